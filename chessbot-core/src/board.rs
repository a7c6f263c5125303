//! Board Model: the logical game, backed by the `shakmaty` rules engine.
//!
//! Moves arrive as a pair of squares. They are resolved against the legal
//! move list, which also tells us what has to happen physically: a captured
//! piece to park (possibly not on the destination square, for en passant)
//! and a rook to carry along when castling.
//!
//! A promotion only changes the logical piece. The robot never swaps it,
//! so the pawn keeps standing in for the promoted piece. Those squares are
//! tracked here, and everything physical (log entries, [`Layout`]) reports
//! the pawn.

use shakmaty::fen::Fen;
use shakmaty::{Chess, EnPassantMode, Position};

use crate::coords::{Spot, Square, Transfer};
use crate::layout::Layout;
use crate::log::LogEntry;
use crate::{Color, Piece, Role};

/// A move as requested by a player.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveRequest {
    pub from: Square,
    pub to: Square,
    /// Promotion piece; queen when omitted.
    pub promotion: Option<Role>,
}

impl MoveRequest {
    pub fn new(from: Square, to: Square) -> MoveRequest {
        MoveRequest {
            from,
            to,
            promotion: None,
        }
    }
}

/// A legal move together with its physical consequences.
#[derive(Clone, Debug)]
pub struct AppliedMove {
    /// The physical piece that moves, as it stands before the move.
    pub mover: Piece,
    pub from: Square,
    pub to: Square,
    /// Captured physical piece and the square it is taken from.
    pub capture: Option<(Square, Piece)>,
    /// Rook relocation that accompanies castling.
    pub rook: Option<(Square, Square)>,
    inner: shakmaty::Move,
}

impl AppliedMove {
    /// Transfer of the moving piece on board 1.
    pub fn main_transfer(&self) -> Transfer {
        Transfer::on_board(self.from, self.to)
    }

    /// Log entry for the moving piece.
    pub fn log_entry(&self) -> LogEntry {
        LogEntry::Moved {
            from: self.from,
            to: self.to,
            piece: self.mover,
        }
    }

    /// Transfer and log entry that park the captured piece in `slot`.
    pub fn capture_step(&self, slot: u8) -> Option<(Transfer, LogEntry)> {
        self.capture.map(|(square, piece)| {
            let transfer = Transfer {
                from: Spot::active(square),
                to: Spot::holding(slot),
            };
            (transfer, LogEntry::Captured { square, slot, piece })
        })
    }

    /// Rook transfer for castling with the entry that confirms it.
    pub fn rook_step(&self) -> Option<(Transfer, LogEntry)> {
        self.rook.map(|(from, to)| {
            let piece = Piece::new(self.mover.color, Role::Rook);
            (Transfer::on_board(from, to), LogEntry::Moved { from, to, piece })
        })
    }

    /// Whether the move ends in a promotion.
    pub fn is_promotion(&self) -> bool {
        self.inner.is_promotion()
    }
}

/// The logical position of the current match.
#[derive(Clone, Debug, Default)]
pub struct BoardModel {
    position: Chess,
    /// Bit per square holding a pawn that stands in for a promoted piece.
    promoted: u64,
}

#[inline]
fn bit(square: Square) -> u64 {
    1 << square.index()
}

impl BoardModel {
    /// Standard starting position.
    pub fn new() -> BoardModel {
        BoardModel::default()
    }

    /// Back to the starting position.
    pub fn reset(&mut self) {
        self.position = Chess::default();
        self.promoted = 0;
    }

    /// Side to move.
    pub fn turn(&self) -> Color {
        match self.position.turn() {
            shakmaty::Color::White => Color::White,
            shakmaty::Color::Black => Color::Black,
        }
    }

    /// Resolve a request against the legal moves without playing it.
    pub fn preview(&self, request: MoveRequest) -> Option<AppliedMove> {
        let from = request.from.to_shakmaty();
        let wanted_promotion = request.promotion.unwrap_or(Role::Queen).to_shakmaty();

        let inner = self.position.legal_moves().into_iter().find(|m| {
            m.from() == Some(from)
                && destination(m) == request.to
                && m.promotion().map_or(true, |role| role == wanted_promotion)
        })?;

        let mover = self.physical_piece_at(request.from)?;
        let capture = match &inner {
            shakmaty::Move::EnPassant { from, to } => {
                let square = Square::from_coords(
                    Square::from_shakmaty(*to).file(),
                    Square::from_shakmaty(*from).rank(),
                )?;
                self.physical_piece_at(square).map(|piece| (square, piece))
            }
            _ => self
                .physical_piece_at(request.to)
                .map(|piece| (request.to, piece)),
        };
        let rook = match &inner {
            shakmaty::Move::Castle { king, rook } => {
                let king = Square::from_shakmaty(*king);
                let rook = Square::from_shakmaty(*rook);
                let file = if rook.file() > king.file() { 5 } else { 3 };
                Some((rook, Square::from_coords(file, king.rank())?))
            }
            _ => None,
        };

        Some(AppliedMove {
            mover,
            from: request.from,
            to: request.to,
            capture,
            rook,
            inner,
        })
    }

    /// Play a previewed move. Returns `false` if it is not legal here.
    pub fn commit(&mut self, applied: &AppliedMove) -> bool {
        if !self.position.is_legal(&applied.inner) {
            return false;
        }
        let mut promoted = self.promoted & !bit(applied.from);
        if let Some((square, _)) = applied.capture {
            promoted &= !bit(square);
        }
        if self.promoted & bit(applied.from) != 0 || applied.is_promotion() {
            promoted |= bit(applied.to);
        }
        self.position.play_unchecked(&applied.inner);
        self.promoted = promoted;
        true
    }

    /// Play a request if it is legal. Returns whether it was.
    pub fn apply(&mut self, request: MoveRequest) -> bool {
        match self.preview(request) {
            Some(applied) => self.commit(&applied),
            None => false,
        }
    }

    /// Play the move `from -> to` if it is legal, promoting to a queen.
    /// Returns whether it was.
    pub fn apply_move(&mut self, from: Square, to: Square) -> bool {
        self.apply(MoveRequest::new(from, to))
    }

    /// Whether `from -> to` is a legal pawn promotion.
    pub fn promotes(&self, from: Square, to: Square) -> bool {
        self.preview(MoveRequest::new(from, to))
            .is_some_and(|applied| applied.is_promotion())
    }

    /// Piece standing on `square`.
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position
            .board()
            .piece_at(square.to_shakmaty())
            .map(Piece::from_shakmaty)
    }

    /// Occupied squares with their pieces, in a1..h8 order.
    pub fn all_occupied_squares(&self) -> Vec<(Square, Piece)> {
        Square::all()
            .filter_map(|square| self.piece_at(square).map(|piece| (square, piece)))
            .collect()
    }

    /// The piece physically on `square`: a promoted piece is still its pawn.
    pub fn physical_piece_at(&self, square: Square) -> Option<Piece> {
        let piece = self.piece_at(square)?;
        if self.promoted & bit(square) != 0 {
            return Some(Piece::new(piece.color, Role::Pawn));
        }
        Some(piece)
    }

    /// Physical piece placement as a standalone layout.
    pub fn layout(&self) -> Layout {
        let mut layout = Layout::empty();
        for square in Square::all() {
            layout.set(square, self.physical_piece_at(square));
        }
        layout
    }

    /// FEN of the current position.
    pub fn serialize(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    /// Checkmate, stalemate or a rules draw.
    pub fn is_terminal(&self) -> bool {
        self.position.is_game_over()
    }

    /// All legal moves, castling given as the king's two-square step.
    pub fn legal_moves(&self) -> Vec<MoveRequest> {
        self.position
            .legal_moves()
            .iter()
            .filter_map(|m| {
                Some(MoveRequest {
                    from: Square::from_shakmaty(m.from()?),
                    to: destination(m),
                    promotion: m.promotion().map(Role::from_shakmaty),
                })
            })
            .collect()
    }
}

/// Destination square as a player names it. Castling is stored king-takes-rook
/// by the rules engine; players name the king's target square instead.
fn destination(m: &shakmaty::Move) -> Square {
    match m {
        shakmaty::Move::Castle { king, rook } => {
            let king = Square::from_shakmaty(*king);
            let rook = Square::from_shakmaty(*rook);
            let file = if rook.file() > king.file() { 6 } else { 2 };
            Square::from_coords(file, king.rank()).unwrap_or(king)
        }
        _ => Square::from_shakmaty(m.to()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn play(board: &mut BoardModel, moves: &[(&str, &str)]) {
        for (from, to) in moves {
            assert!(board.apply_move(sq(from), sq(to)), "{from}{to} should be legal");
        }
    }

    #[test]
    fn test_new_board() {
        let board = BoardModel::new();
        assert_eq!(board.serialize(), START_FEN);
        assert_eq!(board.turn(), Color::White);
        assert_eq!(board.all_occupied_squares().len(), 32);
        assert_eq!(board.legal_moves().len(), 20);
        assert!(!board.is_terminal());
    }

    #[test]
    fn test_apply_legal_move() {
        let mut board = BoardModel::new();
        assert!(board.apply_move(sq("e2"), sq("e4")));
        assert_eq!(board.turn(), Color::Black);
        assert_eq!(board.piece_at(sq("e2")), None);
        assert_eq!(board.piece_at(sq("e4")), Some(Piece::new(Color::White, Role::Pawn)));
        assert!(board.serialize().starts_with("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b"));
    }

    #[test]
    fn test_illegal_move_leaves_board() {
        let mut board = BoardModel::new();
        assert!(!board.apply_move(sq("e2"), sq("e5")));
        assert!(!board.apply_move(sq("e7"), sq("e5")));
        assert!(!board.apply_move(sq("e3"), sq("e4")));
        assert_eq!(board.serialize(), START_FEN);
    }

    #[test]
    fn test_preview_plain_capture() {
        let mut board = BoardModel::new();
        play(&mut board, &[("e2", "e4"), ("d7", "d5")]);

        let applied = board.preview(MoveRequest::new(sq("e4"), sq("d5"))).unwrap();
        assert_eq!(applied.mover, Piece::new(Color::White, Role::Pawn));
        assert_eq!(
            applied.capture,
            Some((sq("d5"), Piece::new(Color::Black, Role::Pawn)))
        );
        assert_eq!(applied.rook, None);

        let (transfer, entry) = applied.capture_step(1).unwrap();
        assert_eq!(transfer.to_string(), "1:36 -> 2:1");
        assert_eq!(entry.to_string(), "d5-1-BLACK-p-1");
        assert_eq!(applied.log_entry().to_string(), "e4-d5-WHITE-P-0");

        // preview does not move anything
        assert_eq!(board.turn(), Color::White);
        assert!(board.commit(&applied));
        assert_eq!(board.turn(), Color::Black);
    }

    #[test]
    fn test_preview_en_passant() {
        let mut board = BoardModel::new();
        play(
            &mut board,
            &[("e2", "e4"), ("a7", "a6"), ("e4", "e5"), ("d7", "d5")],
        );

        let applied = board.preview(MoveRequest::new(sq("e5"), sq("d6"))).unwrap();
        assert_eq!(
            applied.capture,
            Some((sq("d5"), Piece::new(Color::Black, Role::Pawn)))
        );
        assert!(board.commit(&applied));
        assert_eq!(board.piece_at(sq("d5")), None);
    }

    #[test]
    fn test_preview_castling() {
        let mut board = BoardModel::new();
        play(
            &mut board,
            &[
                ("e2", "e4"),
                ("e7", "e5"),
                ("g1", "f3"),
                ("b8", "c6"),
                ("f1", "c4"),
                ("g8", "f6"),
            ],
        );

        let applied = board.preview(MoveRequest::new(sq("e1"), sq("g1"))).unwrap();
        assert_eq!(applied.mover, Piece::new(Color::White, Role::King));
        assert_eq!(applied.capture, None);
        assert_eq!(applied.rook, Some((sq("h1"), sq("f1"))));
        let (transfer, entry) = applied.rook_step().unwrap();
        assert_eq!(transfer, Transfer::on_board(sq("h1"), sq("f1")));
        assert_eq!(entry.to_string(), "h1-f1-WHITE-R-0");

        assert!(board.commit(&applied));
        assert_eq!(board.piece_at(sq("g1")), Some(Piece::new(Color::White, Role::King)));
        assert_eq!(board.piece_at(sq("f1")), Some(Piece::new(Color::White, Role::Rook)));
        assert_eq!(board.piece_at(sq("h1")), None);
    }

    #[test]
    fn test_commit_rejects_stale_move() {
        let mut board = BoardModel::new();
        let applied = board.preview(MoveRequest::new(sq("e2"), sq("e4"))).unwrap();
        assert!(board.commit(&applied));
        assert!(!board.commit(&applied));
    }

    #[test]
    fn test_fools_mate_is_terminal() {
        let mut board = BoardModel::new();
        play(
            &mut board,
            &[("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")],
        );
        assert!(board.is_terminal());
        assert!(board.legal_moves().is_empty());
    }

    /// 1. a4 b5 2. axb5 a6 3. bxa6 Bb7 4. a7 g6, white to promote on b8.
    fn before_promotion() -> BoardModel {
        let mut board = BoardModel::new();
        play(
            &mut board,
            &[
                ("a2", "a4"),
                ("b7", "b5"),
                ("a4", "b5"),
                ("a7", "a6"),
                ("b5", "a6"),
                ("c8", "b7"),
                ("a6", "a7"),
                ("g7", "g6"),
            ],
        );
        board
    }

    #[test]
    fn test_promoted_piece_is_still_a_pawn_physically() {
        let mut board = before_promotion();
        assert!(board.promotes(sq("a7"), sq("b8")));
        assert!(board.apply(MoveRequest {
            from: sq("a7"),
            to: sq("b8"),
            promotion: Some(Role::Knight),
        }));

        let white_pawn = Piece::new(Color::White, Role::Pawn);
        assert_eq!(board.piece_at(sq("b8")), Some(Piece::new(Color::White, Role::Knight)));
        assert_eq!(board.physical_piece_at(sq("b8")), Some(white_pawn));
        assert_eq!(board.layout().get(sq("b8")), Some(white_pawn));

        // the rook takes it: what goes to holding is the pawn
        let applied = board.preview(MoveRequest::new(sq("a8"), sq("b8"))).unwrap();
        assert_eq!(applied.capture, Some((sq("b8"), white_pawn)));
        assert!(board.commit(&applied));
        assert_eq!(board.physical_piece_at(sq("b8")), Some(Piece::new(Color::Black, Role::Rook)));
    }

    #[test]
    fn test_promoted_piece_keeps_its_pawn_when_moving() {
        let mut board = before_promotion();
        assert!(board.apply_move(sq("a7"), sq("b8")));
        play(&mut board, &[("g6", "g5")]);

        let applied = board.preview(MoveRequest::new(sq("b8"), sq("c8"))).unwrap();
        assert_eq!(applied.log_entry().to_string(), "b8-c8-WHITE-P-0");
        assert!(board.commit(&applied));
        assert_eq!(board.piece_at(sq("c8")), Some(Piece::new(Color::White, Role::Queen)));
        assert_eq!(board.layout().get(sq("c8")), Some(Piece::new(Color::White, Role::Pawn)));
        assert_eq!(board.layout().get(sq("b8")), None);
    }

    #[test]
    fn test_reset() {
        let mut board = BoardModel::new();
        play(&mut board, &[("d2", "d4")]);
        board.reset();
        assert_eq!(board.serialize(), START_FEN);
        assert_eq!(board.layout(), Layout::starting());
    }
}
