//! Recovery Engine planner.
//!
//! Works out the transfers that put every piece back on a starting square,
//! using only the Move Log as the record of what is physically where.
//!
//! 1. Replay the board-1 entries (flag 0) of both colors, alternating white
//!    and black, into a fresh [`BoardModel`]. Captured pieces drop out of the
//!    replay the same way they dropped off the physical board.
//! 2. Walk the occupied squares in a1..h8 order and send each misplaced
//!    piece home. A home square held by a different piece is cleared first,
//!    which may in turn need another square cleared; the chain is kept on an
//!    explicit stack. When the chain loops back on itself the piece at the
//!    top is parked on a free middle square and picked up again later.
//! 3. Bring every captured piece back from its holding slot.
//!
//! A move that stopped between parking the captured piece and moving the
//! capturer leaves a capture entry with no matching board-1 move. The
//! replay still shows the victim on its square, so it is removed before
//! planning. Likewise a castle whose rook entry is missing left the rook on
//! its corner, so the replayed rook is put back there.
//!
//! A promoted piece is physically still its pawn, and is sent home as one.
//! Pieces that have no free home square left stay where they are and are
//! reported as [`Stranded`].

use std::collections::HashSet;

use thiserror::Error;

use crate::board::{BoardModel, MoveRequest};
use crate::coords::{Spot, Square, Transfer};
use crate::layout::{home_squares, is_any_home, is_home, Layout};
use crate::log::{is_rook_leg, unfinished_castle, LogEntry};
use crate::{Color, Piece, Role};

/// Errors that stop recovery planning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecoveryError {
    /// A logged board-1 move is not legal when replayed.
    #[error("{color:?} log entry #{index} ({entry}) does not replay")]
    Replay {
        color: Color,
        index: usize,
        entry: String,
    },

    /// Every middle square is occupied.
    #[error("no free square to park a piece while clearing {0}")]
    NoParkingSquare(Square),
}

/// A piece that could not be returned home.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Stranded {
    pub spot: Spot,
    pub piece: Piece,
}

/// Ordered transfers that restore the starting layout.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct RecoveryPlan {
    pub transfers: Vec<Transfer>,
    pub stranded: Vec<Stranded>,
}

impl RecoveryPlan {
    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }
}

/// Board-1 mirror plus the transfers issued so far.
#[derive(Clone, Debug)]
pub struct RecoveryPlanner {
    layout: Layout,
    transfers: Vec<Transfer>,
    /// Board-1 squares whose piece has nowhere to go.
    stuck: HashSet<Square>,
    stranded: Vec<Stranded>,
}

impl RecoveryPlanner {
    /// Start from an explicit board-1 layout.
    pub fn new(layout: Layout) -> RecoveryPlanner {
        RecoveryPlanner {
            layout,
            transfers: Vec::new(),
            stuck: HashSet::new(),
            stranded: Vec::new(),
        }
    }

    /// Step 1: rebuild board 1 by replaying the logged board-1 moves.
    pub fn from_log(white: &[LogEntry], black: &[LogEntry]) -> Result<RecoveryPlanner, RecoveryError> {
        let mut layout = replay(white, black)?.layout();

        // A capture as the newest entry of its color, with the victim still
        // standing on the square, means the capturing piece never arrived:
        // the victim is physically in holding already.
        for list in [white, black] {
            if let Some(&LogEntry::Captured { square, piece, .. }) = list.last() {
                if layout.get(square) == Some(piece) {
                    layout.set(square, None);
                }
            }
        }

        // A castle without its rook entry: the replay moved the rook, the
        // robot did not.
        for list in [white, black] {
            if let Some((corner, target)) = unfinished_castle(list) {
                if layout.get(corner).is_none() {
                    let rook = layout.take(target);
                    layout.set(corner, rook);
                }
            }
        }
        Ok(RecoveryPlanner::new(layout))
    }

    /// Current board-1 mirror.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Step 2: move every misplaced board-1 piece to a home square.
    pub fn settle_board(&mut self) -> Result<(), RecoveryError> {
        loop {
            // re-enumerate after every placement
            let next = self
                .layout
                .occupied()
                .into_iter()
                .find(|&(square, piece)| !is_home(square, piece) && !self.stuck.contains(&square));
            let Some((square, _)) = next else {
                break;
            };
            self.send_home(square, false)?;
        }
        Ok(())
    }

    /// Step 3: bring a captured piece back from holding `slot`.
    pub fn restore_capture(&mut self, slot: u8, piece: Piece) -> Result<(), RecoveryError> {
        let Some(home) = self.home_target(piece) else {
            self.stranded.push(Stranded {
                spot: Spot::holding(slot),
                piece,
            });
            return Ok(());
        };
        if self.layout.get(home).is_some() {
            self.send_home(home, true)?;
        }
        self.transfers.push(Transfer {
            from: Spot::holding(slot),
            to: Spot::active(home),
        });
        self.layout.set(home, Some(piece));
        Ok(())
    }

    /// Finish planning. Board-1 pieces that never found a home are reported.
    pub fn finish(mut self) -> RecoveryPlan {
        let mut stuck: Vec<Square> = self.stuck.into_iter().collect();
        stuck.sort();
        for square in stuck {
            if let Some(piece) = self.layout.get(square) {
                self.stranded.push(Stranded {
                    spot: Spot::active(square),
                    piece,
                });
            }
        }
        RecoveryPlan {
            transfers: self.transfers,
            stranded: self.stranded,
        }
    }

    /// Move the piece on `start` home, clearing blockers first.
    ///
    /// With `vacate` set the square must end up empty: a piece without a free
    /// home is parked instead of left in place.
    fn send_home(&mut self, start: Square, vacate: bool) -> Result<(), RecoveryError> {
        let mut chain = vec![start];

        while let Some(&square) = chain.last() {
            let Some(piece) = self.layout.get(square) else {
                chain.pop();
                continue;
            };

            match self.home_target(piece) {
                None if chain.len() == 1 && !vacate => {
                    self.stuck.insert(square);
                    chain.pop();
                }
                None => {
                    self.park(square)?;
                    chain.pop();
                }
                Some(home) if self.layout.get(home).is_none() => {
                    self.move_on_board(square, home);
                    chain.pop();
                }
                Some(home) if chain.contains(&home) => {
                    // cycle: step aside so the piece below can go home
                    self.park(square)?;
                    chain.pop();
                }
                Some(home) => chain.push(home),
            }
        }
        Ok(())
    }

    /// Home square for `piece`: the first empty one, else the first held by
    /// a different piece. `None` when all are taken by identical pieces.
    fn home_target(&self, piece: Piece) -> Option<Square> {
        let mut blocked = None;
        for home in home_squares(piece) {
            match self.layout.get(home) {
                None => return Some(home),
                Some(other) if other != piece && blocked.is_none() => blocked = Some(home),
                Some(_) => {}
            }
        }
        blocked
    }

    fn park(&mut self, square: Square) -> Result<(), RecoveryError> {
        let spare = Square::all()
            .find(|&s| !is_any_home(s) && self.layout.get(s).is_none())
            .ok_or(RecoveryError::NoParkingSquare(square))?;
        self.move_on_board(square, spare);
        Ok(())
    }

    fn move_on_board(&mut self, from: Square, to: Square) {
        let piece = self.layout.take(from);
        self.layout.set(to, piece);
        self.stuck.remove(&from);
        self.transfers.push(Transfer::on_board(from, to));
    }
}

/// One logged board-1 move, in play order.
struct Ply {
    color: Color,
    index: usize,
    from: Square,
    to: Square,
}

/// Promotion choices tried when the log does not say which piece was taken.
const PROMOTIONS: [Role; 4] = [Role::Queen, Role::Knight, Role::Rook, Role::Bishop];

/// Replay the flag-0 entries of both colors, white first, pairwise.
///
/// The log records the pawn for a promotion, not the piece chosen. Each
/// promotion is tried as queen first and then the other pieces, keeping the
/// first choice under which the rest of the log still replays.
pub fn replay(white: &[LogEntry], black: &[LogEntry]) -> Result<BoardModel, RecoveryError> {
    let moves = |color: Color, entries: &[LogEntry]| -> Vec<Ply> {
        entries
            .iter()
            .enumerate()
            .filter(|&(index, _)| !is_rook_leg(entries, index))
            .filter_map(|(index, entry)| match *entry {
                LogEntry::Moved { from, to, .. } => Some(Ply {
                    color,
                    index,
                    from,
                    to,
                }),
                LogEntry::Captured { .. } => None,
            })
            .collect()
    };
    let mut white_moves = moves(Color::White, white).into_iter();
    let mut black_moves = moves(Color::Black, black).into_iter();

    let mut plies = Vec::new();
    loop {
        let (w, b) = (white_moves.next(), black_moves.next());
        if w.is_none() && b.is_none() {
            break;
        }
        plies.extend(w);
        plies.extend(b);
    }

    let mut board = BoardModel::new();
    replay_from(&mut board, &plies, 0).map_err(|failed| {
        let ply = &plies[failed];
        let entries = match ply.color {
            Color::White => white,
            Color::Black => black,
        };
        RecoveryError::Replay {
            color: ply.color,
            index: ply.index,
            entry: entries[ply.index].to_string(),
        }
    })?;
    Ok(board)
}

/// Play `plies[start..]` on `board`. On failure, returns the furthest ply
/// reached.
fn replay_from(board: &mut BoardModel, plies: &[Ply], start: usize) -> Result<(), usize> {
    for (i, ply) in plies.iter().enumerate().skip(start) {
        if !board.promotes(ply.from, ply.to) {
            if !board.apply_move(ply.from, ply.to) {
                return Err(i);
            }
            continue;
        }

        let mut furthest = i;
        for role in PROMOTIONS {
            let mut attempt = board.clone();
            let request = MoveRequest {
                from: ply.from,
                to: ply.to,
                promotion: Some(role),
            };
            if !attempt.apply(request) {
                continue;
            }
            match replay_from(&mut attempt, plies, i + 1) {
                Ok(()) => {
                    *board = attempt;
                    return Ok(());
                }
                Err(failed) => furthest = furthest.max(failed),
            }
        }
        return Err(furthest);
    }
    Ok(())
}

/// Plan a full recovery from both color logs.
pub fn plan_recovery(white: &[LogEntry], black: &[LogEntry]) -> Result<RecoveryPlan, RecoveryError> {
    let mut planner = RecoveryPlanner::from_log(white, black)?;
    planner.settle_board()?;

    for entry in white.iter().chain(black) {
        if let LogEntry::Captured { slot, piece, .. } = *entry {
            planner.restore_capture(slot, piece)?;
        }
    }
    Ok(planner.finish())
}
