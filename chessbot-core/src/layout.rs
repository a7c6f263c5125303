//! Physical piece placement on board 1 and the canonical home squares.
//!
//! Home squares (white; black mirrors the rank):
//!
//! ```text
//! pawn    a2 b2 c2 d2 e2 f2 g2 h2
//! rook    a1 h1
//! knight  b1 g1
//! bishop  c1 f1
//! queen   d1
//! king    e1
//! ```

use crate::coords::Square;
use crate::{Color, Piece, Role};

const PAWN_HOMES: &[u8] = &[8, 9, 10, 11, 12, 13, 14, 15];
const ROOK_HOMES: &[u8] = &[0, 7];
const KNIGHT_HOMES: &[u8] = &[1, 6];
const BISHOP_HOMES: &[u8] = &[2, 5];
const QUEEN_HOMES: &[u8] = &[3];
const KING_HOMES: &[u8] = &[4];

/// Starting squares of a piece, in the fixed scan order.
pub fn home_squares(piece: Piece) -> impl Iterator<Item = Square> {
    let base = match piece.role {
        Role::Pawn => PAWN_HOMES,
        Role::Rook => ROOK_HOMES,
        Role::Knight => KNIGHT_HOMES,
        Role::Bishop => BISHOP_HOMES,
        Role::Queen => QUEEN_HOMES,
        Role::King => KING_HOMES,
    };
    base.iter().map(move |&index| {
        let square = Square::at(index);
        match piece.color {
            Color::White => square,
            Color::Black => square.mirror(),
        }
    })
}

/// Whether `square` is one of `piece`'s starting squares.
pub fn is_home(square: Square, piece: Piece) -> bool {
    home_squares(piece).any(|home| home == square)
}

/// Whether `square` is a starting square for any piece (ranks 1, 2, 7, 8).
pub fn is_any_home(square: Square) -> bool {
    matches!(square.rank(), 0 | 1 | 6 | 7)
}

/// Piece-on-square mapping for board 1.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Layout {
    squares: [Option<Piece>; 64],
}

impl Layout {
    /// A board with no pieces.
    pub fn empty() -> Layout {
        Layout {
            squares: [None; 64],
        }
    }

    /// The canonical starting layout.
    pub fn starting() -> Layout {
        let mut layout = Layout::empty();
        for color in Color::all() {
            for role in [
                Role::Pawn,
                Role::Knight,
                Role::Bishop,
                Role::Rook,
                Role::Queen,
                Role::King,
            ] {
                let piece = Piece::new(color, role);
                for square in home_squares(piece) {
                    layout.set(square, Some(piece));
                }
            }
        }
        layout
    }

    #[inline]
    pub fn get(&self, square: Square) -> Option<Piece> {
        self.squares[square.index() as usize]
    }

    #[inline]
    pub fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.squares[square.index() as usize] = piece;
    }

    /// Remove and return the piece on `square`.
    #[inline]
    pub fn take(&mut self, square: Square) -> Option<Piece> {
        self.squares[square.index() as usize].take()
    }

    /// Occupied squares in a1..h8 order.
    pub fn occupied(&self) -> Vec<(Square, Piece)> {
        Square::all()
            .filter_map(|square| self.get(square).map(|piece| (square, piece)))
            .collect()
    }

    /// Number of pieces on the board.
    pub fn count(&self) -> usize {
        self.squares.iter().filter(|s| s.is_some()).count()
    }

    /// Every piece stands on one of its own home squares.
    pub fn is_settled(&self) -> bool {
        self.occupied()
            .into_iter()
            .all(|(square, piece)| is_home(square, piece))
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::starting()
    }
}
