//! Board synchronization and recovery logic for an actuator-driven chess board.
//!
//! # Physical Layout
//!
//! ```text
//! Board 1 (active)                    Board 2 (holding)
//!
//!   8 | 57 58 59 60 61 62 63 64         slots 1..64, one per capture,
//!   7 | 49 50 51 52 53 54 55 56         assigned in capture order
//!   ...
//!   2 |  9 10 11 12 13 14 15 16
//!   1 |  1  2  3  4  5  6  7  8
//!       a  b  c  d  e  f  g  h
//! ```
//!
//! The actuator addresses every location as `(board, linear position)`.
//! Board 1 positions follow the chess square (`a1` = 1, `h8` = 64); board 2
//! positions are the holding slots handed out by the session.
//!
//! # Move Log Entry
//!
//! ```text
//! {from}-{to}-{color}-{piece}-{flag}
//!
//! e2-e4-WHITE-P-0     board-1 transfer of a white pawn
//! d5-3-BLACK-p-1      black pawn captured on d5, parked in holding slot 3
//! ```
//!
//! The log is the only record of where pieces physically are. The
//! [`recovery`] planner replays it to compute the transfers that return
//! every piece to its starting square.

pub mod board;
pub mod coords;
pub mod layout;
pub mod log;
pub mod recovery;

pub use board::{AppliedMove, BoardModel, MoveRequest};
pub use coords::{linear_to_square, square_to_linear, BoardId, Spot, Square, SquareError, Transfer};
pub use layout::{home_squares, Layout};
pub use log::{is_rook_leg, unfinished_castle, CaptureFlag, LogEntry, LogEntryError};
pub use recovery::{plan_recovery, RecoveryError, RecoveryPlan, RecoveryPlanner, Stranded};

use serde::{Deserialize, Serialize};

/// Side of the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Color {
    #[serde(rename = "w")]
    White,
    #[serde(rename = "b")]
    Black,
}

impl Color {
    /// Get the opposing side.
    #[inline]
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Name used for log keys and entries (`WHITE` / `BLACK`).
    pub fn name(self) -> &'static str {
        match self {
            Color::White => "WHITE",
            Color::Black => "BLACK",
        }
    }

    /// Parse a log key name.
    pub fn from_name(name: &str) -> Option<Color> {
        match name {
            "WHITE" => Some(Color::White),
            "BLACK" => Some(Color::Black),
            _ => None,
        }
    }

    /// Single-letter form used on the client protocol (`w` / `b`).
    pub fn letter(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    /// Both colors, white first.
    pub fn all() -> impl Iterator<Item = Color> {
        [Color::White, Color::Black].into_iter()
    }
}

/// Piece type.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub enum Role {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Role {
    /// Lowercase letter of the role (`p`, `n`, `b`, `r`, `q`, `k`).
    pub fn letter(self) -> char {
        match self {
            Role::Pawn => 'p',
            Role::Knight => 'n',
            Role::Bishop => 'b',
            Role::Rook => 'r',
            Role::Queen => 'q',
            Role::King => 'k',
        }
    }

    /// Parse a role letter, either case.
    pub fn from_letter(letter: char) -> Option<Role> {
        match letter.to_ascii_lowercase() {
            'p' => Some(Role::Pawn),
            'n' => Some(Role::Knight),
            'b' => Some(Role::Bishop),
            'r' => Some(Role::Rook),
            'q' => Some(Role::Queen),
            'k' => Some(Role::King),
            _ => None,
        }
    }

    pub(crate) fn to_shakmaty(self) -> shakmaty::Role {
        match self {
            Role::Pawn => shakmaty::Role::Pawn,
            Role::Knight => shakmaty::Role::Knight,
            Role::Bishop => shakmaty::Role::Bishop,
            Role::Rook => shakmaty::Role::Rook,
            Role::Queen => shakmaty::Role::Queen,
            Role::King => shakmaty::Role::King,
        }
    }

    pub(crate) fn from_shakmaty(role: shakmaty::Role) -> Role {
        match role {
            shakmaty::Role::Pawn => Role::Pawn,
            shakmaty::Role::Knight => Role::Knight,
            shakmaty::Role::Bishop => Role::Bishop,
            shakmaty::Role::Rook => Role::Rook,
            shakmaty::Role::Queen => Role::Queen,
            shakmaty::Role::King => Role::King,
        }
    }
}

/// A colored piece.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Piece {
    pub color: Color,
    pub role: Role,
}

impl Piece {
    pub const fn new(color: Color, role: Role) -> Piece {
        Piece { color, role }
    }

    /// FEN symbol: uppercase for white, lowercase for black.
    pub fn symbol(self) -> char {
        match self.color {
            Color::White => self.role.letter().to_ascii_uppercase(),
            Color::Black => self.role.letter(),
        }
    }

    /// Parse a FEN symbol.
    pub fn from_symbol(symbol: char) -> Option<Piece> {
        let role = Role::from_letter(symbol)?;
        let color = if symbol.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece { color, role })
    }

    pub(crate) fn from_shakmaty(piece: shakmaty::Piece) -> Piece {
        let color = match piece.color {
            shakmaty::Color::White => Color::White,
            shakmaty::Color::Black => Color::Black,
        };
        Piece {
            color,
            role: Role::from_shakmaty(piece.role),
        }
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
