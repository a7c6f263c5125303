//! Chess squares and actuator coordinates.
//!
//! Square indices run a1=0 .. h8=63 (rank-major). The actuator's linear
//! position on board 1 is the index plus one:
//!
//! ```text
//! linear = rank * 8 - (8 - (file_index + 1))      rank in 1..=8, file_index in 0..=7
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const FILES: &[u8; 8] = b"abcdefgh";

/// Errors from square parsing and coordinate conversion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SquareError {
    #[error("invalid square: {0:?}")]
    Invalid(String),

    #[error("linear position {0} is outside 1..=64")]
    OutOfRange(u32),
}

/// A square on the chess board (0-63, a1 = 0, h8 = 63).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    /// Create a square from its index (0-63).
    #[inline]
    pub fn new(index: u8) -> Option<Square> {
        (index < 64).then_some(Square(index))
    }

    #[inline]
    pub(crate) const fn at(index: u8) -> Square {
        debug_assert!(index < 64);
        Square(index)
    }

    /// Create a square from zero-based file and rank.
    #[inline]
    pub fn from_coords(file: u8, rank: u8) -> Option<Square> {
        if file < 8 && rank < 8 {
            Some(Square(rank * 8 + file))
        } else {
            None
        }
    }

    /// Index (0-63).
    #[inline]
    pub fn index(self) -> u8 {
        self.0
    }

    /// Zero-based file (a = 0).
    #[inline]
    pub fn file(self) -> u8 {
        self.0 % 8
    }

    /// Zero-based rank (rank 1 = 0).
    #[inline]
    pub fn rank(self) -> u8 {
        self.0 / 8
    }

    /// Actuator position on board 1 (1-64).
    #[inline]
    pub fn linear(self) -> u8 {
        self.0 + 1
    }

    /// Square for an actuator position on board 1.
    pub fn from_linear(pos: u32) -> Result<Square, SquareError> {
        if (1..=64).contains(&pos) {
            Ok(Square((pos - 1) as u8))
        } else {
            Err(SquareError::OutOfRange(pos))
        }
    }

    /// Same file, rank seen from the other side of the board.
    #[inline]
    pub fn mirror(self) -> Square {
        Square(self.0 ^ 56)
    }

    /// Iterate over all 64 squares in a1..h8 order.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).map(Square)
    }

    pub(crate) fn to_shakmaty(self) -> shakmaty::Square {
        shakmaty::Square::new(u32::from(self.0))
    }

    pub(crate) fn from_shakmaty(square: shakmaty::Square) -> Square {
        Square(u8::from(square))
    }
}

impl FromStr for Square {
    type Err = SquareError;

    /// Parse `e4` / `E4`.
    fn from_str(s: &str) -> Result<Square, SquareError> {
        let invalid = || SquareError::Invalid(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(invalid());
        }
        let file = FILES
            .iter()
            .position(|&f| f == bytes[0].to_ascii_lowercase())
            .ok_or_else(invalid)?;
        let rank = match bytes[1] {
            b'1'..=b'8' => bytes[1] - b'1',
            _ => return Err(invalid()),
        };
        Square::from_coords(file as u8, rank).ok_or_else(invalid)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            FILES[self.file() as usize] as char,
            self.rank() + 1
        )
    }
}

/// Map a square name to its board-1 actuator position (1-64).
pub fn square_to_linear(square: &str) -> Result<u8, SquareError> {
    square.parse::<Square>().map(Square::linear)
}

/// Map a board-1 actuator position back to its square. Fails outside 1..=64.
pub fn linear_to_square(pos: u32) -> Result<Square, SquareError> {
    Square::from_linear(pos)
}

/// Which physical board a position refers to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum BoardId {
    /// The board the game is played on.
    Active = 1,
    /// Where captured pieces are parked.
    Holding = 2,
}

impl BoardId {
    #[inline]
    pub fn number(self) -> u8 {
        self as u8
    }
}

/// One actuator-addressable location.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Spot {
    pub board: BoardId,
    pub pos: u8,
}

impl Spot {
    /// A square on board 1.
    pub fn active(square: Square) -> Spot {
        Spot {
            board: BoardId::Active,
            pos: square.linear(),
        }
    }

    /// A holding slot on board 2.
    pub fn holding(slot: u8) -> Spot {
        Spot {
            board: BoardId::Holding,
            pos: slot,
        }
    }
}

impl fmt::Display for Spot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.board.number(), self.pos)
    }
}

/// One physical relocation of a piece.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct Transfer {
    pub from: Spot,
    pub to: Spot,
}

impl Transfer {
    /// Transfer between two board-1 squares.
    pub fn on_board(from: Square, to: Square) -> Transfer {
        Transfer {
            from: Spot::active(from),
            to: Spot::active(to),
        }
    }

    /// The transfer that puts the piece back.
    pub fn reversed(self) -> Transfer {
        Transfer {
            from: self.to,
            to: self.from,
        }
    }
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
