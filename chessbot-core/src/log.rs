//! Move Log entries.
//!
//! Each color has its own append-only list. An entry is one physical
//! transfer that happened on behalf of that color's pieces:
//!
//! ```text
//! {from}-{to}-{color}-{piece}-0    board-1 move, `to` is a square
//! {from}-{to}-{color}-{piece}-1    capture, `to` is the board-2 holding slot
//! ```
//!
//! Castling is two board-1 entries: the king's move, then the rook's once
//! the robot has carried it (`e1-g1-WHITE-K-0`, `h1-f1-WHITE-R-0`). Only
//! the king's entry is a turn; the rook's entry confirms the second leg.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::coords::Square;
use crate::{Color, Piece, Role};

/// Error parsing a stored log entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed log entry {entry:?}: {reason}")]
pub struct LogEntryError {
    pub entry: String,
    pub reason: &'static str,
}

/// Marks whether an entry moved a piece on board 1 or parked a captured one.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum CaptureFlag {
    Moved = 0,
    Captured = 1,
}

/// One record in the Move Log.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LogEntry {
    /// `piece` went from `from` to `to` on board 1.
    Moved {
        from: Square,
        to: Square,
        piece: Piece,
    },
    /// `piece` was taken off `square` and parked in holding `slot`.
    Captured { square: Square, slot: u8, piece: Piece },
}

impl LogEntry {
    /// Color whose list the entry belongs to.
    pub fn color(&self) -> Color {
        self.piece().color
    }

    pub fn piece(&self) -> Piece {
        match *self {
            LogEntry::Moved { piece, .. } | LogEntry::Captured { piece, .. } => piece,
        }
    }

    pub fn flag(&self) -> CaptureFlag {
        match self {
            LogEntry::Moved { .. } => CaptureFlag::Moved,
            LogEntry::Captured { .. } => CaptureFlag::Captured,
        }
    }

    /// For a castling king move, the rook leg `(corner, target)` it implies.
    pub fn castle_rook(&self) -> Option<(Square, Square)> {
        let LogEntry::Moved { from, to, piece } = *self else {
            return None;
        };
        let two_files = from.file().abs_diff(to.file()) == 2;
        if piece.role != Role::King || from.rank() != to.rank() || !two_files {
            return None;
        }
        let (corner, target) = if to.file() > from.file() { (7, 5) } else { (0, 3) };
        Some((
            Square::from_coords(corner, from.rank())?,
            Square::from_coords(target, from.rank())?,
        ))
    }
}

/// Whether `entries[index]` is the rook leg of the castling entry before it.
pub fn is_rook_leg(entries: &[LogEntry], index: usize) -> bool {
    let (Some(previous), Some(&LogEntry::Moved { from, to, piece })) =
        (index.checked_sub(1).and_then(|i| entries.get(i)), entries.get(index))
    else {
        return false;
    };
    piece.role == Role::Rook && previous.castle_rook() == Some((from, to))
}

/// The rook leg of a castle that ends the list without its rook entry: the
/// king moved, the rook did not.
pub fn unfinished_castle(entries: &[LogEntry]) -> Option<(Square, Square)> {
    entries.last()?.castle_rook()
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            LogEntry::Moved { from, to, piece } => write!(
                f,
                "{}-{}-{}-{}-{}",
                from,
                to,
                piece.color.name(),
                piece.symbol(),
                CaptureFlag::Moved as u8
            ),
            LogEntry::Captured { square, slot, piece } => write!(
                f,
                "{}-{}-{}-{}-{}",
                square,
                slot,
                piece.color.name(),
                piece.symbol(),
                CaptureFlag::Captured as u8
            ),
        }
    }
}

impl FromStr for LogEntry {
    type Err = LogEntryError;

    fn from_str(s: &str) -> Result<LogEntry, LogEntryError> {
        let err = |reason| LogEntryError {
            entry: s.to_string(),
            reason,
        };

        let parts: Vec<&str> = s.split('-').collect();
        let [from, to, color, symbol, flag] = parts[..] else {
            return Err(err("expected five dash-separated fields"));
        };

        let color = Color::from_name(color).ok_or_else(|| err("unknown color"))?;
        let mut symbol_chars = symbol.chars();
        let piece = match (symbol_chars.next(), symbol_chars.next()) {
            (Some(c), None) => Piece::from_symbol(c).ok_or_else(|| err("unknown piece symbol"))?,
            _ => return Err(err("piece symbol must be one character")),
        };
        if piece.color != color {
            return Err(err("piece symbol does not match color"));
        }
        let from: Square = from.parse().map_err(|_| err("bad source square"))?;

        match flag {
            "0" => {
                let to: Square = to.parse().map_err(|_| err("bad destination square"))?;
                Ok(LogEntry::Moved { from, to, piece })
            }
            "1" => {
                let slot: u8 = to.parse().map_err(|_| err("bad holding slot"))?;
                if !(1..=64).contains(&slot) {
                    return Err(err("holding slot outside 1..=64"));
                }
                Ok(LogEntry::Captured {
                    square: from,
                    slot,
                    piece,
                })
            }
            _ => Err(err("capture flag must be 0 or 1")),
        }
    }
}
