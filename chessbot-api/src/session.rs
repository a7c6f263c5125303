//! Two-player session bookkeeping.
//!
//! ```text
//! EMPTY --connect--> ONE_PLAYER --connect--> ACTIVE
//!   ^                    |                     |
//!   +----disconnect------+------disconnect-----+
//! ```
//!
//! The first client gets white, the second black. Any disconnect ends the
//! match for both.

use chessbot_core::Color;
use serde::Serialize;

/// Identifier of one client connection.
pub type ConnId = u64;

/// A seated player.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Player {
    pub conn: ConnId,
    pub color: Color,
}

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    OnePlayer,
    Active,
}

/// Player slots and whose turn it is.
#[derive(Clone, Debug, Default)]
pub struct Session {
    slots: [Option<Player>; 2],
    current_turn: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        match self.active_count() {
            0 => SessionState::Empty,
            1 => SessionState::OnePlayer,
            _ => SessionState::Active,
        }
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.active_count() == 2
    }

    /// Index of the player whose move it is (0 white, 1 black).
    #[inline]
    pub fn current_turn(&self) -> usize {
        self.current_turn
    }

    /// Seat `conn` in the first free slot. Returns `None` when full.
    pub fn add_player(&mut self, conn: ConnId) -> Option<Player> {
        let index = self.slots.iter().position(Option::is_none)?;
        let color = if index == 0 { Color::White } else { Color::Black };
        let player = Player { conn, color };
        self.slots[index] = Some(player);
        Some(player)
    }

    /// The player on connection `conn`, if seated.
    pub fn player(&self, conn: ConnId) -> Option<Player> {
        self.players().find(|p| p.conn == conn)
    }

    /// Seated players, white first.
    pub fn players(&self) -> impl Iterator<Item = Player> + '_ {
        self.slots.iter().flatten().copied()
    }

    /// The player to move; only meaningful once active.
    pub fn current_player(&self) -> Option<Player> {
        self.slots[self.current_turn]
    }

    /// Hand the move to the other player.
    pub fn advance_turn(&mut self) {
        self.current_turn = 1 - self.current_turn;
    }

    /// White moves next.
    pub fn restart_turns(&mut self) {
        self.current_turn = 0;
    }

    /// Unseat everyone, returning who was seated.
    pub fn reset(&mut self) -> Vec<Player> {
        let dropped = self.players().collect();
        *self = Session::default();
        dropped
    }
}
