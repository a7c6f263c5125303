//! WebSocket message envelopes.
//!
//! Every frame is JSON `{"type": ..., "data": {...}}`.
//!
//! Client -> server: `make_move {pos_start, pos_end, promotion?}`,
//! `get_board_state`, `reset_board`.
//!
//! Server -> client: `init_game {color}`,
//! `update_game_state {board_state, player_color}`,
//! `board_state {board_state, player_color}`, `error {message}`, plus the
//! bare `{"message": "session is full"}` sent to a rejected third client.

use chessbot_core::Color;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

// =============================================================================
// Inbound
// =============================================================================

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize, Default)]
struct MakeMoveData {
    pos_start: Option<String>,
    pos_end: Option<String>,
    promotion: Option<String>,
}

/// A request from a player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    MakeMove {
        pos_start: String,
        pos_end: String,
        promotion: Option<String>,
    },
    GetBoardState,
    ResetBoard,
}

impl ClientMessage {
    /// Parse one text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let raw: RawEnvelope =
            serde_json::from_str(text).map_err(|_| ProtocolError::InvalidJson)?;
        let kind = raw.kind.ok_or(ProtocolError::MissingType)?;

        match kind.as_str() {
            "make_move" => {
                let data: MakeMoveData = if raw.data.is_null() {
                    MakeMoveData::default()
                } else {
                    serde_json::from_value(raw.data).map_err(|_| ProtocolError::MissingSquares)?
                };
                match (data.pos_start, data.pos_end) {
                    (Some(pos_start), Some(pos_end)) => Ok(ClientMessage::MakeMove {
                        pos_start,
                        pos_end,
                        promotion: data.promotion,
                    }),
                    _ => Err(ProtocolError::MissingSquares),
                }
            }
            "get_board_state" => Ok(ClientMessage::GetBoardState),
            "reset_board" => Ok(ClientMessage::ResetBoard),
            _ => Err(ProtocolError::UnknownType(kind)),
        }
    }
}

// =============================================================================
// Outbound
// =============================================================================

/// Board snapshot as sent to clients.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct BoardState {
    pub fen: String,
}

/// Typed `{type, data}` envelope.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Envelope {
    InitGame {
        color: Color,
    },
    UpdateGameState {
        board_state: BoardState,
        player_color: Color,
    },
    BoardState {
        board_state: BoardState,
        player_color: Color,
    },
    Error {
        message: String,
    },
}

/// Anything the server writes to a socket.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum ServerMessage {
    Envelope(Envelope),
    /// Bare notice without an envelope.
    Notice { message: String },
}

impl ServerMessage {
    pub fn init_game(color: Color) -> Self {
        ServerMessage::Envelope(Envelope::InitGame { color })
    }

    pub fn update_game_state(fen: String, player_color: Color) -> Self {
        ServerMessage::Envelope(Envelope::UpdateGameState {
            board_state: BoardState { fen },
            player_color,
        })
    }

    pub fn board_state(fen: String, player_color: Color) -> Self {
        ServerMessage::Envelope(Envelope::BoardState {
            board_state: BoardState { fen },
            player_color,
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Envelope(Envelope::Error {
            message: message.into(),
        })
    }

    pub fn session_full() -> Self {
        ServerMessage::Notice {
            message: "session is full".to_string(),
        }
    }

    /// JSON text of the message.
    pub fn to_json(&self) -> String {
        // Serializing these plain structs cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// What the game worker hands to a connection's writer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outbound {
    Message(ServerMessage),
    /// Close the socket after anything already queued.
    Close,
}
