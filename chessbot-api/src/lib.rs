//! Chessbot game server.
//!
//! Two browser clients play one match over WebSocket while a robot arm
//! mirrors every move on a physical board. Captured pieces are parked on a
//! second, holding board. Every physical move is logged per color so that,
//! when the match ends or the process restarts, the robot can put every
//! piece back on its starting square.
//!
//! # Architecture
//!
//! ```text
//!  client A ─┐   WebSocket    ┌──────────────┐  TCP line protocol  ┌───────┐
//!            ├──────────────> │ game worker  │ ──────────────────> │ robot │
//!  client B ─┘  (axum tasks)  │ (Coordinator)│ <──── Done ──────── └───────┘
//!                             └──────┬───────┘
//!                                    │ RPUSH / LRANGE / DEL
//!                                    v
//!                               move log (Redis | SQLite)
//! ```

pub mod actuator;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod move_log;
pub mod protocol;
pub mod recovery;
pub mod server;
pub mod session;
pub mod worker;

pub use actuator::{Actuator, ActuatorLink};
pub use config::ServerConfig;
pub use coordinator::{Coordinator, Delivery, Event, Snapshot};
pub use error::{ActuatorError, LogStoreError, ProtocolError, RecoveryFailure, ServerError, ServerResult};
pub use move_log::{open_store, MemoryStore, MoveLogStore, RedisStore, SqliteStore};
pub use protocol::{ClientMessage, Outbound, ServerMessage};
pub use recovery::{recover, RecoveryReport};
pub use session::{ConnId, Session, SessionState};
pub use worker::GameHandle;
