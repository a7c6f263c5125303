//! Error types for the game server.

use std::time::Duration;

use chessbot_core::{LogEntryError, RecoveryError, Transfer};
use thiserror::Error;

/// Failures talking to the robot controller.
#[derive(Error, Debug)]
pub enum ActuatorError {
    /// Initial connection could not be made
    #[error("cannot connect to robot at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Socket read or write failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No reply line within the configured timeout
    #[error("robot did not answer within {0:?}")]
    Timeout(Duration),

    /// Robot answered with something other than `Done`
    #[error("robot rejected the command: {0:?}")]
    Rejected(String),

    /// Robot closed the connection
    #[error("robot closed the connection")]
    Disconnected,

    /// Link was closed locally
    #[error("robot link is closed")]
    Closed,
}

/// Failures of the persistent move log.
#[derive(Error, Debug)]
pub enum LogStoreError {
    /// Redis connection or operation error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored entry does not parse
    #[error("corrupt log: {0}")]
    Entry(#[from] LogEntryError),

    /// Store URL scheme is not one we know
    #[error("unsupported log store url: {0}")]
    UnsupportedUrl(String),
}

/// Malformed client messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid JSON format")]
    InvalidJson,

    #[error("The required field type is missing")]
    MissingType,

    #[error("Invalid type")]
    UnknownType(String),

    #[error("Mandatory fields pos_start and pos_end are missing")]
    MissingSquares,
}

/// Recovery run aborted.
#[derive(Error, Debug)]
pub enum RecoveryFailure {
    #[error("recovery planning failed: {0}")]
    Plan(#[from] RecoveryError),

    #[error("move log unavailable: {0}")]
    Log(#[from] LogStoreError),

    /// Robot failed partway; earlier transfers were carried out
    #[error("robot failed on {transfer} after {completed} transfers: {source}")]
    Actuator {
        completed: usize,
        transfer: Transfer,
        #[source]
        source: ActuatorError,
    },
}

/// Fatal errors of the server process.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Actuator(#[from] ActuatorError),

    #[error(transparent)]
    LogStore(#[from] LogStoreError),

    #[error("startup recovery failed: {0}")]
    Recovery(#[from] RecoveryFailure),

    /// IO error (listener, socket)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
