//! Server configuration.
//!
//! Defaults come from the environment; command-line flags override them.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{ServerError, ServerResult};

pub const DEFAULT_BIND: &str = "127.0.0.1:8765";
pub const DEFAULT_ROBOT_ADDR: &str = "127.0.0.1:12345";
pub const DEFAULT_LOG_STORE: &str = "redis://127.0.0.1:6379/0";
pub const DEFAULT_ACTUATOR_TIMEOUT_SECS: u64 = 60;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket/HTTP listener binds to
    pub bind: SocketAddr,

    /// `host:port` of the robot controller
    pub robot_addr: String,

    /// Move log location: `redis://...`, `sqlite://<path>` or `memory://`
    pub log_store: String,

    /// Prefix for the two Redis list keys
    pub log_prefix: String,

    /// How long to wait for the robot to acknowledge one command
    pub actuator_timeout: Duration,
}

impl ServerConfig {
    /// Build a config from `CHESSBOT_*` environment variables, falling back
    /// to the defaults for anything unset.
    pub fn new() -> ServerResult<Self> {
        let bind = std::env::var("CHESSBOT_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());

        let robot_addr = std::env::var("CHESSBOT_ROBOT_ADDR")
            .unwrap_or_else(|_| DEFAULT_ROBOT_ADDR.to_string());

        let log_store = std::env::var("CHESSBOT_LOG_STORE")
            .unwrap_or_else(|_| DEFAULT_LOG_STORE.to_string());

        let log_prefix = std::env::var("CHESSBOT_LOG_PREFIX").unwrap_or_default();

        let timeout_secs: u64 = std::env::var("CHESSBOT_ACTUATOR_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_ACTUATOR_TIMEOUT_SECS);

        let mut config = Self {
            bind: parse_bind(&bind)?,
            robot_addr,
            log_store,
            log_prefix,
            actuator_timeout: Duration::from_secs(DEFAULT_ACTUATOR_TIMEOUT_SECS),
        };
        config.set_actuator_timeout_secs(timeout_secs)?;
        Ok(config)
    }

    /// Replace the bind address.
    pub fn set_bind(&mut self, bind: &str) -> ServerResult<()> {
        self.bind = parse_bind(bind)?;
        Ok(())
    }

    /// Replace the actuator timeout; zero would block forever.
    pub fn set_actuator_timeout_secs(&mut self, secs: u64) -> ServerResult<()> {
        if secs == 0 {
            return Err(ServerError::Config(
                "actuator timeout must be at least one second".to_string(),
            ));
        }
        self.actuator_timeout = Duration::from_secs(secs);
        Ok(())
    }
}

fn parse_bind(bind: &str) -> ServerResult<SocketAddr> {
    bind.parse()
        .map_err(|e| ServerError::Config(format!("invalid bind address {bind:?}: {e}")))
}
