//! Chessbot server entry point.
//!
//! Usage: chessbot [--bind <addr>] [--robot-addr <host:port>] [--log-store <url>]
//!
//! Startup is fail-fast: the robot and the move log must both be reachable,
//! and a log left behind by a crashed run is replayed back to the starting
//! layout before any client is accepted.

use clap::Parser;
use tracing::{error, info, warn};

use chessbot_api::{
    logging, open_store, recover, server, worker, ActuatorLink, Coordinator, ServerConfig,
    ServerError, ServerResult,
};

/// WebSocket server for a robot-driven chess board.
#[derive(Parser, Debug)]
#[command(name = "chessbot")]
#[command(about = "Two-player chess server that mirrors every move on a robot arm")]
struct Args {
    /// Address to listen on (default 127.0.0.1:8765)
    #[arg(long, env = "CHESSBOT_BIND")]
    bind: Option<String>,

    /// Robot controller address (default 127.0.0.1:12345)
    #[arg(long, env = "CHESSBOT_ROBOT_ADDR")]
    robot_addr: Option<String>,

    /// Move log store: redis://..., sqlite://<path> or memory://
    #[arg(long, env = "CHESSBOT_LOG_STORE")]
    log_store: Option<String>,

    /// Prefix for the Redis list keys
    #[arg(long, env = "CHESSBOT_LOG_PREFIX")]
    log_prefix: Option<String>,

    /// Seconds to wait for the robot per command (default 60)
    #[arg(long, env = "CHESSBOT_ACTUATOR_TIMEOUT_SECS")]
    actuator_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn load_config(args: Args) -> ServerResult<ServerConfig> {
    let mut config = ServerConfig::new()?;

    if let Some(bind) = args.bind {
        config.set_bind(&bind)?;
    }
    if let Some(robot_addr) = args.robot_addr {
        config.robot_addr = robot_addr;
    }
    if let Some(log_store) = args.log_store {
        config.log_store = log_store;
    }
    if let Some(log_prefix) = args.log_prefix {
        config.log_prefix = log_prefix;
    }
    if let Some(secs) = args.actuator_timeout_secs {
        config.set_actuator_timeout_secs(secs)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> ServerResult<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    info!("Chessbot starting...");
    let config = load_config(args)?;
    info!(
        bind = %config.bind,
        robot = %config.robot_addr,
        log_store = %config.log_store,
        timeout_secs = config.actuator_timeout.as_secs(),
        "Configuration loaded"
    );

    // Robot and log are blocking clients; set them up off the runtime.
    let startup = config.clone();
    let coordinator = tokio::task::spawn_blocking(move || -> ServerResult<Coordinator> {
        let mut actuator = ActuatorLink::connect(&startup.robot_addr, startup.actuator_timeout)?;
        let mut log = open_store(&startup.log_store, &startup.log_prefix)?;

        if !log.is_empty()? {
            warn!("Move log not empty, previous run ended mid-match; recovering board");
            let report = recover(&mut actuator, log.as_mut())?;
            info!(
                transfers = report.transfers,
                stranded = report.stranded.len(),
                "Startup recovery finished"
            );
        }

        Ok(Coordinator::new(Box::new(actuator), log))
    })
    .await
    .map_err(|e| ServerError::Config(format!("startup task failed: {e}")))??;

    let (game, _worker) = worker::spawn(coordinator)?;
    let app = server::router(game);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, "Listening for players");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal, exiting...");
        })
        .await?;

    Ok(())
}
