//! Carries out a recovery plan on the robot.
//!
//! The plan itself is computed from the move log by `chessbot_core`; this
//! module feeds its transfers to the actuator one at a time and clears the
//! log once every transfer has been acknowledged. On failure the log is left
//! untouched so the whole run can be repeated from scratch.

use chessbot_core::{plan_recovery, Color, Stranded};
use tracing::{info, warn};

use crate::actuator::Actuator;
use crate::error::RecoveryFailure;
use crate::move_log::MoveLogStore;

/// Outcome of a completed recovery.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Transfers the robot carried out
    pub transfers: usize,
    /// Pieces that could not be given a home square
    pub stranded: Vec<Stranded>,
}

/// Return every piece to its starting square and clear the log.
pub fn recover(
    actuator: &mut dyn Actuator,
    log: &mut dyn MoveLogStore,
) -> Result<RecoveryReport, RecoveryFailure> {
    let white = log.read_all(Color::White)?;
    let black = log.read_all(Color::Black)?;
    let plan = plan_recovery(&white, &black)?;

    info!(
        white_entries = white.len(),
        black_entries = black.len(),
        transfers = plan.transfers.len(),
        "Starting board recovery"
    );

    for (completed, &transfer) in plan.transfers.iter().enumerate() {
        actuator
            .transfer(transfer)
            .map_err(|source| RecoveryFailure::Actuator {
                completed,
                transfer,
                source,
            })?;
    }

    for stranded in &plan.stranded {
        warn!(spot = %stranded.spot, piece = %stranded.piece, "Piece has no free home square");
    }

    log.clear()?;
    info!(transfers = plan.transfers.len(), "Board recovery complete");

    Ok(RecoveryReport {
        transfers: plan.transfers.len(),
        stranded: plan.stranded,
    })
}
