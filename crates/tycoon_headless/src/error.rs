//! Errors surfaced by the headless binary.

use thiserror::Error;
use tycoon_core::error::GameError;

use crate::protocol::ProtocolError;
use crate::strategies::StrategyError;

/// Anything that ends a headless command unsuccessfully.
#[derive(Error, Debug)]
pub enum HeadlessError {
    /// Engine, catalog, save or replay failure.
    #[error(transparent)]
    Game(#[from] GameError),
    /// Protocol stream failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Strategy could not be resolved.
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    /// File output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Result serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Repeated runs of one seed ended in different states.
    #[error("Seed {seed} is non-deterministic over {turns} turns")]
    NonDeterministic {
        /// Seed that diverged.
        seed: u64,
        /// Turns per run.
        turns: u64,
    },
}
