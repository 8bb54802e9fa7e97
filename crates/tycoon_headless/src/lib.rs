//! Headless game runner for scripted play, batch balancing and CI
//! verification.
//!
//! This crate drives the economy simulation without any user interface:
//!
//! - **Protocol play**: a controller sends JSON commands on stdin and reads
//!   one JSON response per command on stdout
//! - **Auto-play**: scripted [`strategies`] play whole games, singly or in
//!   parallel batches
//! - **Replay verification**: check that recorded games reproduce their
//!   final state hash
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (buy, build, advance, etc.)
//! - **stdout**: Responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Play interactively
//! echo '{"cmd":"advance","count":10}' | cargo run -p tycoon_headless
//!
//! # Auto-play one game
//! cargo run -p tycoon_headless -- run --strategy builder --turns 200
//!
//! # Verify a recorded game
//! cargo run -p tycoon_headless -- replay --file game.replay
//! ```

use std::path::Path;
use std::sync::Arc;

use tycoon_core::catalog::Catalog;
use tycoon_core::error::Result;

pub mod batch;
pub mod error;
pub mod game_runner;
pub mod metrics;
pub mod protocol;
pub mod runner;
pub mod strategies;

pub use batch::{run_batch, BatchConfig, BatchResults};
pub use error::HeadlessError;
pub use game_runner::{run_game, GameConfig, GameResult};
pub use metrics::{BatchSummary, GameMetrics};
pub use protocol::{Command, ProtocolError, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use strategies::{Strategy, StrategyExecutor};

/// Origin recorded for the built-in catalog.
pub const STANDARD_CATALOG: &str = "standard";

/// Load the catalog at `path`, or the standard catalog when `None`.
///
/// Returns the catalog with the origin string replays record for it.
///
/// # Errors
///
/// Returns [`tycoon_core::error::GameError::DataParseError`] if the file
/// cannot be read or is not a valid catalog.
pub fn load_catalog(path: Option<&Path>) -> Result<(Arc<Catalog>, String)> {
    match path {
        Some(path) => {
            let catalog = Catalog::from_ron_file(path)?;
            tracing::info!(path = %path.display(), "Loaded catalog");
            Ok((Arc::new(catalog), path.display().to_string()))
        }
        None => Ok((Arc::new(Catalog::standard()), STANDARD_CATALOG.to_string())),
    }
}
