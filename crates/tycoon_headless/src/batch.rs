//! Batch game runner for balance testing.
//!
//! Runs multiple games in parallel using rayon to collect balance
//! metrics across many seeds efficiently.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use tycoon_core::catalog::Catalog;

use crate::game_runner::{run_game, GameConfig};
use crate::metrics::{BatchSummary, GameMetrics};
use crate::strategies::{Strategy, StrategyError};

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Strategy preset name or `.ron` path
    pub strategy: String,
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Starting seed; game `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Turns per game
    pub turns: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            strategy: "builder".to_string(),
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            turns: 100,
        }
    }
}

impl BatchConfig {
    /// Create config for a strategy
    #[must_use]
    pub fn new(strategy: &str, game_count: u32) -> Self {
        Self {
            strategy: strategy.to_string(),
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set turns per game
    #[must_use]
    pub fn with_turns(mut self, turns: u64) -> Self {
        self.turns = turns;
        self
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual game metrics, in seed order
    pub games: Vec<GameMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to JSON file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Progress tracking for batch runs
#[derive(Debug)]
pub struct BatchProgress {
    /// Total games
    pub total: u32,
    completed: AtomicU32,
    start_time: Instant,
}

impl BatchProgress {
    /// Create new progress tracker
    #[must_use]
    pub fn new(total: u32) -> Self {
        Self {
            total,
            completed: AtomicU32::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a completed game, returning the new count
    pub fn record_completion(&self) -> u32 {
        self.completed.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Get current completion count
    #[must_use]
    pub fn current(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Get completion percentage
    #[must_use]
    pub fn percentage(&self) -> f64 {
        f64::from(self.current()) / f64::from(self.total.max(1)) * 100.0
    }

    /// Seconds since the batch started
    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

/// Run a batch of games
///
/// # Errors
///
/// Returns a [`StrategyError`] if the configured strategy cannot be
/// resolved.
pub fn run_batch(catalog: &Arc<Catalog>, config: BatchConfig) -> Result<BatchResults, StrategyError> {
    let strategy = Strategy::resolve(&config.strategy)?;
    let progress = BatchProgress::new(config.game_count);

    info!(
        strategy = %strategy.name,
        games = config.game_count,
        turns = config.turns,
        seed = config.seed_start,
        "Starting batch run"
    );

    // Configure thread pool if specified
    if config.parallel_games > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build_global()
            .ok(); // Ignore if already set
    }

    let games: Vec<GameMetrics> = (0..config.game_count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            let game = GameConfig::new(seed, config.turns, strategy.clone());
            let metrics = run_game(Arc::clone(catalog), game).metrics;

            let completed = progress.record_completion();
            if completed % 10 == 0 {
                debug!(
                    "Progress: {}/{} ({:.0}%)",
                    completed,
                    config.game_count,
                    progress.percentage()
                );
            }
            metrics
        })
        .collect();

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = progress.elapsed_seconds();

    info!(
        games = games.len(),
        mean_capital = summary.mean_capital,
        "Batch complete in {:.1}s",
        duration_seconds
    );

    Ok(BatchResults {
        config,
        games,
        summary,
        duration_seconds,
    })
}

/// Verify determinism by running the same seed several times
///
/// Returns the shared final hash, or `None` if any run diverged.
#[must_use]
pub fn verify_determinism(
    catalog: &Arc<Catalog>,
    strategy: &Strategy,
    seed: u64,
    turns: u64,
    runs: u32,
) -> Option<u64> {
    let hashes: Vec<u64> = (0..runs.max(1))
        .map(|_| {
            let config = GameConfig::new(seed, turns, strategy.clone());
            run_game(Arc::clone(catalog), config).metrics.final_state_hash
        })
        .collect();

    let first = hashes[0];
    hashes.iter().all(|&h| h == first).then_some(first)
}
