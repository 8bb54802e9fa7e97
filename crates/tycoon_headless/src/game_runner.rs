//! Scripted single-game runner.
//!
//! Plays one game to a fixed turn count with a [`Strategy`], optionally
//! recording every applied command into a [`Replay`].

use std::sync::Arc;

use tycoon_core::catalog::Catalog;
use tycoon_core::replay::Replay;
use tycoon_core::simulation::Simulation;
use tycoon_core::snapshot::Snapshot;

use crate::metrics::GameMetrics;
use crate::strategies::{Strategy, StrategyExecutor};

/// Configuration for one auto-played game.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Identifier carried into the metrics.
    pub game_id: String,
    /// Seed for the simulation's generator.
    pub seed: u64,
    /// Turns to play.
    pub turns: u64,
    /// Strategy to follow.
    pub strategy: Strategy,
    /// Record a replay.
    pub record: bool,
    /// Where the catalog came from, stamped into replays.
    pub catalog_origin: String,
}

impl GameConfig {
    /// Play `turns` turns from `seed` with a strategy.
    #[must_use]
    pub fn new(seed: u64, turns: u64, strategy: Strategy) -> Self {
        Self {
            game_id: format!("game_{seed}"),
            seed,
            turns,
            strategy,
            record: false,
            catalog_origin: "standard".to_string(),
        }
    }

    /// Record a replay, stamped with the catalog's origin.
    #[must_use]
    pub fn with_recording(mut self, catalog_origin: impl Into<String>) -> Self {
        self.record = true;
        self.catalog_origin = catalog_origin.into();
        self
    }
}

/// Everything a finished game leaves behind.
#[derive(Debug, Clone)]
pub struct GameResult {
    /// Outcome figures.
    pub metrics: GameMetrics,
    /// Final state.
    pub snapshot: Snapshot,
    /// Recording, when requested.
    pub replay: Option<Replay>,
}

/// Play one game to completion.
#[must_use]
pub fn run_game(catalog: Arc<Catalog>, config: GameConfig) -> GameResult {
    let mut simulation = Simulation::new(catalog, config.seed);
    let mut replay = config
        .record
        .then(|| Replay::new(config.catalog_origin.clone(), config.seed));
    let strategy_name = config.strategy.name.clone();
    let mut executor = StrategyExecutor::new(config.strategy);
    let mut commands_applied = 0;

    tracing::debug!(
        game = %config.game_id,
        seed = config.seed,
        strategy = %strategy_name,
        turns = config.turns,
        "Starting game"
    );

    for _ in 0..config.turns {
        let applied = executor.take_turn(&mut simulation);
        commands_applied += applied.len();
        if let Some(replay) = &mut replay {
            for command in applied {
                replay.record(command);
            }
        }
    }

    if let Some(replay) = &mut replay {
        replay.finalize(&simulation);
    }

    let metrics = GameMetrics::from_simulation(
        config.game_id,
        strategy_name,
        config.seed,
        &simulation,
        commands_applied,
    );
    tracing::debug!(
        game = %metrics.game_id,
        capital = metrics.final_capital,
        hash = metrics.final_state_hash,
        "Game finished"
    );

    GameResult {
        metrics,
        snapshot: simulation.snapshot(),
        replay,
    }
}
