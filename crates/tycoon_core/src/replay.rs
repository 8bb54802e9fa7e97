//! Replay system for recording and re-running games.
//!
//! A replay stores the seed a game started from and every state-changing
//! step taken afterwards. Because the simulation is deterministic, running
//! the steps again from the same seed and catalog reproduces the game
//! exactly, which [`Replay::verify`] checks against the recorded final hash.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::command::Command;
use crate::error::{GameError, Result};
use crate::persistence::{SaveDocument, SaveFormat};
use crate::simulation::Simulation;

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// One recorded step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayStep {
    /// A command that succeeded.
    Command(Command),
    /// A save document was loaded (stored as JSON).
    Load(String),
}

/// A recorded game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Where the catalog came from (a path, or `standard`).
    pub catalog: String,
    /// Seed of the simulation's generator.
    pub seed: u64,
    /// Steps in the order they were taken.
    pub steps: Vec<ReplayStep>,
    /// Turn reached when recording finished.
    pub final_turn: u64,
    /// State hash when recording finished.
    pub final_hash: u64,
}

impl Replay {
    /// Start recording a game.
    #[must_use]
    pub fn new(catalog: impl Into<String>, seed: u64) -> Self {
        Self {
            version: REPLAY_VERSION,
            catalog: catalog.into(),
            seed,
            steps: Vec::new(),
            final_turn: 0,
            final_hash: 0,
        }
    }

    /// Record a successfully applied command.
    pub fn record(&mut self, command: Command) {
        self.steps.push(ReplayStep::Command(command));
    }

    /// Record a successful load.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MalformedDocument`] if the document cannot be
    /// encoded.
    pub fn record_load(&mut self, document: &SaveDocument) -> Result<()> {
        let json = document.encode(SaveFormat::Json)?;
        self.steps.push(ReplayStep::Load(json));
        Ok(())
    }

    /// Stamp the final turn and hash from the recorded simulation.
    pub fn finalize(&mut self, simulation: &Simulation) {
        self.final_turn = simulation.turn();
        self.final_hash = simulation.state_hash();
    }

    /// Number of recorded steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PersistenceError`] if serialization or file
    /// writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = bincode::serialize(self).map_err(|e| GameError::persistence(path, e))?;
        std::fs::write(path, bytes).map_err(|e| GameError::persistence(path, e))?;
        tracing::info!(path = %path.display(), steps = self.steps.len(), "Saved replay");
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PersistenceError`] if the file cannot be read,
    /// decoded, or has an unsupported version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| GameError::persistence(path, e))?;
        let replay: Self =
            bincode::deserialize(&bytes).map_err(|e| GameError::persistence(path, e))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::persistence(
                path,
                format!(
                    "replay version mismatch: expected {REPLAY_VERSION}, got {}",
                    replay.version
                ),
            ));
        }

        Ok(replay)
    }

    /// Re-run every step against a fresh simulation.
    ///
    /// # Errors
    ///
    /// Returns the first error a step produces. A faithful recording of a
    /// deterministic game never fails.
    pub fn play(&self, catalog: Arc<Catalog>) -> Result<Simulation> {
        let mut simulation = Simulation::new(catalog, self.seed);
        for step in &self.steps {
            match step {
                ReplayStep::Command(command) => {
                    simulation.apply(command)?;
                }
                ReplayStep::Load(json) => simulation.load_json(json)?,
            }
        }
        Ok(simulation)
    }

    /// Re-run the replay and check it reproduces the recorded final hash.
    ///
    /// Returns the reproduced hash.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ReplayMismatch`] if the hash differs, or any
    /// error from [`play`](Self::play).
    pub fn verify(&self, catalog: Arc<Catalog>) -> Result<u64> {
        let simulation = self.play(catalog)?;
        let actual = simulation.state_hash();
        if actual != self.final_hash {
            return Err(GameError::ReplayMismatch {
                turn: simulation.turn(),
                expected: self.final_hash,
                actual,
            });
        }
        tracing::debug!(turn = simulation.turn(), hash = actual, "Replay verified");
        Ok(actual)
    }
}
