//! Error types for the economy simulation.

use thiserror::Error;

use crate::buildings::BuildingId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all simulation errors.
///
/// Command errors are recoverable: a command that returns one of these
/// has not mutated the simulation.
#[derive(Debug, Error)]
pub enum GameError {
    /// Not enough capital to pay for a purchase, construction or upgrade.
    #[error("Insufficient capital: need {required:.2}, have {available:.2}")]
    InsufficientCapital {
        /// Amount required.
        required: f64,
        /// Capital available.
        available: f64,
    },

    /// Not enough units of a resource to sell.
    #[error("Insufficient {resource}: requested {requested}, have {available}")]
    InsufficientQuantity {
        /// Resource key.
        resource: String,
        /// Units requested.
        requested: u64,
        /// Units held.
        available: u64,
    },

    /// No building with this identifier exists.
    #[error("Invalid building: {0}")]
    UnknownBuilding(BuildingId),

    /// Building is already at its model's maximum level.
    #[error("Building {building} is already at max level {max_level}")]
    MaxLevelReached {
        /// The building.
        building: BuildingId,
        /// Maximum level of its model.
        max_level: u32,
    },

    /// Building model key not present in the catalog.
    #[error("Unknown building model: {0}")]
    UnknownModel(String),

    /// Resource key not present in the catalog.
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// Trade amounts must be positive.
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    /// Every building ID has been handed out.
    #[error("No building IDs left")]
    BuildingIdsExhausted,

    /// Save document could not be parsed or is inconsistent.
    #[error("Malformed save document: {0}")]
    MalformedDocument(String),

    /// Reading or writing a save or replay file failed.
    #[error("Persistence error for '{path}': {message}")]
    PersistenceError {
        /// Path of the file.
        path: String,
        /// Error message.
        message: String,
    },

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Replay playback did not reproduce the recorded outcome.
    #[error("Replay mismatch at turn {turn}: expected hash {expected}, got {actual}")]
    ReplayMismatch {
        /// Turn reached by playback.
        turn: u64,
        /// Recorded final hash.
        expected: u64,
        /// Hash produced by playback.
        actual: u64,
    },
}

impl GameError {
    /// Build a [`GameError::DataParseError`] for in-memory catalog data.
    pub(crate) fn catalog(message: impl Into<String>) -> Self {
        Self::DataParseError {
            path: "<catalog>".to_string(),
            message: message.into(),
        }
    }

    /// Build a [`GameError::PersistenceError`] for a path.
    pub(crate) fn persistence(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::PersistenceError {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}
