//! # Tycoon Core
//!
//! Deterministic simulation core for a turn-based economy game.
//!
//! This crate contains **only** game logic:
//! - No rendering
//! - No input handling
//! - No hidden randomness (the generator is owned and seeded)
//!
//! This separation enables:
//! - Headless runs and batch balancing
//! - Replay systems
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`catalog`] - Static reference data and economy rules
//! - [`economy`] - Mutable economy state
//! - [`buildings`] - Building models, instances and the roster
//! - [`events`] - Random narrative events
//! - [`achievements`] - Unlock conditions and their evaluation
//! - [`simulation`] - Turn engine and player commands
//! - [`persistence`] - Save documents
//! - [`replay`] - Recording and verifying games

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod achievements;
pub mod buildings;
pub mod catalog;
pub mod command;
pub mod data;
pub mod economy;
pub mod error;
pub mod events;
pub mod math;
pub mod persistence;
pub mod replay;
pub mod simulation;
pub mod snapshot;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::achievements::{AchievementDef, DerivedStats, Predicate, Stat};
    pub use crate::buildings::{BuildingId, BuildingInstance, BuildingModel};
    pub use crate::catalog::{Catalog, EconomyRules};
    pub use crate::command::{Command, CommandOutcome};
    pub use crate::data::{CatalogData, ResourceDef};
    pub use crate::economy::{EconomyState, Resource, Statistics};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{Event, EventCategory, EventEffect, EventTemplate};
    pub use crate::math::GameRng;
    pub use crate::persistence::{SaveDocument, SaveFormat};
    pub use crate::replay::Replay;
    pub use crate::simulation::{Simulation, TurnReport};
    pub use crate::snapshot::Snapshot;
}
