//! Turn engine.
//!
//! [`Simulation`] owns the economy state and the random generator, and is
//! the only place state changes. Player commands validate fully before
//! mutating anything, so a command that returns an error leaves the game
//! exactly as it was.
//!
//! # Determinism
//!
//! All randomness comes from the generator the simulation owns. Two
//! simulations built from the same catalog and seed, fed the same
//! commands, end in the same state and report the same
//! [`state_hash`](Simulation::state_hash).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tycoon_core::catalog::Catalog;
//! use tycoon_core::simulation::Simulation;
//!
//! let mut sim = Simulation::new(Arc::new(Catalog::standard()), 42);
//! let sawmill = sim.build("madeira").unwrap();
//! sim.advance_turn();
//!
//! assert_eq!(sim.turn(), 2);
//! assert!(sim.state().buildings.get(sawmill).is_some());
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::achievements::{evaluate_achievements, UnlockedAchievement};
use crate::buildings::BuildingId;
use crate::catalog::Catalog;
use crate::command::{Command, CommandOutcome};
use crate::economy::EconomyState;
use crate::error::{GameError, Result};
use crate::events::{roll_event, Event};
use crate::math::GameRng;
use crate::snapshot::Snapshot;

/// What happened during one [`Simulation::advance_turn`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TurnReport {
    /// Turn number after advancing.
    pub turn: u64,
    /// Random events that occurred.
    pub events: Vec<Event>,
    /// Achievements unlocked at the end of the turn.
    pub unlocked: Vec<UnlockedAchievement>,
    /// Total upkeep debited.
    pub upkeep_paid: f64,
    /// Total bank interest credited.
    pub interest_earned: f64,
}

/// The economy simulation.
///
/// # Turn Order
///
/// Each turn runs these steps in order:
/// 1. **Upkeep** - debit the upkeep of every building (capital may go negative)
/// 2. **Production** - buildings in construction order produce resources and
///    research; banks pay interest on the capital at that moment
/// 3. **Prices** - every resource drifts randomly within its volatility
/// 4. **Events** - roll for one random event
/// 5. **Bookkeeping** - advance the turn counter and peak capital
/// 6. **Achievements** - unlock any whose condition now holds
#[derive(Debug, Clone)]
pub struct Simulation<R = GameRng> {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) state: EconomyState,
    pub(crate) rng: R,
}

impl Simulation<GameRng> {
    /// Create a simulation at the catalog's starting position, with the
    /// default generator seeded from `seed`.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, seed: u64) -> Self {
        Self::with_rng(catalog, GameRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Simulation<R> {
    /// Create a simulation at the catalog's starting position with a
    /// caller-supplied generator.
    #[must_use]
    pub fn with_rng(catalog: Arc<Catalog>, rng: R) -> Self {
        let state = EconomyState::new(&catalog);
        Self {
            catalog,
            state,
            rng,
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// The catalog this simulation runs against.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Current economy state.
    #[must_use]
    pub fn state(&self) -> &EconomyState {
        &self.state
    }

    /// Current turn.
    #[must_use]
    pub fn turn(&self) -> u64 {
        self.state.turn
    }

    /// Current capital.
    #[must_use]
    pub fn capital(&self) -> f64 {
        self.state.capital
    }

    /// Owned, serializable view of the game for rendering.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.catalog, &self.state)
    }

    /// The most recent `window` prices of a resource, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownResource`] if the key is not in the
    /// catalog.
    pub fn resource_history(&self, key: &str, window: usize) -> Result<&[f64]> {
        self.state
            .resource(key)
            .map(|r| r.history.recent(window))
            .ok_or_else(|| GameError::UnknownResource(key.to_string()))
    }

    /// Upkeep that the next turn will debit.
    #[must_use]
    pub fn total_upkeep(&self) -> f64 {
        self.state.total_upkeep(&self.catalog)
    }

    /// Market value of all resource holdings.
    #[must_use]
    pub fn portfolio_value(&self) -> f64 {
        self.state.portfolio_value()
    }

    /// Stable ID of the building currently at a list position.
    #[must_use]
    pub fn building_id_at(&self, index: usize) -> Option<BuildingId> {
        self.state.buildings.id_at(index)
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Buy `amount` units of a resource at its current price.
    ///
    /// Returns the capital paid.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownResource`], [`GameError::InvalidAmount`] for a
    /// zero amount, or [`GameError::InsufficientCapital`].
    #[allow(clippy::cast_precision_loss)]
    pub fn buy(&mut self, key: &str, amount: u64) -> Result<f64> {
        let capital = self.state.capital;
        let resource = self
            .state
            .resource_mut(key)
            .ok_or_else(|| GameError::UnknownResource(key.to_string()))?;
        if amount == 0 {
            return Err(GameError::InvalidAmount);
        }

        let cost = amount as f64 * resource.price;
        if cost > capital {
            return Err(GameError::InsufficientCapital {
                required: cost,
                available: capital,
            });
        }

        resource.quantity += amount;
        self.state.spend(cost);
        tracing::debug!(resource = key, amount, cost, "Bought");
        Ok(cost)
    }

    /// Sell `amount` units of a resource at its current price.
    ///
    /// Returns the capital received.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownResource`], [`GameError::InvalidAmount`] for a
    /// zero amount, or [`GameError::InsufficientQuantity`].
    #[allow(clippy::cast_precision_loss)]
    pub fn sell(&mut self, key: &str, amount: u64) -> Result<f64> {
        let resource = self
            .state
            .resource_mut(key)
            .ok_or_else(|| GameError::UnknownResource(key.to_string()))?;
        if amount == 0 {
            return Err(GameError::InvalidAmount);
        }
        if amount > resource.quantity {
            return Err(GameError::InsufficientQuantity {
                resource: key.to_string(),
                requested: amount,
                available: resource.quantity,
            });
        }

        let revenue = amount as f64 * resource.price;
        resource.quantity -= amount;
        self.state.earn(revenue);
        self.state.statistics.units_sold += amount;
        tracing::debug!(resource = key, amount, revenue, "Sold");
        Ok(revenue)
    }

    /// Sell every unit of every resource at current prices.
    ///
    /// Returns the total revenue, 0 if nothing was held.
    pub fn sell_all(&mut self) -> f64 {
        let mut revenue = 0.0;
        let mut units = 0;
        for resource in &mut self.state.resources {
            revenue += resource.holdings_value();
            units += resource.quantity;
            resource.quantity = 0;
        }

        if units > 0 {
            self.state.earn(revenue);
            self.state.statistics.units_sold += units;
            tracing::debug!(units, revenue, "Sold all holdings");
        }
        revenue
    }

    /// Construct a level-1 building of the given model.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownModel`] or [`GameError::InsufficientCapital`].
    pub fn build(&mut self, model_key: &str) -> Result<BuildingId> {
        let model = self
            .catalog
            .model(model_key)
            .ok_or_else(|| GameError::UnknownModel(model_key.to_string()))?;
        if model.cost > self.state.capital {
            return Err(GameError::InsufficientCapital {
                required: model.cost,
                available: self.state.capital,
            });
        }
        if !self.state.buildings.has_free_id() {
            return Err(GameError::BuildingIdsExhausted);
        }

        let cost = model.cost;
        self.state.spend(cost);
        self.state.statistics.buildings_built += 1;
        let id = self.state.buildings.insert(model_key, self.state.turn);
        tracing::debug!(model = model_key, building = %id, cost, "Built");
        Ok(id)
    }

    /// Upgrade a building by one level.
    ///
    /// Returns the new level.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownBuilding`], [`GameError::MaxLevelReached`] or
    /// [`GameError::InsufficientCapital`].
    pub fn upgrade(&mut self, id: BuildingId) -> Result<u32> {
        let capital = self.state.capital;
        let building = self
            .state
            .buildings
            .get_mut(id)
            .ok_or(GameError::UnknownBuilding(id))?;
        let model = self
            .catalog
            .model(&building.model_key)
            .ok_or_else(|| GameError::UnknownModel(building.model_key.clone()))?;
        if building.is_max_level(model) {
            return Err(GameError::MaxLevelReached {
                building: id,
                max_level: model.max_level,
            });
        }

        let cost = building.upgrade_cost(model, self.catalog.rules());
        if cost > capital {
            return Err(GameError::InsufficientCapital {
                required: cost,
                available: capital,
            });
        }

        building.level += 1;
        let level = building.level;
        self.state.spend(cost);
        self.state.statistics.upgrades_made += 1;
        tracing::debug!(building = %id, level, cost, "Upgraded");
        Ok(level)
    }

    /// Demolish a building for a partial refund of its model's cost.
    ///
    /// Returns the refund.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownBuilding`].
    pub fn demolish(&mut self, id: BuildingId) -> Result<f64> {
        let building = self
            .state
            .buildings
            .get(id)
            .ok_or(GameError::UnknownBuilding(id))?;
        let refund = self
            .catalog
            .model(&building.model_key)
            .map_or(0.0, |m| m.demolish_refund(self.catalog.rules()));

        self.state.buildings.remove(id);
        self.state.earn(refund);
        tracing::debug!(building = %id, refund, "Demolished");
        Ok(refund)
    }

    /// Apply a command value.
    ///
    /// # Errors
    ///
    /// Whatever the underlying command returns. [`Command::SellAll`] and
    /// [`Command::AdvanceTurn`] never fail.
    pub fn apply(&mut self, command: &Command) -> Result<CommandOutcome> {
        let outcome = match command {
            Command::Buy { resource, amount } => CommandOutcome::Bought {
                cost: self.buy(resource, *amount)?,
            },
            Command::Sell { resource, amount } => CommandOutcome::Sold {
                revenue: self.sell(resource, *amount)?,
            },
            Command::SellAll => CommandOutcome::Sold {
                revenue: self.sell_all(),
            },
            Command::Build { model } => CommandOutcome::Built {
                building: self.build(model)?,
            },
            Command::Upgrade { building } => CommandOutcome::Upgraded {
                building: *building,
                level: self.upgrade(*building)?,
            },
            Command::Demolish { building } => CommandOutcome::Demolished {
                refund: self.demolish(*building)?,
            },
            Command::AdvanceTurn => CommandOutcome::Turn(self.advance_turn()),
        };
        Ok(outcome)
    }

    // ========================================================================
    // Turn
    // ========================================================================

    /// Advance one turn.
    ///
    /// Never fails: capital may go negative and condition anomalies are
    /// logged and treated as unsatisfied.
    pub fn advance_turn(&mut self) -> TurnReport {
        let catalog = &*self.catalog;
        let rules = catalog.rules();
        let state = &mut self.state;

        // 1. Upkeep
        let upkeep_paid = state.total_upkeep(catalog);
        state.spend(upkeep_paid);

        // 2. Production, research and interest
        let mut interest_earned = 0.0;
        for building in state.buildings.iter() {
            let Some(model) = catalog.model(&building.model_key) else {
                continue;
            };
            if let Some(key) = &model.produces {
                let produced = building.production(model, rules);
                if let Some(resource) = state.resources.iter_mut().find(|r| &r.key == key) {
                    resource.quantity += produced;
                }
            }
            state.research_points += building.research(model, rules);
            if model.yields_interest() {
                let interest = state.capital * model.interest_rate * f64::from(building.level);
                state.capital += interest;
                state.statistics.total_earned += interest;
                interest_earned += interest;
            }
        }

        // 3. Price drift
        for resource in &mut state.resources {
            let swing = resource.volatility;
            let perturbation = self.rng.random_range(-swing..=swing);
            resource.drift(perturbation, rules.price_floor, rules.history_window);
        }

        // 4. Random event
        let events: Vec<Event> =
            roll_event(
                catalog.events(),
                state,
                rules.event_chance,
                rules.price_floor,
                &mut self.rng,
            )
            .into_iter()
            .collect();

        // 5. Bookkeeping
        state.turn += 1;
        state.statistics.turns_played += 1;
        state.statistics.peak_capital = state.statistics.peak_capital.max(state.capital);

        // 6. Achievements
        let stats = state.derived_stats();
        let unlocked = evaluate_achievements(
            catalog.achievements(),
            &mut state.achievements,
            &stats,
            state.turn,
        );
        for achievement in &unlocked {
            tracing::info!(
                turn = achievement.turn,
                id = %achievement.id,
                name = %achievement.name,
                "Achievement unlocked"
            );
        }

        tracing::debug!(
            turn = state.turn,
            upkeep = upkeep_paid,
            interest = interest_earned,
            capital = state.capital,
            "Turn advanced"
        );

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(turn = self.state.turn, state_hash = hash, "Simulation state hash");
        }

        #[cfg(feature = "debug-validation")]
        self.check_invariants();

        TurnReport {
            turn: self.state.turn,
            events,
            unlocked,
            upkeep_paid,
            interest_earned,
        }
    }

    /// Advance `count` turns, collecting the reports.
    ///
    /// The report list grows as turns are played; it is not sized up front
    /// from `count`.
    pub fn advance_turns(&mut self, count: u64) -> Vec<TurnReport> {
        let mut reports = Vec::new();
        for _ in 0..count {
            reports.push(self.advance_turn());
        }
        reports
    }

    // ========================================================================
    // Determinism
    // ========================================================================

    /// Hash of the complete economy state.
    ///
    /// Two simulations with identical state produce identical hashes.
    /// Used for determinism checks and replay verification.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        let state = &self.state;

        state.capital.to_bits().hash(&mut hasher);
        state.turn.hash(&mut hasher);
        state.research_points.hash(&mut hasher);

        state.resources.len().hash(&mut hasher);
        for resource in &state.resources {
            resource.key.hash(&mut hasher);
            resource.quantity.hash(&mut hasher);
            resource.price.to_bits().hash(&mut hasher);
            resource.history.len().hash(&mut hasher);
            for price in resource.history.as_slice() {
                price.to_bits().hash(&mut hasher);
            }
        }

        state.buildings.len().hash(&mut hasher);
        state.buildings.next_id().hash(&mut hasher);
        for building in &state.buildings {
            building.hash(&mut hasher);
        }

        for achievement in &state.achievements {
            achievement.hash(&mut hasher);
        }

        state.events.len().hash(&mut hasher);
        for event in state.events.iter() {
            event.hash(&mut hasher);
        }

        let stats = &state.statistics;
        stats.total_earned.to_bits().hash(&mut hasher);
        stats.total_spent.to_bits().hash(&mut hasher);
        stats.turns_played.hash(&mut hasher);
        stats.buildings_built.hash(&mut hasher);
        stats.upgrades_made.hash(&mut hasher);
        stats.units_sold.hash(&mut hasher);
        stats.events_occurred.hash(&mut hasher);
        stats.peak_capital.to_bits().hash(&mut hasher);

        hasher.finish()
    }

    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        let floor = self.catalog.rules().price_floor;
        for resource in &self.state.resources {
            debug_assert!(
                resource.price >= floor,
                "price of {} fell to {}",
                resource.key,
                resource.price
            );
        }
        for building in &self.state.buildings {
            if let Some(model) = self.catalog.model(&building.model_key) {
                debug_assert!(
                    (1..=model.max_level).contains(&building.level),
                    "building {} has level {}",
                    building.id,
                    building.level
                );
            }
        }
    }
}
