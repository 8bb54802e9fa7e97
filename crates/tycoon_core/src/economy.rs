//! Economy state: capital, resources, buildings and bookkeeping.
//!
//! [`EconomyState`] is the single mutable ledger of a game. It owns every
//! [`Resource`] and building instance; the catalog it was created from is
//! only consulted, never stored here.

use serde::{Deserialize, Serialize};

use crate::achievements::{AchievementStatus, DerivedStats};
use crate::buildings::BuildingRoster;
use crate::catalog::Catalog;
use crate::data::ResourceDef;
use crate::events::EventLog;
use crate::math::round_cents;

// ============================================================================
// Resources
// ============================================================================

/// Bounded list of past prices, oldest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceHistory(Vec<f64>);

impl PriceHistory {
    /// History holding a single starting price.
    #[must_use]
    pub fn starting_at(price: f64) -> Self {
        Self(vec![price])
    }

    /// History from existing entries, keeping the most recent `window`.
    #[must_use]
    pub fn from_prices(mut prices: Vec<f64>, window: usize) -> Self {
        let excess = prices.len().saturating_sub(window);
        prices.drain(..excess);
        Self(prices)
    }

    /// Append a price, dropping the oldest entries beyond `window`.
    pub fn push(&mut self, price: f64, window: usize) {
        self.0.push(price);
        let excess = self.0.len().saturating_sub(window);
        self.0.drain(..excess);
    }

    /// The most recent `window` prices, oldest first.
    #[must_use]
    pub fn recent(&self, window: usize) -> &[f64] {
        let start = self.0.len().saturating_sub(window);
        &self.0[start..]
    }

    /// All retained prices, oldest first.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of retained prices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A tradable resource and the player's holdings of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Unit symbol.
    pub symbol: String,
    /// Units held.
    pub quantity: u64,
    /// Current market price per unit.
    pub price: f64,
    /// Maximum per-turn price swing as a fraction of price.
    pub volatility: f64,
    /// Past prices, oldest first.
    pub history: PriceHistory,
}

impl Resource {
    /// Create a resource at its catalog starting position.
    #[must_use]
    pub fn from_def(def: &ResourceDef) -> Self {
        Self {
            key: def.key.clone(),
            name: def.name.clone(),
            symbol: def.symbol.clone(),
            quantity: def.quantity,
            price: def.price,
            volatility: def.volatility,
            history: PriceHistory::starting_at(def.price),
        }
    }

    /// Market value of the units held.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn holdings_value(&self) -> f64 {
        self.quantity as f64 * self.price
    }

    /// Apply a relative price change and record the result in the history.
    ///
    /// The new price is rounded to cents and never drops below `floor`.
    pub fn drift(&mut self, perturbation: f64, floor: f64, window: usize) {
        self.price = floor.max(round_cents(self.price * (1.0 + perturbation)));
        self.history.push(self.price, window);
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Cumulative statistics over a game.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Total capital received from sales, interest, refunds and events.
    pub total_earned: f64,
    /// Total capital paid for purchases, construction, upgrades, upkeep and events.
    pub total_spent: f64,
    /// Turns advanced.
    pub turns_played: u64,
    /// Buildings constructed.
    pub buildings_built: u64,
    /// Upgrades performed.
    pub upgrades_made: u64,
    /// Resource units sold.
    pub units_sold: u64,
    /// Random events that occurred.
    pub events_occurred: u64,
    /// Highest capital observed at the end of a turn.
    pub peak_capital: f64,
}

impl Statistics {
    /// Fresh statistics for a game starting with `capital`.
    #[must_use]
    pub fn starting_with(capital: f64) -> Self {
        Self {
            peak_capital: capital,
            ..Self::default()
        }
    }
}

// ============================================================================
// Economy State
// ============================================================================

/// The complete mutable state of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyState {
    /// Current capital. May be negative.
    pub capital: f64,
    /// Current turn, starting at 1.
    pub turn: u64,
    /// Accumulated research points.
    pub research_points: u64,
    /// Resources in catalog order.
    pub resources: Vec<Resource>,
    /// Owned buildings in construction order.
    pub buildings: BuildingRoster,
    /// Recent events, most recent first.
    pub events: EventLog,
    /// Unlock state of each catalog achievement, in catalog order.
    pub achievements: Vec<AchievementStatus>,
    /// Cumulative statistics.
    pub statistics: Statistics,
}

impl EconomyState {
    /// Starting state for a catalog.
    #[must_use]
    pub fn new(catalog: &Catalog) -> Self {
        let rules = catalog.rules();
        Self {
            capital: rules.starting_capital,
            turn: rules.starting_turn,
            research_points: 0,
            resources: catalog.resources().iter().map(Resource::from_def).collect(),
            buildings: BuildingRoster::new(),
            events: EventLog::with_capacity(rules.event_log_capacity),
            achievements: catalog
                .achievements()
                .iter()
                .map(|a| AchievementStatus::locked(&a.id))
                .collect(),
            statistics: Statistics::starting_with(rules.starting_capital),
        }
    }

    /// Look up a resource by key.
    #[must_use]
    pub fn resource(&self, key: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.key == key)
    }

    /// Look up a resource by key, mutably.
    pub fn resource_mut(&mut self, key: &str) -> Option<&mut Resource> {
        self.resources.iter_mut().find(|r| r.key == key)
    }

    /// Look up an achievement's status by ID.
    #[must_use]
    pub fn achievement(&self, id: &str) -> Option<&AchievementStatus> {
        self.achievements.iter().find(|a| a.id == id)
    }

    /// Market value of all resource holdings.
    #[must_use]
    pub fn portfolio_value(&self) -> f64 {
        self.resources.iter().map(Resource::holdings_value).sum()
    }

    /// Upkeep due for all owned buildings at their current levels.
    ///
    /// Buildings whose model is missing from `catalog` cost nothing.
    #[must_use]
    pub fn total_upkeep(&self, catalog: &Catalog) -> f64 {
        self.buildings
            .iter()
            .filter_map(|b| catalog.model(&b.model_key).map(|m| b.upkeep(m, catalog.rules())))
            .sum()
    }

    /// Credit capital and record it as earned.
    pub fn earn(&mut self, amount: f64) {
        self.capital += amount;
        self.statistics.total_earned += amount;
    }

    /// Debit capital and record it as spent.
    pub fn spend(&mut self, amount: f64) {
        self.capital -= amount;
        self.statistics.total_spent += amount;
    }

    /// Statistics achievement conditions are evaluated over.
    #[must_use]
    pub fn derived_stats(&self) -> DerivedStats {
        DerivedStats {
            turn: self.turn,
            capital: self.capital,
            buildings_count: self.buildings.len() as u64,
            research_points: self.research_points,
            max_building_level: self.buildings.max_level(),
            distinct_building_types: self.buildings.distinct_models() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wood() -> Resource {
        Resource::from_def(&ResourceDef::new("madeira", "Madeira", "🌲", 100, 5.0, 0.15))
    }

    #[test]
    fn test_history_starts_with_price() {
        let r = wood();
        assert_eq!(r.history.as_slice(), &[5.0]);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = PriceHistory::starting_at(1.0);
        for i in 0..60 {
            history.push(f64::from(i), 50);
        }
        assert_eq!(history.len(), 50);
        assert!((history.as_slice()[0] - 10.0).abs() < f64::EPSILON);
        assert!((history.as_slice()[49] - 59.0).abs() < f64::EPSILON);
        assert_eq!(history.recent(3), &[57.0, 58.0, 59.0]);
        assert_eq!(history.recent(500).len(), 50);
    }

    #[test]
    fn test_history_from_prices_truncates() {
        let history = PriceHistory::from_prices(vec![1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(history.as_slice(), &[3.0, 4.0]);
    }

    #[test]
    fn test_drift_rounds_and_records() {
        let mut r = wood();
        r.drift(0.1234, 0.1, 50);
        assert!((r.price - 5.62).abs() < 1e-9);
        assert_eq!(r.history.len(), 2);
        assert!((r.history.as_slice()[1] - 5.62).abs() < 1e-9);
    }

    #[test]
    fn test_drift_respects_floor() {
        let mut r = wood();
        r.price = 0.11;
        r.drift(-0.35, 0.1, 50);
        assert!((r.price - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_holdings_value() {
        assert!((wood().holdings_value() - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_state_new_from_standard_catalog() {
        let catalog = Catalog::standard();
        let state = EconomyState::new(&catalog);
        assert!((state.capital - 15_000.0).abs() < f64::EPSILON);
        assert_eq!(state.turn, 1);
        assert_eq!(state.resources.len(), 6);
        assert_eq!(state.resource("ouro").unwrap().quantity, 5);
        assert!(state.buildings.is_empty());
        assert!(state.achievements.iter().all(|a| !a.unlocked));
        assert!((state.statistics.peak_capital - 15_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_earn_and_spend_track_statistics() {
        let catalog = Catalog::standard();
        let mut state = EconomyState::new(&catalog);
        state.spend(1_000.0);
        state.earn(250.0);
        assert!((state.capital - 14_250.0).abs() < 1e-9);
        assert!((state.statistics.total_spent - 1_000.0).abs() < 1e-9);
        assert!((state.statistics.total_earned - 250.0).abs() < 1e-9);
    }
}
