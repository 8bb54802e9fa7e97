//! Read-only views of simulation state for presentation layers.
//!
//! A [`Snapshot`] is an owned copy with every derived figure a renderer
//! needs already computed, so callers never consult the catalog themselves.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingId;
use crate::catalog::Catalog;
use crate::economy::{EconomyState, Statistics};
use crate::events::Event;

/// One resource as presented to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceView {
    /// Resource key.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Unit symbol.
    pub symbol: String,
    /// Units held.
    pub quantity: u64,
    /// Current price.
    pub price: f64,
    /// Market value of the units held.
    pub value: f64,
    /// Per-turn price swing bound.
    pub volatility: f64,
}

/// One building as presented to the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingView {
    /// Stable identifier.
    pub id: BuildingId,
    /// Model key.
    pub model_key: String,
    /// Model display name.
    pub name: String,
    /// Current level.
    pub level: u32,
    /// Model maximum level.
    pub max_level: u32,
    /// Turn built.
    pub built_at: u64,
    /// Upkeep per turn.
    pub upkeep: f64,
    /// Resource produced, if any.
    pub produces: Option<String>,
    /// Units produced per turn.
    pub production: u64,
    /// Research points per turn.
    pub research: u64,
    /// Cost of the next upgrade, `None` at max level.
    pub upgrade_cost: Option<f64>,
    /// Capital refunded on demolition.
    pub refund: f64,
}

/// One achievement as presented to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementView {
    /// Identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Display text.
    pub description: String,
    /// Whether unlocked.
    pub unlocked: bool,
    /// Turn unlocked, if unlocked.
    pub unlocked_turn: Option<u64>,
}

/// Owned, serializable view of the whole game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current turn.
    pub turn: u64,
    /// Current capital.
    pub capital: f64,
    /// Accumulated research points.
    pub research_points: u64,
    /// Resources in catalog order.
    pub resources: Vec<ResourceView>,
    /// Buildings in construction order.
    pub buildings: Vec<BuildingView>,
    /// Recent events, most recent first.
    pub events: Vec<Event>,
    /// Achievements in catalog order.
    pub achievements: Vec<AchievementView>,
    /// Cumulative statistics.
    pub statistics: Statistics,
    /// Upkeep due next turn.
    pub total_upkeep: f64,
    /// Market value of all resource holdings.
    pub portfolio_value: f64,
}

impl Snapshot {
    /// Capture `state`, deriving figures from `catalog`.
    #[must_use]
    pub fn capture(catalog: &Catalog, state: &EconomyState) -> Self {
        let rules = catalog.rules();

        let resources = state
            .resources
            .iter()
            .map(|r| ResourceView {
                key: r.key.clone(),
                name: r.name.clone(),
                symbol: r.symbol.clone(),
                quantity: r.quantity,
                price: r.price,
                value: r.holdings_value(),
                volatility: r.volatility,
            })
            .collect();

        let buildings = state
            .buildings
            .iter()
            .filter_map(|b| {
                let model = catalog.model(&b.model_key)?;
                Some(BuildingView {
                    id: b.id,
                    model_key: b.model_key.clone(),
                    name: model.name.clone(),
                    level: b.level,
                    max_level: model.max_level,
                    built_at: b.built_at,
                    upkeep: b.upkeep(model, rules),
                    produces: model.produces.clone(),
                    production: b.production(model, rules),
                    research: b.research(model, rules),
                    upgrade_cost: (!b.is_max_level(model)).then(|| b.upgrade_cost(model, rules)),
                    refund: model.demolish_refund(rules),
                })
            })
            .collect();

        let achievements = state
            .achievements
            .iter()
            .filter_map(|status| {
                let def = catalog.achievement(&status.id)?;
                Some(AchievementView {
                    id: def.id.clone(),
                    name: def.name.clone(),
                    description: def.description.clone(),
                    unlocked: status.unlocked,
                    unlocked_turn: status.unlocked.then_some(status.unlocked_turn),
                })
            })
            .collect();

        Self {
            turn: state.turn,
            capital: state.capital,
            research_points: state.research_points,
            resources,
            buildings,
            events: state.events.iter().cloned().collect(),
            achievements,
            statistics: state.statistics,
            total_upkeep: state.total_upkeep(catalog),
            portfolio_value: state.portfolio_value(),
        }
    }

    /// Look up a resource view by key.
    #[must_use]
    pub fn resource(&self, key: &str) -> Option<&ResourceView> {
        self.resources.iter().find(|r| r.key == key)
    }

    /// Number of unlocked achievements.
    #[must_use]
    pub fn unlocked_count(&self) -> usize {
        self.achievements.iter().filter(|a| a.unlocked).count()
    }
}
