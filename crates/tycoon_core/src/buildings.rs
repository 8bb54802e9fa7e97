//! Building models and owned building instances.
//!
//! A [`BuildingModel`] is immutable catalog data. A [`BuildingInstance`]
//! is one building the player owns: it refers to its model by key and only
//! stores its level and construction turn. Upkeep, production, research
//! yield and upgrade cost are derived from the model and the level.
//!
//! Instances are addressed by a [`BuildingId`] that stays valid until that
//! building is demolished, independent of list position.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::EconomyRules;
use crate::math::{floor_count, level_multiplier};

// ============================================================================
// Identifiers
// ============================================================================

/// Stable identifier for an owned building.
///
/// Assigned from a monotonic counter; never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(pub u64);

impl BuildingId {
    /// Upper bound of the ID space. Never assigned to a building.
    pub const MAX: Self = Self(u64::MAX);

    /// Create a building ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ============================================================================
// Models
// ============================================================================

/// Catalog definition of a building type.
///
/// A model may produce a resource, yield research, pay interest, any
/// combination of these, or none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingModel {
    /// Unique key, also used in save files.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Display description.
    #[serde(default)]
    pub description: String,
    /// Construction cost.
    pub cost: f64,
    /// Resource key this building produces, if any.
    #[serde(default)]
    pub produces: Option<String>,
    /// Units produced per turn at level 1.
    #[serde(default)]
    pub production_rate: u64,
    /// Upkeep per turn at level 1.
    pub upkeep: f64,
    /// Highest level this building can be upgraded to.
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    /// Research points per turn at level 1.
    #[serde(default)]
    pub research_yield: u64,
    /// Fraction of current capital paid as interest per level per turn.
    #[serde(default)]
    pub interest_rate: f64,
}

/// Default maximum building level.
const fn default_max_level() -> u32 {
    5
}

impl BuildingModel {
    /// Create a model with no economic role.
    #[must_use]
    pub fn new(key: impl Into<String>, name: impl Into<String>, cost: f64, upkeep: f64) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: String::new(),
            cost,
            produces: None,
            production_rate: 0,
            upkeep,
            max_level: default_max_level(),
            research_yield: 0,
            interest_rate: 0.0,
        }
    }

    /// Produce `rate` units of `resource` per turn.
    #[must_use]
    pub fn with_production(mut self, resource: impl Into<String>, rate: u64) -> Self {
        self.produces = Some(resource.into());
        self.production_rate = rate;
        self
    }

    /// Yield research points per turn.
    #[must_use]
    pub fn with_research(mut self, research_yield: u64) -> Self {
        self.research_yield = research_yield;
        self
    }

    /// Pay interest on capital each turn.
    #[must_use]
    pub fn with_interest(mut self, rate: f64) -> Self {
        self.interest_rate = rate;
        self
    }

    /// Set the display description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the maximum level.
    #[must_use]
    pub fn with_max_level(mut self, max_level: u32) -> Self {
        self.max_level = max_level;
        self
    }

    /// Whether this model pays interest.
    #[must_use]
    pub fn yields_interest(&self) -> bool {
        self.interest_rate > 0.0
    }

    /// Refund paid when a building of this model is demolished.
    #[must_use]
    pub fn demolish_refund(&self, rules: &EconomyRules) -> f64 {
        self.cost * rules.demolish_refund
    }
}

// ============================================================================
// Instances
// ============================================================================

/// A building owned by the player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildingInstance {
    /// Stable identifier.
    pub id: BuildingId,
    /// Key of the [`BuildingModel`] in the catalog.
    pub model_key: String,
    /// Current level, in `1..=model.max_level`.
    pub level: u32,
    /// Turn the building was constructed on.
    pub built_at: u64,
}

impl BuildingInstance {
    /// Upkeep per turn at the current level.
    #[must_use]
    pub fn upkeep(&self, model: &BuildingModel, rules: &EconomyRules) -> f64 {
        model.upkeep * level_multiplier(rules.upkeep_growth, self.level)
    }

    /// Units of the model's resource produced per turn.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn production(&self, model: &BuildingModel, rules: &EconomyRules) -> u64 {
        floor_count(
            model.production_rate as f64 * level_multiplier(rules.production_growth, self.level),
        )
    }

    /// Research points yielded per turn.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn research(&self, model: &BuildingModel, rules: &EconomyRules) -> u64 {
        floor_count(
            model.research_yield as f64 * level_multiplier(rules.research_growth, self.level),
        )
    }

    /// Cost to upgrade from the current level to the next.
    #[must_use]
    pub fn upgrade_cost(&self, model: &BuildingModel, rules: &EconomyRules) -> f64 {
        (model.cost * rules.upgrade_cost_factor * f64::from(self.level)).floor()
    }

    /// Whether the building is at its model's maximum level.
    #[must_use]
    pub fn is_max_level(&self, model: &BuildingModel) -> bool {
        self.level >= model.max_level
    }
}

// ============================================================================
// Roster
// ============================================================================

/// Owned buildings in construction order.
///
/// Iteration order is construction order, which is also the order the turn
/// engine processes production in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingRoster {
    buildings: Vec<BuildingInstance>,
    next_id: u64,
}

impl BuildingRoster {
    /// Create an empty roster.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buildings: Vec::new(),
            next_id: 1,
        }
    }

    /// Rebuild a roster from existing instances.
    ///
    /// Returns `None` if two instances share an ID or an instance holds
    /// [`BuildingId::MAX`], which would leave no ID for the next insert.
    #[must_use]
    pub fn from_instances(buildings: Vec<BuildingInstance>) -> Option<Self> {
        let mut seen = HashSet::with_capacity(buildings.len());
        if !buildings.iter().all(|b| seen.insert(b.id)) {
            return None;
        }
        let next_id = buildings
            .iter()
            .map(|b| b.id.0)
            .max()
            .unwrap_or(0)
            .checked_add(1)?;
        Some(Self { buildings, next_id })
    }

    /// ID the next inserted building will receive.
    #[must_use]
    pub const fn next_id(&self) -> BuildingId {
        BuildingId(self.next_id)
    }

    /// Whether another building can be inserted with a fresh ID.
    #[must_use]
    pub const fn has_free_id(&self) -> bool {
        self.next_id < BuildingId::MAX.0
    }

    /// Append a new level-1 building and return its ID.
    ///
    /// Callers check [`has_free_id`](Self::has_free_id) first; once the ID
    /// space is spent the last ID would be handed out again.
    pub fn insert(&mut self, model_key: impl Into<String>, built_at: u64) -> BuildingId {
        let id = BuildingId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.buildings.push(BuildingInstance {
            id,
            model_key: model_key.into(),
            level: 1,
            built_at,
        });
        id
    }

    /// Remove a building, preserving the order of the rest.
    pub fn remove(&mut self, id: BuildingId) -> Option<BuildingInstance> {
        let index = self.position(id)?;
        Some(self.buildings.remove(index))
    }

    /// Get a building by ID.
    #[must_use]
    pub fn get(&self, id: BuildingId) -> Option<&BuildingInstance> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Get a mutable reference to a building by ID.
    pub fn get_mut(&mut self, id: BuildingId) -> Option<&mut BuildingInstance> {
        self.buildings.iter_mut().find(|b| b.id == id)
    }

    /// Current list position of a building.
    #[must_use]
    pub fn position(&self, id: BuildingId) -> Option<usize> {
        self.buildings.iter().position(|b| b.id == id)
    }

    /// ID of the building currently at a list position.
    #[must_use]
    pub fn id_at(&self, index: usize) -> Option<BuildingId> {
        self.buildings.get(index).map(|b| b.id)
    }

    /// Iterate in construction order.
    pub fn iter(&self) -> std::slice::Iter<'_, BuildingInstance> {
        self.buildings.iter()
    }

    /// All buildings in construction order.
    #[must_use]
    pub fn as_slice(&self) -> &[BuildingInstance] {
        &self.buildings
    }

    /// Number of buildings owned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    /// Whether no buildings are owned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// Highest level among owned buildings, 0 if none.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        self.buildings.iter().map(|b| b.level).max().unwrap_or(0)
    }

    /// Number of distinct models owned.
    #[must_use]
    pub fn distinct_models(&self) -> usize {
        self.buildings
            .iter()
            .map(|b| b.model_key.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

impl Default for BuildingRoster {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a BuildingRoster {
    type Item = &'a BuildingInstance;
    type IntoIter = std::slice::Iter<'a, BuildingInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.buildings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sawmill() -> BuildingModel {
        BuildingModel::new("madeira", "Serraria", 1500.0, 30.0).with_production("madeira", 50)
    }

    fn instance(level: u32) -> BuildingInstance {
        BuildingInstance {
            id: BuildingId(1),
            model_key: "madeira".to_string(),
            level,
            built_at: 1,
        }
    }

    #[test]
    fn test_derived_values_level_one() {
        let rules = EconomyRules::default();
        let model = sawmill();
        let b = instance(1);
        assert!((b.upkeep(&model, &rules) - 30.0).abs() < 1e-9);
        assert_eq!(b.production(&model, &rules), 50);
        assert!((b.upgrade_cost(&model, &rules) - 750.0).abs() < 1e-9);
    }

    #[test]
    fn test_derived_values_scale_with_level() {
        let rules = EconomyRules::default();
        let model = sawmill();
        let b = instance(3);
        // 30 * (1 + 0.3 * 2)
        assert!((b.upkeep(&model, &rules) - 48.0).abs() < 1e-9);
        // floor(50 * (1 + 0.5 * 2))
        assert_eq!(b.production(&model, &rules), 100);
        // floor(1500 * 0.5 * 3)
        assert!((b.upgrade_cost(&model, &rules) - 2250.0).abs() < 1e-9);
    }

    #[test]
    fn test_production_floors() {
        let rules = EconomyRules::default();
        let mine =
            BuildingModel::new("ouro", "Mina de Ouro", 12000.0, 350.0).with_production("ouro", 3);
        // floor(3 * 1.5) = 4
        assert_eq!(instance(2).production(&mine, &rules), 4);
    }

    #[test]
    fn test_research_yield() {
        let rules = EconomyRules::default();
        let lab = BuildingModel::new("pesquisa", "Centro de P&D", 7000.0, 200.0).with_research(10);
        assert_eq!(instance(1).research(&lab, &rules), 10);
        assert_eq!(instance(2).research(&lab, &rules), 13);
        assert_eq!(instance(1).production(&lab, &rules), 0);
    }

    #[test]
    fn test_demolish_refund_is_flat() {
        let rules = EconomyRules::default();
        assert!((sawmill().demolish_refund(&rules) - 450.0).abs() < 1e-9);
    }

    #[test]
    fn test_roster_ids_are_stable() {
        let mut roster = BuildingRoster::new();
        let a = roster.insert("madeira", 1);
        let b = roster.insert("metal", 1);
        let c = roster.insert("madeira", 2);

        assert_eq!(roster.position(c), Some(2));
        roster.remove(a).unwrap();
        assert_eq!(roster.position(c), Some(1));
        assert_eq!(roster.get(b).unwrap().model_key, "metal");
        assert!(roster.get(a).is_none());

        // IDs are never reused.
        let d = roster.insert("cafe", 3);
        assert!(d > c);
    }

    #[test]
    fn test_roster_aggregates() {
        let mut roster = BuildingRoster::new();
        assert_eq!(roster.max_level(), 0);
        let a = roster.insert("madeira", 1);
        roster.insert("madeira", 1);
        roster.insert("banco", 1);
        roster.get_mut(a).unwrap().level = 4;

        assert_eq!(roster.max_level(), 4);
        assert_eq!(roster.distinct_models(), 2);
        assert_eq!(roster.id_at(0), Some(a));
        assert_eq!(roster.id_at(3), None);
    }

    #[test]
    fn test_roster_rejects_duplicate_ids() {
        let dup = vec![instance(1), instance(2)];
        assert!(BuildingRoster::from_instances(dup).is_none());

        let mut other = instance(1);
        other.id = BuildingId(7);
        let mut roster = BuildingRoster::from_instances(vec![instance(1), other]).unwrap();
        assert_eq!(roster.insert("madeira", 1), BuildingId(8));
    }

    #[test]
    fn test_roster_id_space_is_bounded() {
        let mut last = instance(1);
        last.id = BuildingId::MAX;
        assert!(BuildingRoster::from_instances(vec![last]).is_none());

        let mut near = instance(1);
        near.id = BuildingId(u64::MAX - 1);
        let roster = BuildingRoster::from_instances(vec![near]).unwrap();
        assert_eq!(roster.next_id(), BuildingId::MAX);
        assert!(!roster.has_free_id());
        assert!(BuildingRoster::new().has_free_id());
    }
}
