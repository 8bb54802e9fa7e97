//! Top-level catalog document.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::resource_data::ResourceDef;
use crate::achievements::AchievementDef;
use crate::buildings::BuildingModel;
use crate::catalog::EconomyRules;
use crate::events::{EventEffect, EventTemplate};

/// Complete catalog definition as stored in a data file.
///
/// Deserialized from RON and turned into a validated
/// [`Catalog`](crate::catalog::Catalog) with
/// [`Catalog::from_data`](crate::catalog::Catalog::from_data).
///
/// # Example RON
///
/// ```ron
/// CatalogData(
///     rules: (starting_capital: 15000.0),
///     resources: [...],
///     buildings: [...],
///     achievements: [
///         (id: "primeiro_turno", name: "Iniciante", condition: "turn >= 2"),
///     ],
///     events: [...],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CatalogData {
    /// Economy tuning. Missing fields take their defaults.
    #[serde(default)]
    pub rules: EconomyRules,

    /// Tradable resources, in display and simulation order.
    pub resources: Vec<ResourceDef>,

    /// Building models available for construction.
    #[serde(default)]
    pub buildings: Vec<BuildingModel>,

    /// Achievements that can be unlocked.
    #[serde(default)]
    pub achievements: Vec<AchievementDef>,

    /// Random event templates.
    #[serde(default)]
    pub events: Vec<EventTemplate>,
}

impl CatalogData {
    /// Get a resource definition by key.
    #[must_use]
    pub fn get_resource(&self, key: &str) -> Option<&ResourceDef> {
        self.resources.iter().find(|r| r.key == key)
    }

    /// Validate internal consistency.
    ///
    /// Returns a list of problems found; an empty list means the data can
    /// be turned into a catalog.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.resources.is_empty() {
            errors.push("Catalog defines no resources".to_string());
        }

        let mut seen = HashSet::new();
        for resource in &self.resources {
            if !seen.insert(resource.key.as_str()) {
                errors.push(format!("Duplicate resource '{}'", resource.key));
            }
            if !(resource.price.is_finite() && resource.price >= self.rules.price_floor) {
                errors.push(format!(
                    "Resource '{}' has price {} below the floor {}",
                    resource.key, resource.price, self.rules.price_floor
                ));
            }
            if !(resource.volatility > 0.0 && resource.volatility <= 1.0) {
                errors.push(format!(
                    "Resource '{}' has volatility {} outside (0, 1]",
                    resource.key, resource.volatility
                ));
            }
        }

        let mut seen = HashSet::new();
        for model in &self.buildings {
            if !seen.insert(model.key.as_str()) {
                errors.push(format!("Duplicate building '{}'", model.key));
            }
            if let Some(resource) = &model.produces {
                if self.get_resource(resource).is_none() {
                    errors.push(format!(
                        "Building '{}' produces unknown resource '{}'",
                        model.key, resource
                    ));
                }
            }
            if model.max_level == 0 {
                errors.push(format!("Building '{}' has max level 0", model.key));
            }
            if !(model.cost.is_finite() && model.cost >= 0.0) {
                errors.push(format!("Building '{}' has invalid cost", model.key));
            }
            if !(model.upkeep.is_finite() && model.upkeep >= 0.0) {
                errors.push(format!("Building '{}' has invalid upkeep", model.key));
            }
        }

        let mut seen = HashSet::new();
        for achievement in &self.achievements {
            if !seen.insert(achievement.id.as_str()) {
                errors.push(format!("Duplicate achievement '{}'", achievement.id));
            }
        }

        for event in &self.events {
            match event.effect {
                EventEffect::ScalePrice { factor, floor } => {
                    if !(factor.is_finite() && factor > 0.0) {
                        errors.push(format!(
                            "Event '{}' scales prices by {factor}",
                            event.title
                        ));
                    }
                    if floor.is_some_and(|f| !f.is_finite()) {
                        errors.push(format!("Event '{}' has a non-finite floor", event.title));
                    }
                }
                EventEffect::AdjustCapital(amount) if !amount.is_finite() => {
                    errors.push(format!("Event '{}' adjusts capital by {amount}", event.title));
                }
                EventEffect::AdjustCapital(_) | EventEffect::None => {}
            }
        }

        let rules = &self.rules;
        if !(rules.price_floor.is_finite() && rules.price_floor > 0.0) {
            errors.push("Rules: price_floor must be positive".to_string());
        }
        if rules.history_window == 0 {
            errors.push("Rules: history_window must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&rules.event_chance) {
            errors.push("Rules: event_chance must be within [0, 1]".to_string());
        }
        if !rules.starting_capital.is_finite() {
            errors.push("Rules: starting_capital must be finite".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> CatalogData {
        CatalogData {
            resources: vec![ResourceDef::new("madeira", "Madeira", "", 0, 5.0, 0.15)],
            buildings: vec![BuildingModel::new("serraria", "Serraria", 1_500.0, 30.0)
                .with_production("madeira", 50)],
            ..CatalogData::default()
        }
    }

    #[test]
    fn test_minimal_catalog_is_valid() {
        assert!(minimal().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut data = minimal();
        data.resources.push(ResourceDef::new("madeira", "Dup", "", 0, 0.0, 1.5));
        data.buildings[0].produces = Some("aco".into());
        data.buildings[0].max_level = 0;

        let errors = data.validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate resource")));
        assert!(errors.iter().any(|e| e.contains("below the floor")));
        assert!(errors.iter().any(|e| e.contains("volatility")));
        assert!(errors.iter().any(|e| e.contains("unknown resource 'aco'")));
        assert!(errors.iter().any(|e| e.contains("max level 0")));
    }

    #[test]
    fn test_price_below_floor_rejected() {
        let mut data = minimal();
        data.resources[0].price = 0.05;
        assert!(data.validate().iter().any(|e| e.contains("below the floor")));

        data.rules.price_floor = 0.01;
        assert!(data.validate().is_empty());
    }

    #[test]
    fn test_event_effects_checked() {
        use crate::events::EventCategory;

        let mut data = minimal();
        for factor in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            data.events = vec![EventTemplate::new(
                EventCategory::Penalty,
                "Colapso",
                "",
                EventEffect::ScalePrice { factor, floor: None },
            )];
            assert!(
                data.validate().iter().any(|e| e.contains("scales prices")),
                "factor {factor} accepted"
            );
        }

        data.events = vec![EventTemplate::new(
            EventCategory::Bonus,
            "Herança",
            "",
            EventEffect::AdjustCapital(f64::INFINITY),
        )];
        assert!(data.validate().iter().any(|e| e.contains("adjusts capital")));

        data.events = EventTemplate::standard_table();
        assert!(data.validate().is_empty());
    }

    #[test]
    fn test_empty_resources_rejected() {
        let data = CatalogData::default();
        assert!(data
            .validate()
            .iter()
            .any(|e| e.contains("no resources")));
    }
}
