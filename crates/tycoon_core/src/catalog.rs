//! Static reference data for a game.
//!
//! A [`Catalog`] bundles the resource definitions, building models,
//! achievements, event templates and economy rules a simulation runs
//! against. It is validated once on construction and read-only afterwards;
//! simulations share it through an `Arc`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::achievements::{AchievementDef, Predicate};
use crate::buildings::BuildingModel;
use crate::data::{CatalogData, ResourceDef};
use crate::error::{GameError, Result};
use crate::events::EventTemplate;

// ============================================================================
// Economy Rules
// ============================================================================

/// Tunable constants of the economic model.
///
/// Every field has a default, so a data file only needs to name the values
/// it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyRules {
    /// Capital at the start of a game.
    pub starting_capital: f64,
    /// Turn number at the start of a game.
    pub starting_turn: u64,
    /// Lowest price drift can produce.
    pub price_floor: f64,
    /// Number of past prices retained per resource.
    pub history_window: usize,
    /// Probability of a random event each turn.
    pub event_chance: f64,
    /// Number of events retained in the log.
    pub event_log_capacity: usize,
    /// Fraction of a model's cost refunded on demolition.
    pub demolish_refund: f64,
    /// Upkeep increase per level above 1.
    pub upkeep_growth: f64,
    /// Production increase per level above 1.
    pub production_growth: f64,
    /// Research increase per level above 1.
    pub research_growth: f64,
    /// Upgrade cost as a fraction of model cost, per current level.
    pub upgrade_cost_factor: f64,
}

impl Default for EconomyRules {
    fn default() -> Self {
        Self {
            starting_capital: 15_000.0,
            starting_turn: 1,
            price_floor: 0.1,
            history_window: 50,
            event_chance: 0.30,
            event_log_capacity: 20,
            demolish_refund: 0.3,
            upkeep_growth: 0.3,
            production_growth: 0.5,
            research_growth: 0.3,
            upgrade_cost_factor: 0.5,
        }
    }
}

impl EconomyRules {
    /// Rules with random events disabled.
    #[must_use]
    pub fn without_events(mut self) -> Self {
        self.event_chance = 0.0;
        self
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Validated, immutable reference data.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    rules: EconomyRules,
    resources: Vec<ResourceDef>,
    models: Vec<BuildingModel>,
    achievements: Vec<AchievementDef>,
    events: Vec<EventTemplate>,
    model_index: HashMap<String, usize>,
    resource_index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from a data document.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] listing every validation
    /// problem if the data is inconsistent.
    pub fn from_data(data: CatalogData) -> Result<Self> {
        let errors = data.validate();
        if !errors.is_empty() {
            return Err(GameError::catalog(errors.join("; ")));
        }
        Ok(Self::from_valid(data))
    }

    /// Parse and build a catalog from RON text. `origin` names the source
    /// in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] if the text does not parse
    /// (including unparsable achievement conditions) or fails validation.
    pub fn from_ron_str(text: &str, origin: &str) -> Result<Self> {
        let data: CatalogData = ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        let errors = data.validate();
        if !errors.is_empty() {
            return Err(GameError::DataParseError {
                path: origin.to_string(),
                message: errors.join("; "),
            });
        }

        tracing::debug!(
            origin,
            resources = data.resources.len(),
            buildings = data.buildings.len(),
            achievements = data.achievements.len(),
            events = data.events.len(),
            "Loaded catalog"
        );
        Ok(Self::from_valid(data))
    }

    /// Read, parse and build a catalog from a RON file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] naming the path if the file
    /// cannot be read, or as [`from_ron_str`](Self::from_ron_str).
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
            path: origin.clone(),
            message: e.to_string(),
        })?;
        Self::from_ron_str(&text, &origin)
    }

    fn from_valid(data: CatalogData) -> Self {
        let model_index = data
            .buildings
            .iter()
            .enumerate()
            .map(|(i, m)| (m.key.clone(), i))
            .collect();
        let resource_index = data
            .resources
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key.clone(), i))
            .collect();

        Self {
            rules: data.rules,
            resources: data.resources,
            models: data.buildings,
            achievements: data.achievements,
            events: data.events,
            model_index,
            resource_index,
        }
    }

    /// The catalog as a data document, suitable for writing to RON.
    #[must_use]
    pub fn to_data(&self) -> CatalogData {
        CatalogData {
            rules: self.rules.clone(),
            resources: self.resources.clone(),
            buildings: self.models.clone(),
            achievements: self.achievements.clone(),
            events: self.events.clone(),
        }
    }

    /// Copy of this catalog with different rules.
    #[must_use]
    pub fn with_rules(mut self, rules: EconomyRules) -> Self {
        self.rules = rules;
        self
    }

    /// Economy rules.
    #[must_use]
    pub fn rules(&self) -> &EconomyRules {
        &self.rules
    }

    /// Resource definitions in simulation order.
    #[must_use]
    pub fn resources(&self) -> &[ResourceDef] {
        &self.resources
    }

    /// Look up a resource definition by key.
    #[must_use]
    pub fn resource(&self, key: &str) -> Option<&ResourceDef> {
        self.resource_index.get(key).map(|&i| &self.resources[i])
    }

    /// Building models in catalog order.
    #[must_use]
    pub fn models(&self) -> &[BuildingModel] {
        &self.models
    }

    /// Look up a building model by key.
    #[must_use]
    pub fn model(&self, key: &str) -> Option<&BuildingModel> {
        self.model_index.get(key).map(|&i| &self.models[i])
    }

    /// Achievement definitions in catalog order.
    #[must_use]
    pub fn achievements(&self) -> &[AchievementDef] {
        &self.achievements
    }

    /// Look up an achievement definition by ID.
    #[must_use]
    pub fn achievement(&self, id: &str) -> Option<&AchievementDef> {
        self.achievements.iter().find(|a| a.id == id)
    }

    /// Random event templates.
    #[must_use]
    pub fn events(&self) -> &[EventTemplate] {
        &self.events
    }

    /// The built-in catalog.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_valid(CatalogData {
            rules: EconomyRules::default(),
            resources: standard_resources(),
            buildings: standard_models(),
            achievements: standard_achievements(),
            events: EventTemplate::standard_table(),
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// Standard Content
// ============================================================================

fn standard_resources() -> Vec<ResourceDef> {
    vec![
        ResourceDef::new("madeira", "Madeira", "🌲", 100, 5.0, 0.15),
        ResourceDef::new("metal", "Metal", "🔩", 50, 20.0, 0.20),
        ResourceDef::new("cafe", "Café", "☕", 20, 50.0, 0.10),
        ResourceDef::new("energia", "Energia", "⚡", 200, 2.5, 0.05),
        ResourceDef::new("petroleo", "Petróleo", "🛢️", 10, 85.0, 0.25),
        ResourceDef::new("ouro", "Ouro", "🪙", 5, 150.0, 0.35),
    ]
}

fn standard_models() -> Vec<BuildingModel> {
    vec![
        BuildingModel::new("madeira", "Serraria", 1_500.0, 30.0)
            .with_production("madeira", 50)
            .with_description("Produz madeira de reflorestamento"),
        BuildingModel::new("metal", "Mineradora", 3_000.0, 75.0)
            .with_production("metal", 25)
            .with_description("Extrai metais preciosos"),
        BuildingModel::new("energia", "Hidrelétrica", 4_000.0, 120.0)
            .with_production("energia", 100)
            .with_description("Gera energia limpa"),
        BuildingModel::new("cafe", "Cafezal", 5_000.0, 100.0)
            .with_production("cafe", 10)
            .with_description("Plantação de café premium"),
        BuildingModel::new("petroleo", "Refinaria", 8_000.0, 200.0)
            .with_production("petroleo", 8)
            .with_description("Refina petróleo bruto"),
        BuildingModel::new("ouro", "Mina de Ouro", 12_000.0, 350.0)
            .with_production("ouro", 3)
            .with_description("Extrai ouro e gemas"),
        BuildingModel::new("pesquisa", "Centro de P&D", 7_000.0, 200.0)
            .with_research(10)
            .with_description("Gera pontos de pesquisa"),
        BuildingModel::new("banco", "Banco", 10_000.0, 150.0)
            .with_interest(0.02)
            .with_description("Gera 2% de juros por turno"),
    ]
}

fn standard_achievements() -> Vec<AchievementDef> {
    use crate::achievements::{CmpOp::Ge, Stat};

    let def = |id: &str, name: &str, description: &str, stat: Stat, value: f64| AchievementDef {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        condition: Predicate::compare(stat, Ge, value),
    };

    vec![
        def("primeiro_turno", "Iniciante", "Complete o primeiro turno", Stat::Turn, 2.0),
        def("capital_50k", "Investidor", "Alcance R$ 50.000", Stat::Capital, 50_000.0),
        def("capital_100k", "Magnata", "Alcance R$ 100.000", Stat::Capital, 100_000.0),
        def("capital_500k", "Bilionário", "Alcance R$ 500.000", Stat::Capital, 500_000.0),
        def("5_construcoes", "Construtor", "Construa 5 edificações", Stat::BuildingsCount, 5.0),
        def(
            "10_construcoes",
            "Desenvolvedor",
            "Construa 10 edificações",
            Stat::BuildingsCount,
            10.0,
        ),
        def(
            "pesquisa_100",
            "Cientista",
            "Alcance 100 pontos de pesquisa",
            Stat::ResearchPoints,
            100.0,
        ),
        def("turno_50", "Veterano", "Sobreviva 50 turnos", Stat::Turn, 50.0),
        def(
            "upgrade_max",
            "Perfeccionista",
            "Faça upgrade de uma construção ao nível máximo",
            Stat::MaxBuildingLevel,
            5.0,
        ),
        def(
            "diversificado",
            "Diversificado",
            "Tenha pelo menos 4 tipos de construção",
            Stat::DistinctBuildingTypes,
            4.0,
        ),
    ]
}
