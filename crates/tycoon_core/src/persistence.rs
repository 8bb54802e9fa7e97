//! Save and load.
//!
//! A [`SaveDocument`] captures the economy state (never the catalog) in a
//! shape that is stable across catalog changes: resources and achievements
//! are keyed by their catalog keys, and entries the current catalog does
//! not know are skipped on load. JSON is the primary encoding; RON is also
//! accepted, chosen by file extension.
//!
//! Loading is atomic. The replacement state is fully built and checked
//! before it is swapped in, so a failed load leaves the game untouched.

use std::collections::BTreeMap;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::buildings::{BuildingId, BuildingInstance, BuildingRoster};
use crate::economy::{PriceHistory, Statistics};
use crate::error::{GameError, Result};
use crate::events::{Event, EventLog};
use crate::simulation::Simulation;

// ============================================================================
// Document
// ============================================================================

/// Saved state of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Units held.
    pub quantity: u64,
    /// Current price.
    pub price: f64,
    /// Past prices, oldest first. Missing means `[price]`.
    #[serde(default)]
    pub price_history: Option<Vec<f64>>,
}

/// Saved state of one building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingRecord {
    /// Stable identifier. Missing IDs are assigned on load.
    #[serde(default)]
    pub id: Option<BuildingId>,
    /// Building model key.
    pub model_key: String,
    /// Current level.
    pub level: u32,
    /// Turn built.
    pub built_at: u64,
}

/// Saved state of one achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementRecord {
    /// Whether unlocked.
    pub unlocked: bool,
    /// Turn unlocked (0 while locked).
    #[serde(default)]
    pub turn: u64,
}

/// Persisted game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument {
    /// Capital.
    pub capital: f64,
    /// Current turn.
    pub turn: u64,
    /// Accumulated research points.
    #[serde(default)]
    pub research_points: u64,
    /// Resources by key.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRecord>,
    /// Buildings in construction order.
    #[serde(default)]
    pub buildings: Vec<BuildingRecord>,
    /// Achievements by ID.
    #[serde(default)]
    pub achievements: BTreeMap<String, AchievementRecord>,
    /// Cumulative statistics. Missing keeps the current statistics.
    #[serde(default)]
    pub statistics: Option<Statistics>,
    /// Recent events, most recent first. Missing keeps the current log.
    #[serde(default)]
    pub events: Option<Vec<Event>>,
}

/// Text encoding of a save file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// Pretty-printed JSON.
    Json,
    /// Pretty-printed RON.
    Ron,
}

impl SaveFormat {
    /// Format for a path: `.ron` is RON, anything else JSON.
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ron") => Self::Ron,
            _ => Self::Json,
        }
    }
}

impl SaveDocument {
    /// Encode as text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MalformedDocument`] if the document cannot be
    /// encoded (non-finite floats in RON, for instance).
    pub fn encode(&self, format: SaveFormat) -> Result<String> {
        match format {
            SaveFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| GameError::MalformedDocument(e.to_string())),
            SaveFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| GameError::MalformedDocument(e.to_string())),
        }
    }

    /// Decode from text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MalformedDocument`] if the text does not parse.
    pub fn decode(text: &str, format: SaveFormat) -> Result<Self> {
        match format {
            SaveFormat::Json => {
                serde_json::from_str(text).map_err(|e| GameError::MalformedDocument(e.to_string()))
            }
            SaveFormat::Ron => {
                ron::from_str(text).map_err(|e| GameError::MalformedDocument(e.to_string()))
            }
        }
    }

    /// Write to a file, choosing the encoding by extension.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PersistenceError`] if the file cannot be
    /// written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let text = self
            .encode(SaveFormat::for_path(path))
            .map_err(|e| GameError::persistence(path, e))?;
        std::fs::write(path, text).map_err(|e| GameError::persistence(path, e))
    }

    /// Read from a file, choosing the encoding by extension.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PersistenceError`] if the file cannot be read
    /// or parsed.
    pub fn read_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| GameError::persistence(path, e))?;
        Self::decode(&text, SaveFormat::for_path(path)).map_err(|e| GameError::persistence(path, e))
    }
}

// ============================================================================
// Simulation Integration
// ============================================================================

impl<R: Rng> Simulation<R> {
    /// Capture the current state as a save document.
    #[must_use]
    pub fn to_document(&self) -> SaveDocument {
        let state = &self.state;
        SaveDocument {
            capital: state.capital,
            turn: state.turn,
            research_points: state.research_points,
            resources: state
                .resources
                .iter()
                .map(|r| {
                    let record = ResourceRecord {
                        quantity: r.quantity,
                        price: r.price,
                        price_history: Some(r.history.as_slice().to_vec()),
                    };
                    (r.key.clone(), record)
                })
                .collect(),
            buildings: state
                .buildings
                .iter()
                .map(|b| BuildingRecord {
                    id: Some(b.id),
                    model_key: b.model_key.clone(),
                    level: b.level,
                    built_at: b.built_at,
                })
                .collect(),
            achievements: state
                .achievements
                .iter()
                .map(|a| {
                    let record = AchievementRecord {
                        unlocked: a.unlocked,
                        turn: a.unlocked_turn,
                    };
                    (a.id.clone(), record)
                })
                .collect(),
            statistics: Some(state.statistics),
            events: Some(state.events.iter().cloned().collect()),
        }
    }

    /// Replace the current state with a save document.
    ///
    /// Unknown resource and achievement keys are skipped; resources,
    /// achievements and statistics the document omits keep their current
    /// values.
    ///
    /// # Errors
    ///
    /// [`GameError::UnknownModel`] for a building model the catalog lacks,
    /// or [`GameError::MalformedDocument`] for a non-finite capital, a
    /// price below the floor, a level out of range or duplicate building
    /// IDs. The current state is unchanged on error.
    pub fn load_document(&mut self, document: SaveDocument) -> Result<()> {
        let rules = self.catalog.rules();
        if !document.capital.is_finite() {
            return Err(GameError::MalformedDocument(format!(
                "capital is not finite: {}",
                document.capital
            )));
        }

        let mut state = self.state.clone();
        state.capital = document.capital;
        state.turn = document.turn;
        state.research_points = document.research_points;

        for (key, record) in document.resources {
            let Some(resource) = state.resource_mut(&key) else {
                tracing::warn!(resource = %key, "Ignoring unknown resource in save");
                continue;
            };
            if !(record.price.is_finite() && record.price >= rules.price_floor) {
                return Err(GameError::MalformedDocument(format!(
                    "price of '{key}' is invalid: {}",
                    record.price
                )));
            }
            resource.quantity = record.quantity;
            resource.price = record.price;
            resource.history = match record.price_history {
                Some(prices) if !prices.is_empty() => {
                    PriceHistory::from_prices(prices, rules.history_window)
                }
                _ => PriceHistory::starting_at(record.price),
            };
        }

        state.buildings = self.rebuild_roster(document.buildings)?;

        for (id, record) in document.achievements {
            let Some(status) = state.achievements.iter_mut().find(|a| a.id == id) else {
                tracing::warn!(achievement = %id, "Ignoring unknown achievement in save");
                continue;
            };
            status.unlocked = record.unlocked;
            status.unlocked_turn = if record.unlocked { record.turn } else { 0 };
        }

        if let Some(statistics) = document.statistics {
            state.statistics = statistics;
        }

        if let Some(events) = document.events {
            state.events = EventLog::from_recent(events, rules.event_log_capacity);
        }

        tracing::info!(
            turn = state.turn,
            capital = state.capital,
            buildings = state.buildings.len(),
            "Loaded save"
        );
        self.state = state;
        Ok(())
    }

    fn rebuild_roster(&self, records: Vec<BuildingRecord>) -> Result<BuildingRoster> {
        let out_of_range = || GameError::MalformedDocument("building id out of range".to_string());
        let mut next_free = records
            .iter()
            .filter_map(|r| r.id)
            .map(|id| id.0)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(out_of_range)?;

        let mut instances = Vec::with_capacity(records.len());
        for record in records {
            let model = self
                .catalog
                .model(&record.model_key)
                .ok_or_else(|| GameError::UnknownModel(record.model_key.clone()))?;
            if record.level == 0 || record.level > model.max_level {
                return Err(GameError::MalformedDocument(format!(
                    "building '{}' has level {} outside 1..={}",
                    record.model_key, record.level, model.max_level
                )));
            }
            let id = match record.id {
                Some(id) => id,
                None => {
                    let id = BuildingId(next_free);
                    next_free = next_free.checked_add(1).ok_or_else(out_of_range)?;
                    id
                }
            };
            instances.push(BuildingInstance {
                id,
                model_key: record.model_key,
                level: record.level,
                built_at: record.built_at,
            });
        }

        BuildingRoster::from_instances(instances)
            .ok_or_else(|| GameError::MalformedDocument("duplicate building IDs".to_string()))
    }

    /// Encode the current state as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MalformedDocument`] if encoding fails.
    pub fn save_json(&self) -> Result<String> {
        self.to_document().encode(SaveFormat::Json)
    }

    /// Replace the current state from JSON text.
    ///
    /// # Errors
    ///
    /// As [`load_document`](Self::load_document), plus
    /// [`GameError::MalformedDocument`] if the text does not parse.
    pub fn load_json(&mut self, text: &str) -> Result<()> {
        self.load_document(SaveDocument::decode(text, SaveFormat::Json)?)
    }

    /// Encode the current state as RON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::MalformedDocument`] if encoding fails.
    pub fn save_ron(&self) -> Result<String> {
        self.to_document().encode(SaveFormat::Ron)
    }

    /// Replace the current state from RON text.
    ///
    /// # Errors
    ///
    /// As [`load_json`](Self::load_json).
    pub fn load_ron(&mut self, text: &str) -> Result<()> {
        self.load_document(SaveDocument::decode(text, SaveFormat::Ron)?)
    }

    /// Save to a file; `.ron` files are RON, anything else JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PersistenceError`] on I/O failure.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.to_document().write_to(path)?;
        tracing::info!(path = %path.display(), turn = self.state.turn, "Saved game");
        Ok(())
    }

    /// Load from a file; `.ron` files are RON, anything else JSON.
    ///
    /// # Errors
    ///
    /// [`GameError::PersistenceError`] if the file cannot be read or
    /// parsed, otherwise as [`load_document`](Self::load_document).
    pub fn load_from_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let document = SaveDocument::read_from(path.as_ref())?;
        self.load_document(document)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::Catalog;

    fn sim() -> Simulation {
        Simulation::new(Arc::new(Catalog::standard()), 5)
    }

    #[test]
    fn test_format_for_path() {
        assert_eq!(SaveFormat::for_path(Path::new("a.ron")), SaveFormat::Ron);
        assert_eq!(SaveFormat::for_path(Path::new("a.RON")), SaveFormat::Ron);
        assert_eq!(SaveFormat::for_path(Path::new("a.json")), SaveFormat::Json);
        assert_eq!(SaveFormat::for_path(Path::new("save")), SaveFormat::Json);
    }

    #[test]
    fn test_json_round_trip_preserves_hash() {
        let mut a = sim();
        let id = a.build("madeira").unwrap();
        a.upgrade(id).unwrap();
        a.advance_turns(5);

        let text = a.save_json().unwrap();
        let mut b = sim();
        b.load_json(&text).unwrap();
        assert_eq!(b.to_document(), a.to_document());
        assert_eq!(b.state().buildings.next_id(), a.state().buildings.next_id());
    }

    #[test]
    fn test_ron_round_trip() {
        let mut a = sim();
        a.build("banco").unwrap();
        a.advance_turns(3);

        let text = a.save_ron().unwrap();
        let mut b = sim();
        b.load_ron(&text).unwrap();
        assert_eq!(b.to_document(), a.to_document());
    }

    #[test]
    fn test_minimal_document_keeps_missing_parts() {
        let mut s = sim();
        s.advance_turns(2);
        let statistics = s.state().statistics;

        let text = r#"{
            "capital": 500.0,
            "turn": 9,
            "resources": { "ouro": { "quantity": 1, "price": 10.0 }, "platina": { "quantity": 3, "price": 1.0 } },
            "buildings": [ { "model_key": "madeira", "level": 2, "built_at": 4 } ]
        }"#;
        s.load_json(text).unwrap();

        let state = s.state();
        assert!((state.capital - 500.0).abs() < f64::EPSILON);
        assert_eq!(state.turn, 9);
        assert_eq!(state.research_points, 0);
        let gold = state.resource("ouro").unwrap();
        assert_eq!(gold.history.as_slice(), &[10.0]);
        assert_eq!(state.resource("madeira").unwrap().history.len(), 3);
        assert_eq!(state.buildings.as_slice()[0].id, BuildingId(1));
        assert_eq!(state.statistics, statistics);
    }

    #[test]
    fn test_missing_ids_do_not_collide_with_explicit_ones() {
        let mut s = sim();
        let text = r#"{
            "capital": 0.0, "turn": 1,
            "buildings": [
                { "model_key": "madeira", "level": 1, "built_at": 1 },
                { "id": 4, "model_key": "metal", "level": 1, "built_at": 1 }
            ]
        }"#;
        s.load_json(text).unwrap();
        let ids: Vec<u64> = s.state().buildings.iter().map(|b| b.id.0).collect();
        assert_eq!(ids, vec![5, 4]);
        assert_eq!(s.build("madeira").unwrap(), BuildingId(6));
    }

    #[test]
    fn test_rejections_are_atomic() {
        let mut s = sim();
        s.build("madeira").unwrap();
        let before = s.state_hash();

        let unknown_model = r#"{"capital": 1.0, "turn": 3,
            "buildings": [{"model_key": "castelo", "level": 1, "built_at": 1}]}"#;
        assert!(matches!(
            s.load_json(unknown_model),
            Err(GameError::UnknownModel(ref m)) if m == "castelo"
        ));

        let bad_level = r#"{"capital": 1.0, "turn": 3,
            "buildings": [{"model_key": "madeira", "level": 6, "built_at": 1}]}"#;
        assert!(matches!(
            s.load_json(bad_level),
            Err(GameError::MalformedDocument(_))
        ));

        let duplicate = r#"{"capital": 1.0, "turn": 3, "buildings": [
            {"id": 1, "model_key": "madeira", "level": 1, "built_at": 1},
            {"id": 1, "model_key": "metal", "level": 1, "built_at": 1}]}"#;
        assert!(matches!(
            s.load_json(duplicate),
            Err(GameError::MalformedDocument(_))
        ));

        let low_price = r#"{"capital": 1.0, "turn": 3,
            "resources": {"ouro": {"quantity": 1, "price": 0.01}}}"#;
        assert!(matches!(
            s.load_json(low_price),
            Err(GameError::MalformedDocument(_))
        ));

        let last_id = r#"{"capital": 1.0, "turn": 3, "buildings": [
            {"id": 18446744073709551615, "model_key": "madeira", "level": 1, "built_at": 1}]}"#;
        assert!(matches!(
            s.load_json(last_id),
            Err(GameError::MalformedDocument(ref m)) if m.contains("out of range")
        ));

        assert!(matches!(
            s.load_json("{not json"),
            Err(GameError::MalformedDocument(_))
        ));

        assert_eq!(s.state_hash(), before);
    }

    #[test]
    fn test_crashing_events_keep_saves_loadable() {
        use crate::events::{EventCategory, EventEffect, EventTemplate};

        let mut data = Catalog::standard().to_data();
        data.rules.event_chance = 1.0;
        data.events = vec![EventTemplate::new(
            EventCategory::Penalty,
            "Colapso",
            "O preço de {resource} desabou!",
            EventEffect::ScalePrice {
                factor: 0.01,
                floor: None,
            },
        )];
        let catalog = Arc::new(Catalog::from_data(data).unwrap());
        let mut s = Simulation::new(Arc::clone(&catalog), 11);
        s.advance_turns(40);

        let floor = catalog.rules().price_floor;
        assert!(s.state().resources.iter().all(|r| r.price >= floor));

        let json = s.save_json().unwrap();
        let mut restored = Simulation::new(catalog, 0);
        restored.load_json(&json).unwrap();
        assert_eq!(restored.state().resources, s.state().resources);
    }

    #[test]
    fn test_build_refused_once_ids_run_out() {
        let mut s = sim();
        let near_limit = r#"{"capital": 100000.0, "turn": 3, "buildings": [
            {"id": 18446744073709551614, "model_key": "madeira", "level": 1, "built_at": 1}]}"#;
        s.load_json(near_limit).unwrap();
        let before = s.state_hash();

        assert!(matches!(s.build("madeira"), Err(GameError::BuildingIdsExhausted)));
        assert_eq!(s.state_hash(), before);
        assert_eq!(s.state().buildings.len(), 1);
    }

    #[test]
    fn test_event_log_loads_most_recent_first() {
        let mut s = sim();
        let text = r#"{"capital": 1.0, "turn": 4, "events": [
            {"turn": 3, "title": "Doação Recebida", "description": "d", "category": "bonus"},
            {"turn": 2, "title": "Mercado Estável", "description": "n", "category": "neutral"}]}"#;
        s.load_json(text).unwrap();
        let log = &s.state().events;
        assert_eq!(log.len(), 2);
        assert_eq!(log.latest().unwrap().turn, 3);

        let reloaded = s.to_document();
        assert_eq!(reloaded.events.as_ref().map(Vec::len), Some(2));

        s.load_json(r#"{"capital": 1.0, "turn": 5}"#).unwrap();
        assert_eq!(s.state().events.len(), 2);
    }

    #[test]
    fn test_achievements_load_and_unknown_ids_ignored() {
        let mut s = sim();
        let text = r#"{"capital": 1.0, "turn": 3, "achievements": {
            "primeiro_turno": {"unlocked": true, "turn": 2},
            "lendario": {"unlocked": true, "turn": 2}}}"#;
        s.load_json(text).unwrap();
        let status = s.state().achievement("primeiro_turno").unwrap();
        assert!(status.unlocked);
        assert_eq!(status.unlocked_turn, 2);
        assert!(s.state().achievement("lendario").is_none());
    }
}
