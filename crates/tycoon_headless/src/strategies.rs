//! Scripted strategies for headless auto-play.
//!
//! A [`Strategy`] is data: a build order plus optional trading and
//! liquidation rules, loadable from RON. A [`StrategyExecutor`] walks it
//! against a running simulation one turn at a time and reports every
//! command that took effect, so auto-played games can be recorded and
//! replayed like interactive ones.

use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tycoon_core::buildings::BuildingId;
use tycoon_core::command::Command;
use tycoon_core::math::floor_count;
use tycoon_core::simulation::Simulation;

/// Error type for strategy operations.
#[derive(Error, Debug)]
pub enum StrategyError {
    /// File not found.
    #[error("Strategy file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read strategy file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse strategy: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Neither a preset name nor a `.ron` path.
    #[error("Unknown strategy '{0}' (expected idle, builder, trader or a .ron file)")]
    Unknown(String),
}

/// A complete auto-play strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Strategy name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Build order to follow, front first.
    #[serde(default)]
    pub build_order: Vec<BuildOrderItem>,
    /// Capital never spent below.
    #[serde(default)]
    pub reserve: f64,
    /// Price-driven buying and selling.
    #[serde(default)]
    pub trading: Option<TradingRules>,
    /// Sell all holdings every N turns (0 = never).
    #[serde(default)]
    pub liquidate_every: u64,
}

impl Default for Strategy {
    fn default() -> Self {
        Self::idle()
    }
}

impl Strategy {
    /// Load a strategy from a RON file.
    ///
    /// # Errors
    ///
    /// Returns a [`StrategyError`] if the file is missing, unreadable or
    /// not a strategy.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StrategyError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StrategyError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::ParseError`] if the text is not a strategy.
    pub fn from_ron_str(ron: &str) -> Result<Self, StrategyError> {
        let strategy: Strategy = ron::from_str(ron)?;
        Ok(strategy)
    }

    /// Resolve a preset name or a `.ron` path.
    ///
    /// # Errors
    ///
    /// As [`load`](Self::load) for paths; [`StrategyError::Unknown`] for
    /// anything else.
    pub fn resolve(name: &str) -> Result<Self, StrategyError> {
        match name {
            "idle" => Ok(Self::idle()),
            "builder" => Ok(Self::builder()),
            "trader" => Ok(Self::trader()),
            path if path.ends_with(".ron") => Self::load(path),
            other => Err(StrategyError::Unknown(other.to_string())),
        }
    }

    /// Do nothing but end turns.
    #[must_use]
    pub fn idle() -> Self {
        Self {
            name: "Idle".to_string(),
            description: "Ends every turn without acting".to_string(),
            build_order: Vec::new(),
            reserve: 0.0,
            trading: None,
            liquidate_every: 0,
        }
    }

    /// Grow a production base and cash out its output regularly.
    #[must_use]
    pub fn builder() -> Self {
        use BuildOrderItem::{Build, Upgrade, WaitForCapital};
        Self {
            name: "Builder".to_string(),
            description: "Builds cheap producers first and sells output every few turns"
                .to_string(),
            build_order: vec![
                Build("madeira".to_string()),
                Build("metal".to_string()),
                Build("energia".to_string()),
                WaitForCapital(12_000.0),
                Build("banco".to_string()),
                Upgrade("madeira".to_string()),
                Build("cafe".to_string()),
                Upgrade("metal".to_string()),
                WaitForCapital(25_000.0),
                Build("petroleo".to_string()),
                Build("pesquisa".to_string()),
                Upgrade("banco".to_string()),
                Build("ouro".to_string()),
                Upgrade("energia".to_string()),
                Upgrade("madeira".to_string()),
            ],
            reserve: 1_000.0,
            trading: None,
            liquidate_every: 3,
        }
    }

    /// Buy dips and sell spikes without building anything.
    #[must_use]
    pub fn trader() -> Self {
        Self {
            name: "Trader".to_string(),
            description: "Buys below the recent mean and sells above it".to_string(),
            build_order: Vec::new(),
            reserve: 2_000.0,
            trading: Some(TradingRules::default()),
            liquidate_every: 0,
        }
    }
}

/// A single item in a build order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuildOrderItem {
    /// Construct a building of this model.
    Build(String),
    /// Upgrade the lowest-level building of this model.
    Upgrade(String),
    /// Wait until capital reaches this amount.
    WaitForCapital(f64),
    /// Wait for a specific turn.
    WaitForTurn(u64),
}

/// Price-driven trading thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingRules {
    /// Prices averaged over this many recent turns.
    pub window: usize,
    /// Buy when the price is at or below `mean × buy_below`.
    pub buy_below: f64,
    /// Sell everything held when the price is at or above `mean × sell_above`.
    pub sell_above: f64,
    /// Share of spare capital committed per purchase.
    pub lot_fraction: f64,
}

impl Default for TradingRules {
    fn default() -> Self {
        Self {
            window: 8,
            buy_below: 0.92,
            sell_above: 1.08,
            lot_fraction: 0.2,
        }
    }
}

/// Runtime state for executing a strategy.
#[derive(Debug, Clone)]
pub struct StrategyExecutor {
    strategy: Strategy,
    build_queue: VecDeque<BuildOrderItem>,
    current_index: usize,
    turns_taken: u64,
}

impl StrategyExecutor {
    /// Create a new executor for a strategy.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        let build_queue = strategy.build_order.iter().cloned().collect();
        Self {
            strategy,
            build_queue,
            current_index: 0,
            turns_taken: 0,
        }
    }

    /// Get the strategy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.strategy.name
    }

    /// Get build order progress as a fraction.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f64 {
        if self.strategy.build_order.is_empty() {
            1.0
        } else {
            self.current_index as f64 / self.strategy.build_order.len() as f64
        }
    }

    /// Act for one turn, then end it.
    ///
    /// Returns every command that succeeded, ending with the
    /// [`Command::AdvanceTurn`].
    pub fn take_turn(&mut self, sim: &mut Simulation) -> Vec<Command> {
        let mut applied = Vec::new();
        self.follow_build_order(sim, &mut applied);
        if let Some(rules) = self.strategy.trading.clone() {
            self.trade(sim, &rules, &mut applied);
        }

        self.turns_taken += 1;
        let every = self.strategy.liquidate_every;
        if every > 0 && self.turns_taken % every == 0 {
            Self::try_apply(sim, Command::SellAll, &mut applied);
        }

        Self::try_apply(sim, Command::AdvanceTurn, &mut applied);
        applied
    }

    fn follow_build_order(&mut self, sim: &mut Simulation, applied: &mut Vec<Command>) {
        while let Some(item) = self.build_queue.front().cloned() {
            let command = match item {
                BuildOrderItem::WaitForCapital(amount) => {
                    if sim.capital() < amount {
                        return;
                    }
                    None
                }
                BuildOrderItem::WaitForTurn(turn) => {
                    if sim.turn() < turn {
                        return;
                    }
                    None
                }
                BuildOrderItem::Build(model) => {
                    let Some(cost) = sim.catalog().model(&model).map(|m| m.cost) else {
                        tracing::warn!(model = %model, "Skipping unknown model in build order");
                        self.advance_queue();
                        continue;
                    };
                    if !self.affordable(sim, cost) {
                        return;
                    }
                    Some(Command::Build { model })
                }
                BuildOrderItem::Upgrade(model) => match Self::upgrade_target(sim, &model) {
                    None => None,
                    Some((building, cost)) => {
                        if !self.affordable(sim, cost) {
                            return;
                        }
                        Some(Command::Upgrade { building })
                    }
                },
            };

            if let Some(command) = command {
                Self::try_apply(sim, command, applied);
            }
            self.advance_queue();
        }
    }

    fn advance_queue(&mut self) {
        self.build_queue.pop_front();
        self.current_index += 1;
    }

    fn affordable(&self, sim: &Simulation, cost: f64) -> bool {
        sim.capital() - cost >= self.strategy.reserve
    }

    /// Lowest-level upgradable building of a model, with its upgrade cost.
    fn upgrade_target(sim: &Simulation, model_key: &str) -> Option<(BuildingId, f64)> {
        let catalog = sim.catalog();
        let model = catalog.model(model_key)?;
        sim.state()
            .buildings
            .iter()
            .filter(|b| b.model_key == model_key && !b.is_max_level(model))
            .min_by_key(|b| b.level)
            .map(|b| (b.id, b.upgrade_cost(model, catalog.rules())))
    }

    fn trade(&self, sim: &mut Simulation, rules: &TradingRules, applied: &mut Vec<Command>) {
        let keys: Vec<String> = sim.catalog().resources().iter().map(|r| r.key.clone()).collect();
        for key in keys {
            let Ok(history) = sim.resource_history(&key, rules.window) else {
                continue;
            };
            if history.len() < rules.window.min(2) {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let mean = history.iter().sum::<f64>() / history.len() as f64;
            let Some(resource) = sim.state().resource(&key) else {
                continue;
            };
            let (price, held) = (resource.price, resource.quantity);

            if price >= mean * rules.sell_above && held > 0 {
                Self::try_apply(
                    sim,
                    Command::Sell {
                        resource: key,
                        amount: held,
                    },
                    applied,
                );
            } else if price <= mean * rules.buy_below {
                let spare = sim.capital() - self.strategy.reserve;
                let amount = floor_count(spare * rules.lot_fraction / price);
                if amount > 0 {
                    Self::try_apply(sim, Command::Buy { resource: key, amount }, applied);
                }
            }
        }
    }

    fn try_apply(sim: &mut Simulation, command: Command, applied: &mut Vec<Command>) {
        match sim.apply(&command) {
            Ok(_) => applied.push(command),
            Err(e) => tracing::debug!(cmd = command.name(), error = %e, "Strategy command rejected"),
        }
    }
}
