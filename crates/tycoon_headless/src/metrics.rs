//! Per-game metrics and batch summaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tycoon_core::simulation::Simulation;

/// Outcome figures for one finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Unique game identifier.
    pub game_id: String,
    /// Strategy that played.
    pub strategy: String,
    /// Seed used.
    pub seed: u64,
    /// Turns advanced.
    pub turns_played: u64,
    /// Turn the game ended on.
    pub final_turn: u64,
    /// Capital at the end.
    pub final_capital: f64,
    /// Highest capital seen.
    pub peak_capital: f64,
    /// Market value of holdings at the end.
    pub portfolio_value: f64,
    /// Buildings owned at the end.
    pub buildings: usize,
    /// Research points at the end.
    pub research_points: u64,
    /// IDs of unlocked achievements.
    pub achievements_unlocked: Vec<String>,
    /// Random events that occurred.
    pub events_occurred: u64,
    /// Commands that took effect, turns included.
    pub commands_applied: usize,
    /// Final state hash.
    pub final_state_hash: u64,
}

impl GameMetrics {
    /// Collect metrics from a finished game.
    #[must_use]
    pub fn from_simulation(
        game_id: impl Into<String>,
        strategy: impl Into<String>,
        seed: u64,
        simulation: &Simulation,
        commands_applied: usize,
    ) -> Self {
        let state = simulation.state();
        Self {
            game_id: game_id.into(),
            strategy: strategy.into(),
            seed,
            turns_played: state.statistics.turns_played,
            final_turn: state.turn,
            final_capital: state.capital,
            peak_capital: state.statistics.peak_capital,
            portfolio_value: simulation.portfolio_value(),
            buildings: state.buildings.len(),
            research_points: state.research_points,
            achievements_unlocked: state
                .achievements
                .iter()
                .filter(|a| a.unlocked)
                .map(|a| a.id.clone())
                .collect(),
            events_occurred: state.statistics.events_occurred,
            commands_applied,
            final_state_hash: simulation.state_hash(),
        }
    }

    /// Capital plus holdings at market value.
    #[must_use]
    pub fn net_worth(&self) -> f64 {
        self.final_capital + self.portfolio_value
    }
}

/// Summary statistics across multiple games.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Total games played.
    pub total_games: u32,
    /// Average final capital.
    pub mean_capital: f64,
    /// Lowest final capital.
    pub min_capital: f64,
    /// Highest final capital.
    pub max_capital: f64,
    /// Average capital plus holdings.
    pub mean_net_worth: f64,
    /// Average number of achievements unlocked.
    pub mean_achievements: f64,
    /// Share of games unlocking each achievement.
    pub achievement_rates: BTreeMap<String, f64>,
    /// Games that ended with negative capital.
    pub games_in_debt: u32,
}

impl BatchSummary {
    /// Calculate summary from a list of game metrics.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let count = games.len() as f64;

        let mut summary = Self {
            total_games: games.len() as u32,
            min_capital: f64::INFINITY,
            max_capital: f64::NEG_INFINITY,
            ..Self::default()
        };

        let mut capital_sum = 0.0;
        let mut net_worth_sum = 0.0;
        let mut unlocked_sum = 0usize;
        let mut unlock_counts: BTreeMap<String, u32> = BTreeMap::new();

        for game in games {
            capital_sum += game.final_capital;
            net_worth_sum += game.net_worth();
            summary.min_capital = summary.min_capital.min(game.final_capital);
            summary.max_capital = summary.max_capital.max(game.final_capital);
            if game.final_capital < 0.0 {
                summary.games_in_debt += 1;
            }

            unlocked_sum += game.achievements_unlocked.len();
            for id in &game.achievements_unlocked {
                *unlock_counts.entry(id.clone()).or_default() += 1;
            }
        }

        summary.mean_capital = capital_sum / count;
        summary.mean_net_worth = net_worth_sum / count;
        summary.mean_achievements = unlocked_sum as f64 / count;
        summary.achievement_rates = unlock_counts
            .into_iter()
            .map(|(id, n)| (id, f64::from(n) / count))
            .collect();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(capital: f64, achievements: &[&str]) -> GameMetrics {
        GameMetrics {
            game_id: "g".into(),
            strategy: "Idle".into(),
            seed: 0,
            turns_played: 10,
            final_turn: 11,
            final_capital: capital,
            peak_capital: capital.max(15_000.0),
            portfolio_value: 100.0,
            buildings: 0,
            research_points: 0,
            achievements_unlocked: achievements.iter().map(ToString::to_string).collect(),
            events_occurred: 0,
            commands_applied: 10,
            final_state_hash: 0,
        }
    }

    #[test]
    fn test_summary_of_nothing_is_default() {
        assert_eq!(BatchSummary::from_games(&[]), BatchSummary::default());
    }

    #[test]
    fn test_summary_figures() {
        let games = [
            game(10_000.0, &["primeiro_turno"]),
            game(-500.0, &["primeiro_turno", "capital_50k"]),
            game(20_500.0, &[]),
        ];
        let summary = BatchSummary::from_games(&games);

        assert_eq!(summary.total_games, 3);
        assert!((summary.mean_capital - 10_000.0).abs() < 1e-9);
        assert!((summary.min_capital + 500.0).abs() < f64::EPSILON);
        assert!((summary.max_capital - 20_500.0).abs() < f64::EPSILON);
        assert!((summary.mean_net_worth - 10_100.0).abs() < 1e-9);
        assert!((summary.mean_achievements - 1.0).abs() < f64::EPSILON);
        assert!((summary.achievement_rates["primeiro_turno"] - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.games_in_debt, 1);
    }
}
