//! Serializable player commands.
//!
//! Every mutation a player can make is expressible as a [`Command`] value,
//! which is what replays record and what outer protocols translate into.
//! [`Simulation::apply`](crate::simulation::Simulation::apply) dispatches
//! them.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingId;
use crate::simulation::TurnReport;

/// A player command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Buy units of a resource at its current price.
    Buy {
        /// Resource key.
        resource: String,
        /// Units to buy.
        amount: u64,
    },
    /// Sell units of a resource at its current price.
    Sell {
        /// Resource key.
        resource: String,
        /// Units to sell.
        amount: u64,
    },
    /// Sell every unit of every resource.
    SellAll,
    /// Construct a new building.
    Build {
        /// Building model key.
        model: String,
    },
    /// Upgrade a building by one level.
    Upgrade {
        /// Target building.
        building: BuildingId,
    },
    /// Demolish a building for a partial refund.
    Demolish {
        /// Target building.
        building: BuildingId,
    },
    /// End the turn.
    AdvanceTurn,
}

impl Command {
    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Buy { .. } => "buy",
            Self::Sell { .. } => "sell",
            Self::SellAll => "sell_all",
            Self::Build { .. } => "build",
            Self::Upgrade { .. } => "upgrade",
            Self::Demolish { .. } => "demolish",
            Self::AdvanceTurn => "advance_turn",
        }
    }
}

/// Result of a successfully applied [`Command`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Resources bought.
    Bought {
        /// Capital paid.
        cost: f64,
    },
    /// Resources sold.
    Sold {
        /// Capital received.
        revenue: f64,
    },
    /// Building constructed.
    Built {
        /// The new building.
        building: BuildingId,
    },
    /// Building upgraded.
    Upgraded {
        /// The building.
        building: BuildingId,
        /// Level after the upgrade.
        level: u32,
    },
    /// Building demolished.
    Demolished {
        /// Capital refunded.
        refund: f64,
    },
    /// Turn advanced.
    Turn(TurnReport),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        assert_eq!(Command::SellAll.name(), "sell_all");
        assert_eq!(
            Command::Upgrade {
                building: BuildingId(3)
            }
            .name(),
            "upgrade"
        );
    }

    #[test]
    fn test_commands_survive_bincode() {
        let commands = vec![
            Command::Buy {
                resource: "metal".into(),
                amount: 4,
            },
            Command::Demolish {
                building: BuildingId(9),
            },
            Command::AdvanceTurn,
        ];
        let bytes = bincode::serialize(&commands).unwrap();
        let back: Vec<Command> = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, commands);
    }
}
