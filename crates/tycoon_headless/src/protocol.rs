//! JSON protocol for headless game communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Responses, one per command
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner answers each command with exactly one response
//! 4. On `quit` or end of input, outputs `{"type":"bye",...}`
//!
//! A command that fails is answered with an `error` response; the session
//! continues with the state unchanged. An `advance` above
//! [`MAX_ADVANCE_COUNT`] turns is refused the same way.
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","turn":1,"capital":15000.0}
//! -> {"cmd":"build","model":"madeira"}
//! <- {"type":"ack","cmd":"build","outcome":{"outcome":"built","building":1}}
//! -> {"cmd":"advance","count":3}
//! <- {"type":"turn","turn":4,"capital":14910.0,"reports":[...]}
//! -> {"cmd":"sell","resource":"ouro","amount":6}
//! <- {"type":"error","message":"Insufficient ouro: requested 6, available 5","cmd":"sell"}
//! -> {"cmd":"quit"}
//! <- {"type":"bye","turn":4}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tycoon_core::buildings::BuildingId;
use tycoon_core::command::{Command as CoreCommand, CommandOutcome};
use tycoon_core::simulation::TurnReport;
use tycoon_core::snapshot::Snapshot;

/// Protocol version reported in the `ready` response.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Most turns a single `advance` command may request.
pub const MAX_ADVANCE_COUNT: u64 = 10_000;

/// Errors reading or writing the protocol stream.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// A line was not a valid command.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// The input or output stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A building command named neither an ID nor an index.
    #[error("'{0}' needs either \"building\" or \"index\"")]
    MissingBuilding(&'static str),
    /// A building index past the end of the roster.
    #[error("No building at index {0}")]
    NoBuildingAt(usize),
}

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Buy units of a resource.
    Buy {
        /// Resource key.
        resource: String,
        /// Units to buy.
        amount: u64,
    },

    /// Sell units of a resource.
    Sell {
        /// Resource key.
        resource: String,
        /// Units to sell.
        amount: u64,
    },

    /// Sell every held unit.
    SellAll,

    /// Construct a building.
    Build {
        /// Building model key.
        model: String,
    },

    /// Upgrade a building, by ID or by construction-order index.
    Upgrade {
        /// Building ID.
        #[serde(default)]
        building: Option<BuildingId>,
        /// Zero-based position in construction order.
        #[serde(default)]
        index: Option<usize>,
    },

    /// Demolish a building, by ID or by construction-order index.
    Demolish {
        /// Building ID.
        #[serde(default)]
        building: Option<BuildingId>,
        /// Zero-based position in construction order.
        #[serde(default)]
        index: Option<usize>,
    },

    /// Advance N turns (default: 1).
    Advance {
        /// Turns to advance, at most [`MAX_ADVANCE_COUNT`].
        #[serde(default = "default_advance_count")]
        count: u64,
    },

    /// Full state for rendering.
    Snapshot,

    /// Recent price history of a resource.
    History {
        /// Resource key.
        resource: String,
        /// Most recent prices to return.
        #[serde(default = "default_history_window")]
        window: usize,
    },

    /// Save the game to a file (`.ron` for RON, anything else JSON).
    Save {
        /// Destination path.
        path: String,
    },

    /// Load the game from a file.
    Load {
        /// Source path.
        path: String,
    },

    /// Current state hash (for determinism verification).
    Hash,

    /// End the session.
    Quit,
}

fn default_advance_count() -> u64 {
    1
}

fn default_history_window() -> usize {
    10
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Current turn.
        turn: u64,
        /// Current capital.
        capital: f64,
    },

    /// A command succeeded.
    Ack {
        /// Command name.
        cmd: String,
        /// What the command did, for engine commands.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        outcome: Option<CommandOutcome>,
    },

    /// Turns were advanced.
    Turn {
        /// Turn after advancing.
        turn: u64,
        /// Capital after advancing.
        capital: f64,
        /// One report per turn advanced.
        reports: Vec<TurnReport>,
    },

    /// Current game state.
    State {
        /// The snapshot.
        snapshot: Box<Snapshot>,
    },

    /// Price history of one resource, oldest first.
    History {
        /// Resource key.
        resource: String,
        /// Prices.
        prices: Vec<f64>,
    },

    /// State hash for determinism verification.
    Hash {
        /// Current turn.
        turn: u64,
        /// The hash.
        hash: u64,
    },

    /// Error processing a command.
    Error {
        /// Human-readable description.
        message: String,
        /// Command name, when the line parsed.
        #[serde(default)]
        cmd: Option<String>,
    },

    /// Goodbye message before shutdown.
    Bye {
        /// Final turn.
        turn: u64,
    },
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    #[must_use]
    pub fn ready(turn: u64, capital: f64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            turn,
            capital,
        }
    }

    /// Create an acknowledgment.
    #[must_use]
    pub fn ack(cmd: &str, outcome: Option<CommandOutcome>) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
            outcome,
        }
    }

    /// Create an error response.
    #[must_use]
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Parse`] if the line is not a command.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Get command name for acknowledgment.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Buy { .. } => "buy",
            Self::Sell { .. } => "sell",
            Self::SellAll => "sell_all",
            Self::Build { .. } => "build",
            Self::Upgrade { .. } => "upgrade",
            Self::Demolish { .. } => "demolish",
            Self::Advance { .. } => "advance",
            Self::Snapshot => "snapshot",
            Self::History { .. } => "history",
            Self::Save { .. } => "save",
            Self::Load { .. } => "load",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }

    /// The engine command this maps to, for single-step commands.
    ///
    /// `resolve` turns a construction-order index into a building ID.
    /// Returns `Ok(None)` for commands the runner handles itself.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MissingBuilding`] when a building command names
    /// neither an ID nor an index, [`ProtocolError::NoBuildingAt`] when the
    /// index resolves to nothing.
    pub fn to_core<F>(&self, resolve: F) -> Result<Option<CoreCommand>, ProtocolError>
    where
        F: Fn(usize) -> Option<BuildingId>,
    {
        let target = |building: Option<BuildingId>, index: Option<usize>| match (building, index) {
            (Some(id), _) => Ok(id),
            (None, Some(index)) => resolve(index).ok_or(ProtocolError::NoBuildingAt(index)),
            (None, None) => Err(ProtocolError::MissingBuilding(self.name())),
        };

        let command = match self {
            Self::Buy { resource, amount } => CoreCommand::Buy {
                resource: resource.clone(),
                amount: *amount,
            },
            Self::Sell { resource, amount } => CoreCommand::Sell {
                resource: resource.clone(),
                amount: *amount,
            },
            Self::SellAll => CoreCommand::SellAll,
            Self::Build { model } => CoreCommand::Build {
                model: model.clone(),
            },
            Self::Upgrade { building, index } => CoreCommand::Upgrade {
                building: target(*building, *index)?,
            },
            Self::Demolish { building, index } => CoreCommand::Demolish {
                building: target(*building, *index)?,
            },
            _ => return Ok(None),
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_advance_command() {
        let cmd = Command::from_json(r#"{"cmd":"advance","count":12}"#).unwrap();
        assert_eq!(cmd, Command::Advance { count: 12 });
    }

    #[test]
    fn test_default_advance_count() {
        let cmd = Command::from_json(r#"{"cmd":"advance"}"#).unwrap();
        assert_eq!(cmd, Command::Advance { count: 1 });
    }

    #[test]
    fn test_parse_trade_command() {
        let cmd = Command::from_json(r#"{"cmd":"buy","resource":"cafe","amount":3}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Buy {
                resource: "cafe".into(),
                amount: 3
            }
        );
    }

    #[test]
    fn test_parse_building_by_id_or_index() {
        let by_id = Command::from_json(r#"{"cmd":"upgrade","building":4}"#).unwrap();
        assert_eq!(
            by_id,
            Command::Upgrade {
                building: Some(BuildingId(4)),
                index: None
            }
        );
        let by_index = Command::from_json(r#"{"cmd":"demolish","index":0}"#).unwrap();
        assert_eq!(
            by_index,
            Command::Demolish {
                building: None,
                index: Some(0)
            }
        );
    }

    #[test]
    fn test_unknown_command_is_parse_error() {
        let err = Command::from_json(r#"{"cmd":"spawn"}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::Parse(_)));
        assert!(err.to_string().starts_with("Parse error"));
    }

    #[test]
    fn test_to_core_resolves_index() {
        let cmd = Command::Upgrade {
            building: None,
            index: Some(1),
        };
        let core = cmd.to_core(|i| (i == 1).then_some(BuildingId(7))).unwrap();
        assert_eq!(
            core,
            Some(CoreCommand::Upgrade {
                building: BuildingId(7)
            })
        );

        let err = cmd.to_core(|_| None).unwrap_err();
        assert!(matches!(err, ProtocolError::NoBuildingAt(1)));

        let missing = Command::Demolish {
            building: None,
            index: None,
        };
        let err = missing.to_core(|_| None).unwrap_err();
        assert!(err.to_string().contains("demolish"));
    }

    #[test]
    fn test_runner_commands_have_no_core_form() {
        assert_eq!(Command::Hash.to_core(|_| None).unwrap(), None);
        assert_eq!(
            Command::Advance { count: 2 }.to_core(|_| None).unwrap(),
            None
        );
    }

    #[test]
    fn test_serialize_responses() {
        let json = Response::ready(1, 15_000.0).to_json_line();
        assert!(json.contains(r#""type":"ready""#));
        assert!(json.ends_with('\n'));

        let json = Response::ack("build", Some(CommandOutcome::Built { building: BuildingId(1) }))
            .to_json_line();
        assert!(json.contains(r#""cmd":"build""#));
        assert!(json.contains(r#""outcome":"built""#));

        let json = Response::ack("save", None).to_json_line();
        assert!(!json.contains("outcome"));

        let json = Response::Hash { turn: 3, hash: 99 }.to_json_line();
        assert!(json.contains(r#""type":"hash""#));
    }
}
