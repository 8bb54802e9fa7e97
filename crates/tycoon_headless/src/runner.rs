//! Headless game runner implementation.
//!
//! [`HeadlessRunner`] owns one simulation and answers protocol commands
//! against it. Input and output are generic so tests drive a session from
//! in-memory buffers exactly the way the binary drives it from stdin.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use tycoon_core::catalog::Catalog;
use tycoon_core::command::Command as CoreCommand;
use tycoon_core::persistence::SaveDocument;
use tycoon_core::replay::Replay;
use tycoon_core::simulation::Simulation;

use crate::protocol::{Command, ProtocolError, Response, MAX_ADVANCE_COUNT};

/// Headless runner configuration.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Seed for the simulation's generator.
    pub seed: u64,
    /// Where the catalog came from, stamped into replays.
    pub catalog_origin: String,
    /// Record a replay of the session.
    pub record: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            catalog_origin: "standard".to_string(),
            record: false,
        }
    }
}

/// Whether a session keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Read the next line.
    Continue,
    /// Stop after this response.
    Quit,
}

/// Headless runner for controller-driven play.
pub struct HeadlessRunner {
    simulation: Simulation,
    replay: Option<Replay>,
}

impl HeadlessRunner {
    /// Create a runner over a fresh game.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, config: &HeadlessConfig) -> Self {
        let replay = config
            .record
            .then(|| Replay::new(config.catalog_origin.clone(), config.seed));
        Self {
            simulation: Simulation::new(catalog, config.seed),
            replay,
        }
    }

    /// The game being played.
    #[must_use]
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// The finished recording, stamped with the final state.
    #[must_use]
    pub fn into_replay(self) -> Option<Replay> {
        let simulation = self.simulation;
        self.replay.map(|mut replay| {
            replay.finalize(&simulation);
            replay
        })
    }

    /// Run a session: greet, answer each line, say goodbye.
    ///
    /// Ends on `quit` or at end of input. Blank lines are skipped; lines
    /// that fail to parse get an `error` response.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Io`] if reading or writing fails.
    pub fn run<I: BufRead, O: Write>(&mut self, input: I, mut output: O) -> Result<(), ProtocolError> {
        let ready = Response::ready(self.simulation.turn(), self.simulation.capital());
        output.write_all(ready.to_json_line().as_bytes())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let (response, flow) = match Command::from_json(line) {
                Ok(command) => self.handle(&command),
                Err(e) => {
                    tracing::warn!(error = %e, "Rejected input line");
                    (Response::error(e.to_string(), None), Flow::Continue)
                }
            };

            if flow == Flow::Quit {
                break;
            }
            output.write_all(response.to_json_line().as_bytes())?;
            output.flush()?;
        }

        let bye = Response::Bye {
            turn: self.simulation.turn(),
        };
        output.write_all(bye.to_json_line().as_bytes())?;
        output.flush()?;
        tracing::info!(turn = self.simulation.turn(), "Session ended");
        Ok(())
    }

    /// Answer one command.
    pub fn handle(&mut self, command: &Command) -> (Response, Flow) {
        let name = command.name();
        tracing::debug!(cmd = name, "Handling command");

        let response = match command {
            Command::Quit => return (Response::Bye { turn: self.simulation.turn() }, Flow::Quit),
            Command::Advance { count } => self.advance(*count),
            Command::Snapshot => Response::State {
                snapshot: Box::new(self.simulation.snapshot()),
            },
            Command::History { resource, window } => {
                match self.simulation.resource_history(resource, *window) {
                    Ok(prices) => Response::History {
                        resource: resource.clone(),
                        prices: prices.to_vec(),
                    },
                    Err(e) => Response::error(e.to_string(), Some(name)),
                }
            }
            Command::Hash => Response::Hash {
                turn: self.simulation.turn(),
                hash: self.simulation.state_hash(),
            },
            Command::Save { path } => match self.simulation.save_to_path(path) {
                Ok(()) => Response::ack(name, None),
                Err(e) => Response::error(e.to_string(), Some(name)),
            },
            Command::Load { path } => self.load(Path::new(path)),
            _ => self.apply(command),
        };
        (response, Flow::Continue)
    }

    fn apply(&mut self, command: &Command) -> Response {
        let name = command.name();
        let core = match command.to_core(|index| self.simulation.building_id_at(index)) {
            Ok(Some(core)) => core,
            Ok(None) => return Response::error("Not an engine command", Some(name)),
            Err(e) => return Response::error(e.to_string(), Some(name)),
        };

        match self.simulation.apply(&core) {
            Ok(outcome) => {
                if let Some(replay) = &mut self.replay {
                    replay.record(core);
                }
                Response::ack(name, Some(outcome))
            }
            Err(e) => {
                tracing::debug!(cmd = name, error = %e, "Command rejected");
                Response::error(e.to_string(), Some(name))
            }
        }
    }

    fn advance(&mut self, count: u64) -> Response {
        if count > MAX_ADVANCE_COUNT {
            return Response::error(
                format!("advance count {count} exceeds the maximum of {MAX_ADVANCE_COUNT}"),
                Some("advance"),
            );
        }
        let reports = self.simulation.advance_turns(count);
        if let Some(replay) = &mut self.replay {
            for _ in 0..count {
                replay.record(CoreCommand::AdvanceTurn);
            }
        }
        Response::Turn {
            turn: self.simulation.turn(),
            capital: self.simulation.capital(),
            reports,
        }
    }

    fn load(&mut self, path: &Path) -> Response {
        let result = SaveDocument::read_from(path).and_then(|document| {
            self.simulation.load_document(document.clone())?;
            Ok(document)
        });

        match result {
            Ok(document) => {
                if let Some(replay) = &mut self.replay {
                    if let Err(e) = replay.record_load(&document) {
                        tracing::warn!(error = %e, "Load not recorded in replay");
                    }
                }
                Response::ack("load", None)
            }
            Err(e) => Response::error(e.to_string(), Some("load")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tycoon_core::catalog::EconomyRules;
    use tycoon_core::command::CommandOutcome;

    fn runner(record: bool) -> HeadlessRunner {
        let catalog =
            Arc::new(Catalog::standard().with_rules(EconomyRules::default().without_events()));
        let config = HeadlessConfig {
            seed: 3,
            record,
            ..HeadlessConfig::default()
        };
        HeadlessRunner::new(catalog, &config)
    }

    fn session(runner: &mut HeadlessRunner, input: &str) -> Vec<Response> {
        let mut output = Vec::new();
        runner.run(input.as_bytes(), &mut output).unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_session_greets_and_says_bye() {
        let responses = session(&mut runner(false), "");
        assert_eq!(responses.len(), 2);
        assert!(matches!(responses[0], Response::Ready { turn: 1, .. }));
        assert!(matches!(responses[1], Response::Bye { turn: 1 }));
    }

    #[test]
    fn test_build_then_advance() {
        let input = "{\"cmd\":\"build\",\"model\":\"madeira\"}\n{\"cmd\":\"advance\"}\n";
        let mut runner = runner(false);
        let responses = session(&mut runner, input);

        assert!(matches!(
            &responses[1],
            Response::Ack { outcome: Some(CommandOutcome::Built { .. }), .. }
        ));
        match &responses[2] {
            Response::Turn { turn, capital, reports } => {
                assert_eq!(*turn, 2);
                assert!((capital - 13_470.0).abs() < 1e-6);
                assert_eq!(reports.len(), 1);
            }
            other => panic!("expected turn, got {other:?}"),
        }
    }

    #[test]
    fn test_errors_do_not_end_the_session() {
        let input = "not json\n\
                     {\"cmd\":\"sell\",\"resource\":\"ouro\",\"amount\":6}\n\
                     {\"cmd\":\"upgrade\",\"index\":0}\n\
                     {\"cmd\":\"hash\"}\n";
        let responses = session(&mut runner(false), input);
        assert_eq!(responses.len(), 6);
        assert!(matches!(&responses[1], Response::Error { cmd: None, .. }));
        assert!(matches!(&responses[2], Response::Error { cmd: Some(c), .. } if c == "sell"));
        assert!(matches!(&responses[3], Response::Error { message, .. } if message.contains("index 0")));
        assert!(matches!(responses[4], Response::Hash { turn: 1, .. }));
    }

    #[test]
    fn test_quit_stops_reading() {
        let input = "{\"cmd\":\"quit\"}\n{\"cmd\":\"advance\"}\n";
        let mut runner = runner(false);
        let responses = session(&mut runner, input);
        assert_eq!(responses.len(), 2);
        assert_eq!(runner.simulation().turn(), 1);
    }

    #[test]
    fn test_history_and_snapshot() {
        let input = "{\"cmd\":\"advance\",\"count\":4}\n\
                     {\"cmd\":\"history\",\"resource\":\"cafe\",\"window\":3}\n\
                     {\"cmd\":\"snapshot\"}\n\
                     {\"cmd\":\"history\",\"resource\":\"platina\"}\n";
        let responses = session(&mut runner(false), input);
        assert!(matches!(&responses[2], Response::History { prices, .. } if prices.len() == 3));
        assert!(matches!(&responses[3], Response::State { snapshot } if snapshot.turn == 5));
        assert!(matches!(&responses[4], Response::Error { .. }));
    }

    #[test]
    fn test_recording_reproduces_session() {
        let input = "{\"cmd\":\"build\",\"model\":\"banco\"}\n\
                     {\"cmd\":\"buy\",\"resource\":\"ouro\",\"amount\":1000}\n\
                     {\"cmd\":\"advance\",\"count\":5}\n\
                     {\"cmd\":\"demolish\",\"index\":0}\n";
        let mut runner = runner(true);
        session(&mut runner, input);
        let hash = runner.simulation().state_hash();

        let replay = runner.into_replay().unwrap();
        assert_eq!(replay.step_count(), 7);
        assert_eq!(replay.final_hash, hash);
        let catalog =
            Arc::new(Catalog::standard().with_rules(EconomyRules::default().without_events()));
        assert_eq!(replay.verify(catalog).unwrap(), hash);
    }
}
