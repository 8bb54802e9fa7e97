//! End-to-end protocol sessions.
//!
//! Drives a [`HeadlessRunner`] through in-memory buffers the way the
//! binary drives it through stdin/stdout.

use std::io::Cursor;

use tempfile::TempDir;
use tycoon_core::replay::Replay;
use tycoon_headless::runner::{HeadlessConfig, HeadlessRunner};
use tycoon_headless::protocol::MAX_ADVANCE_COUNT;
use tycoon_headless::Response;
use tycoon_test_utils::fixtures::{quiet_catalog, standard_catalog};

fn play(runner: &mut HeadlessRunner, lines: &[String]) -> Vec<Response> {
    let input = lines.join("\n");
    let mut output = Vec::new();
    runner.run(Cursor::new(input), &mut output).unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn config(seed: u64, record: bool) -> HeadlessConfig {
    HeadlessConfig {
        seed,
        record,
        ..HeadlessConfig::default()
    }
}

// ==========================================================================
// Save and Load
// ==========================================================================

#[test]
fn test_save_and_load_through_protocol() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("game.json");
    let path = path.display().to_string();

    let mut first = HeadlessRunner::new(quiet_catalog(), &config(1, false));
    let responses = play(
        &mut first,
        &[
            r#"{"cmd":"build","model":"madeira"}"#.to_string(),
            r#"{"cmd":"advance","count":3}"#.to_string(),
            format!(r#"{{"cmd":"save","path":"{path}"}}"#),
            r#"{"cmd":"hash"}"#.to_string(),
        ],
    );
    assert!(matches!(&responses[3], Response::Ack { cmd, .. } if cmd == "save"));
    let Response::Hash { hash: saved_hash, .. } = responses[4] else {
        panic!("expected hash, got {:?}", responses[4]);
    };

    let mut second = HeadlessRunner::new(quiet_catalog(), &config(2, false));
    let responses = play(
        &mut second,
        &[
            format!(r#"{{"cmd":"load","path":"{path}"}}"#),
            r#"{"cmd":"hash"}"#.to_string(),
        ],
    );
    assert!(matches!(&responses[1], Response::Ack { cmd, .. } if cmd == "load"));
    assert!(matches!(responses[2], Response::Hash { turn: 4, hash } if hash == saved_hash));
}

#[test]
fn test_failed_load_reports_error_and_keeps_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.json").display().to_string();

    let mut runner = HeadlessRunner::new(standard_catalog(), &config(5, false));
    let before = runner.simulation().state_hash();
    let responses = play(&mut runner, &[format!(r#"{{"cmd":"load","path":"{path}"}}"#)]);

    assert!(matches!(&responses[1], Response::Error { cmd: Some(c), .. } if c == "load"));
    assert_eq!(runner.simulation().state_hash(), before);
}

// ==========================================================================
// Recording
// ==========================================================================

#[test]
fn test_recorded_session_replays_from_file() {
    let dir = TempDir::new().unwrap();
    let save = dir.path().join("mid.ron").display().to_string();
    let replay_path = dir.path().join("session.replay");

    let mut runner = HeadlessRunner::new(standard_catalog(), &config(42, true));
    play(
        &mut runner,
        &[
            r#"{"cmd":"build","model":"metal"}"#.to_string(),
            r#"{"cmd":"advance","count":10}"#.to_string(),
            format!(r#"{{"cmd":"save","path":"{save}"}}"#),
            r#"{"cmd":"upgrade","index":0}"#.to_string(),
            r#"{"cmd":"advance","count":5}"#.to_string(),
            format!(r#"{{"cmd":"load","path":"{save}"}}"#),
            r#"{"cmd":"sell_all"}"#.to_string(),
            r#"{"cmd":"advance","count":5}"#.to_string(),
            r#"{"cmd":"quit"}"#.to_string(),
        ],
    );
    let hash = runner.simulation().state_hash();

    let replay = runner.into_replay().unwrap();
    replay.save(&replay_path).unwrap();

    let loaded = Replay::load(&replay_path).unwrap();
    assert_eq!(loaded.final_hash, hash);
    assert_eq!(loaded.verify(standard_catalog()).unwrap(), hash);
}

// ==========================================================================
// Limits
// ==========================================================================

#[test]
fn test_oversized_advance_is_refused() {
    let mut runner = HeadlessRunner::new(quiet_catalog(), &config(4, true));
    let responses = play(
        &mut runner,
        &[
            r#"{"cmd":"advance","count":18446744073709551615}"#.to_string(),
            format!(r#"{{"cmd":"advance","count":{}}}"#, MAX_ADVANCE_COUNT + 1),
            r#"{"cmd":"advance","count":2}"#.to_string(),
            r#"{"cmd":"quit"}"#.to_string(),
        ],
    );

    assert_eq!(responses.len(), 5);
    for refused in &responses[1..3] {
        assert!(matches!(
            refused,
            Response::Error { cmd: Some(c), message } if c == "advance" && message.contains("maximum")
        ));
    }
    assert!(matches!(&responses[3], Response::Turn { turn: 3, reports, .. } if reports.len() == 2));
    assert!(matches!(responses[4], Response::Bye { turn: 3 }));
    assert_eq!(runner.into_replay().unwrap().step_count(), 2);
}
