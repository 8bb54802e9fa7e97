//! Save files on disk.

use tempfile::TempDir;
use tycoon_core::error::GameError;
use tycoon_core::persistence::SaveDocument;
use tycoon_test_utils::fixtures::{developed_sim, standard_sim};

#[test]
fn test_json_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("save.json");

    let mut sim = developed_sim(21);
    sim.advance_turns(15);
    sim.save_to_path(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"capital\""));

    let mut restored = standard_sim(0);
    restored.load_from_path(&path).unwrap();
    assert_eq!(restored.to_document(), sim.to_document());
    assert_eq!(restored.state_hash(), sim.state_hash());
}

#[test]
fn test_ron_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("save.ron");

    let mut sim = standard_sim(8);
    sim.build("pesquisa").unwrap();
    sim.advance_turns(20);
    sim.save_to_path(&path).unwrap();

    let document = SaveDocument::read_from(&path).unwrap();
    assert_eq!(document, sim.to_document());

    let mut restored = standard_sim(8);
    restored.load_from_path(&path).unwrap();
    assert_eq!(restored.state_hash(), sim.state_hash());
}

#[test]
fn test_round_trip_keeps_every_part() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("full.json");

    let mut sim = developed_sim(2);
    sim.sell("ouro", 2).unwrap();
    sim.advance_turns(30);
    sim.save_to_path(&path).unwrap();

    let mut restored = standard_sim(99);
    restored.load_from_path(&path).unwrap();

    let (a, b) = (sim.state(), restored.state());
    assert!((a.capital - b.capital).abs() < f64::EPSILON);
    assert_eq!(a.turn, b.turn);
    assert_eq!(a.research_points, b.research_points);
    assert_eq!(a.resources, b.resources);
    assert_eq!(a.buildings, b.buildings);
    assert_eq!(a.statistics, b.statistics);
    assert_eq!(a.achievements, b.achievements);
}

#[test]
fn test_missing_file_is_persistence_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.json");

    let mut sim = standard_sim(1);
    let before = sim.state_hash();
    let result = sim.load_from_path(&path);
    assert!(matches!(result, Err(GameError::PersistenceError { .. })));
    assert_eq!(sim.state_hash(), before);
}

#[test]
fn test_garbage_file_is_persistence_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("garbage.json");
    std::fs::write(&path, "capital = lots").unwrap();

    let mut sim = standard_sim(1);
    let result = sim.load_from_path(&path);
    assert!(matches!(result, Err(GameError::PersistenceError { .. })));
}

#[test]
fn test_unwritable_path_is_persistence_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no_such_dir").join("save.json");

    let sim = standard_sim(1);
    assert!(matches!(
        sim.save_to_path(&path),
        Err(GameError::PersistenceError { .. })
    ));
}
