//! Simulation benchmarks for tycoon_core.
//!
//! Run with: `cargo bench -p tycoon_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tycoon_core::catalog::Catalog;
use tycoon_core::simulation::Simulation;

/// A mid-game economy: one of every building, some upgraded.
fn developed_economy() -> Simulation {
    let catalog = Arc::new(Catalog::standard());
    let mut sim = Simulation::new(Arc::clone(&catalog), 7);
    sim.load_json(
        r#"{"capital": 1000000.0, "turn": 40, "research_points": 120}"#,
    )
    .ok();
    for model in catalog.models() {
        if let Ok(id) = sim.build(&model.key) {
            sim.upgrade(id).ok();
        }
    }
    sim
}

/// Runs simulation benchmarks for the tycoon_core crate.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("advance_turn_fresh", |b| {
        b.iter_batched(
            || Simulation::new(Arc::new(Catalog::standard()), 1),
            |mut sim| black_box(sim.advance_turn()),
            BatchSize::SmallInput,
        );
    });

    c.bench_function("advance_turn_developed", |b| {
        b.iter_batched(
            developed_economy,
            |mut sim| black_box(sim.advance_turn()),
            BatchSize::SmallInput,
        );
    });

    c.bench_function("advance_100_turns", |b| {
        b.iter_batched(
            developed_economy,
            |mut sim| black_box(sim.advance_turns(100)),
            BatchSize::SmallInput,
        );
    });

    c.bench_function("state_hash", |b| {
        let mut sim = developed_economy();
        sim.advance_turns(50);
        b.iter(|| black_box(sim.state_hash()));
    });

    c.bench_function("snapshot", |b| {
        let sim = developed_economy();
        b.iter(|| black_box(sim.snapshot()));
    });
}

criterion_group!(benches, simulation_benchmark);
criterion_main!(benches);
