//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and batch comparisons rely on a game being exactly reproducible
//! from its seed and command stream. Sources of non-determinism include:
//!
//! - **Unseeded randomness**: every draw must come from the generator the
//!   simulation owns, never from `thread_rng` or the clock.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Resources, buildings and achievements are iterated in list order.
//!
//! - **Float formatting**: save files must round-trip every price and
//!   balance bit for bit.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual commands and turn steps
//! 2. **Property tests**: random command streams still produce deterministic outputs
//! 3. **Integration tests**: full games are reproducible and replayable
//! 4. **Parallel tests**: running N simulations in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use tycoon_core::command::Command;
use tycoon_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of turns simulated.
    pub turns: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Turns: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `turns` - Number of steps to take per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one step
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use tycoon_test_utils::determinism::verify_determinism;
/// use tycoon_test_utils::fixtures::standard_sim;
///
/// let result = verify_determinism(
///     3,
///     20,
///     || standard_sim(42),
///     |sim| {
///         sim.advance_turn();
///     },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    turns: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..turns {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        turns,
    }
}

/// Run a game twice from the same setup and compare final hashes.
pub fn verify_simulation_determinism<F>(setup_fn: F, turns: u64) -> bool
where
    F: Fn() -> Simulation,
{
    verify_determinism(
        2,
        turns,
        &setup_fn,
        |sim| {
            sim.advance_turn();
        },
        |sim| sim.state_hash(),
    )
    .is_deterministic
}

/// Apply the same command stream to games from the same setup and compare
/// final hashes. Failed commands are part of the stream.
pub fn verify_command_determinism<F>(
    setup_fn: F,
    commands: &[Command],
    runs: usize,
) -> DeterminismResult
where
    F: Fn() -> Simulation,
{
    let mut hashes = Vec::with_capacity(runs);
    let mut turns = 0;
    for _ in 0..runs {
        let mut sim = setup_fn();
        let start = sim.turn();
        for command in commands {
            let _ = sim.apply(command);
        }
        turns = sim.turn() - start;
        hashes.push(sim.state_hash());
    }

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        turns,
    }
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling
/// variations or shared global state.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, turns: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    sim.advance_turns(turns);
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_default())
            .collect::<Vec<u64>>()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        turns,
    }
}

/// Compare two runs turn by turn, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs stay identical, `Some(turn_index)` at the first
/// step whose hashes differ (0 for the initial state).
pub fn find_first_divergence<F>(setup_fn: F, turns: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for turn in 1..=turns {
        sim1.advance_turn();
        sim2.advance_turn();

        if sim1.state_hash() != sim2.state_hash() {
            return Some(turn);
        }
    }

    None
}

/// Verify that a JSON save round trip preserves the state hash exactly.
pub fn verify_save_round_trip<F>(setup_fn: F, turns: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();
    sim.advance_turns(turns);
    let hash_before = sim.state_hash();

    let Ok(text) = sim.save_json() else {
        return false;
    };

    let mut restored = setup_fn();
    if restored.load_json(&text).is_err() {
        return false;
    }

    restored.state_hash() == hash_before
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for simulation testing.
///
/// These strategies generate random but reproducible command streams
/// against the standard catalog.
pub mod strategies {
    use proptest::prelude::*;
    use tycoon_core::buildings::BuildingId;
    use tycoon_core::command::Command;

    /// Resource keys of the standard catalog.
    pub const RESOURCE_KEYS: [&str; 6] =
        ["madeira", "metal", "cafe", "energia", "petroleo", "ouro"];

    /// Building model keys of the standard catalog.
    pub const MODEL_KEYS: [&str; 8] = [
        "madeira", "metal", "energia", "cafe", "petroleo", "ouro", "pesquisa", "banco",
    ];

    /// Any standard resource key.
    pub fn arb_resource() -> impl Strategy<Value = String> {
        proptest::sample::select(&RESOURCE_KEYS[..]).prop_map(str::to_string)
    }

    /// Any standard model key.
    pub fn arb_model() -> impl Strategy<Value = String> {
        proptest::sample::select(&MODEL_KEYS[..]).prop_map(str::to_string)
    }

    /// A trade amount, occasionally zero or far more than affordable.
    pub fn arb_amount() -> impl Strategy<Value = u64> {
        prop_oneof![
            8 => 1u64..200,
            1 => Just(0u64),
            1 => 1_000u64..100_000,
        ]
    }

    /// A building ID among the first few a game hands out.
    pub fn arb_building_id() -> impl Strategy<Value = BuildingId> {
        (1u64..12).prop_map(BuildingId)
    }

    /// Any single command, weighted towards turns and construction.
    pub fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            3 => (arb_resource(), arb_amount())
                .prop_map(|(resource, amount)| Command::Buy { resource, amount }),
            3 => (arb_resource(), arb_amount())
                .prop_map(|(resource, amount)| Command::Sell { resource, amount }),
            1 => Just(Command::SellAll),
            3 => arb_model().prop_map(|model| Command::Build { model }),
            2 => arb_building_id().prop_map(|building| Command::Upgrade { building }),
            1 => arb_building_id().prop_map(|building| Command::Demolish { building }),
            5 => Just(Command::AdvanceTurn),
        ]
    }

    /// A sequence of commands.
    pub fn arb_command_sequence(max_len: usize) -> impl Strategy<Value = Vec<Command>> {
        prop::collection::vec(arb_command(), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use crate::fixtures::{developed_sim, quiet_sim, standard_sim};
    use proptest::prelude::*;

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(
            3,
            25,
            || standard_sim(1),
            |s| {
                s.advance_turn();
            },
            |s| s.state_hash(),
        );
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }

    #[test]
    fn test_simulation_determinism_developed() {
        assert!(verify_simulation_determinism(|| developed_sim(9), 40));
    }

    #[test]
    fn test_find_divergence_on_deterministic_sim() {
        assert_eq!(find_first_divergence(|| standard_sim(3), 30), None);
    }

    #[test]
    fn test_find_divergence_detects_different_seeds() {
        use std::sync::atomic::{AtomicU64, Ordering};
        let counter = AtomicU64::new(0);
        let divergence = find_first_divergence(
            || standard_sim(counter.fetch_add(1, Ordering::Relaxed)),
            10,
        );
        assert_eq!(divergence, Some(1));
    }

    #[test]
    fn test_save_round_trip_preserves_hash() {
        assert!(verify_save_round_trip(|| developed_sim(4), 12));
        assert!(verify_save_round_trip(|| standard_sim(4), 0));
    }

    #[test]
    fn test_parallel_simulations_match() {
        run_parallel_simulations(|| developed_sim(77), 4, 30).assert_deterministic();
    }

    #[test]
    fn test_compute_hash_is_stable() {
        assert_eq!(compute_hash(&"tycoon"), compute_hash(&"tycoon"));
        assert_ne!(compute_hash(&1u64), compute_hash(&2u64));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_command_streams_are_deterministic(commands in arb_command_sequence(60)) {
            let result = verify_command_determinism(|| quiet_sim(5), &commands, 2);
            prop_assert!(result.is_deterministic, "hashes: {:?}", result.hashes);
        }
    }
}
