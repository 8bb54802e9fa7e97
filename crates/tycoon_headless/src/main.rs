//! Headless economy game runner.
//!
//! This binary runs the game without any user interface, controlled via JSON
//! on stdin/stdout or played by scripted strategies.
//! Designed for controllers, batch balancing, and replay verification.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p tycoon_headless
//!
//! # Auto-play a single game and print the final snapshot
//! cargo run -p tycoon_headless -- run --strategy builder --turns 200 --seed 7
//!
//! # Run batch balance test
//! cargo run -p tycoon_headless -- batch --strategy trader --count 1000 --output results.json
//!
//! # Verify determinism of one seed
//! cargo run -p tycoon_headless -- verify --seed 12345 --runs 5
//!
//! # Re-run a recorded game
//! cargo run -p tycoon_headless -- replay --file game.replay
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tycoon_core::catalog::Catalog;
use tycoon_core::replay::Replay;

use tycoon_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    game_runner::{run_game, GameConfig},
    load_catalog,
    runner::{HeadlessConfig, HeadlessRunner},
    strategies::Strategy,
    HeadlessError, STANDARD_CATALOG,
};

#[derive(Parser)]
#[command(name = "tycoon_headless")]
#[command(about = "Headless economy game runner for scripted play and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Catalog RON file (default: the standard catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play interactively over JSON lines on stdin/stdout
    Play {
        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Write a replay of the session to this file at exit
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Auto-play one game with a scripted strategy
    Run {
        /// Turns to play
        #[arg(short, long, default_value = "100")]
        turns: u64,

        /// Random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Strategy: idle, builder, trader, or a .ron file
        #[arg(short, long, default_value = "builder")]
        strategy: String,

        /// Write a replay of the game to this file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Write the final snapshot here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a batch of games for balance testing
    Batch {
        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Turns per game
        #[arg(short, long, default_value = "100")]
        turns: u64,

        /// Strategy: idle, builder, trader, or a .ron file
        #[arg(short, long, default_value = "builder")]
        strategy: String,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Write full results here; the summary always goes to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify determinism by running same seed multiple times
    Verify {
        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Turns per run
        #[arg(short, long, default_value = "200")]
        turns: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Strategy: idle, builder, trader, or a .ron file
        #[arg(short, long, default_value = "builder")]
        strategy: String,
    },

    /// Re-run a recorded game and check its final hash
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let catalog_path = cli.catalog.as_deref();
    let result = match cli.command {
        Some(Commands::Play { seed, record }) => cmd_play(catalog_path, seed, record),
        Some(Commands::Run {
            turns,
            seed,
            strategy,
            record,
            output,
        }) => cmd_run(catalog_path, turns, seed, &strategy, record, output),
        Some(Commands::Batch {
            count,
            seed,
            turns,
            strategy,
            parallel,
            output,
        }) => {
            let config = BatchConfig {
                strategy,
                game_count: count,
                parallel_games: parallel,
                seed_start: seed,
                turns,
            };
            cmd_batch(catalog_path, config, output)
        }
        Some(Commands::Verify {
            seed,
            turns,
            runs,
            strategy,
        }) => cmd_verify(catalog_path, seed, turns, runs, &strategy),
        Some(Commands::Replay { file }) => cmd_replay(catalog_path, &file),
        None => cmd_play(catalog_path, 0, None),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

/// Play an interactive session on stdin/stdout
fn cmd_play(
    catalog_path: Option<&Path>,
    seed: u64,
    record: Option<PathBuf>,
) -> Result<(), HeadlessError> {
    let (catalog, origin) = load_catalog(catalog_path)?;
    tracing::info!(seed, "Starting interactive session");

    let config = HeadlessConfig {
        seed,
        catalog_origin: origin,
        record: record.is_some(),
    };
    let mut runner = HeadlessRunner::new(catalog, &config);
    let stdin = io::stdin();
    runner.run(stdin.lock(), io::stdout().lock())?;

    if let (Some(path), Some(replay)) = (record, runner.into_replay()) {
        replay.save(&path)?;
    }
    Ok(())
}

/// Auto-play one game and print its final snapshot
fn cmd_run(
    catalog_path: Option<&Path>,
    turns: u64,
    seed: u64,
    strategy: &str,
    record: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), HeadlessError> {
    let (catalog, origin) = load_catalog(catalog_path)?;
    let strategy = Strategy::resolve(strategy)?;
    tracing::info!(strategy = %strategy.name, seed, turns, "Running game");

    let mut config = GameConfig::new(seed, turns, strategy);
    if record.is_some() {
        config = config.with_recording(origin);
    }
    let result = run_game(catalog, config);

    tracing::info!(
        capital = result.metrics.final_capital,
        achievements = result.metrics.achievements_unlocked.len(),
        hash = result.metrics.final_state_hash,
        "Game finished"
    );

    if let (Some(path), Some(replay)) = (record, &result.replay) {
        replay.save(path)?;
    }

    let json = serde_json::to_string_pretty(&result.snapshot)?;
    write_output(output.as_deref(), &json)
}

/// Run a batch of games and print the summary
fn cmd_batch(
    catalog_path: Option<&Path>,
    config: BatchConfig,
    output: Option<PathBuf>,
) -> Result<(), HeadlessError> {
    let (catalog, _) = load_catalog(catalog_path)?;
    let results = run_batch(&catalog, config)?;

    if let Some(path) = &output {
        results.save(path)?;
        tracing::info!(path = %path.display(), "Saved batch results");
    }

    let json = serde_json::to_string_pretty(&results.summary)?;
    write_output(None, &json)
}

/// Verify determinism of one seed
fn cmd_verify(
    catalog_path: Option<&Path>,
    seed: u64,
    turns: u64,
    runs: u32,
    strategy: &str,
) -> Result<(), HeadlessError> {
    let (catalog, _) = load_catalog(catalog_path)?;
    let strategy = Strategy::resolve(strategy)?;
    tracing::info!(seed, turns, runs, strategy = %strategy.name, "Verifying determinism");

    let hash = verify_determinism(&catalog, &strategy, seed, turns, runs)
        .ok_or(HeadlessError::NonDeterministic { seed, turns })?;

    let json = serde_json::json!({
        "deterministic": true,
        "seed": seed,
        "turns": turns,
        "runs": runs,
        "hash": hash,
    });
    write_output(None, &json.to_string())
}

/// Re-run a recorded game
fn cmd_replay(catalog_path: Option<&Path>, file: &Path) -> Result<(), HeadlessError> {
    let replay = Replay::load(file)?;
    let catalog = match catalog_path {
        Some(_) => load_catalog(catalog_path)?.0,
        None if replay.catalog == STANDARD_CATALOG => Arc::new(Catalog::standard()),
        None => load_catalog(Some(Path::new(&replay.catalog)))?.0,
    };
    tracing::info!(
        file = %file.display(),
        steps = replay.step_count(),
        seed = replay.seed,
        "Verifying replay"
    );

    let hash = replay.verify(catalog)?;
    let json = serde_json::json!({
        "verified": true,
        "turn": replay.final_turn,
        "steps": replay.step_count(),
        "hash": hash,
    });
    write_output(None, &json.to_string())
}

/// Write a JSON document to a file, or to stdout when no path is given.
fn write_output(path: Option<&Path>, json: &str) -> Result<(), HeadlessError> {
    match path {
        Some(path) => std::fs::write(path, json)?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}
