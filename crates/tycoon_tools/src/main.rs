//! Tycoon - Development Tools

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tycoon-tools")]
#[command(about = "Development tools for the economy game")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate catalog files
    Validate {
        /// Catalog file, or directory searched for .ron files
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },

    /// Write the standard catalog as RON
    Export {
        /// Output file
        #[arg(default_value = "catalog.ron")]
        path: PathBuf,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { path } => {
            tracing::info!("Validating data files in: {}", path.display());
            match tycoon_tools::validate::validate_data_path(&path) {
                Ok(report) if report.is_ok() => {
                    tracing::info!(files = report.checked(), "Validation passed");
                }
                Ok(report) => {
                    tracing::error!(
                        failed = report.failed.len(),
                        files = report.checked(),
                        "Validation failed"
                    );
                    std::process::exit(1);
                }
                Err(e) => {
                    tracing::error!("Validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Export { path } => {
            match tycoon_tools::validate::export_standard_catalog(&path) {
                Ok(()) => tracing::info!("Wrote standard catalog to {}", path.display()),
                Err(e) => {
                    tracing::error!("Export failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
