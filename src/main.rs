//! # Replay - Listening Session Analysis
//!
//! Replay analyzes personal streaming-history exports: it segments the raw
//! play-event log into listening sessions, derives a behavioral feature
//! vector per session, and groups sessions into clusters with automatic
//! model-order selection.
//!
//! ## Architecture
//!
//! - `cli`: Command-line interface definitions
//! - `event`: Export parsing and the play-event record
//! - `session`: Gap-based session segmentation
//! - `features`: Per-session feature extraction
//! - `cluster`: Normalization, seeded k-means, silhouette model selection
//! - `report`: Summary / centroid / assignment query shapes
//! - `pipeline`: Per-invocation analysis context
//! - `cache`: Optional digest-keyed result cache
//!
//! ## Usage
//!
//! ```bash
//! # Cluster summary for an export directory
//! replay clusters ~/exports/spotify
//!
//! # Cluster centers in original units
//! replay centroids ~/exports/spotify
//!
//! # Recent sessions with labels
//! replay sessions ~/exports/spotify --limit 25
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::info;

use replay::cli;
use replay::completion;
use replay::config::{self, AnalysisConfig};
use replay::pipeline::AnalysisContext;
use replay::{cache, report};

/// Main entry point for the Replay application.
///
/// Initializes logging, parses command-line arguments, and routes commands
/// to the appropriate module functions.
///
/// # Logging
///
/// Initializes environment logger which can be controlled via `RUST_LOG`:
/// - `RUST_LOG=debug replay clusters DIR` - Enable debug logging
/// - `RUST_LOG=replay::cluster=trace replay clusters DIR` - Module-specific
fn main() -> Result<()> {
    // Initialize environment logger for debugging and monitoring
    env_logger::init();

    // Parse command-line arguments using Clap derive macros
    let args = cli::Args::parse();

    match args.command {
        cli::Command::Clusters { data_dir, no_cache } => {
            info!("Clustering sessions from: {}", data_dir.display());
            let ctx = AnalysisContext::load(&data_dir, AnalysisConfig::default())?;

            let json = if no_cache {
                serde_json::to_string_pretty(&ctx.summary())
                    .context("Failed to serialize cluster summary")?
            } else {
                let conn = cache::open(&config::get_cache_db_path()?)?;
                ctx.summary_cached(&conn)?
            };
            println!("{json}");
        }
        cli::Command::Centroids { data_dir } => {
            info!("Computing centroids from: {}", data_dir.display());
            let ctx = AnalysisContext::load(&data_dir, AnalysisConfig::default())?;

            match ctx.centroids() {
                Ok(centroids) => {
                    let json = serde_json::to_string_pretty(&centroids)
                        .context("Failed to serialize centroids")?;
                    println!("{json}");
                }
                Err(err) => {
                    // Informational, not a process failure.
                    let summary = report::build_empty_summary(&err);
                    let json = serde_json::to_string_pretty(&summary)
                        .context("Failed to serialize summary")?;
                    println!("{json}");
                }
            }
        }
        cli::Command::Sessions { data_dir, limit } => {
            info!("Listing session assignments from: {}", data_dir.display());
            let ctx = AnalysisContext::load(&data_dir, AnalysisConfig::default())?;

            match ctx.assignments(Some(limit)) {
                Ok(assignments) => {
                    let json = serde_json::to_string_pretty(&assignments)
                        .context("Failed to serialize assignments")?;
                    println!("{json}");
                }
                Err(err) => {
                    let summary = report::build_empty_summary(&err);
                    let json = serde_json::to_string_pretty(&summary)
                        .context("Failed to serialize summary")?;
                    println!("{json}");
                }
            }
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(&shell), &mut cmd);
        }
    }

    Ok(())
}
