//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Replay using Clap
//! derive macros. It provides a type-safe way to parse command-line
//! arguments and route them to appropriate functionality.
//!
//! ## Commands
//!
//! - `clusters`: Analyze sessions and print the cluster summary
//! - `centroids`: Print cluster centers in original feature units
//! - `sessions`: Print recent sessions with their cluster assignments
//! - `completion`: Generate shell completion scripts
//!
//! ## Examples
//!
//! ```bash
//! replay clusters ~/exports/spotify
//! replay sessions ~/exports/spotify --limit 25
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// Uses Clap derive macros to automatically generate argument parsing,
/// help text, and validation. All functionality is accessed through
/// subcommands.
#[derive(Parser)]
#[command(name = "replay")]
#[command(about = "Replay: listening session analysis for streaming history exports")]
#[command(version)]
pub struct Args {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Cluster listening sessions and print the summary
    ///
    /// Segments the export into listening sessions, clusters their
    /// behavioral features, and prints per-cluster statistical profiles as
    /// JSON. With fewer than 10 qualifying sessions the summary carries an
    /// informational `error` field instead of cluster data.
    Clusters {
        /// Directory containing the streaming_*.json export files
        data_dir: PathBuf,

        /// Recompute even when a cached result exists for this export
        #[arg(long)]
        no_cache: bool,
    },

    /// Print cluster centroids in original feature units
    ///
    /// Each centroid is the center of one behavioral cluster, mapped back
    /// from normalized feature space to minutes, counts, and ratios. Useful
    /// for profile visualization; distinct from the summary's raw-value
    /// averages.
    Centroids {
        /// Directory containing the streaming_*.json export files
        data_dir: PathBuf,
    },

    /// Print recent sessions with their cluster assignments
    ///
    /// Lists retained sessions most-recent-first with the full feature
    /// vector, playback platform, and assigned cluster label.
    Sessions {
        /// Directory containing the streaming_*.json export files
        data_dir: PathBuf,

        /// Maximum number of sessions to print (1-500)
        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Generate shell completions
    ///
    /// Generates completion scripts for various shells to enable tab
    /// completion of commands and options.
    ///
    /// Usage: replay completion bash > ~/.local/share/bash-completion/completions/replay
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
