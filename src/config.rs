//! # Configuration Module
//!
//! This module handles configuration management and data directory setup for
//! Replay. It provides platform-appropriate storage locations for the result
//! cache and the tunable parameters of the analysis pipeline.
//!
//! ## Data Storage
//!
//! Replay stores its cache database in the platform-standard data directory:
//! - Linux: `~/.local/share/replay/`
//! - macOS: `~/Library/Application Support/replay/`
//! - Windows: `%APPDATA%\replay\`
//!
//! ## Analysis Parameters
//!
//! All thresholds that govern segmentation and clustering live in
//! [`AnalysisConfig`] rather than being scattered as magic numbers:
//! - Session gap threshold and minimum session size
//! - Minimum session count before clustering is attempted
//! - Cluster count cap and k-means seed/iteration limits

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Returns the platform-appropriate cache database file path.
///
/// Locates the standard data directory for the current platform and creates
/// the Replay subdirectory if it doesn't exist. The database file is named
/// `replay.db` and stores cached cluster results keyed by event-log digest.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The replay subdirectory cannot be created due to permissions
/// - The filesystem is read-only
pub fn get_cache_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("replay.db"))
}

/// Returns the platform-appropriate data directory for Replay.
///
/// Creates the directory if it doesn't already exist.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let replay_dir = data_dir.join("replay");
    fs::create_dir_all(&replay_dir).with_context(|| {
        format!(
            "Failed to create Replay data directory at {}. Please check file permissions.",
            replay_dir.display()
        )
    })?;

    Ok(replay_dir)
}

/// Tunable parameters for session segmentation and clustering.
///
/// Every threshold the pipeline depends on is explicit here so that repeated
/// runs with the same configuration and the same event log are reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Inactivity gap (minutes) that closes a listening session.
    pub session_gap_minutes: i64,
    /// Sessions with fewer events than this are discarded.
    pub min_session_events: usize,
    /// Minimum number of qualifying sessions before clustering is attempted.
    pub min_sessions_for_clustering: usize,
    /// Hard cap on the candidate cluster counts searched.
    /// The effective upper bound is `min(max_clusters, n_sessions / 10)`.
    pub max_clusters: usize,
    /// Seed for k-means initialization. Fixed so repeated runs on identical
    /// input produce identical clusters.
    pub kmeans_seed: u64,
    /// Iteration limit for a single k-means fit.
    pub kmeans_max_iterations: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            session_gap_minutes: 30,
            min_session_events: 3,
            min_sessions_for_clustering: 10,
            max_clusters: 8,
            kmeans_seed: 42,
            kmeans_max_iterations: 100,
        }
    }
}
