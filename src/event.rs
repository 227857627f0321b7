//! # Play Event Loading
//!
//! This module defines the [`PlayEvent`] record consumed by the rest of the
//! pipeline and the loader that reads streaming-history JSON exports.
//!
//! ## Export Format
//!
//! A history export is a directory of `streaming_*.json` files, each holding
//! an array of playback records. Only a handful of fields matter to the
//! analysis: the end timestamp, played duration, track/artist names, the
//! playback platform, and the skip flag. Everything else in the export is
//! ignored.
//!
//! ## Malformed Records
//!
//! Records missing a timestamp or a played duration cannot be placed on the
//! session timeline and are dropped during loading. Drops are counted and
//! logged, never fatal: one bad record should not take down an analysis of
//! tens of thousands of good ones.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// A single playback record, already validated.
///
/// `timestamp` marks the instant the playback *ended*, matching the export's
/// `ts` field. The `skipped` flag is taken verbatim from the export and is
/// never re-derived from the played duration.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayEvent {
    /// When the playback ended.
    pub timestamp: DateTime<Utc>,
    /// Elapsed playback time in milliseconds.
    pub played_ms: i64,
    /// Track name; empty when the export omits it.
    pub track_id: String,
    /// Artist name; empty when the export omits it.
    pub artist_id: String,
    /// Device/app the stream was played on.
    pub platform: String,
    /// Whether the track was abandoned before natural completion.
    pub skipped: bool,
}

/// Raw export record as it appears on disk. All fields optional: real exports
/// contain podcast rows and partially-scrubbed entries.
#[derive(Debug, Deserialize)]
struct RawStreamRecord {
    ts: Option<DateTime<Utc>>,
    ms_played: Option<i64>,
    master_metadata_track_name: Option<String>,
    master_metadata_album_artist_name: Option<String>,
    platform: Option<String>,
    skipped: Option<bool>,
}

impl RawStreamRecord {
    /// Validate a raw record into a [`PlayEvent`], or `None` when the record
    /// is missing the fields the timeline depends on.
    fn validate(self) -> Option<PlayEvent> {
        let timestamp = self.ts?;
        let played_ms = self.ms_played?;

        Some(PlayEvent {
            timestamp,
            played_ms,
            track_id: self.master_metadata_track_name.unwrap_or_default(),
            artist_id: self.master_metadata_album_artist_name.unwrap_or_default(),
            platform: self.platform.unwrap_or_default(),
            skipped: self.skipped.unwrap_or(false),
        })
    }
}

/// Result of loading an export directory.
#[derive(Debug)]
pub struct LoadedEvents {
    /// All valid play events, in file order (unsorted).
    pub events: Vec<PlayEvent>,
    /// Number of records dropped for missing timestamp or duration.
    pub dropped: usize,
}

/// Load every `streaming_*.json` file under `data_dir`.
///
/// Files are read in lexicographic order for reproducibility, but no ordering
/// of the events themselves is guaranteed; the sessionizer sorts before
/// segmenting.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or a file fails to parse
/// as a JSON array of records. Individual malformed records are dropped and
/// counted, not treated as errors.
pub fn load_events(data_dir: &Path) -> Result<LoadedEvents> {
    let mut files: Vec<_> = fs::read_dir(data_dir)
        .with_context(|| format!("Failed to read export directory {}", data_dir.display()))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with("streaming_") && name.ends_with(".json"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        warn!(
            "No streaming_*.json files found in {}",
            data_dir.display()
        );
    }

    let mut events = Vec::new();
    let mut dropped = 0usize;

    for file in &files {
        let contents = fs::read_to_string(file)
            .with_context(|| format!("Failed to read export file {}", file.display()))?;

        let records: Vec<RawStreamRecord> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse export file {}", file.display()))?;

        debug!("{}: {} records", file.display(), records.len());

        for record in records {
            match record.validate() {
                Some(event) => events.push(event),
                None => dropped += 1,
            }
        }
    }

    if dropped > 0 {
        warn!("Dropped {dropped} records missing timestamp or duration");
    }
    info!(
        "Loaded {} play events from {} export files",
        events.len(),
        files.len()
    );

    Ok(LoadedEvents { events, dropped })
}
