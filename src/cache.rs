//! # Result Cache
//!
//! Optional SQLite store mapping an event-log digest to the serialized
//! cluster summary. The cache key is content-derived: ingesting new events
//! changes the digest, so stale entries are simply never read again. The
//! core pipeline stays stateless; this store is the only persisted artifact.

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, trace};
use rusqlite::{Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::event::PlayEvent;

/// Open (and initialize) the cache database at `path`.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open cache database at {}", path.display()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cluster_cache (
            digest     TEXT PRIMARY KEY,
            summary    TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        (),
    )
    .context("Failed to create cluster cache table")?;

    Ok(conn)
}

/// Content digest of an event log.
///
/// Events are hashed in chronological order over the fields the pipeline
/// consumes, so two logs that differ only in fields the analysis ignores
/// share a digest.
pub fn event_log_digest(events: &[PlayEvent]) -> String {
    let mut ordered: Vec<&PlayEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut hasher = Sha256::new();
    for event in ordered {
        hasher.update(event.timestamp.timestamp_millis().to_le_bytes());
        hasher.update(event.played_ms.to_le_bytes());
        hasher.update(event.track_id.as_bytes());
        hasher.update([0]);
        hasher.update(event.artist_id.as_bytes());
        hasher.update([0]);
        hasher.update(event.platform.as_bytes());
        hasher.update([u8::from(event.skipped)]);
    }

    format!("{:x}", hasher.finalize())
}

/// Look up a cached summary by digest.
pub fn get(conn: &Connection, digest: &str) -> Result<Option<String>> {
    let summary = conn
        .query_row(
            "SELECT summary FROM cluster_cache WHERE digest = ?1",
            [digest],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to query cluster cache")?;

    trace!(
        "Cache {} for digest {digest}",
        if summary.is_some() { "hit" } else { "miss" }
    );
    Ok(summary)
}

/// Store a summary under its digest, replacing any previous entry.
pub fn put(conn: &Connection, digest: &str, summary: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO cluster_cache (digest, summary, created_at)
         VALUES (?1, ?2, ?3)",
        (digest, summary, Utc::now().to_rfc3339()),
    )
    .context("Failed to write cluster cache entry")?;

    debug!("Cached cluster summary under digest {digest}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(minute: u32, artist: &str) -> PlayEvent {
        PlayEvent {
            timestamp: Utc.with_ymd_and_hms(2023, 4, 1, 10, minute, 0).unwrap(),
            played_ms: 120_000,
            track_id: "t".to_string(),
            artist_id: artist.to_string(),
            platform: "web".to_string(),
            skipped: false,
        }
    }

    #[test]
    fn test_digest_is_order_independent() {
        let a = vec![event(0, "x"), event(5, "y")];
        let b = vec![event(5, "y"), event(0, "x")];

        assert_eq!(event_log_digest(&a), event_log_digest(&b));
    }

    #[test]
    fn test_digest_changes_with_content() {
        let a = vec![event(0, "x")];
        let b = vec![event(0, "y")];
        let c = vec![event(0, "x"), event(5, "x")];

        assert_ne!(event_log_digest(&a), event_log_digest(&b));
        assert_ne!(event_log_digest(&a), event_log_digest(&c));
    }

    #[test]
    fn test_put_then_get_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let conn = open(&dir.path().join("cache.db"))?;

        assert!(get(&conn, "abc")?.is_none());

        put(&conn, "abc", r#"{"n_clusters":2}"#)?;
        assert_eq!(get(&conn, "abc")?.as_deref(), Some(r#"{"n_clusters":2}"#));

        put(&conn, "abc", r#"{"n_clusters":3}"#)?;
        assert_eq!(get(&conn, "abc")?.as_deref(), Some(r#"{"n_clusters":3}"#));
        Ok(())
    }
}
