//! # Integration Tests for Replay
//!
//! End-to-end tests covering the full pipeline from export files on disk
//! through segmentation, feature extraction, clustering, and report
//! assembly, including the result cache.

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use replay::cache;
use replay::cluster::ClusterError;
use replay::config::AnalysisConfig;
use replay::event::PlayEvent;
use replay::pipeline::AnalysisContext;

/// Build one play event ending at `ts`.
fn event(ts: DateTime<Utc>, artist: &str, platform: &str, skipped: bool) -> PlayEvent {
    PlayEvent {
        timestamp: ts,
        played_ms: 150_000,
        track_id: format!("track-{}", ts.timestamp()),
        artist_id: artist.to_string(),
        platform: platform.to_string(),
        skipped,
    }
}

/// Synthetic log with two visibly distinct behavioral patterns: short
/// low-diversity morning sessions and long high-diversity evening sessions,
/// one of each per day.
fn two_pattern_log(days: i64) -> Vec<PlayEvent> {
    let mut events = Vec::new();
    for day in 0..days {
        // Weekdays only (2023-05-01 is a Monday), so the weekend flag does
        // not introduce structure beyond the two intended patterns.
        let offset = Duration::weeks(day / 5) + Duration::days(day % 5);
        let morning = Utc.with_ymd_and_hms(2023, 5, 1, 7, 30, 0).unwrap() + offset;
        for e in 0..4i64 {
            events.push(event(
                morning + Duration::minutes(2 * e),
                "commute-artist",
                "android",
                e % 2 == 0,
            ));
        }

        let evening = Utc.with_ymd_and_hms(2023, 5, 1, 20, 0, 0).unwrap() + offset;
        for e in 0..50i64 {
            events.push(event(
                evening + Duration::minutes(3 * e),
                &format!("evening-artist-{}", e % 25),
                "web",
                false,
            ));
        }
    }
    events
}

/// Write a synthetic export directory with the given events split across two
/// streaming files, plus one malformed record.
fn write_export(dir: &Path, events: &[PlayEvent]) -> Result<()> {
    let to_json = |chunk: &[PlayEvent]| -> serde_json::Value {
        chunk
            .iter()
            .map(|e| {
                serde_json::json!({
                    "ts": e.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                    "ms_played": e.played_ms,
                    "master_metadata_track_name": e.track_id,
                    "master_metadata_album_artist_name": e.artist_id,
                    "platform": e.platform,
                    "skipped": e.skipped,
                })
            })
            .collect()
    };

    let mid = events.len() / 2;
    fs::write(
        dir.join("streaming_2023_0.json"),
        serde_json::to_string(&to_json(&events[..mid]))?,
    )?;

    // Second file carries one record missing ms_played; it must be dropped
    // without affecting the rest.
    let mut second: Vec<serde_json::Value> = match to_json(&events[mid..]) {
        serde_json::Value::Array(records) => records,
        _ => unreachable!(),
    };
    second.push(serde_json::json!({"ts": "2023-05-01T00:00:00Z"}));
    fs::write(
        dir.join("streaming_2023_1.json"),
        serde_json::to_string(&second)?,
    )?;

    // A non-matching file that must be ignored.
    fs::write(dir.join("video_2023.json"), "[]")?;
    Ok(())
}

mod loader_tests {
    use super::*;

    #[test]
    fn test_export_loading_drops_malformed_and_ignores_other_files() -> Result<()> {
        let dir = TempDir::new()?;
        let events = two_pattern_log(3);
        write_export(dir.path(), &events)?;

        let ctx = AnalysisContext::load(dir.path(), AnalysisConfig::default())?;
        assert_eq!(ctx.dropped_events(), 1);
        assert_eq!(ctx.sessions().len(), 6, "two sessions per day over 3 days");
        Ok(())
    }

    #[test]
    fn test_empty_export_directory() -> Result<()> {
        let dir = TempDir::new()?;
        let ctx = AnalysisContext::load(dir.path(), AnalysisConfig::default())?;
        assert!(ctx.sessions().is_empty());

        let summary = ctx.summary();
        assert!(summary.error.is_some());
        assert_eq!(summary.total_sessions, 0);
        Ok(())
    }
}

mod segmentation_tests {
    use super::*;

    #[test]
    fn test_session_boundaries_respect_gap_threshold() {
        let config = AnalysisConfig::default();
        let ctx = AnalysisContext::new(two_pattern_log(5), config.clone());
        let gap = Duration::minutes(config.session_gap_minutes);

        for session in ctx.sessions() {
            assert!(session.event_count() >= config.min_session_events);
            for pair in session.events.windows(2) {
                assert!(pair[1].timestamp - pair[0].timestamp < gap);
            }
        }
        for pair in ctx.sessions().windows(2) {
            assert!(pair[1].start_time - pair[0].end_time >= gap);
        }
    }

    #[test]
    fn test_segmentation_idempotent_across_contexts() {
        let events = two_pattern_log(4);
        let a = AnalysisContext::new(events.clone(), AnalysisConfig::default());
        let b = AnalysisContext::new(events, AnalysisConfig::default());

        let bounds = |ctx: &AnalysisContext| -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
            ctx.sessions()
                .iter()
                .map(|s| (s.start_time, s.end_time))
                .collect()
        };
        assert_eq!(bounds(&a), bounds(&b));
    }
}

mod clustering_tests {
    use super::*;

    #[test]
    fn test_insufficient_data_at_nine_sessions() {
        // 9 sessions: 5 days of two patterns, with the final evening removed
        // and the final morning trimmed to exactly 3 events.
        let mut events = two_pattern_log(5);
        events.truncate(events.len() - 51);
        let ctx = AnalysisContext::new(events, AnalysisConfig::default());
        assert_eq!(ctx.sessions().len(), 9);

        assert!(matches!(
            ctx.cluster(),
            Err(ClusterError::InsufficientData {
                found: 9,
                required: 10
            })
        ));
        let summary = ctx.summary();
        assert!(summary.error.is_some());
    }

    #[test]
    fn test_ten_sessions_cluster_into_two_patterns() {
        let ctx = AnalysisContext::new(two_pattern_log(5), AnalysisConfig::default());
        assert_eq!(ctx.sessions().len(), 10);

        let clustering = ctx.cluster().expect("10 sessions should cluster");
        assert_eq!(clustering.k, 2);
        assert!(
            clustering.silhouette > 0.5,
            "distinct patterns should separate cleanly, got {}",
            clustering.silhouette
        );
    }

    #[test]
    fn test_thirty_sessions_profiles_reflect_pattern_means() {
        let ctx = AnalysisContext::new(two_pattern_log(15), AnalysisConfig::default());
        assert_eq!(ctx.sessions().len(), 30);

        let summary = ctx.summary();
        assert_eq!(summary.n_clusters, 2);

        let mut clusters = summary.clusters.clone();
        clusters.sort_by(|a, b| a.avg_duration.partial_cmp(&b.avg_duration).unwrap());

        // Morning pattern: 4 events over ~6 minutes, half skipped.
        assert_eq!(clusters[0].session_count, 15);
        assert!(clusters[0].avg_duration < 15.0);
        assert!(clusters[0].avg_skip_ratio > 0.4);
        assert_eq!(clusters[0].common_hour, 7);

        // Evening pattern: 50 events over ~147 minutes, no skips.
        assert_eq!(clusters[1].session_count, 15);
        assert!(clusters[1].avg_duration > 100.0);
        assert_eq!(clusters[1].avg_skip_ratio, 0.0);
        assert_eq!(clusters[1].common_hour, 20);
        assert!(clusters[1].avg_tracks > 40.0);
    }

    #[test]
    fn test_full_determinism_of_queries() {
        let events = two_pattern_log(12);
        let a = AnalysisContext::new(events.clone(), AnalysisConfig::default());
        let b = AnalysisContext::new(events, AnalysisConfig::default());

        let sa = serde_json::to_string(&a.summary()).unwrap();
        let sb = serde_json::to_string(&b.summary()).unwrap();
        assert_eq!(sa, sb);

        let ca = serde_json::to_string(&a.centroids().unwrap()).unwrap();
        let cb = serde_json::to_string(&b.centroids().unwrap()).unwrap();
        assert_eq!(ca, cb);

        let aa = serde_json::to_string(&a.assignments(None).unwrap()).unwrap();
        let ab = serde_json::to_string(&b.assignments(None).unwrap()).unwrap();
        assert_eq!(aa, ab);
    }

    #[test]
    fn test_assignments_cover_every_session() {
        let ctx = AnalysisContext::new(two_pattern_log(10), AnalysisConfig::default());
        let clustering = ctx.cluster().expect("should cluster");

        assert_eq!(clustering.labels.len(), ctx.sessions().len());
        assert!(clustering.labels.iter().all(|&l| l < clustering.k));

        let assignments = ctx.assignments(None).expect("should assign");
        assert_eq!(assignments.len(), 20);
        for pair in assignments.windows(2) {
            assert!(pair[0].session_start >= pair[1].session_start);
        }
        let limited = ctx.assignments(Some(7)).expect("should assign");
        assert_eq!(limited.len(), 7);
    }
}

mod cache_tests {
    use super::*;

    #[test]
    fn test_summary_cache_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let conn = cache::open(&dir.path().join("replay.db"))?;

        let ctx = AnalysisContext::new(two_pattern_log(8), AnalysisConfig::default());
        let first = ctx.summary_cached(&conn)?;
        let second = ctx.summary_cached(&conn)?;
        assert_eq!(first, second);

        // Cached entry is keyed on content; the stored row must match.
        let stored = cache::get(&conn, &ctx.digest())?.expect("entry should exist");
        assert_eq!(stored, first);

        // A different log produces a different digest and a fresh entry.
        let other = AnalysisContext::new(two_pattern_log(9), AnalysisConfig::default());
        assert_ne!(other.digest(), ctx.digest());
        assert!(cache::get(&conn, &other.digest())?.is_none());
        Ok(())
    }
}
