//! # Analysis Pipeline
//!
//! Glue between the loader, the sessionizer, and the cluster engine. The
//! [`AnalysisContext`] holds one immutable snapshot of the event log plus the
//! configuration; there is no shared mutable state, so separate contexts can
//! run concurrently. Clustering recomputes from the snapshot on every call;
//! the optional cache short-circuits only the summary query.

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;
use std::path::Path;

use crate::cache;
use crate::cluster::{ClusterEngine, ClusterError, Clustering};
use crate::config::AnalysisConfig;
use crate::event::{self, PlayEvent};
use crate::features::{self, SessionFeatures};
use crate::report::{self, ClusterCentroid, ClusterSummary, SessionAssignment};
use crate::session::{self, Session};

/// One pipeline invocation: an event snapshot, its derived sessions and
/// features, and the configuration they were derived with.
#[derive(Debug)]
pub struct AnalysisContext {
    config: AnalysisConfig,
    events: Vec<PlayEvent>,
    dropped_events: usize,
    sessions: Vec<Session>,
    features: Vec<SessionFeatures>,
}

impl AnalysisContext {
    /// Build a context from an already-loaded event snapshot. Segmentation
    /// and feature extraction run eagerly; clustering runs per query.
    #[must_use]
    pub fn new(events: Vec<PlayEvent>, config: AnalysisConfig) -> Self {
        Self::with_dropped(events, 0, config)
    }

    fn with_dropped(events: Vec<PlayEvent>, dropped_events: usize, config: AnalysisConfig) -> Self {
        let sessions = session::segment(events.clone(), &config);
        let features: Vec<SessionFeatures> = sessions.iter().map(features::extract).collect();

        info!(
            "Pipeline ready: {} events, {} retained sessions",
            events.len(),
            sessions.len()
        );

        Self {
            config,
            events,
            dropped_events,
            sessions,
            features,
        }
    }

    /// Load a streaming-history export directory into a fresh context.
    pub fn load(data_dir: &Path, config: AnalysisConfig) -> Result<Self> {
        let loaded = event::load_events(data_dir)
            .with_context(|| format!("Failed to load export from {}", data_dir.display()))?;
        Ok(Self::with_dropped(loaded.events, loaded.dropped, config))
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn features(&self) -> &[SessionFeatures] {
        &self.features
    }

    /// Records dropped by the loader for missing timestamp or duration.
    pub fn dropped_events(&self) -> usize {
        self.dropped_events
    }

    /// Content digest of the event snapshot, used as the cache key.
    pub fn digest(&self) -> String {
        cache::event_log_digest(&self.events)
    }

    /// Run the cluster engine over the session features.
    pub fn cluster(&self) -> Result<Clustering, ClusterError> {
        ClusterEngine::new(self.config.clone()).cluster(&self.features)
    }

    /// Cluster summary; insufficient data becomes an informational summary
    /// with the `error` field set, never a failure.
    pub fn summary(&self) -> ClusterSummary {
        match self.cluster() {
            Ok(clustering) => report::build_summary(&self.features, &clustering),
            Err(err) => report::build_empty_summary(&err),
        }
    }

    /// Summary with cache lookup: returns the stored JSON when the event-log
    /// digest matches, otherwise computes, stores, and returns fresh JSON.
    pub fn summary_cached(&self, conn: &Connection) -> Result<String> {
        let digest = self.digest();
        if let Some(cached) = cache::get(conn, &digest)? {
            debug!("Returning cached cluster summary");
            return Ok(cached);
        }

        let json = serde_json::to_string_pretty(&self.summary())
            .context("Failed to serialize cluster summary")?;
        cache::put(conn, &digest, &json)?;
        Ok(json)
    }

    /// Centroid list in original units.
    pub fn centroids(&self) -> Result<Vec<ClusterCentroid>, ClusterError> {
        Ok(report::build_centroids(&self.cluster()?))
    }

    /// Most-recent-first page of session assignments.
    pub fn assignments(&self, limit: Option<usize>) -> Result<Vec<SessionAssignment>, ClusterError> {
        let clustering = self.cluster()?;
        Ok(report::build_assignments(
            &self.sessions,
            &self.features,
            &clustering.labels,
            limit,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    /// Synthetic log with two behavioral patterns, enough sessions to
    /// cluster: short morning sessions and long evening ones.
    fn two_pattern_events(sessions_per_pattern: usize) -> Vec<PlayEvent> {
        let mut events = Vec::new();
        for day in 0..sessions_per_pattern as i64 {
            // Weekdays only (2023-04-03 is a Monday) so the weekend flag
            // stays constant and the two patterns are the only structure.
            let offset = Duration::weeks(day / 5) + Duration::days(day % 5);
            let base = Utc.with_ymd_and_hms(2023, 4, 3, 8, 0, 0).unwrap() + offset;
            for e in 0..3i64 {
                events.push(PlayEvent {
                    timestamp: base + Duration::minutes(2 * e),
                    played_ms: 90_000,
                    track_id: format!("short-{day}-{e}"),
                    artist_id: "pop".to_string(),
                    platform: "android".to_string(),
                    skipped: e == 2,
                });
            }

            let evening = base + Duration::hours(13);
            for e in 0..60i64 {
                events.push(PlayEvent {
                    timestamp: evening + Duration::minutes(3 * e),
                    played_ms: 180_000,
                    track_id: format!("long-{day}-{e}"),
                    artist_id: format!("artist-{}", e % 20),
                    platform: "web".to_string(),
                    skipped: false,
                });
            }
        }
        events
    }

    #[test]
    fn test_pipeline_end_to_end_two_patterns() {
        let ctx = AnalysisContext::new(two_pattern_events(15), AnalysisConfig::default());
        assert_eq!(ctx.sessions().len(), 30);

        let summary = ctx.summary();
        assert!(summary.error.is_none());
        assert_eq!(summary.n_clusters, 2);
        assert_eq!(summary.total_sessions, 30);

        let mut avg_durations: Vec<f64> =
            summary.clusters.iter().map(|c| c.avg_duration).collect();
        avg_durations.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!(avg_durations[0] < 10.0, "short pattern mean ~4min");
        assert!(avg_durations[1] > 150.0, "long pattern mean ~177min");
    }

    #[test]
    fn test_pipeline_insufficient_data_is_informational() {
        let ctx = AnalysisContext::new(two_pattern_events(2), AnalysisConfig::default());
        assert_eq!(ctx.sessions().len(), 4);

        let summary = ctx.summary();
        assert!(summary.error.is_some());
        assert_eq!(summary.n_clusters, 0);
        assert_eq!(summary.total_sessions, 4);

        assert!(matches!(
            ctx.centroids(),
            Err(ClusterError::InsufficientData { found: 4, .. })
        ));
    }

    #[test]
    fn test_digest_stable_across_contexts() {
        let events = two_pattern_events(3);
        let a = AnalysisContext::new(events.clone(), AnalysisConfig::default());
        let b = AnalysisContext::new(events, AnalysisConfig::default());
        assert_eq!(a.digest(), b.digest());
    }
}
