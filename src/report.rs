//! # Report Assembly
//!
//! The read-only query shapes exposed to callers: cluster summary, centroid
//! list, and paged session assignments. These mirror the reporting layer's
//! JSON contract; the structs here serialize directly.
//!
//! Note the two distinct per-cluster views: [`ClusterProfile`] carries
//! arithmetic means of the raw feature values for human-readable display,
//! while the centroid list reports the geometric cluster centers computed in
//! normalized space and mapped back to original units. The two can differ
//! slightly and both are part of the contract.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cluster::{ClusterError, Clustering};
use crate::features::SessionFeatures;
use crate::session::Session;

/// Default number of assignments returned when the caller gives no limit.
pub const DEFAULT_ASSIGNMENT_LIMIT: usize = 100;
/// Hard bound on a single assignments page.
pub const MAX_ASSIGNMENT_LIMIT: usize = 500;

/// Human-readable aggregate statistics for one cluster.
///
/// All fields are arithmetic means of raw session values except
/// `common_hour` (the mode) and `session_count`.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterProfile {
    pub cluster_id: usize,
    pub session_count: usize,
    pub avg_duration: f64,
    pub avg_tracks: f64,
    pub avg_skip_ratio: f64,
    pub avg_diversity: f64,
    pub common_hour: u32,
    pub weekend_ratio: f64,
}

/// Top-level cluster summary, the primary reporting shape.
///
/// `error` is populated (and the other fields left empty) exactly when the
/// engine reported insufficient data.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterSummary {
    pub n_clusters: usize,
    pub total_sessions: usize,
    pub silhouette_score: f64,
    pub clusters: Vec<ClusterProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One cluster center in original feature units.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterCentroid {
    pub cluster_id: usize,
    pub features: SessionFeatures,
}

/// One retained session with its feature vector and cluster label.
#[derive(Debug, Clone, Serialize)]
pub struct SessionAssignment {
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
    #[serde(flatten)]
    pub features: SessionFeatures,
    pub platform: String,
    pub cluster_label: usize,
}

/// Aggregate raw feature values into per-cluster profiles.
///
/// `labels` and `features` are parallel; every label is in `[0, k)`.
pub fn build_profiles(
    features: &[SessionFeatures],
    labels: &[usize],
    k: usize,
) -> Vec<ClusterProfile> {
    (0..k)
        .map(|cluster_id| {
            let members: Vec<&SessionFeatures> = features
                .iter()
                .zip(labels.iter())
                .filter(|(_, &label)| label == cluster_id)
                .map(|(f, _)| f)
                .collect();

            let count = members.len();
            let n = count.max(1) as f64;
            let mean = |select: fn(&SessionFeatures) -> f64| -> f64 {
                members.iter().map(|f| select(f)).sum::<f64>() / n
            };

            // Mode of the start hour; earlier hour wins ties.
            let mut hour_counts = [0usize; 24];
            for f in &members {
                hour_counts[(f.hour_of_day as usize).min(23)] += 1;
            }
            let common_hour = hour_counts
                .iter()
                .enumerate()
                .max_by_key(|&(hour, &count)| (count, std::cmp::Reverse(hour)))
                .map(|(hour, _)| hour as u32)
                .unwrap_or(0);

            ClusterProfile {
                cluster_id,
                session_count: count,
                avg_duration: mean(|f| f.duration_minutes),
                avg_tracks: mean(|f| f.track_count),
                avg_skip_ratio: mean(|f| f.skip_ratio),
                avg_diversity: mean(|f| f.diversity_score),
                common_hour,
                weekend_ratio: mean(|f| f.is_weekend),
            }
        })
        .collect()
}

/// Assemble the summary for a successful clustering run.
pub fn build_summary(features: &[SessionFeatures], clustering: &Clustering) -> ClusterSummary {
    ClusterSummary {
        n_clusters: clustering.k,
        total_sessions: features.len(),
        silhouette_score: clustering.silhouette,
        clusters: build_profiles(features, &clustering.labels, clustering.k),
        error: None,
    }
}

/// Assemble the informational summary for an insufficient-data outcome.
pub fn build_empty_summary(error: &ClusterError) -> ClusterSummary {
    let found = match error {
        ClusterError::InsufficientData { found, .. } => *found,
    };
    ClusterSummary {
        n_clusters: 0,
        total_sessions: found,
        silhouette_score: 0.0,
        clusters: Vec::new(),
        error: Some(error.to_string()),
    }
}

/// Centroid list in original units, one entry per cluster.
pub fn build_centroids(clustering: &Clustering) -> Vec<ClusterCentroid> {
    clustering
        .centroids
        .iter()
        .enumerate()
        .map(|(cluster_id, features)| ClusterCentroid {
            cluster_id,
            features: features.clone(),
        })
        .collect()
}

/// Most-recent-first page of session assignments.
///
/// `limit` is clamped to `1..=500`; pass `None` for the default page size.
pub fn build_assignments(
    sessions: &[Session],
    features: &[SessionFeatures],
    labels: &[usize],
    limit: Option<usize>,
) -> Vec<SessionAssignment> {
    let limit = limit
        .unwrap_or(DEFAULT_ASSIGNMENT_LIMIT)
        .clamp(1, MAX_ASSIGNMENT_LIMIT);

    let mut assignments: Vec<SessionAssignment> = sessions
        .iter()
        .zip(features.iter())
        .zip(labels.iter())
        .map(|((session, features), &label)| SessionAssignment {
            session_start: session.start_time,
            session_end: session.end_time,
            features: features.clone(),
            platform: session.platform().to_string(),
            cluster_label: label,
        })
        .collect();

    assignments.sort_by(|a, b| b.session_start.cmp(&a.session_start));
    assignments.truncate(limit);
    assignments
}
