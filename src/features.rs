//! # Session Feature Extraction
//!
//! Reduces a [`Session`] to the fixed 8-dimensional numeric summary used for
//! clustering. The dimension order is part of the contract: normalization,
//! distance computation, and centroid reporting all index the same vector
//! layout, so [`FEATURE_DIM`], [`FEATURE_NAMES`], [`SessionFeatures::to_vector`]
//! and [`SessionFeatures::from_vector`] must stay in lockstep.

use chrono::{Datelike, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::session::Session;

/// Number of feature dimensions. Fixed by the clustering contract.
pub const FEATURE_DIM: usize = 8;

/// Dimension names in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_DIM] = [
    "duration_minutes",
    "track_count",
    "unique_artist_count",
    "skip_ratio",
    "avg_track_duration",
    "hour_of_day",
    "is_weekend",
    "diversity_score",
];

/// The 8-dimensional behavioral summary of one listening session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFeatures {
    /// Wall-clock span of the session in minutes.
    pub duration_minutes: f64,
    /// Number of events in the session.
    pub track_count: f64,
    /// Count of distinct artist identifiers.
    pub unique_artist_count: f64,
    /// Fraction of events flagged as skipped, in [0, 1].
    pub skip_ratio: f64,
    /// Mean played duration per event, in minutes.
    pub avg_track_duration: f64,
    /// Hour (0-23) of the session start.
    pub hour_of_day: f64,
    /// 1.0 when the session starts on Saturday or Sunday, else 0.0.
    pub is_weekend: f64,
    /// unique_artist_count / track_count, in (0, 1].
    pub diversity_score: f64,
}

impl SessionFeatures {
    /// Flatten into the fixed-order vector used for clustering.
    pub fn to_vector(&self) -> [f64; FEATURE_DIM] {
        [
            self.duration_minutes,
            self.track_count,
            self.unique_artist_count,
            self.skip_ratio,
            self.avg_track_duration,
            self.hour_of_day,
            self.is_weekend,
            self.diversity_score,
        ]
    }

    /// Rebuild from a fixed-order vector, e.g. a denormalized centroid.
    pub fn from_vector(v: &[f64; FEATURE_DIM]) -> Self {
        Self {
            duration_minutes: v[0],
            track_count: v[1],
            unique_artist_count: v[2],
            skip_ratio: v[3],
            avg_track_duration: v[4],
            hour_of_day: v[5],
            is_weekend: v[6],
            diversity_score: v[7],
        }
    }
}

/// Compute the feature vector for a retained session. Pure.
///
/// The caller guarantees the session passed the minimum-size filter, so
/// `track_count >= 3` and the diversity denominator is never zero. Empty
/// artist identifiers count as one shared "unknown" identity, which keeps
/// `unique_artist_count >= 1`.
pub fn extract(session: &Session) -> SessionFeatures {
    let track_count = session.event_count() as f64;

    let unique_artists: HashSet<&str> = session
        .events
        .iter()
        .map(|e| e.artist_id.as_str())
        .collect();
    let unique_artist_count = unique_artists.len() as f64;

    let skip_count = session.events.iter().filter(|e| e.skipped).count() as f64;

    let total_played_ms: i64 = session.events.iter().map(|e| e.played_ms).sum();
    let avg_track_duration = total_played_ms as f64 / track_count / 60_000.0;

    let start = session.start_time;
    let is_weekend = matches!(start.weekday(), Weekday::Sat | Weekday::Sun);

    SessionFeatures {
        duration_minutes: session.duration_minutes(),
        track_count,
        unique_artist_count,
        skip_ratio: skip_count / track_count,
        avg_track_duration,
        hour_of_day: f64::from(start.hour()),
        is_weekend: if is_weekend { 1.0 } else { 0.0 },
        diversity_score: unique_artist_count / track_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::event::PlayEvent;
    use crate::session::segment;
    use chrono::{TimeZone, Utc};

    fn session_from(events: Vec<PlayEvent>) -> Session {
        let mut sessions = segment(events, &AnalysisConfig::default());
        assert_eq!(sessions.len(), 1, "test events should form one session");
        sessions.remove(0)
    }

    fn event(minute: u32, artist: &str, skipped: bool) -> PlayEvent {
        PlayEvent {
            // 2023-04-01 is a Saturday.
            timestamp: Utc.with_ymd_and_hms(2023, 4, 1, 21, minute, 0).unwrap(),
            played_ms: 120_000,
            track_id: format!("t{minute}"),
            artist_id: artist.to_string(),
            platform: "web".to_string(),
            skipped,
        }
    }

    #[test]
    fn test_extract_basic_features() {
        let session = session_from(vec![
            event(0, "a", false),
            event(5, "b", true),
            event(10, "a", false),
            event(15, "c", false),
        ]);

        let features = extract(&session);
        assert_eq!(features.duration_minutes, 15.0);
        assert_eq!(features.track_count, 4.0);
        assert_eq!(features.unique_artist_count, 3.0);
        assert_eq!(features.skip_ratio, 0.25);
        assert_eq!(features.avg_track_duration, 2.0);
        assert_eq!(features.hour_of_day, 21.0);
        assert_eq!(features.is_weekend, 1.0, "2023-04-01 is a Saturday");
        assert_eq!(features.diversity_score, 0.75);
    }

    #[test]
    fn test_weekday_session() {
        let monday = Utc.with_ymd_and_hms(2023, 4, 3, 8, 0, 0).unwrap();
        let events: Vec<PlayEvent> = (0..3)
            .map(|i| PlayEvent {
                timestamp: monday + chrono::Duration::minutes(i * 4),
                ..event(0, "a", false)
            })
            .collect();

        let features = extract(&session_from(events));
        assert_eq!(features.is_weekend, 0.0);
        assert_eq!(features.hour_of_day, 8.0);
    }

    #[test]
    fn test_empty_artist_ids_share_one_identity() {
        let session = session_from(vec![
            event(0, "", false),
            event(3, "", false),
            event(6, "", false),
        ]);

        let features = extract(&session);
        assert_eq!(features.unique_artist_count, 1.0);
        assert!(features.diversity_score > 0.0);
    }

    #[test]
    fn test_vector_round_trip_preserves_order() {
        let session = session_from(vec![
            event(0, "a", false),
            event(5, "b", false),
            event(10, "c", true),
        ]);

        let features = extract(&session);
        let vector = features.to_vector();
        assert_eq!(vector.len(), FEATURE_DIM);
        assert_eq!(SessionFeatures::from_vector(&vector), features);

        // Spot-check the documented ordering.
        assert_eq!(vector[0], features.duration_minutes);
        assert_eq!(vector[3], features.skip_ratio);
        assert_eq!(vector[7], features.diversity_score);
    }

    #[test]
    fn test_feature_names_match_dim() {
        assert_eq!(FEATURE_NAMES.len(), FEATURE_DIM);
    }
}
