//! # Session Segmentation
//!
//! Turns an unordered play-event log into discrete listening sessions.
//!
//! A session is a maximal run of events where no two consecutive events are
//! separated by the inactivity gap (30 minutes by default). Candidates with
//! fewer than the minimum number of events (3 by default) are discarded
//! outright: they are neither merged into neighbours nor padded.
//!
//! Segmentation is a pure function of its input. It sorts the events itself
//! (stable sort, so equal timestamps keep their input order), which makes the
//! result independent of the order the loader happened to read files in.

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::config::AnalysisConfig;
use crate::event::PlayEvent;

/// A maximal run of play events with no internal gap at or above the
/// threshold. Immutable once built.
#[derive(Debug, Clone)]
pub struct Session {
    /// Timestamp of the first event.
    pub start_time: DateTime<Utc>,
    /// Timestamp of the last event.
    pub end_time: DateTime<Utc>,
    /// Events in chronological order.
    pub events: Vec<PlayEvent>,
}

impl Session {
    fn from_events(events: Vec<PlayEvent>) -> Self {
        let start_time = events.first().map(|e| e.timestamp).unwrap_or_default();
        let end_time = events.last().map(|e| e.timestamp).unwrap_or_default();
        Self {
            start_time,
            end_time,
            events,
        }
    }

    /// Wall-clock span of the session in minutes.
    pub fn duration_minutes(&self) -> f64 {
        (self.end_time - self.start_time).num_seconds() as f64 / 60.0
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Platform of the first event, used when reporting assignments.
    pub fn platform(&self) -> &str {
        self.events
            .first()
            .map(|e| e.platform.as_str())
            .unwrap_or("")
    }
}

/// Split an unordered event log into retained sessions.
///
/// Steps: stable-sort by timestamp, scan once splitting wherever the gap to
/// the previous event reaches `session_gap_minutes`, close the final buffer,
/// then drop candidates shorter than `min_session_events`.
///
/// Empty input yields empty output. A single event forms a candidate of
/// length 1 and is filtered out.
pub fn segment(mut events: Vec<PlayEvent>, config: &AnalysisConfig) -> Vec<Session> {
    if events.is_empty() {
        return Vec::new();
    }

    events.sort_by_key(|e| e.timestamp);
    let gap = Duration::minutes(config.session_gap_minutes);

    let mut candidates: Vec<Vec<PlayEvent>> = Vec::new();
    let mut current: Vec<PlayEvent> = Vec::new();

    for event in events {
        match current.last() {
            Some(prev) if event.timestamp - prev.timestamp >= gap => {
                candidates.push(std::mem::take(&mut current));
                current.push(event);
            }
            _ => current.push(event),
        }
    }
    candidates.push(current);

    let total_candidates = candidates.len();
    let sessions: Vec<Session> = candidates
        .into_iter()
        .filter(|events| events.len() >= config.min_session_events)
        .map(Session::from_events)
        .collect();

    debug!(
        "Segmented {} session candidates, retained {} with >= {} events",
        total_candidates,
        sessions.len(),
        config.min_session_events
    );

    sessions
}
