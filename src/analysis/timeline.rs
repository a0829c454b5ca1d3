//! Per-region text change timeline
//!
//! Records transitions, not readings: an event is appended only when a
//! region's non-blank text differs from the last text seen for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One change of detected text in a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// When the new text was first seen
    pub timestamp: DateTime<Utc>,
    /// The new text
    pub text: String,
}

/// Timeline as persisted in `timeline.json`, keyed by region index as a string
pub type PersistedTimeline = BTreeMap<String, Vec<TimelineEvent>>;

/// Tracks the last text per region and the append-only change log
#[derive(Debug, Default)]
pub struct TimelineTracker {
    last_text: HashMap<usize, String>,
    timeline: BTreeMap<usize, Vec<TimelineEvent>>,
}

impl TimelineTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one reading for `region`
    ///
    /// Returns `true` if an event was appended. Blank or absent readings
    /// leave the state untouched.
    pub fn observe(&mut self, region: usize, text: Option<&str>, timestamp: DateTime<Utc>) -> bool {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return false;
        };

        if self.last_text.get(&region).map(String::as_str) == Some(text) {
            return false;
        }

        self.last_text.insert(region, text.to_string());
        self.timeline.entry(region).or_default().push(TimelineEvent {
            timestamp,
            text: text.to_string(),
        });
        true
    }

    /// Last non-blank text seen for `region`
    pub fn last_text(&self, region: usize) -> Option<&str> {
        self.last_text.get(&region).map(String::as_str)
    }

    /// Events recorded for `region`, oldest first
    pub fn events(&self, region: usize) -> &[TimelineEvent] {
        self.timeline.get(&region).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total number of events across all regions
    pub fn event_count(&self) -> usize {
        self.timeline.values().map(Vec::len).sum()
    }

    /// Snapshot in the persisted shape; regions without events are omitted
    pub fn to_persisted(&self) -> PersistedTimeline {
        self.timeline
            .iter()
            .map(|(index, events)| (index.to_string(), events.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(second: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(second)
    }

    fn texts(tracker: &TimelineTracker, region: usize) -> Vec<&str> {
        tracker.events(region).iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn test_debounce_records_transitions_only() {
        let mut tracker = TimelineTracker::new();
        for (i, text) in ["A", "A", "A", "B", "B", "A"].iter().enumerate() {
            tracker.observe(0, Some(text), at(i as i64));
        }

        assert_eq!(texts(&tracker, 0), vec!["A", "B", "A"]);

        // Each event keeps the time the change was first seen
        let stamps: Vec<_> = tracker.events(0).iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![at(0), at(3), at(5)]);
    }

    #[test]
    fn test_blank_readings_are_ignored() {
        let mut tracker = TimelineTracker::new();

        assert!(!tracker.observe(0, None, at(0)));
        assert!(!tracker.observe(0, Some(""), at(1)));
        assert!(!tracker.observe(0, Some("   "), at(2)));
        assert!(tracker.events(0).is_empty());
        assert!(tracker.last_text(0).is_none());

        assert!(tracker.observe(0, Some("A"), at(3)));
        // Blank after a reading does not clear it, so A again is not a change
        assert!(!tracker.observe(0, None, at(4)));
        assert!(!tracker.observe(0, Some("A"), at(5)));

        assert_eq!(tracker.last_text(0), Some("A"));
        assert_eq!(texts(&tracker, 0), vec!["A"]);
    }

    #[test]
    fn test_regions_are_independent() {
        let mut tracker = TimelineTracker::new();
        tracker.observe(0, Some("A"), at(0));
        tracker.observe(1, Some("A"), at(0));
        tracker.observe(1, Some("B"), at(1));

        assert_eq!(texts(&tracker, 0), vec!["A"]);
        assert_eq!(texts(&tracker, 1), vec!["A", "B"]);
        assert_eq!(tracker.event_count(), 3);
    }

    #[test]
    fn test_persisted_shape_skips_silent_regions() {
        let mut tracker = TimelineTracker::new();
        // Region 0: blank then A
        tracker.observe(0, None, at(0));
        tracker.observe(0, Some("A"), at(1));
        // Region 1: blank throughout
        tracker.observe(1, None, at(0));
        tracker.observe(1, None, at(1));
        // Region 2: X -> Y -> X
        tracker.observe(2, Some("X"), at(0));
        tracker.observe(2, Some("Y"), at(1));
        tracker.observe(2, Some("X"), at(2));

        let persisted = tracker.to_persisted();
        let keys: Vec<_> = persisted.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["0", "2"]);
        assert_eq!(persisted["0"].len(), 1);
        assert_eq!(persisted["2"].len(), 3);
    }

    #[test]
    fn test_event_serializes_iso_timestamp() {
        let event = TimelineEvent {
            timestamp: at(0),
            text: "Sample Text A".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["text"], "Sample Text A");
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00Z");
    }
}
