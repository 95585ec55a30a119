//! Timeline segmentation.
//!
//! Turns an ordered list of [`ChangeEvent`]s into contiguous value
//! intervals. Each segment is half-open `[start, end)`; adjacent segments
//! share their boundary, so the union of an entity's segments covers
//! `[creation, cutoff]` without gaps or overlaps.

use serde::{Deserialize, Serialize};

use crate::changelog::ChangeEvent;
use crate::time::{EpochMillis, millis_to_seconds};

/// A maximal interval during which a field held one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Field value; empty when the value could not be determined.
    pub value: String,
    pub start: EpochMillis,
    pub end: EpochMillis,
}

impl Segment {
    #[must_use]
    pub const fn duration_ms(&self) -> i64 {
        self.end - self.start
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        millis_to_seconds(self.duration_ms())
    }
}

/// Lifecycle bounds of an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub created: Option<EpochMillis>,
    pub resolved: Option<EpochMillis>,
    pub updated: Option<EpochMillis>,
}

impl Lifecycle {
    /// Where an entity's timeline stops: resolution, else last update,
    /// else `now`.
    #[must_use]
    pub fn cutoff(&self, now: EpochMillis) -> EpochMillis {
        self.resolved.or(self.updated).unwrap_or(now)
    }
}

/// Segment `events` (already sorted ascending by `at`).
///
/// * `initial`: the value at creation; when `None` (or empty) it is taken
///   from the first event's `from`.
/// * `created`: the creation instant; when `None` the first event's `at`,
///   which leaves a zero-length leading segment for the initial value.
/// * `cutoff`: the end of the final segment.
///
/// An event with an empty `to` keeps the previous value. The trailing
/// segment is emitted only when `cutoff >= ` its start; an earlier cutoff
/// silently truncates the timeline.
#[must_use]
pub fn segment_timeline(
    events: &[ChangeEvent],
    initial: Option<&str>,
    created: Option<EpochMillis>,
    cutoff: EpochMillis,
) -> Vec<Segment> {
    let first = events.first();
    let mut current = initial
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| first.and_then(|e| e.from.clone()))
        .unwrap_or_default();
    let mut current_start = created.or_else(|| first.map(|e| e.at));

    let mut segments = Vec::with_capacity(events.len() + 1);

    for event in events {
        if let Some(start) = current_start {
            segments.push(Segment {
                value: current.clone(),
                start,
                end: event.at,
            });
        }
        if let Some(to) = event.to.as_deref().filter(|v| !v.is_empty()) {
            current = to.to_string();
        }
        current_start = Some(event.at);
    }

    if let Some(start) = current_start {
        if cutoff >= start {
            segments.push(Segment {
                value: current,
                start,
                end: cutoff,
            });
        } else {
            tracing::trace!(start, cutoff, "cutoff precedes last change; trailing segment dropped");
        }
    }

    segments
}

/// True when every adjacent pair shares its boundary.
#[must_use]
pub fn is_contiguous(segments: &[Segment]) -> bool {
    segments.windows(2).all(|pair| pair[0].end == pair[1].start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(from: Option<&str>, to: Option<&str>, at: EpochMillis) -> ChangeEvent {
        ChangeEvent {
            field: "status".into(),
            from: from.map(str::to_string),
            to: to.map(str::to_string),
            at,
        }
    }

    fn values(segments: &[Segment]) -> Vec<(&str, EpochMillis, EpochMillis)> {
        segments
            .iter()
            .map(|s| (s.value.as_str(), s.start, s.end))
            .collect()
    }

    #[test]
    fn zero_events_yield_one_segment() {
        let segs = segment_timeline(&[], Some("Open"), Some(10), 100);
        assert_eq!(values(&segs), [("Open", 10, 100)]);
        assert!((segs[0].duration_seconds() - 0.09).abs() < 1e-9);
    }

    #[test]
    fn zero_events_without_creation_yield_nothing() {
        assert!(segment_timeline(&[], Some("Open"), None, 100).is_empty());
    }

    #[test]
    fn events_split_the_timeline() {
        let events = [
            ev(Some("Open"), Some("In Progress"), 30),
            ev(Some("In Progress"), Some("Done"), 70),
        ];
        let segs = segment_timeline(&events, None, Some(10), 100);
        assert_eq!(
            values(&segs),
            [("Open", 10, 30), ("In Progress", 30, 70), ("Done", 70, 100)]
        );
        assert!(is_contiguous(&segs));
    }

    #[test]
    fn missing_creation_starts_at_first_event() {
        let events = [ev(Some("Open"), Some("Done"), 30)];
        let segs = segment_timeline(&events, None, None, 100);
        assert_eq!(values(&segs), [("Open", 30, 30), ("Done", 30, 100)]);
        assert_eq!(segs[0].duration_ms(), 0);
        assert!(is_contiguous(&segs));
    }

    #[test]
    fn empty_target_keeps_previous_value() {
        let events = [ev(Some("Open"), None, 30), ev(None, Some(""), 50)];
        let segs = segment_timeline(&events, Some("Open"), Some(10), 100);
        assert_eq!(
            values(&segs),
            [("Open", 10, 30), ("Open", 30, 50), ("Open", 50, 100)]
        );
    }

    #[test]
    fn early_cutoff_drops_trailing_segment() {
        let events = [ev(Some("Open"), Some("Done"), 80)];
        let segs = segment_timeline(&events, None, Some(10), 50);
        assert_eq!(values(&segs), [("Open", 10, 80)]);
    }

    #[test]
    fn cutoff_equal_to_last_change_emits_empty_segment() {
        let events = [ev(Some("Open"), Some("Done"), 80)];
        let segs = segment_timeline(&events, None, Some(10), 80);
        assert_eq!(values(&segs), [("Open", 10, 80), ("Done", 80, 80)]);
    }

    #[test]
    fn lifecycle_cutoff_priority() {
        let both = Lifecycle {
            created: Some(0),
            resolved: Some(50),
            updated: Some(90),
        };
        assert_eq!(both.cutoff(1_000), 50);
        let updated_only = Lifecycle {
            resolved: None,
            ..both
        };
        assert_eq!(updated_only.cutoff(1_000), 90);
        assert_eq!(Lifecycle::default().cutoff(1_000), 1_000);
    }
}
