//! Step-function series and change markers for burndown charts.

use serde::Serialize;

use crate::error::Diagnostic;
use crate::time::EpochMillis;

/// One sample of a step function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub timestamp: EpochMillis,
    pub value: f64,
}

impl SeriesPoint {
    #[must_use]
    pub const fn new(timestamp: EpochMillis, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// What moved an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerOperation {
    Added,
    Removed,
    Completed,
    Reopened,
}

impl MarkerOperation {
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Added => "added to scope",
            Self::Removed => "removed from scope",
            Self::Completed => "completed",
            Self::Reopened => "reopened",
        }
    }
}

/// A point where an aggregate actually changed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub timestamp: EpochMillis,
    pub key: String,
    pub from: f64,
    pub to: f64,
    pub operation: MarkerOperation,
    pub summary: String,
}

impl Marker {
    #[must_use]
    pub fn new(
        timestamp: EpochMillis,
        key: &str,
        from: f64,
        to: f64,
        operation: MarkerOperation,
    ) -> Self {
        Self {
            timestamp,
            key: key.to_string(),
            from,
            to,
            operation,
            summary: format!("{key} {}: {from} -> {to}", operation.verb()),
        }
    }
}

/// Markers split by the aggregate they moved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarkerSet {
    pub scope: Vec<Marker>,
    pub done: Vec<Marker>,
}

/// Which reconstruction produced a [`Burndown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesSource {
    /// Event-accurate replay of the scope-change feed.
    Replay,
    /// Day-granular reconstruction from issue histories.
    Daily,
}

/// Chart-ready scope, completed, and guideline series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Burndown {
    pub source: SeriesSource,
    pub scope: Vec<SeriesPoint>,
    pub completed: Vec<SeriesPoint>,
    pub guideline: Vec<SeriesPoint>,
    pub markers: MarkerSet,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Last value at or before `ts`, if any point qualifies.
#[must_use]
pub fn value_at(points: &[SeriesPoint], ts: EpochMillis) -> Option<f64> {
    points
        .iter()
        .take_while(|p| p.timestamp <= ts)
        .last()
        .map(|p| p.value)
}

/// Append a point at `end` holding the last value, unless the series
/// already reaches it.
pub fn close_at(series: &mut Vec<SeriesPoint>, end: EpochMillis) {
    if let Some(last) = series.last().copied() {
        if last.timestamp < end {
            series.push(SeriesPoint::new(end, last.value));
        }
    }
}

/// Drop points after `now` and close the series with a point at `now`.
///
/// Values after `now` are projections rather than facts, so they must not
/// be drawn as completed history. No point is appended when nothing is
/// known at or before `now`.
#[must_use]
pub fn clip_to_now(points: &[SeriesPoint], now: EpochMillis) -> Vec<SeriesPoint> {
    let mut clipped: Vec<SeriesPoint> = points
        .iter()
        .copied()
        .take_while(|p| p.timestamp <= now)
        .collect();
    if let Some(last) = clipped.last().copied() {
        if last.timestamp < now {
            clipped.push(SeriesPoint::new(now, last.value));
        }
    }
    clipped
}
