//! Ideal completion curve.
//!
//! The guideline rises from zero at the period start to the final scope at
//! the period end, advancing only during working windows (`rate > 0`) and
//! holding flat across non-working ones (weekends, holidays).
//!
//! Rate windows are clamped to the period. Any part of the period that no
//! rate window covers is treated as working time.

use serde::{Deserialize, Serialize};

use crate::time::{EpochMillis, MILLIS_PER_DAY, is_weekend};

use super::series::SeriesPoint;

/// A working (`rate > 0`) or non-working (`rate == 0`) interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateWindow {
    pub start: EpochMillis,
    pub end: EpochMillis,
    pub rate: f64,
}

impl RateWindow {
    #[must_use]
    pub fn is_working(&self) -> bool {
        self.rate > 0.0
    }

    #[must_use]
    pub const fn duration_ms(&self) -> i64 {
        self.end - self.start
    }
}

/// Clamp `rates` to `[start, end]`, resolve overlaps in favor of the
/// earlier window, and fill uncovered stretches with working windows.
///
/// The result is sorted, gap-free, and spans exactly `[start, end]`.
#[must_use]
pub fn normalize_rate_windows(
    start: EpochMillis,
    end: EpochMillis,
    rates: &[RateWindow],
) -> Vec<RateWindow> {
    if end <= start {
        return Vec::new();
    }

    let mut sorted: Vec<RateWindow> = rates.to_vec();
    sorted.sort_by_key(|w| w.start);

    let mut out = Vec::with_capacity(sorted.len() + 2);
    let mut cursor = start;
    for window in sorted {
        let w_start = window.start.max(cursor);
        let w_end = window.end.min(end);
        if w_end <= w_start {
            continue;
        }
        if w_start > cursor {
            out.push(RateWindow {
                start: cursor,
                end: w_start,
                rate: 1.0,
            });
        }
        out.push(RateWindow {
            start: w_start,
            end: w_end,
            rate: window.rate,
        });
        cursor = w_end;
    }
    if cursor < end {
        out.push(RateWindow {
            start: cursor,
            end,
            rate: 1.0,
        });
    }
    out
}

/// Project the ideal completion curve for `final_scope` items.
///
/// Emits a point at `start` (zero) and one at the end of every normalized
/// rate window. Without any working time the curve stays at zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn project_guideline(
    final_scope: f64,
    start: EpochMillis,
    end: EpochMillis,
    rates: &[RateWindow],
) -> Vec<SeriesPoint> {
    let windows = normalize_rate_windows(start, end, rates);
    let working_ms: i64 = windows
        .iter()
        .filter(|w| w.is_working())
        .map(RateWindow::duration_ms)
        .sum();
    let per_ms = if working_ms > 0 {
        final_scope / working_ms as f64
    } else {
        0.0
    };

    let mut points = Vec::with_capacity(windows.len() + 1);
    points.push(SeriesPoint::new(start, 0.0));
    let mut worked_ms: i64 = 0;
    for window in &windows {
        if window.is_working() {
            worked_ms += window.duration_ms();
        }
        // Pin the end of the last working window to the exact final scope.
        let value = if working_ms > 0 && worked_ms == working_ms {
            final_scope
        } else {
            per_ms * worked_ms as f64
        };
        points.push(SeriesPoint::new(window.end, value));
    }
    points
}

/// Rate windows marking UTC Saturdays and Sundays as non-working.
///
/// Adjacent days with the same rate are merged into one window.
#[must_use]
pub fn weekday_rate_windows(start: EpochMillis, end: EpochMillis) -> Vec<RateWindow> {
    let mut out: Vec<RateWindow> = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next_midnight = cursor - cursor.rem_euclid(MILLIS_PER_DAY) + MILLIS_PER_DAY;
        let piece_end = next_midnight.min(end);
        let rate = if is_weekend(cursor) { 0.0 } else { 1.0 };
        match out.last_mut() {
            Some(last) if (last.rate - rate).abs() < f64::EPSILON => last.end = piece_end,
            _ => out.push(RateWindow {
                start: cursor,
                end: piece_end,
                rate,
            }),
        }
        cursor = piece_end;
    }
    out
}
