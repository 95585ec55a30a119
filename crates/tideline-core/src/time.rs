//! Timestamps, reporting windows, and lenient timestamp parsing.
//!
//! All instants are `i64` milliseconds since the Unix epoch. Durations stay
//! in integer milliseconds until a caller asks for seconds, so summing
//! totals across issues is exact regardless of merge order.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch.
pub type EpochMillis = i64;

pub const MILLIS_PER_SECOND: i64 = 1_000;
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Convert a millisecond duration to fractional seconds.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn millis_to_seconds(ms: i64) -> f64 {
    ms as f64 / MILLIS_PER_SECOND as f64
}

/// Parse a timestamp string as delivered by issue-tracker exports.
///
/// Accepted forms, tried in order:
/// - RFC 3339 (`2024-01-03T10:00:00Z`, `2024-01-03T10:00:00.000+00:00`)
/// - Jira's compact offset form (`2024-01-03T10:00:00.000+0000`)
/// - a bare calendar day (`2024-01-03`, read as midnight UTC)
/// - integer epoch milliseconds (`1704276000000`)
///
/// Returns `None` for anything else.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<EpochMillis> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.timestamp_millis());
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return day_start(day);
    }
    raw.parse::<i64>().ok()
}

/// Parse a timestamp from a JSON value (string or integer milliseconds).
#[must_use]
pub fn timestamp_from_value(value: &serde_json::Value) -> Option<EpochMillis> {
    match value {
        serde_json::Value::String(s) => parse_timestamp(s),
        serde_json::Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Render a timestamp as RFC 3339 for marker summaries and logs.
#[must_use]
pub fn format_timestamp(ts: EpochMillis) -> String {
    Utc.timestamp_millis_opt(ts)
        .single()
        .map_or_else(|| ts.to_string(), |dt| dt.to_rfc3339())
}

fn day_start(day: NaiveDate) -> Option<EpochMillis> {
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn day_last_second(day: NaiveDate) -> Option<EpochMillis> {
    day.and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc().timestamp_millis())
}

/// Errors building a [`ReportingWindow`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("invalid calendar day '{raw}': expected YYYY-MM-DD")]
    InvalidDay { raw: String },

    #[error("window end {end} precedes start {start}")]
    Inverted { start: EpochMillis, end: EpochMillis },
}

/// Inclusive reporting window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingWindow {
    pub start: EpochMillis,
    pub end: EpochMillis,
}

impl ReportingWindow {
    /// Build a window from raw bounds.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Inverted`] when `end < start`.
    pub const fn new(start: EpochMillis, end: EpochMillis) -> Result<Self, WindowError> {
        if end < start {
            return Err(WindowError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a window spanning whole calendar days: `00:00:00` of
    /// `start_day` through `23:59:59` of `end_day`, UTC.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::InvalidDay`] if either day fails to parse and
    /// [`WindowError::Inverted`] if `end_day` precedes `start_day`.
    pub fn from_days(start_day: &str, end_day: &str) -> Result<Self, WindowError> {
        let start = parse_day(start_day).and_then(day_start);
        let end = parse_day(end_day).and_then(day_last_second);
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            (None, _) => Err(WindowError::InvalidDay {
                raw: start_day.to_string(),
            }),
            (_, None) => Err(WindowError::InvalidDay {
                raw: end_day.to_string(),
            }),
        }
    }

    #[must_use]
    pub const fn duration_ms(&self) -> i64 {
        self.end - self.start
    }

    #[must_use]
    pub const fn contains(&self, ts: EpochMillis) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Length of `[start, end)` that falls inside the window, never negative.
    #[must_use]
    pub fn overlap_ms(&self, start: EpochMillis, end: EpochMillis) -> i64 {
        (end.min(self.end) - start.max(self.start)).max(0)
    }

    /// Midnight (UTC) of every calendar day touched by the window.
    #[must_use]
    pub fn day_starts(&self) -> Vec<EpochMillis> {
        let first = self.start - self.start.rem_euclid(MILLIS_PER_DAY);
        let mut days = Vec::new();
        let mut day = first;
        while day <= self.end {
            days.push(day);
            day += MILLIS_PER_DAY;
        }
        days
    }
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// True when the UTC calendar day containing `ts` is Saturday or Sunday.
#[must_use]
pub fn is_weekend(ts: EpochMillis) -> bool {
    Utc.timestamp_millis_opt(ts)
        .single()
        .is_some_and(|dt| matches!(dt.weekday(), Weekday::Sat | Weekday::Sun))
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAN_3_10AM: EpochMillis = 1_704_276_000_000;

    #[test]
    fn parses_all_supported_forms() {
        assert_eq!(parse_timestamp("2024-01-03T10:00:00Z"), Some(JAN_3_10AM));
        assert_eq!(parse_timestamp("2024-01-03T10:00:00.000+00:00"), Some(JAN_3_10AM));
        assert_eq!(parse_timestamp("2024-01-03T10:00:00.000+0000"), Some(JAN_3_10AM));
        assert_eq!(parse_timestamp("2024-01-03T12:00:00.000+0200"), Some(JAN_3_10AM));
        assert_eq!(parse_timestamp("1704276000000"), Some(JAN_3_10AM));
        assert_eq!(
            parse_timestamp("2024-01-03"),
            Some(JAN_3_10AM - 10 * 3_600_000)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }

    #[test]
    fn value_parsing_accepts_numbers_and_strings() {
        assert_eq!(
            timestamp_from_value(&serde_json::json!(JAN_3_10AM)),
            Some(JAN_3_10AM)
        );
        assert_eq!(
            timestamp_from_value(&serde_json::json!("2024-01-03T10:00:00Z")),
            Some(JAN_3_10AM)
        );
        assert_eq!(timestamp_from_value(&serde_json::json!(null)), None);
        assert_eq!(timestamp_from_value(&serde_json::json!(true)), None);
    }

    #[test]
    fn window_from_days_covers_full_days() {
        let w = ReportingWindow::from_days("2024-01-01", "2024-01-31").expect("valid window");
        assert_eq!(w.start, 1_704_067_200_000);
        assert_eq!(w.end, 1_706_745_599_000);
        assert_eq!(w.day_starts().len(), 31);
    }

    #[test]
    fn window_rejects_bad_input() {
        assert!(matches!(
            ReportingWindow::from_days("2024-01-31", "2024-01-01"),
            Err(WindowError::Inverted { .. })
        ));
        assert!(matches!(
            ReportingWindow::from_days("Jan 1", "2024-01-01"),
            Err(WindowError::InvalidDay { raw }) if raw == "Jan 1"
        ));
    }

    #[test]
    fn overlap_is_clamped() {
        let w = ReportingWindow::new(100, 200).expect("valid window");
        assert_eq!(w.overlap_ms(50, 150), 50);
        assert_eq!(w.overlap_ms(150, 400), 50);
        assert_eq!(w.overlap_ms(0, 50), 0);
        assert_eq!(w.overlap_ms(300, 250), 0);
    }

    #[test]
    fn weekend_detection() {
        // 2024-01-06 is a Saturday.
        let saturday = parse_timestamp("2024-01-06T12:00:00Z").expect("parse");
        let monday = parse_timestamp("2024-01-08T12:00:00Z").expect("parse");
        assert!(is_weekend(saturday));
        assert!(!is_weekend(monday));
    }
}
