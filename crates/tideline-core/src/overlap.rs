//! Time-in-status and time-in-category aggregation.
//!
//! Each segment is clipped to the reporting window. The clipped duration is
//! added to the segment's status total and, in full, to every category the
//! status belongs to. A status in two categories therefore counts twice on
//! the category side, and category totals may exceed the window length.
//!
//! Totals are integer milliseconds and merge by addition, so per-issue
//! results can be reduced in any order.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::category::CategorySet;
use crate::error::{Diagnostic, DiagnosticCode};
use crate::segment::Segment;
use crate::time::{EpochMillis, ReportingWindow, millis_to_seconds};

/// Clipped duration of `segment` inside `window`, never negative.
#[must_use]
pub fn overlap_ms(segment: &Segment, window: &ReportingWindow) -> i64 {
    window.overlap_ms(segment.start, segment.end)
}

/// One segment's contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlapEntry {
    pub value: String,
    pub categories: Vec<String>,
    pub start: EpochMillis,
    pub end: EpochMillis,
    pub overlap_ms: i64,
}

/// Summed milliseconds per status and per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverlapTotals {
    pub status_ms: BTreeMap<String, i64>,
    pub category_ms: BTreeMap<String, i64>,
}

impl OverlapTotals {
    /// Add `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        for (status, ms) in &other.status_ms {
            *self.status_ms.entry(status.clone()).or_default() += ms;
        }
        for (category, ms) in &other.category_ms {
            *self.category_ms.entry(category.clone()).or_default() += ms;
        }
    }

    #[must_use]
    pub fn status_seconds(&self, status: &str) -> f64 {
        millis_to_seconds(self.status_ms.get(status).copied().unwrap_or(0))
    }

    #[must_use]
    pub fn category_seconds(&self, category: &str) -> f64 {
        millis_to_seconds(self.category_ms.get(category).copied().unwrap_or(0))
    }

    /// Sum over all statuses. Equals the window overlap of the timeline.
    #[must_use]
    pub fn total_status_ms(&self) -> i64 {
        self.status_ms.values().sum()
    }
}

/// Aggregation for a single entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OverlapSummary {
    pub totals: OverlapTotals,
    pub entries: Vec<OverlapEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Clip `segments` to `window` and accumulate status and category totals.
///
/// Statuses missing from `categories` still count under their literal name;
/// each such status is reported once.
#[must_use]
pub fn aggregate_overlap(
    segments: &[Segment],
    window: &ReportingWindow,
    categories: &CategorySet,
) -> OverlapSummary {
    let mut summary = OverlapSummary::default();
    let mut unknown: BTreeSet<&str> = BTreeSet::new();

    for segment in segments {
        let ms = overlap_ms(segment, window);
        if ms <= 0 {
            continue;
        }

        *summary
            .totals
            .status_ms
            .entry(segment.value.clone())
            .or_default() += ms;

        let cats = categories.categories_of(&segment.value);
        for category in cats {
            *summary
                .totals
                .category_ms
                .entry(category.clone())
                .or_default() += ms;
        }
        if !categories.is_known(&segment.value) && unknown.insert(segment.value.as_str()) {
            summary.diagnostics.push(Diagnostic::new(
                DiagnosticCode::UnknownStatus,
                Some(&segment.value),
                "counted under its literal name only",
            ));
        }

        summary.entries.push(OverlapEntry {
            value: segment.value.clone(),
            categories: cats.iter().cloned().collect(),
            start: segment.start,
            end: segment.end,
            overlap_ms: ms,
        });
    }

    summary
}
