//! Cross-issue reduction.
//!
//! Every field of [`FlowReport`] is a sum, so reports built from any
//! partition of the issues merge to the same totals in any order.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::DiagnosticCode;
use crate::flow::FlowTotals;
use crate::issue::{AnalysisRequest, IssueAnalysis, IssueRecord, analyze_issue};
use crate::overlap::OverlapTotals;
use crate::time::millis_to_seconds;

/// Summed per-issue results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowReport {
    pub overlap: OverlapTotals,
    pub flow: FlowTotals,
    /// Number of diagnostics raised, by code.
    pub diagnostics: BTreeMap<DiagnosticCode, u64>,
}

/// Per-issue means derived from a [`FlowReport`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlowAverages {
    pub lead_seconds: f64,
    pub cycle_seconds: f64,
    pub wait_seconds: f64,
    pub reopens_per_issue: f64,
    pub completion_rate: f64,
}

impl FlowReport {
    pub fn add(&mut self, analysis: &IssueAnalysis) {
        self.overlap.merge(&analysis.overlap.totals);
        self.flow.add(&analysis.flow);
        for diagnostic in &analysis.diagnostics {
            *self.diagnostics.entry(diagnostic.code).or_default() += 1;
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.overlap.merge(&other.overlap);
        self.flow.merge(&other.flow);
        for (code, count) in &other.diagnostics {
            *self.diagnostics.entry(*code).or_default() += count;
        }
    }

    #[must_use]
    pub const fn issues(&self) -> u64 {
        self.flow.issues
    }

    /// Seconds spent in `category` across all issues.
    #[must_use]
    pub fn category_seconds(&self, category: &str) -> f64 {
        self.overlap
            .category_ms
            .get(category)
            .copied()
            .map_or(0.0, millis_to_seconds)
    }

    /// Means per analyzed issue; all zero for an empty report.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn averages(&self) -> FlowAverages {
        if self.flow.issues == 0 {
            return FlowAverages::default();
        }
        let n = self.flow.issues as f64;
        let (lead_seconds, cycle_seconds, wait_seconds) = self.flow.mean_seconds();
        FlowAverages {
            lead_seconds,
            cycle_seconds,
            wait_seconds,
            reopens_per_issue: self.flow.reopens as f64 / n,
            completion_rate: self.flow.completed as f64 / n,
        }
    }
}

/// Analyze every issue and fold the results into one report.
#[must_use]
pub fn analyze_issues(issues: &[IssueRecord], request: &AnalysisRequest<'_>) -> FlowReport {
    let report = issues.iter().fold(FlowReport::default(), |mut report, issue| {
        report.add(&analyze_issue(issue, request));
        report
    });
    tracing::debug!(
        issues = report.issues(),
        completed = report.flow.completed,
        diagnostics = report.diagnostics.values().sum::<u64>(),
        "flow report built"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategorySet;
    use crate::changelog::{FieldDelta, Revision};
    use crate::config::AnalyticsConfig;
    use crate::time::{MILLIS_PER_DAY, ReportingWindow, parse_timestamp};

    fn issue(key: &str, created: &str, changes: &[(&str, &str, &str)]) -> IssueRecord {
        IssueRecord {
            key: key.into(),
            created: Some(serde_json::json!(created)),
            changelog: changes
                .iter()
                .map(|(at, from, to)| {
                    Revision::at(at, vec![FieldDelta::new("status", Some(from), Some(to))])
                })
                .collect(),
            ..IssueRecord::default()
        }
    }

    fn issues() -> Vec<IssueRecord> {
        vec![
            issue(
                "A-1",
                "2024-01-01",
                &[("2024-01-02", "Open", "Doing"), ("2024-01-05", "Doing", "Done")],
            ),
            issue(
                "A-2",
                "2024-01-01",
                &[
                    ("2024-01-03", "Open", "Done"),
                    ("2024-01-04", "Done", "Doing"),
                    ("2024-01-06", "Doing", "Done"),
                ],
            ),
            issue("A-3", "2024-01-01", &[("2024-01-02", "Open", "Triage")]),
        ]
    }

    fn config() -> AnalyticsConfig {
        AnalyticsConfig {
            categories: CategorySet::new()
                .with("Open", &["wait"])
                .with("Doing", &["work"])
                .with("Done", &["done"]),
            ..AnalyticsConfig::default()
        }
    }

    #[test]
    fn folds_issues_into_totals() {
        let config = config();
        let window = ReportingWindow::from_days("2024-01-01", "2024-01-10").expect("window");
        let now = parse_timestamp("2024-01-10").expect("now");
        let report = analyze_issues(&issues(), &AnalysisRequest::status(&config, window, now));

        assert_eq!(report.issues(), 3);
        assert_eq!(report.flow.completed, 2);
        assert_eq!(report.flow.reopens, 1);
        assert_eq!(report.diagnostics.get(&DiagnosticCode::UnknownStatus), Some(&1));
        // A-1 works Jan 2..5; A-2 works Jan 4..6 after its reopen.
        assert_eq!(report.overlap.category_ms["work"], 5 * MILLIS_PER_DAY);
        assert!((report.category_seconds("work") - 432_000.0).abs() < 1e-9);
    }

    #[test]
    fn merge_is_order_independent() {
        let config = config();
        let window = ReportingWindow::from_days("2024-01-01", "2024-01-10").expect("window");
        let now = parse_timestamp("2024-01-10").expect("now");
        let request = AnalysisRequest::status(&config, window, now);
        let all = issues();

        let whole = analyze_issues(&all, &request);
        let mut left = analyze_issues(&all[..1], &request);
        let right = analyze_issues(&all[1..], &request);
        let mut swapped = right.clone();
        swapped.merge(&left);
        left.merge(&right);

        assert_eq!(left, whole);
        assert_eq!(swapped, whole);
    }

    #[test]
    fn averages_of_empty_report_are_zero() {
        assert_eq!(FlowReport::default().averages(), FlowAverages::default());
    }

    #[test]
    fn averages_divide_by_issue_count() {
        let config = config();
        let window = ReportingWindow::from_days("2024-01-01", "2024-01-10").expect("window");
        let now = parse_timestamp("2024-01-10").expect("now");
        let report = analyze_issues(&issues()[..2], &AnalysisRequest::status(&config, window, now));
        let averages = report.averages();

        // Leads: A-1 four days, A-2 two days (first done on Jan 3).
        assert!((averages.lead_seconds - 3.0 * 86_400.0).abs() < 1e-9);
        assert!((averages.completion_rate - 1.0).abs() < f64::EPSILON);
        assert!((averages.reopens_per_issue - 0.5).abs() < f64::EPSILON);
    }
}
