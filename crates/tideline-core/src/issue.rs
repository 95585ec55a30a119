//! Per-issue pipeline: changelog → events → segments → overlap and flow.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::CategorySet;
use crate::changelog::{Revision, extract_field_events};
use crate::config::AnalyticsConfig;
use crate::error::{Diagnostic, DiagnosticCode};
use crate::flow::{FlowCategories, FlowMetrics, compute_flow};
use crate::overlap::{OverlapSummary, aggregate_overlap};
use crate::scope::daily::{SprintMember, WorkLog};
use crate::segment::{Lifecycle, Segment, segment_timeline};
use crate::time::{EpochMillis, ReportingWindow, timestamp_from_value};
use crate::timing::timed;

/// An issue as delivered by the tracker export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRecord {
    pub key: String,
    /// Current field values by field name.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub created: Option<serde_json::Value>,
    #[serde(default)]
    pub resolved: Option<serde_json::Value>,
    #[serde(default)]
    pub updated: Option<serde_json::Value>,
    #[serde(default)]
    pub changelog: Vec<Revision>,
    #[serde(default)]
    pub worklogs: Vec<RawWorkLog>,
}

/// A work log entry before its timestamp is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawWorkLog {
    #[serde(default)]
    pub started: Option<serde_json::Value>,
    #[serde(default)]
    pub time_spent_seconds: i64,
}

impl IssueRecord {
    /// Current value of `field`, matched case-insensitively.
    #[must_use]
    pub fn current(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(field.trim()))
            .map(|(_, value)| value.as_str())
    }

    /// Parsed lifecycle timestamps; unreadable ones are reported and
    /// treated as absent.
    pub fn lifecycle(&self, diagnostics: &mut Vec<Diagnostic>) -> Lifecycle {
        let mut read = |label: &str, value: Option<&serde_json::Value>| {
            let value = value.filter(|v| !v.is_null())?;
            let parsed = timestamp_from_value(value);
            if parsed.is_none() {
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::UnparseableTimestamp,
                    Some(&self.key),
                    format!("{label} = {value}"),
                ));
            }
            parsed
        };
        Lifecycle {
            created: read("created", self.created.as_ref()),
            resolved: read("resolved", self.resolved.as_ref()),
            updated: read("updated", self.updated.as_ref()),
        }
    }
}

/// Everything one analysis run needs besides the issue itself.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    pub field: &'a str,
    pub window: ReportingWindow,
    pub now: EpochMillis,
    pub categories: &'a CategorySet,
    pub flow: &'a FlowCategories,
}

impl<'a> AnalysisRequest<'a> {
    /// Status analysis over `window` using the configured field and
    /// categories.
    #[must_use]
    pub fn status(config: &'a AnalyticsConfig, window: ReportingWindow, now: EpochMillis) -> Self {
        Self {
            field: &config.fields.status,
            window,
            now,
            categories: &config.categories,
            flow: &config.flow,
        }
    }
}

/// Output of [`analyze_issue`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueAnalysis {
    pub key: String,
    pub segments: Vec<Segment>,
    pub overlap: OverlapSummary,
    pub flow: FlowMetrics,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Run the full timeline pipeline for one issue and field.
///
/// The value at creation is the first change's `from`, falling back to the
/// current value. Creation falls back to the first change, then to the
/// cutoff, so an issue with no usable timestamps yields an empty timeline.
#[must_use]
pub fn analyze_issue(issue: &IssueRecord, request: &AnalysisRequest<'_>) -> IssueAnalysis {
    timed("issue.analyze", || analyze_inner(issue, request))
}

fn analyze_inner(issue: &IssueRecord, request: &AnalysisRequest<'_>) -> IssueAnalysis {
    let mut diagnostics = Vec::new();
    let timeline = field_timeline(issue, request.field, request.now, &mut diagnostics);
    let segments = timeline.segments;

    let overlap = aggregate_overlap(&segments, &request.window, request.categories);
    diagnostics.extend(overlap.diagnostics.iter().cloned());
    let flow = compute_flow(
        &segments,
        timeline.created,
        timeline.cutoff,
        request.categories,
        request.flow,
    );

    tracing::trace!(
        key = %issue.key,
        events = timeline.events,
        segments = segments.len(),
        "issue analyzed"
    );

    IssueAnalysis {
        key: issue.key.clone(),
        segments,
        overlap,
        flow,
        diagnostics,
    }
}

struct FieldTimeline {
    segments: Vec<Segment>,
    created: EpochMillis,
    cutoff: EpochMillis,
    events: usize,
}

fn field_timeline(
    issue: &IssueRecord,
    field: &str,
    now: EpochMillis,
    diagnostics: &mut Vec<Diagnostic>,
) -> FieldTimeline {
    let lifecycle = issue.lifecycle(diagnostics);
    let cutoff = lifecycle.cutoff(now);

    let extraction = extract_field_events(&issue.changelog, field);
    diagnostics.extend(extraction.diagnostics);
    let events = extraction.events;

    let initial = events
        .first()
        .and_then(|e| e.from.as_deref())
        .or_else(|| issue.current(field));
    let created = lifecycle
        .created
        .or_else(|| events.first().map(|e| e.at))
        .unwrap_or(cutoff);

    FieldTimeline {
        segments: segment_timeline(&events, initial, Some(created), cutoff),
        created,
        cutoff,
        events: events.len(),
    }
}

/// Build the daily-burndown input for `issue`.
///
/// Done time comes from the issue's status flow; work logs with unreadable
/// start times are dropped and reported.
#[must_use]
pub fn sprint_member(
    issue: &IssueRecord,
    config: &AnalyticsConfig,
    now: EpochMillis,
) -> (SprintMember, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let timeline = field_timeline(issue, &config.fields.status, now, &mut diagnostics);
    let flow = compute_flow(
        &timeline.segments,
        timeline.created,
        timeline.cutoff,
        &config.categories,
        &config.flow,
    );

    let sprint = extract_field_events(&issue.changelog, &config.fields.sprint);
    diagnostics.extend(sprint.diagnostics);

    let mut worklogs = Vec::with_capacity(issue.worklogs.len());
    for raw in &issue.worklogs {
        match raw.started.as_ref().and_then(timestamp_from_value) {
            Some(started) => worklogs.push(WorkLog {
                started,
                seconds: raw.time_spent_seconds,
            }),
            None => diagnostics.push(Diagnostic::new(
                DiagnosticCode::UnparseableTimestamp,
                Some(&issue.key),
                format!("worklog of {}s dropped", raw.time_spent_seconds),
            )),
        }
    }

    let member = SprintMember {
        key: issue.key.clone(),
        sprint_changes: sprint.events,
        done_at: flow.reached_done.then_some(flow.done_at),
        worklogs,
    };
    (member, diagnostics)
}
