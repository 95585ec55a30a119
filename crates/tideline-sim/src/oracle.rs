//! Invariant oracle for generated corpora.
//!
//! Each checker inspects one property of the pipeline's output and reports
//! every violation it finds; [`check_corpus`] runs them all.

use std::collections::BTreeMap;

use serde::Serialize;
use tideline_core::issue::{AnalysisRequest, IssueAnalysis, analyze_issue, sprint_member};
use tideline_core::report::FlowReport;
use tideline_core::scope::daily::{DailyRequest, daily_burndown};
use tideline_core::scope::{
    Burndown, ScopeChangeEvent, ScopeChangePayload, ScopeReplayState, replay_scope,
};
use tideline_core::segment::is_contiguous;
use tideline_core::time::EpochMillis;

use crate::corpus::{SimCorpus, TRACKED_SPRINT};

/// Outcome of one or more invariant checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleResult {
    pub passed: bool,
    pub violations: Vec<InvariantViolation>,
}

impl OracleResult {
    fn from_violations(violations: Vec<InvariantViolation>) -> Self {
        Self {
            passed: violations.is_empty(),
            violations,
        }
    }

    #[must_use]
    fn merge(mut self, other: Self) -> Self {
        self.passed &= other.passed;
        self.violations.extend(other.violations);
        self
    }
}

/// A single broken invariant with enough context to debug it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "invariant", rename_all = "snake_case")]
pub enum InvariantViolation {
    /// Adjacent segments do not share a boundary.
    Contiguity { key: String, gap_at: usize },
    /// Clipped status totals differ from the timeline's overlap with the
    /// window.
    Conservation {
        key: String,
        status_total_ms: i64,
        expected_ms: i64,
    },
    /// `lead >= cycle >= 0` or `wait == lead - cycle` failed.
    FlowOrdering {
        key: String,
        lead_ms: i64,
        cycle_ms: i64,
        wait_ms: i64,
    },
    /// A replay step left a done key outside scope.
    DoneOutsideScope { step: usize, key: String },
    /// Replaying the same payload twice disagreed.
    ReplayNondeterministic,
    /// Completed exceeded scope at some point of the replayed series.
    CompletedAboveScope { timestamp: EpochMillis },
    /// Folding per-issue results in a different order changed the totals.
    MergeOrder,
    /// A daily-series point went negative, backwards in time, or past `now`.
    DailySeries { timestamp: EpochMillis, value: f64 },
}

/// Run every checker against `corpus`.
#[must_use]
pub fn check_corpus(corpus: &SimCorpus) -> OracleResult {
    let request = AnalysisRequest::status(&corpus.config, corpus.window, corpus.now);
    let analyses: Vec<IssueAnalysis> = corpus
        .issues
        .iter()
        .map(|issue| analyze_issue(issue, &request))
        .collect();

    check_timelines(&analyses, corpus)
        .merge(check_flow(&analyses))
        .merge(check_merge_order(&analyses))
        .merge(check_replay(&corpus.payload))
        .merge(check_daily(corpus))
}

/// Contiguity and overlap conservation per issue.
#[must_use]
pub fn check_timelines(analyses: &[IssueAnalysis], corpus: &SimCorpus) -> OracleResult {
    let mut violations = Vec::new();
    for analysis in analyses {
        if !is_contiguous(&analysis.segments) {
            let gap_at = analysis
                .segments
                .windows(2)
                .position(|pair| pair[0].end != pair[1].start)
                .unwrap_or(0);
            violations.push(InvariantViolation::Contiguity {
                key: analysis.key.clone(),
                gap_at,
            });
        }

        let (Some(first), Some(last)) = (analysis.segments.first(), analysis.segments.last())
        else {
            continue;
        };
        if analysis.segments.iter().any(|s| s.end < s.start) {
            // Negative segments are clamped away; conservation only holds
            // for well-ordered timelines.
            continue;
        }
        let expected_ms = corpus.window.overlap_ms(first.start, last.end);
        let status_total_ms = analysis.overlap.totals.total_status_ms();
        if status_total_ms != expected_ms {
            violations.push(InvariantViolation::Conservation {
                key: analysis.key.clone(),
                status_total_ms,
                expected_ms,
            });
        }
    }
    OracleResult::from_violations(violations)
}

#[must_use]
pub fn check_flow(analyses: &[IssueAnalysis]) -> OracleResult {
    let violations = analyses
        .iter()
        .filter(|a| {
            let f = &a.flow;
            f.cycle_ms < 0 || f.lead_ms < f.cycle_ms || f.wait_ms != f.lead_ms - f.cycle_ms
        })
        .map(|a| InvariantViolation::FlowOrdering {
            key: a.key.clone(),
            lead_ms: a.flow.lead_ms,
            cycle_ms: a.flow.cycle_ms,
            wait_ms: a.flow.wait_ms,
        })
        .collect();
    OracleResult::from_violations(violations)
}

#[must_use]
pub fn check_merge_order(analyses: &[IssueAnalysis]) -> OracleResult {
    let forward = fold_reports(analyses.iter());
    let backward = fold_reports(analyses.iter().rev());

    let mid = analyses.len() / 2;
    let mut halves = fold_reports(analyses[mid..].iter());
    halves.merge(&fold_reports(analyses[..mid].iter()));

    if forward == backward && forward == halves {
        OracleResult::from_violations(Vec::new())
    } else {
        OracleResult::from_violations(vec![InvariantViolation::MergeOrder])
    }
}

fn fold_reports<'a>(analyses: impl Iterator<Item = &'a IssueAnalysis>) -> FlowReport {
    analyses.fold(FlowReport::default(), |mut report, analysis| {
        report.add(analysis);
        report
    })
}

/// Replay determinism, `done ⊆ in_scope` per step, and completed ≤ scope.
#[must_use]
pub fn check_replay(payload: &ScopeChangePayload) -> OracleResult {
    let mut violations = Vec::new();

    let first = replay_scope(payload);
    if first != replay_scope(payload) {
        violations.push(InvariantViolation::ReplayNondeterministic);
    }

    let mut state = ScopeReplayState::seeded(payload.final_key_set.iter().cloned());
    for (step, event) in ordered_events(payload).into_iter().enumerate() {
        let _ = state.apply(event);
        if !state.is_consistent() {
            violations.push(InvariantViolation::DoneOutsideScope {
                step,
                key: event.key.clone(),
            });
        }
    }

    if let Some(burndown) = first.into_burndown() {
        violations.extend(completed_above_scope(&burndown));
    }
    OracleResult::from_violations(violations)
}

fn ordered_events(payload: &ScopeChangePayload) -> Vec<&ScopeChangeEvent> {
    let Some(changes) = &payload.changes else {
        return Vec::new();
    };
    let mut buckets: BTreeMap<EpochMillis, Vec<&ScopeChangeEvent>> = BTreeMap::new();
    for (raw, events) in changes {
        if let Ok(ts) = raw.parse::<EpochMillis>() {
            buckets.entry(ts).or_default().extend(events);
        }
    }
    buckets.into_values().flatten().collect()
}

fn completed_above_scope(burndown: &Burndown) -> Vec<InvariantViolation> {
    burndown
        .scope
        .iter()
        .zip(&burndown.completed)
        .filter(|(scope, done)| done.value > scope.value)
        .map(|(scope, _)| InvariantViolation::CompletedAboveScope {
            timestamp: scope.timestamp,
        })
        .collect()
}

/// Daily series are time-ordered, non-negative, and end by `now`.
#[must_use]
pub fn check_daily(corpus: &SimCorpus) -> OracleResult {
    let members: Vec<_> = corpus
        .issues
        .iter()
        .map(|issue| sprint_member(issue, &corpus.config, corpus.now).0)
        .collect();
    let request = DailyRequest {
        sprint: TRACKED_SPRINT.to_string(),
        window: corpus.window,
        now: Some(corpus.now),
    };
    let burndown = daily_burndown(&members, &request);

    let horizon = if corpus.window.contains(corpus.now) {
        corpus.now
    } else {
        EpochMillis::MAX
    };
    let mut violations = Vec::new();
    for series in [&burndown.scope, &burndown.completed] {
        let mut last_ts = EpochMillis::MIN;
        for point in series {
            if point.value < 0.0 || point.timestamp < last_ts || point.timestamp > horizon {
                violations.push(InvariantViolation::DailySeries {
                    timestamp: point.timestamp,
                    value: point.value,
                });
            }
            last_ts = point.timestamp;
        }
    }
    OracleResult::from_violations(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{CorpusConfig, generate_corpus};

    #[test]
    fn generated_corpus_passes() {
        let corpus = generate_corpus(1, &CorpusConfig::default());
        let result = check_corpus(&corpus);
        assert!(result.passed, "{:?}", result.violations);
    }

    #[test]
    fn merge_tracks_failures() {
        let ok = OracleResult::from_violations(Vec::new());
        let bad = OracleResult::from_violations(vec![InvariantViolation::MergeOrder]);
        let merged = ok.merge(bad);
        assert!(!merged.passed);
        assert_eq!(merged.violations.len(), 1);
    }

    #[test]
    fn replay_checker_accepts_consistent_payload() {
        let payload = ScopeChangePayload {
            start_time: 0,
            end_time: 100,
            final_key_set: vec!["A-1".into()],
            changes: Some(BTreeMap::from([(
                "50".to_string(),
                vec![ScopeChangeEvent::new("A-1").column_done()],
            )])),
            ..ScopeChangePayload::default()
        };
        assert!(check_replay(&payload).passed);
    }

    #[test]
    fn violations_serialize_with_tag() {
        let violation = InvariantViolation::DoneOutsideScope {
            step: 3,
            key: "A-1".into(),
        };
        let json = serde_json::to_value(&violation).expect("serialize");
        assert_eq!(json["invariant"], "done_outside_scope");
        assert_eq!(json["step"], 3);
    }
}
