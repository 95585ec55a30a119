//! Scope-change replay.
//!
//! Reconstructs the scope and completed series of a sprint from its sparse
//! change log.
//!
//! # Algorithm
//!
//! 1. Bucket changes by numeric timestamp; unparseable keys are dropped.
//! 2. Keys added at or after the start joined late: the initial scope is the
//!    final key set minus those keys.
//! 3. Changes before the start are replayed silently so removals and
//!    completions that predate the window still shape the initial state.
//! 4. Changes inside `[start, end]` are replayed in timestamp order. Each
//!    processed timestamp produces one point per series, and every actual
//!    count change produces a marker.
//! 5. The series open with a point at `start` and close with a point at
//!    `end`; with `now` inside the period they are clipped to `now`.
//!
//! Changes sharing a timestamp are applied in the order the feed listed them.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Diagnostic, DiagnosticCode};
use crate::time::EpochMillis;
use crate::timing::timed;

use super::flag::{indeterminate_flags, normalize_flag};
use super::guideline::project_guideline;
use super::payload::{ScopeChangeEvent, ScopeChangePayload};
use super::series::{
    Burndown, Marker, MarkerSet, SeriesPoint, SeriesSource, clip_to_now, close_at,
};
use super::state::{Metric, ScopeReplayState};

/// Replay knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Clip scope and completed series to the payload's `now` when it falls
    /// inside the period.
    pub clip_to_now: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self { clip_to_now: true }
    }
}

/// Result of a replay.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOutcome {
    Available(Burndown),
    /// The payload carried no change log. This is "no data", not "no change".
    Unavailable { diagnostics: Vec<Diagnostic> },
}

impl ReplayOutcome {
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    #[must_use]
    pub fn into_burndown(self) -> Option<Burndown> {
        match self {
            Self::Available(burndown) => Some(burndown),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Replay `payload` with default options.
#[must_use]
pub fn replay_scope(payload: &ScopeChangePayload) -> ReplayOutcome {
    replay_scope_with(payload, ReplayOptions::default())
}

/// Replay `payload`.
#[must_use]
pub fn replay_scope_with(payload: &ScopeChangePayload, options: ReplayOptions) -> ReplayOutcome {
    timed("scope.replay", || replay_inner(payload, options))
}

fn replay_inner(payload: &ScopeChangePayload, options: ReplayOptions) -> ReplayOutcome {
    let Some(changes) = &payload.changes else {
        return ReplayOutcome::Unavailable {
            diagnostics: vec![Diagnostic::new(
                DiagnosticCode::ChangesUnavailable,
                None,
                "payload has no `changes` map",
            )],
        };
    };

    let mut diagnostics = Vec::new();
    let buckets = bucket_changes(changes, &mut diagnostics);
    let start = payload.start_time;
    let end = payload.end_time.max(start);

    let added_after_start: BTreeSet<&str> = buckets
        .range(start..)
        .flat_map(|(_, events)| events.iter())
        .filter(|event| normalize_flag(event.added.as_ref()).is_true())
        .map(|event| event.key.as_str())
        .collect();

    let mut state = ScopeReplayState::seeded(
        payload
            .final_key_set
            .iter()
            .filter(|key| !added_after_start.contains(key.as_str()))
            .cloned(),
    );

    for events in buckets.range(..start).map(|(_, events)| events) {
        for event in events {
            note_indeterminate(event, &mut diagnostics);
            state.apply(event);
        }
    }

    let mut scope = vec![SeriesPoint::new(start, count(state.scope_count()))];
    let mut completed = vec![SeriesPoint::new(start, count(state.done_count()))];
    let mut markers = MarkerSet::default();

    for (&ts, events) in buckets.range(start..=end) {
        for event in events {
            note_indeterminate(event, &mut diagnostics);
            for transition in state.apply(event) {
                let marker = Marker::new(
                    ts,
                    &event.key,
                    count(transition.from),
                    count(transition.to),
                    transition.operation,
                );
                match transition.metric {
                    Metric::Scope => markers.scope.push(marker),
                    Metric::Done => markers.done.push(marker),
                }
            }
        }
        scope.push(SeriesPoint::new(ts, count(state.scope_count())));
        completed.push(SeriesPoint::new(ts, count(state.done_count())));
    }

    close_at(&mut scope, end);
    close_at(&mut completed, end);

    let final_scope = scope.last().map_or(0.0, |p| p.value);
    let guideline = project_guideline(final_scope, start, end, payload.rates());

    if let Some(now) = payload
        .now
        .filter(|now| options.clip_to_now && (start..=end).contains(now))
    {
        scope = clip_to_now(&scope, now);
        completed = clip_to_now(&completed, now);
    }

    tracing::debug!(
        buckets = buckets.len(),
        scope_markers = markers.scope.len(),
        done_markers = markers.done.len(),
        final_scope,
        "scope replay finished"
    );

    ReplayOutcome::Available(Burndown {
        source: SeriesSource::Replay,
        scope,
        completed,
        guideline,
        markers,
        diagnostics,
    })
}

fn bucket_changes<'a>(
    changes: &'a BTreeMap<String, Vec<ScopeChangeEvent>>,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<EpochMillis, Vec<&'a ScopeChangeEvent>> {
    let mut buckets: BTreeMap<EpochMillis, Vec<&ScopeChangeEvent>> = BTreeMap::new();
    for (raw_ts, events) in changes {
        if let Ok(ts) = raw_ts.trim().parse::<EpochMillis>() {
            buckets.entry(ts).or_default().extend(events.iter());
        } else {
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::UnparseableChangeKey,
                Some(raw_ts),
                format!("{} change(s) dropped", events.len()),
            ));
        }
    }
    buckets
}

fn note_indeterminate(event: &ScopeChangeEvent, diagnostics: &mut Vec<Diagnostic>) {
    for flag in indeterminate_flags(event) {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::IndeterminateFlag,
            Some(&event.key),
            format!("`{flag}` read as false"),
        ));
    }
}

#[allow(clippy::cast_precision_loss)]
fn count(n: usize) -> f64 {
    n as f64
}
