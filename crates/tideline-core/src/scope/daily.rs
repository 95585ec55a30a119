//! Day-granular burndown reconstruction.
//!
//! Used when the scope-change feed is unavailable. Sprint membership comes
//! from each issue's own sprint-field history and completed effort from its
//! work logs. The series open with a point at the window start and then
//! sample once per UTC day at the close of that day. Every point holds the
//! state at its own timestamp; when `now` falls inside the window, sampling
//! stops at `now` so nothing later is reported. The output has the same
//! shape as [`replay_scope`](super::replay::replay_scope), so consumers can
//! chart either without caring which one ran.

use serde::{Deserialize, Serialize};

use crate::changelog::ChangeEvent;
use crate::error::{Diagnostic, DiagnosticCode};
use crate::time::{EpochMillis, MILLIS_PER_DAY, ReportingWindow};
use crate::timing::timed;

use super::guideline::{project_guideline, weekday_rate_windows};
use super::series::{
    Burndown, Marker, MarkerOperation, MarkerSet, SeriesPoint, SeriesSource,
};

/// Time logged against an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLog {
    pub started: EpochMillis,
    pub seconds: i64,
}

/// One candidate sprint member and everything the daily path needs of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SprintMember {
    pub key: String,
    /// Sprint-field change events, ascending by `at`.
    pub sprint_changes: Vec<ChangeEvent>,
    /// First entry into a done status, if any.
    pub done_at: Option<EpochMillis>,
    pub worklogs: Vec<WorkLog>,
}

/// What to reconstruct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyRequest {
    /// Sprint name as it appears in the sprint field.
    pub sprint: String,
    pub window: ReportingWindow,
    pub now: Option<EpochMillis>,
}

/// Half-open membership interval; `left == None` means still a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub joined: EpochMillis,
    pub left: Option<EpochMillis>,
}

impl Membership {
    #[must_use]
    pub fn covers(&self, ts: EpochMillis) -> bool {
        self.joined <= ts && self.left.is_none_or(|left| ts < left)
    }
}

/// Membership intervals of `sprint` derived from sprint-field changes.
///
/// The field holds a comma-separated list of sprint names. A change that
/// introduces `sprint` opens an interval; one that drops it closes the
/// open interval. When the first relevant change is a departure, or no
/// change mentions `sprint`, membership starts at `default_join`.
#[must_use]
pub fn membership_intervals(
    changes: &[ChangeEvent],
    sprint: &str,
    default_join: EpochMillis,
) -> Vec<Membership> {
    let mut intervals = Vec::new();
    let mut open: Option<EpochMillis> = None;
    let mut seen = false;

    for change in changes {
        let before = lists_sprint(change.from.as_deref(), sprint);
        let after = lists_sprint(change.to.as_deref(), sprint);
        match (before, after) {
            (false, true) => {
                open.get_or_insert(change.at);
            }
            (true, false) => {
                let joined = open.take().or((!seen).then_some(default_join));
                if let Some(joined) = joined {
                    intervals.push(Membership {
                        joined: joined.min(change.at),
                        left: Some(change.at),
                    });
                }
            }
            _ => continue,
        }
        seen = true;
    }

    if let Some(joined) = open {
        intervals.push(Membership { joined, left: None });
    } else if !seen {
        intervals.push(Membership {
            joined: default_join,
            left: None,
        });
    }
    intervals
}

fn lists_sprint(value: Option<&str>, sprint: &str) -> bool {
    value.is_some_and(|list| list.split(',').any(|name| name.trim() == sprint.trim()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DayState {
    member: bool,
    counted: bool,
    logged_seconds: i64,
}

/// Reconstruct scope (member count) and completed (logged seconds of done
/// members) at the window start and at the close of each day of
/// `request.window`.
#[must_use]
pub fn daily_burndown(members: &[SprintMember], request: &DailyRequest) -> Burndown {
    timed("scope.daily", || daily_inner(members, request))
}

fn daily_inner(members: &[SprintMember], request: &DailyRequest) -> Burndown {
    let window = request.window;
    let samples = sample_instants(window, request.now);

    let memberships: Vec<Vec<Membership>> = members
        .iter()
        .map(|m| membership_intervals(&m.sprint_changes, &request.sprint, window.start))
        .collect();

    let grid: Vec<Vec<DayState>> = samples
        .iter()
        .map(|&sample| {
            members
                .iter()
                .zip(&memberships)
                .map(|(member, intervals)| day_state(member, intervals, sample))
                .collect()
        })
        .collect();

    if grid.iter().flatten().all(|state| !state.member) {
        return Burndown {
            source: SeriesSource::Daily,
            scope: Vec::new(),
            completed: Vec::new(),
            guideline: Vec::new(),
            markers: MarkerSet::default(),
            diagnostics: vec![Diagnostic::new(
                DiagnosticCode::EmptyMembership,
                Some(&request.sprint),
                format!("{} candidate issue(s), none in the sprint", members.len()),
            )],
        };
    }

    let mut scope = Vec::with_capacity(samples.len());
    let mut completed = Vec::with_capacity(samples.len());
    let mut markers = MarkerSet::default();

    for (index, (&point_at, today)) in samples.iter().zip(&grid).enumerate() {
        let scope_count = today.iter().filter(|s| s.member).count();
        let done_seconds: i64 = today
            .iter()
            .filter(|s| s.counted)
            .map(|s| s.logged_seconds)
            .sum();

        if let Some(yesterday) = index.checked_sub(1).map(|i| &grid[i]) {
            day_markers(point_at, members, yesterday, today, &mut markers);
        }

        scope.push(SeriesPoint::new(point_at, as_value(scope_count)));
        completed.push(SeriesPoint::new(point_at, seconds_value(done_seconds)));
    }

    // Sampling may stop at `now`; the guideline still targets the scope at
    // the window end.
    let final_scope = as_value(
        memberships
            .iter()
            .filter(|intervals| intervals.iter().any(|m| m.covers(window.end)))
            .count(),
    );
    let guideline = project_guideline(
        final_scope,
        window.start,
        window.end,
        &weekday_rate_windows(window.start, window.end),
    );

    tracing::debug!(
        sprint = %request.sprint,
        samples = samples.len(),
        members = members.len(),
        final_scope,
        "daily burndown finished"
    );

    Burndown {
        source: SeriesSource::Daily,
        scope,
        completed,
        guideline,
        markers,
        diagnostics: Vec::new(),
    }
}

/// Window start, then the close of each UTC day clamped to the window end.
/// A `now` inside the window replaces every later instant.
fn sample_instants(window: ReportingWindow, now: Option<EpochMillis>) -> Vec<EpochMillis> {
    let mut samples = vec![window.start];
    samples.extend(
        window
            .day_starts()
            .into_iter()
            .map(|day| (day + MILLIS_PER_DAY - 1).min(window.end)),
    );
    if let Some(now) = now.filter(|now| window.contains(*now)) {
        samples.retain(|&at| at < now);
        samples.push(now);
    }
    samples.dedup();
    samples
}

fn day_state(member: &SprintMember, intervals: &[Membership], sample: EpochMillis) -> DayState {
    let is_member = intervals.iter().any(|m| m.covers(sample));
    let logged_seconds = member
        .worklogs
        .iter()
        .filter(|log| log.started <= sample)
        .map(|log| log.seconds.max(0))
        .sum();
    DayState {
        member: is_member,
        counted: is_member && member.done_at.is_some_and(|done| done <= sample),
        logged_seconds,
    }
}

/// Markers for every per-issue flip between two consecutive samples.
///
/// Effort logged by issues counted at both samples moves the completed series
/// without a marker; flips are then applied on top, so the last marker's
/// `to` equals the day's completed value.
fn day_markers(
    at: EpochMillis,
    members: &[SprintMember],
    yesterday: &[DayState],
    today: &[DayState],
    markers: &mut MarkerSet,
) {
    let mut running_scope = yesterday.iter().filter(|s| s.member).count();
    let mut running_done: i64 = yesterday
        .iter()
        .zip(today)
        .filter(|(before, _)| before.counted)
        .map(|(before, after)| {
            if after.counted {
                after.logged_seconds
            } else {
                before.logged_seconds
            }
        })
        .sum();

    for ((member, before), after) in members.iter().zip(yesterday).zip(today) {
        if before.member != after.member {
            let (to, operation) = if after.member {
                (running_scope + 1, MarkerOperation::Added)
            } else {
                (running_scope.saturating_sub(1), MarkerOperation::Removed)
            };
            markers.scope.push(Marker::new(
                at,
                &member.key,
                as_value(running_scope),
                as_value(to),
                operation,
            ));
            running_scope = to;
        }

        if before.counted != after.counted {
            let (to, operation) = if after.counted {
                (running_done + after.logged_seconds, MarkerOperation::Completed)
            } else if after.member {
                (running_done - before.logged_seconds, MarkerOperation::Reopened)
            } else {
                (running_done - before.logged_seconds, MarkerOperation::Removed)
            };
            markers.done.push(Marker::new(
                at,
                &member.key,
                seconds_value(running_done),
                seconds_value(to),
                operation,
            ));
            running_done = to;
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_value(n: usize) -> f64 {
    n as f64
}

#[allow(clippy::cast_precision_loss)]
fn seconds_value(seconds: i64) -> f64 {
    seconds as f64
}
