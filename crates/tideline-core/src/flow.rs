//! Lead, cycle, and wait time derivation from status segments.
//!
//! - **lead**: creation until the issue first reaches the done category
//! - **cycle**: first entry into the work category until done, capped at lead
//! - **wait**: lead minus cycle
//!
//! An issue that never reaches done is measured up to its fallback end
//! (resolution, last update, or now). All durations are clamped to be
//! non-negative and satisfy `lead >= cycle >= 0`.

use serde::{Deserialize, Serialize};

use crate::category::CategorySet;
use crate::segment::Segment;
use crate::time::{EpochMillis, millis_to_seconds};

/// Category names that drive flow metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowCategories {
    #[serde(default = "default_done")]
    pub done: String,
    #[serde(default = "default_work")]
    pub work: String,
}

impl Default for FlowCategories {
    fn default() -> Self {
        Self {
            done: default_done(),
            work: default_work(),
        }
    }
}

fn default_done() -> String {
    "done".to_string()
}

fn default_work() -> String {
    "work".to_string()
}

/// Flow metrics for one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowMetrics {
    pub lead_ms: i64,
    pub cycle_ms: i64,
    pub wait_ms: i64,
    pub reopen_count: u32,
    /// Start of the first done segment, or the fallback end.
    pub done_at: EpochMillis,
    pub work_started_at: Option<EpochMillis>,
    /// False when `done_at` came from the fallback end.
    pub reached_done: bool,
}

impl FlowMetrics {
    #[must_use]
    pub fn lead_seconds(&self) -> f64 {
        millis_to_seconds(self.lead_ms)
    }

    #[must_use]
    pub fn cycle_seconds(&self) -> f64 {
        millis_to_seconds(self.cycle_ms)
    }

    #[must_use]
    pub fn wait_seconds(&self) -> f64 {
        millis_to_seconds(self.wait_ms)
    }
}

/// Compute flow metrics for one issue's status segments.
#[must_use]
pub fn compute_flow(
    segments: &[Segment],
    created: EpochMillis,
    fallback_end: EpochMillis,
    categories: &CategorySet,
    flow: &FlowCategories,
) -> FlowMetrics {
    let is_done = |value: &str| categories.has_category(value, &flow.done);

    let first_done = segments.iter().find(|s| is_done(&s.value)).map(|s| s.start);
    let work_started_at = segments
        .iter()
        .find(|s| categories.has_category(&s.value, &flow.work))
        .map(|s| s.start);

    let done_at = first_done.unwrap_or(fallback_end);
    let lead_ms = (done_at - created).max(0);
    let raw_cycle = work_started_at.map_or(0, |start| (done_at - start).max(0));
    let cycle_ms = raw_cycle.min(lead_ms);
    if cycle_ms != raw_cycle {
        tracing::trace!(raw_cycle, lead_ms, "cycle time clamped to lead time");
    }

    let reopens = segments
        .windows(2)
        .filter(|pair| is_done(&pair[0].value) && !is_done(&pair[1].value))
        .count();

    FlowMetrics {
        lead_ms,
        cycle_ms,
        wait_ms: lead_ms - cycle_ms,
        reopen_count: u32::try_from(reopens).unwrap_or(u32::MAX),
        done_at,
        work_started_at,
        reached_done: first_done.is_some(),
    }
}

/// Summed flow metrics across issues.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlowTotals {
    pub issues: u64,
    pub completed: u64,
    pub lead_ms: i64,
    pub cycle_ms: i64,
    pub wait_ms: i64,
    pub reopens: u64,
}

impl FlowTotals {
    pub fn add(&mut self, metrics: &FlowMetrics) {
        self.issues += 1;
        self.completed += u64::from(metrics.reached_done);
        self.lead_ms += metrics.lead_ms;
        self.cycle_ms += metrics.cycle_ms;
        self.wait_ms += metrics.wait_ms;
        self.reopens += u64::from(metrics.reopen_count);
    }

    pub fn merge(&mut self, other: &Self) {
        self.issues += other.issues;
        self.completed += other.completed;
        self.lead_ms += other.lead_ms;
        self.cycle_ms += other.cycle_ms;
        self.wait_ms += other.wait_ms;
        self.reopens += other.reopens;
    }

    /// Mean `(lead, cycle, wait)` in seconds; zeros when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_seconds(&self) -> (f64, f64, f64) {
        if self.issues == 0 {
            return (0.0, 0.0, 0.0);
        }
        let n = self.issues as f64;
        (
            millis_to_seconds(self.lead_ms) / n,
            millis_to_seconds(self.cycle_ms) / n,
            millis_to_seconds(self.wait_ms) / n,
        )
    }
}
