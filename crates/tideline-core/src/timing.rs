//! Opt-in latency sampling for pipeline stages.
//!
//! Stages wrap their work in [`timed`]. Sampling is off by default and is
//! switched on by the embedding application, typically from
//! `TIDELINE_TIMING` via [`timing_enabled_from_env`] or the layered config
//! in [`crate::config`]. Samples live in a
//! thread-local buffer, so concurrent analyses on different threads never
//! contend.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Per-stage latency percentiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageLatency {
    pub stage: String,
    pub samples: usize,
    #[serde(rename = "p50_us", serialize_with = "as_micros")]
    pub p50: Duration,
    #[serde(rename = "p95_us", serialize_with = "as_micros")]
    pub p95: Duration,
    #[serde(rename = "p99_us", serialize_with = "as_micros")]
    pub p99: Duration,
}

/// Latency report across all sampled stages, ordered by stage name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatencyReport {
    pub stages: Vec<StageLatency>,
}

thread_local! {
    static SAMPLES: RefCell<Vec<(&'static str, Duration)>> = const { RefCell::new(Vec::new()) };
}

static ENABLED: AtomicBool = AtomicBool::new(false);

/// True when `TIDELINE_TIMING` is `1`, `true`, `yes`, or `on`
/// (case-insensitive).
#[must_use]
pub fn timing_enabled_from_env() -> bool {
    std::env::var("TIDELINE_TIMING")
        .ok()
        .is_some_and(|value| is_truthy(&value))
}

/// Switch sampling on or off. Switching off discards buffered samples.
pub fn set_timing_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
    if !enabled {
        clear_samples();
    }
}

#[must_use]
pub fn is_timing_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Discard this thread's buffered samples.
pub fn clear_samples() {
    SAMPLES.with(|samples| samples.borrow_mut().clear());
}

/// Run `f`, recording its wall time under `stage` when sampling is on.
pub fn timed<R>(stage: &'static str, f: impl FnOnce() -> R) -> R {
    if !is_timing_enabled() {
        return f();
    }
    let started = Instant::now();
    let result = f();
    record(stage, started.elapsed());
    result
}

/// Drain this thread's samples into a report.
#[must_use]
pub fn drain_report() -> LatencyReport {
    let samples = SAMPLES.with(|samples| std::mem::take(&mut *samples.borrow_mut()));

    let mut by_stage: BTreeMap<&'static str, Vec<Duration>> = BTreeMap::new();
    for (stage, elapsed) in samples {
        by_stage.entry(stage).or_default().push(elapsed);
    }

    let stages = by_stage
        .into_iter()
        .map(|(stage, mut values)| {
            values.sort_unstable();
            StageLatency {
                stage: stage.to_string(),
                samples: values.len(),
                p50: percentile(&values, 50),
                p95: percentile(&values, 95),
                p99: percentile(&values, 99),
            }
        })
        .collect();

    LatencyReport { stages }
}

impl LatencyReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Fixed-width table for terminal output.
    #[must_use]
    pub fn to_table(&self) -> String {
        if self.stages.is_empty() {
            return "no latency samples\n".to_string();
        }
        let mut out = String::from("stage                  samples      p50      p95      p99\n");
        for s in &self.stages {
            let _ = writeln!(
                out,
                "{:<22} {:>7} {:>8} {:>8} {:>8}",
                s.stage,
                s.samples,
                human(s.p50),
                human(s.p95),
                human(s.p99)
            );
        }
        out
    }
}

fn record(stage: &'static str, elapsed: Duration) {
    SAMPLES.with(|samples| samples.borrow_mut().push((stage, elapsed)));
}

fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let rank = (pct.min(100) * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

fn human(d: Duration) -> String {
    let us = d.as_micros();
    if us >= 1_000_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else if us >= 1_000 {
        format!("{:.2}ms", d.as_secs_f64() * 1_000.0)
    } else {
        format!("{us}µs")
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn as_micros<S: serde::Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(d.as_micros())
}

pub(crate) fn is_truthy(value: &str) -> bool {
    ["1", "true", "yes", "on"]
        .iter()
        .any(|t| value.trim().eq_ignore_ascii_case(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    static GUARD: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[test]
    fn disabled_sampling_records_nothing() {
        let _guard = GUARD.lock().expect("guard");
        set_timing_enabled(false);
        assert_eq!(timed("segment", || 3_u8), 3);
        assert!(drain_report().is_empty());
    }

    #[test]
    fn enabled_sampling_records_stage() {
        let _guard = GUARD.lock().expect("guard");
        set_timing_enabled(true);
        clear_samples();
        let _ = timed("segment", || std::thread::sleep(Duration::from_micros(50)));
        let report = drain_report();
        set_timing_enabled(false);

        assert_eq!(report.stages.len(), 1);
        assert_eq!(report.stages[0].stage, "segment");
        assert_eq!(report.stages[0].samples, 1);
        assert!(report.stages[0].p50 > Duration::ZERO);
    }

    #[test]
    fn percentiles_use_nearest_rank() {
        let _guard = GUARD.lock().expect("guard");
        clear_samples();
        record("replay", Duration::from_micros(3_000));
        record("replay", Duration::from_micros(1_000));
        record("replay", Duration::from_micros(2_000));
        record("overlap", Duration::from_micros(10));

        let report = drain_report();
        let names: Vec<&str> = report.stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(names, ["overlap", "replay"]);
        let replay = &report.stages[1];
        assert_eq!(replay.p50, Duration::from_micros(2_000));
        assert_eq!(replay.p99, Duration::from_micros(3_000));
    }

    #[test]
    fn report_renders_table_and_json() {
        let _guard = GUARD.lock().expect("guard");
        clear_samples();
        record("extract", Duration::from_micros(1_500));
        let report = drain_report();

        assert!(report.to_table().contains("extract"));
        let json = serde_json::to_value(&report).expect("serialize report");
        assert_eq!(json["stages"][0]["p50_us"], 1_500);
        assert_eq!(json["stages"][0]["samples"], 1);
    }

    #[test]
    fn truthy_values() {
        assert!(is_truthy("ON"));
        assert!(is_truthy(" yes "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
    }
}
