//! Synthetic issue histories and scope payloads.
//!
//! Corpora are noisy on purpose: unreadable timestamps, unmapped statuses,
//! stringly-typed flags, and change buckets outside the sprint all show up
//! at the configured rate, so the oracle exercises the degradation paths
//! as well as the happy path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tideline_core::IssueRecord;
use tideline_core::category::CategorySet;
use tideline_core::changelog::{FieldDelta, Revision};
use tideline_core::config::AnalyticsConfig;
use tideline_core::issue::RawWorkLog;
use tideline_core::scope::{ColumnChange, ScopeChangeEvent, ScopeChangePayload};
use tideline_core::time::{EpochMillis, MILLIS_PER_DAY, ReportingWindow};

use crate::rng::DeterministicRng;

/// 2024-01-01T00:00:00Z
pub const EPOCH: EpochMillis = 1_704_067_200_000;

const MAPPED: [&str; 5] = ["Open", "In Progress", "Code Review", "Blocked", "Done"];
const UNMAPPED: [&str; 2] = ["Limbo", "Needs Info"];
const SPRINTS: [&str; 3] = ["Sprint 6", "Sprint 7", "Sprint 8"];

/// Sprint the generated daily path tracks.
pub const TRACKED_SPRINT: &str = "Sprint 7";

/// Knobs for one generated corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusConfig {
    pub issue_count: usize,
    pub max_changes: usize,
    /// Percent of revisions, flags, and bucket keys made deliberately messy.
    pub noise_percent: u8,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            issue_count: 24,
            max_changes: 12,
            noise_percent: 10,
        }
    }
}

/// Everything one campaign seed analyzes.
#[derive(Debug, Clone)]
pub struct SimCorpus {
    pub seed: u64,
    pub config: AnalyticsConfig,
    pub window: ReportingWindow,
    pub now: EpochMillis,
    pub issues: Vec<IssueRecord>,
    pub payload: ScopeChangePayload,
}

#[must_use]
pub fn analytics_config() -> AnalyticsConfig {
    AnalyticsConfig {
        categories: CategorySet::new()
            .with("Open", &["wait"])
            .with("In Progress", &["work"])
            .with("Code Review", &["review", "work"])
            .with("Blocked", &["wait"])
            .with("Done", &["done"]),
        ..AnalyticsConfig::default()
    }
}

#[must_use]
pub fn generate_corpus(seed: u64, config: &CorpusConfig) -> SimCorpus {
    let mut rng = DeterministicRng::new(seed);
    let window = ReportingWindow {
        start: EPOCH + 3 * MILLIS_PER_DAY,
        end: EPOCH + 17 * MILLIS_PER_DAY - 1,
    };
    let now = window.start + rng.millis_below(20 * MILLIS_PER_DAY);

    let issues = (0..config.issue_count)
        .map(|n| generate_issue(&mut rng, n, config))
        .collect();
    let payload = generate_payload(&mut rng, window, now, config);

    SimCorpus {
        seed,
        config: analytics_config(),
        window,
        now,
        issues,
        payload,
    }
}

fn status(rng: &mut DeterministicRng, noise: u8) -> &'static str {
    let pool: &[&'static str] = if rng.chance(noise) { &UNMAPPED } else { &MAPPED };
    rng.pick(pool).copied().unwrap_or("Open")
}

fn generate_issue(rng: &mut DeterministicRng, n: usize, config: &CorpusConfig) -> IssueRecord {
    let noise = config.noise_percent;
    let created = EPOCH + rng.millis_below(10 * MILLIS_PER_DAY);
    let max_changes = u64::try_from(config.max_changes).unwrap_or(0);
    let change_count = usize::try_from(rng.below(max_changes + 1)).unwrap_or(0);

    let mut at = created;
    let mut current = status(rng, noise);
    let mut sprints: Vec<&str> = Vec::new();
    let mut changelog = Vec::with_capacity(change_count);

    for _ in 0..change_count {
        at += 1 + rng.millis_below(2 * MILLIS_PER_DAY);
        let stamp = if rng.chance(noise) {
            json!("not a timestamp")
        } else {
            json!(at)
        };

        if rng.chance(25) {
            let before = sprints.join(", ");
            let sprint = rng.pick(&SPRINTS).copied().unwrap_or(TRACKED_SPRINT);
            if let Some(pos) = sprints.iter().position(|s| *s == sprint) {
                sprints.remove(pos);
            } else {
                sprints.push(sprint);
            }
            changelog.push(Revision {
                created: Some(stamp),
                items: vec![FieldDelta::new(
                    "Sprint",
                    Some(before.as_str()),
                    Some(sprints.join(", ").as_str()),
                )],
            });
            continue;
        }

        let next = status(rng, noise);
        changelog.push(Revision {
            created: Some(stamp),
            items: vec![FieldDelta::new("status", Some(current), Some(next))],
        });
        current = next;
    }

    // Changelog pages arrive unordered.
    if change_count > 1 && rng.chance(50) {
        changelog.reverse();
    }

    let worklogs = (0..rng.below(4))
        .map(|_| RawWorkLog {
            started: Some(json!(created + rng.millis_below(14 * MILLIS_PER_DAY))),
            time_spent_seconds: 900 * (1 + i64::try_from(rng.below(16)).unwrap_or(0)),
        })
        .collect();

    IssueRecord {
        key: format!("SIM-{n}"),
        fields: BTreeMap::from([
            ("status".to_string(), current.to_string()),
            ("Sprint".to_string(), sprints.join(", ")),
        ]),
        created: Some(json!(created)),
        resolved: None,
        updated: Some(json!(at)),
        changelog,
        worklogs,
    }
}

fn flag(rng: &mut DeterministicRng, noise: u8) -> serde_json::Value {
    if rng.chance(noise) {
        return json!("maybe");
    }
    match rng.below(4) {
        0 => json!(true),
        1 => json!("true"),
        2 => json!(1),
        _ => json!("1"),
    }
}

fn generate_payload(
    rng: &mut DeterministicRng,
    window: ReportingWindow,
    now: EpochMillis,
    config: &CorpusConfig,
) -> ScopeChangePayload {
    let noise = config.noise_percent;
    let keys: Vec<String> = (0..config.issue_count).map(|n| format!("SIM-{n}")).collect();
    let span = window.duration_ms();
    let mut changes: BTreeMap<String, Vec<ScopeChangeEvent>> = BTreeMap::new();

    for _ in 0..config.issue_count * 2 {
        let Some(key) = rng.pick(&keys).cloned() else {
            break;
        };
        let ts = window.start - span / 4 + rng.millis_below(span + span / 2);
        let bucket = if rng.chance(noise) {
            format!("t{ts}")
        } else {
            ts.to_string()
        };

        let mut event = ScopeChangeEvent::new(&key);
        match rng.below(6) {
            0 => event.added = Some(flag(rng, noise)),
            1 => event.removed = Some(flag(rng, noise)),
            2 => event.deleted = Some(flag(rng, noise)),
            3 => {
                event.column = Some(ColumnChange {
                    done: Some(flag(rng, noise)),
                    not_done: Some(json!(false)),
                    new_status: Some("Done".into()),
                });
            }
            4 => {
                event.column = Some(ColumnChange {
                    done: Some(json!(false)),
                    not_done: Some(flag(rng, noise)),
                    new_status: Some("In Progress".into()),
                });
            }
            _ => event.done = Some(flag(rng, noise)),
        }
        changes.entry(bucket).or_default().push(event);
    }

    let final_key_set = keys
        .iter()
        .filter(|_| rng.chance(70))
        .cloned()
        .collect();

    ScopeChangePayload {
        start_time: window.start,
        end_time: window.end,
        now: Some(now),
        final_key_set,
        changes: Some(changes),
        work_rate_data: None,
    }
}
