#![allow(dead_code)]

use std::collections::BTreeMap;

use tideline_core::IssueRecord;
use tideline_core::changelog::{FieldDelta, Revision};
use tideline_core::scope::{ScopeChangeEvent, ScopeChangePayload};
use tideline_core::time::{EpochMillis, MILLIS_PER_DAY, ReportingWindow};

#[derive(Clone, Copy, Debug)]
pub struct BenchmarkTier {
    pub name: &'static str,
    pub issue_count: usize,
    pub changes_per_issue: usize,
}

pub const TIER_S: BenchmarkTier = BenchmarkTier {
    name: "S",
    issue_count: 100,
    changes_per_issue: 8,
};

pub const TIER_M: BenchmarkTier = BenchmarkTier {
    name: "M",
    issue_count: 1_000,
    changes_per_issue: 16,
};

pub const TIER_L: BenchmarkTier = BenchmarkTier {
    name: "L",
    issue_count: 10_000,
    changes_per_issue: 32,
};

pub const TIERS: [BenchmarkTier; 3] = [TIER_S, TIER_M, TIER_L];

/// 2024-01-01T00:00:00Z
pub const BASE: EpochMillis = 1_704_067_200_000;

const STATUSES: [&str; 5] = ["Open", "Doing", "Review", "Blocked", "Done"];

#[derive(Clone, Copy, Debug)]
struct Prng(u64);

impl Prng {
    fn next_u64(&mut self) -> u64 {
        // 64-bit LCG constants from Numerical Recipes.
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0
    }

    fn below(&mut self, upper_exclusive: u64) -> u64 {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u64() >> 16) % upper_exclusive
    }
}

pub fn bench_window() -> ReportingWindow {
    ReportingWindow {
        start: BASE,
        end: BASE + 60 * MILLIS_PER_DAY,
    }
}

pub fn generate_issues(tier: BenchmarkTier, seed: u64) -> Vec<IssueRecord> {
    let mut rng = Prng(seed);
    (0..tier.issue_count)
        .map(|n| {
            let created = BASE + rng.below(10 * MILLIS_PER_DAY as u64) as i64;
            let mut at = created;
            let mut current = STATUSES[0];
            let changelog = (0..tier.changes_per_issue)
                .map(|_| {
                    at += rng.below(2 * MILLIS_PER_DAY as u64) as i64 + 1;
                    let next = STATUSES[rng.below(STATUSES.len() as u64) as usize];
                    let revision = Revision {
                        created: Some(serde_json::json!(at)),
                        items: vec![FieldDelta::new("status", Some(current), Some(next))],
                    };
                    current = next;
                    revision
                })
                .collect();
            IssueRecord {
                key: format!("B-{n}"),
                created: Some(serde_json::json!(created)),
                changelog,
                ..IssueRecord::default()
            }
        })
        .collect()
}

pub fn generate_payload(tier: BenchmarkTier, seed: u64) -> ScopeChangePayload {
    let mut rng = Prng(seed);
    let start = 10_000;
    let end = start + 14 * MILLIS_PER_DAY;
    let key_count = tier.issue_count as u64;
    let mut changes: BTreeMap<String, Vec<ScopeChangeEvent>> = BTreeMap::new();

    for _ in 0..tier.issue_count * tier.changes_per_issue / 4 {
        let ts = rng.below((end + MILLIS_PER_DAY) as u64);
        let key = format!("B-{}", rng.below(key_count));
        let event = match rng.below(4) {
            0 => ScopeChangeEvent::new(&key).added(),
            1 => ScopeChangeEvent::new(&key).removed(),
            2 => ScopeChangeEvent::new(&key).column_done(),
            _ => ScopeChangeEvent::new(&key).column_not_done(),
        };
        changes.entry(ts.to_string()).or_default().push(event);
    }

    ScopeChangePayload {
        start_time: start,
        end_time: end,
        now: None,
        final_key_set: (0..key_count).map(|n| format!("B-{n}")).collect(),
        changes: Some(changes),
        work_rate_data: None,
    }
}
