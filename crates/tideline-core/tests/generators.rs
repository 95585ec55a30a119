#![allow(dead_code)]

use std::collections::BTreeMap;

use proptest::prelude::*;
use tideline_core::changelog::ChangeEvent;
use tideline_core::scope::{ScopeChangeEvent, ScopeChangePayload};
use tideline_core::time::{EpochMillis, MILLIS_PER_DAY, ReportingWindow};

pub const STATUSES: [&str; 5] = ["Open", "Doing", "Review", "Done", "Limbo"];
pub const KEYS: [&str; 6] = ["K-0", "K-1", "K-2", "K-3", "K-4", "K-5"];

/// 2024-01-01T00:00:00Z
pub const BASE: EpochMillis = 1_704_067_200_000;

/// A status history whose events all fall between creation and cutoff.
#[derive(Debug, Clone)]
pub struct History {
    pub created: EpochMillis,
    pub initial: String,
    pub events: Vec<ChangeEvent>,
    pub cutoff: EpochMillis,
}

pub fn arb_history() -> impl Strategy<Value = History> + Clone {
    (
        0i64..10 * MILLIS_PER_DAY,
        0usize..STATUSES.len(),
        prop::collection::vec((0i64..3 * MILLIS_PER_DAY, 0usize..STATUSES.len()), 0..16),
        0i64..2 * MILLIS_PER_DAY,
    )
        .prop_map(|(offset, initial, steps, tail)| {
            let created = BASE + offset;
            let mut at = created;
            let mut current = STATUSES[initial].to_string();
            let mut events = Vec::with_capacity(steps.len());
            for (gap, status) in steps {
                at += gap;
                let next = STATUSES[status].to_string();
                events.push(ChangeEvent {
                    field: "status".into(),
                    from: Some(current.clone()),
                    to: Some(next.clone()),
                    at,
                });
                current = next;
            }
            History {
                created,
                initial: STATUSES[initial].to_string(),
                events,
                cutoff: at + tail,
            }
        })
}

pub fn arb_window() -> impl Strategy<Value = ReportingWindow> + Clone {
    (0i64..20 * MILLIS_PER_DAY, 0i64..30 * MILLIS_PER_DAY).prop_map(|(offset, len)| {
        ReportingWindow {
            start: BASE + offset,
            end: BASE + offset + len,
        }
    })
}

pub fn arb_scope_event() -> impl Strategy<Value = ScopeChangeEvent> + Clone {
    (0usize..KEYS.len(), 0u8..7).prop_map(|(key, kind)| {
        let event = ScopeChangeEvent::new(KEYS[key]);
        match kind {
            0 => event.added(),
            1 => event.removed(),
            2 => event.column_done(),
            3 => event.column_not_done(),
            4 => ScopeChangeEvent {
                deleted: Some(serde_json::json!(1)),
                ..event
            },
            5 => ScopeChangeEvent {
                done: Some(serde_json::json!("true")),
                ..event
            },
            _ => ScopeChangeEvent {
                not_done: Some(serde_json::json!(true)),
                ..event
            },
        }
    })
}

pub fn arb_payload() -> impl Strategy<Value = ScopeChangePayload> + Clone {
    (
        1_000i64..3_000,
        5_000i64..9_000,
        prop::collection::btree_set(0usize..KEYS.len(), 0..KEYS.len()),
        prop::collection::vec((0i64..10_000, arb_scope_event()), 0..40),
    )
        .prop_map(|(start, end, keys, events)| {
            let mut changes: BTreeMap<String, Vec<ScopeChangeEvent>> = BTreeMap::new();
            for (ts, event) in events {
                changes.entry(ts.to_string()).or_default().push(event);
            }
            ScopeChangePayload {
                start_time: start,
                end_time: end,
                now: None,
                final_key_set: keys.into_iter().map(|k| KEYS[k].to_string()).collect(),
                changes: Some(changes),
                work_rate_data: None,
            }
        })
}
