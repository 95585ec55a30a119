//! Scope membership state and its single-event reducer.
//!
//! Counts are derived from the sets rather than tracked separately, and
//! every mutation that removes a key from scope also removes it from done,
//! so `done ⊆ in_scope` holds after every step.

use std::collections::BTreeSet;

use serde::Serialize;

use super::flag::{DoneDecision, done_decision, normalize_flag};
use super::payload::ScopeChangeEvent;
use super::series::MarkerOperation;

/// Which aggregate a [`Transition`] moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Scope,
    Done,
}

/// An observed change of one aggregate count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub metric: Metric,
    pub from: usize,
    pub to: usize,
    pub operation: MarkerOperation,
}

/// Keys currently in scope and the subset currently done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScopeReplayState {
    in_scope: BTreeSet<String>,
    done: BTreeSet<String>,
}

impl ScopeReplayState {
    /// State with `keys` in scope and nothing done.
    #[must_use]
    pub fn seeded<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            in_scope: keys.into_iter().map(Into::into).collect(),
            done: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.in_scope.len()
    }

    #[must_use]
    pub fn done_count(&self) -> usize {
        self.done.len()
    }

    #[must_use]
    pub fn in_scope(&self, key: &str) -> bool {
        self.in_scope.contains(key)
    }

    #[must_use]
    pub fn is_done(&self, key: &str) -> bool {
        self.done.contains(key)
    }

    /// True when every done key is in scope.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.done.is_subset(&self.in_scope)
    }

    /// Apply one change and report the count transitions it caused.
    ///
    /// Order within an event: removal/deletion, then addition, then the
    /// done decision. Marking a key done pulls it into scope first.
    pub fn apply(&mut self, event: &ScopeChangeEvent) -> Vec<Transition> {
        let mut transitions = Vec::new();
        let key = event.key.as_str();

        let removed = normalize_flag(event.removed.as_ref()).is_true()
            || normalize_flag(event.deleted.as_ref()).is_true();
        if removed {
            self.remove(key, &mut transitions);
        }

        if normalize_flag(event.added.as_ref()).is_true() {
            self.add(key, &mut transitions);
        }

        match done_decision(event) {
            DoneDecision::Done => {
                self.add(key, &mut transitions);
                self.mark_done(key, &mut transitions);
            }
            DoneDecision::NotDone => self.unmark_done(key, &mut transitions),
            DoneDecision::Unchanged => {}
        }

        debug_assert!(self.is_consistent());
        transitions
    }

    /// Consuming form of [`apply`](Self::apply), discarding transitions.
    #[must_use]
    pub fn step(mut self, event: &ScopeChangeEvent) -> Self {
        let _ = self.apply(event);
        self
    }

    fn add(&mut self, key: &str, out: &mut Vec<Transition>) {
        let before = self.scope_count();
        if self.in_scope.insert(key.to_string()) {
            out.push(Transition {
                metric: Metric::Scope,
                from: before,
                to: self.scope_count(),
                operation: MarkerOperation::Added,
            });
        }
    }

    fn remove(&mut self, key: &str, out: &mut Vec<Transition>) {
        self.unmark_done(key, out);
        let before = self.scope_count();
        if self.in_scope.remove(key) {
            out.push(Transition {
                metric: Metric::Scope,
                from: before,
                to: self.scope_count(),
                operation: MarkerOperation::Removed,
            });
        }
    }

    fn mark_done(&mut self, key: &str, out: &mut Vec<Transition>) {
        let before = self.done_count();
        if self.done.insert(key.to_string()) {
            out.push(Transition {
                metric: Metric::Done,
                from: before,
                to: self.done_count(),
                operation: MarkerOperation::Completed,
            });
        }
    }

    fn unmark_done(&mut self, key: &str, out: &mut Vec<Transition>) {
        let before = self.done_count();
        if self.done.remove(key) {
            out.push(Transition {
                metric: Metric::Done,
                from: before,
                to: self.done_count(),
                operation: MarkerOperation::Reopened,
            });
        }
    }
}
