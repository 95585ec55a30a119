//! Normalization of loosely-typed flag values.
//!
//! The feed encodes booleans as JSON booleans, numbers, or strings
//! depending on the server version. Every flag read in the replayer goes
//! through [`normalize_flag`]; the done/not-done decision for a change is
//! made once in [`done_decision`].

use serde_json::Value;

use super::payload::ScopeChangeEvent;

/// Tri-state reading of a raw flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    True,
    False,
    /// Present but neither truthy nor falsy, or absent.
    Indeterminate,
}

impl Flag {
    /// Indeterminate flags read as false.
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::False)
    }
}

/// Read `true`/`"true"`/`1`/`"1"` as true and `false`/`"false"`/`0`/`"0"`
/// as false. Numbers compare by value, so `1.0` and `0.0` count too.
/// Everything else, including a missing value, is indeterminate.
#[must_use]
pub fn normalize_flag(value: Option<&Value>) -> Flag {
    match value {
        Some(Value::Bool(true)) => Flag::True,
        Some(Value::Bool(false)) => Flag::False,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if (f - 1.0).abs() < f64::EPSILON => Flag::True,
            Some(f) if f.abs() < f64::EPSILON => Flag::False,
            _ => Flag::Indeterminate,
        },
        Some(Value::String(s)) => match s.as_str() {
            "true" | "1" => Flag::True,
            "false" | "0" => Flag::False,
            _ => Flag::Indeterminate,
        },
        _ => Flag::Indeterminate,
    }
}

/// What a change says about an issue's done state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneDecision {
    Done,
    NotDone,
    Unchanged,
}

/// Decide the done transition carried by `event`.
///
/// A column move wins over top-level flags. For a column move, `done`
/// truthy or `notDone` falsy means done; `notDone` truthy or `done` falsy
/// means not done. Top-level `done` truthy means done and top-level
/// `notDone` truthy means not done.
#[must_use]
pub fn done_decision(event: &ScopeChangeEvent) -> DoneDecision {
    if let Some(column) = &event.column {
        let done = normalize_flag(column.done.as_ref());
        let not_done = normalize_flag(column.not_done.as_ref());
        if done.is_true() || not_done.is_false() {
            return DoneDecision::Done;
        }
        if not_done.is_true() || done.is_false() {
            return DoneDecision::NotDone;
        }
    }

    if normalize_flag(event.done.as_ref()).is_true() {
        return DoneDecision::Done;
    }
    if normalize_flag(event.not_done.as_ref()).is_true() {
        return DoneDecision::NotDone;
    }
    DoneDecision::Unchanged
}

/// Names of flags on `event` that are present but indeterminate.
#[must_use]
pub fn indeterminate_flags(event: &ScopeChangeEvent) -> Vec<&'static str> {
    let column = event.column.as_ref();
    [
        ("added", event.added.as_ref()),
        ("removed", event.removed.as_ref()),
        ("deleted", event.deleted.as_ref()),
        ("done", event.done.as_ref()),
        ("notDone", event.not_done.as_ref()),
        ("column.done", column.and_then(|c| c.done.as_ref())),
        ("column.notDone", column.and_then(|c| c.not_done.as_ref())),
    ]
    .into_iter()
    .filter(|&(_, value)| {
        value.is_some_and(|v| !v.is_null()) && normalize_flag(value) == Flag::Indeterminate
    })
    .map(|(name, _)| name)
    .collect()
}
