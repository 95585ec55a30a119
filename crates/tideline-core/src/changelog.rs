//! Field change extraction from raw issue changelogs.
//!
//! A changelog is a list of revisions, each stamped with a creation time and
//! carrying zero or more field deltas. Extraction keeps only the deltas for
//! one field, drops revisions whose timestamp cannot be read, and returns the
//! events in ascending time order.
//!
//! Changelog pages arrive in no guaranteed order, so the result is sorted
//! with a stable sort: events sharing a timestamp keep the order in which
//! they were emitted.

use serde::{Deserialize, Serialize};

use crate::error::{Diagnostic, DiagnosticCode};
use crate::time::{EpochMillis, timestamp_from_value};

/// One revision of an issue's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Revision {
    /// Revision timestamp; string or epoch milliseconds.
    #[serde(default)]
    pub created: Option<serde_json::Value>,
    #[serde(default)]
    pub items: Vec<FieldDelta>,
}

/// One field change inside a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDelta {
    pub field: String,
    #[serde(default, rename = "fromString")]
    pub from_value: Option<String>,
    #[serde(default, rename = "toString")]
    pub to_value: Option<String>,
}

impl Revision {
    /// Convenience constructor used by fixtures and generators.
    #[must_use]
    pub fn at(created: &str, items: Vec<FieldDelta>) -> Self {
        Self {
            created: Some(serde_json::Value::String(created.to_string())),
            items,
        }
    }
}

impl FieldDelta {
    #[must_use]
    pub fn new(field: &str, from: Option<&str>, to: Option<&str>) -> Self {
        Self {
            field: field.to_string(),
            from_value: from.map(str::to_string),
            to_value: to.map(str::to_string),
        }
    }
}

/// A single normalized change of one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub field: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub at: EpochMillis,
}

/// Extraction result plus the revisions that had to be dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub events: Vec<ChangeEvent>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Extract the changes of `field` (case-insensitive) from `revisions`.
///
/// Empty `fromString`/`toString` values are normalized to `None`. A revision
/// whose timestamp is missing or unparseable is dropped; a diagnostic is
/// recorded only when the dropped revision actually touched `field`.
#[must_use]
pub fn extract_field_events(revisions: &[Revision], field: &str) -> Extraction {
    let mut out = Extraction::default();

    for revision in revisions {
        let matching: Vec<&FieldDelta> = revision
            .items
            .iter()
            .filter(|delta| delta.field.trim().eq_ignore_ascii_case(field.trim()))
            .collect();
        if matching.is_empty() {
            continue;
        }

        let Some(at) = revision.created.as_ref().and_then(timestamp_from_value) else {
            out.diagnostics.push(Diagnostic::new(
                DiagnosticCode::UnparseableTimestamp,
                Some(field),
                format!("revision created = {}", describe(revision.created.as_ref())),
            ));
            continue;
        };

        for delta in matching {
            out.events.push(ChangeEvent {
                field: delta.field.clone(),
                from: non_empty(delta.from_value.as_deref()),
                to: non_empty(delta.to_value.as_deref()),
                at,
            });
        }
    }

    out.events.sort_by_key(|event| event.at);
    out
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

fn describe(value: Option<&serde_json::Value>) -> String {
    value.map_or_else(|| "<missing>".to_string(), ToString::to_string)
}
