//! Scope-change payload as delivered by the sprint report feed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::time::EpochMillis;

use super::guideline::RateWindow;

/// Errors decoding a payload from JSON.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("scope payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A sprint's scope-change history.
///
/// `changes` is optional on purpose: a payload without it means the feed
/// could not provide history, which is different from "nothing changed".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeChangePayload {
    pub start_time: EpochMillis,
    pub end_time: EpochMillis,
    #[serde(default)]
    pub now: Option<EpochMillis>,
    /// Keys in the sprint at the end of the recorded history.
    #[serde(default, alias = "issueKeys")]
    pub final_key_set: Vec<String>,
    /// Events bucketed by timestamp (epoch milliseconds as a string key).
    #[serde(default)]
    pub changes: Option<BTreeMap<String, Vec<ScopeChangeEvent>>>,
    #[serde(default)]
    pub work_rate_data: Option<WorkRateData>,
}

impl ScopeChangePayload {
    /// Decode a payload from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Json`] when the text is not a payload.
    pub fn from_json(raw: &str) -> Result<Self, PayloadError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Rate windows, empty when the feed sent none.
    #[must_use]
    pub fn rates(&self) -> &[RateWindow] {
        match &self.work_rate_data {
            Some(data) => &data.rates,
            None => &[],
        }
    }
}

/// Working/non-working intervals for the guideline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkRateData {
    #[serde(default)]
    pub rates: Vec<RateWindow>,
}

/// One raw change record. Flag fields keep their raw JSON value; see
/// [`normalize_flag`](super::flag::normalize_flag).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeChangeEvent {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<ColumnChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_done: Option<serde_json::Value>,
}

/// Board column move attached to a change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_done: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_status: Option<String>,
}

impl ScopeChangeEvent {
    #[must_use]
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn added(mut self) -> Self {
        self.added = Some(serde_json::Value::Bool(true));
        self
    }

    #[must_use]
    pub fn removed(mut self) -> Self {
        self.removed = Some(serde_json::Value::Bool(true));
        self
    }

    #[must_use]
    pub fn column_done(mut self) -> Self {
        self.column = Some(ColumnChange {
            done: Some(serde_json::Value::Bool(true)),
            ..ColumnChange::default()
        });
        self
    }

    #[must_use]
    pub fn column_not_done(mut self) -> Self {
        self.column = Some(ColumnChange {
            not_done: Some(serde_json::Value::Bool(true)),
            ..ColumnChange::default()
        });
        self
    }
}
