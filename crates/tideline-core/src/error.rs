//! Diagnostic codes and the typed errors of the few fallible entry points.
//!
//! Degradations surface as [`Diagnostic`]s with stable `D####` codes.

use std::fmt;

use serde::{Serialize, Serializer};

/// Machine-readable codes for the degradations the engine tolerates.
///
/// Nothing in the reconstruction pipeline fails hard on bad input; instead
/// each tolerated defect is reported as a [`Diagnostic`] carrying one of
/// these codes so the calling layer can decide what to tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticCode {
    UnparseableTimestamp,
    UnknownStatus,
    ChangesUnavailable,
    IndeterminateFlag,
    UnparseableChangeKey,
    EmptyMembership,
}

impl DiagnosticCode {
    /// Stable code identifier (`D####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::UnparseableTimestamp => "D1001",
            Self::UnknownStatus => "D2001",
            Self::ChangesUnavailable => "D3001",
            Self::IndeterminateFlag => "D3002",
            Self::UnparseableChangeKey => "D3003",
            Self::EmptyMembership => "D4001",
        }
    }

    /// Short human-facing summary for logs.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::UnparseableTimestamp => "Revision dropped: timestamp missing or unparseable",
            Self::UnknownStatus => "Status has no category mapping",
            Self::ChangesUnavailable => "Scope payload has no change log",
            Self::IndeterminateFlag => "Flag value is neither truthy nor falsy",
            Self::UnparseableChangeKey => "Change bucket dropped: timestamp key unparseable",
            Self::EmptyMembership => "No issue was a sprint member inside the window",
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::UnparseableTimestamp => {
                Some("Check the changelog export; revisions need a `created` timestamp.")
            }
            Self::UnknownStatus => Some("Add the status to the [categories] table in config.toml."),
            Self::ChangesUnavailable => {
                Some("Fall back to the daily reconstruction or show \"no data\".")
            }
            Self::IndeterminateFlag => None,
            Self::UnparseableChangeKey => None,
            Self::EmptyMembership => Some("Verify the sprint name matches the sprint field values."),
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// A tolerated input defect, returned alongside the result it affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    /// Issue key, status name, or change key the defect belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub detail: String,
}

impl Diagnostic {
    /// Build a diagnostic and log it at `warn` level.
    #[must_use]
    pub fn new(code: DiagnosticCode, subject: Option<&str>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        tracing::warn!(
            code = code.code(),
            subject = subject.unwrap_or(""),
            %detail,
            "{}",
            code.message()
        );
        Self {
            code,
            subject: subject.map(str::to_string),
            detail,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject {
            Some(subject) => write!(f, "{} [{subject}]: {}", self.code, self.detail),
            None => write!(f, "{}: {}", self.code, self.detail),
        }
    }
}
