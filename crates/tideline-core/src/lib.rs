//! tideline-core library.
//!
//! Reconstructs how an issue's fields evolved over time and derives flow
//! metrics from that history:
//!
//! - [`changelog`] extracts per-field change events from raw revisions.
//! - [`segment`] turns events into contiguous value intervals.
//! - [`overlap`] clips intervals to a reporting window and totals them per
//!   status and category.
//! - [`flow`] derives lead, cycle, and wait time.
//! - [`scope`] rebuilds a sprint's scope and completed series, with an
//!   ideal guideline.
//!
//! [`issue`] and [`report`] run the per-issue pipeline and fold results
//! across issues.
//!
//! # Conventions
//!
//! - **Errors**: input defects never abort a computation; they surface as
//!   [`error::Diagnostic`]s. Only config loading returns `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`warn!`, `debug!`, `trace!`). The
//!   library never installs a subscriber.

#![forbid(unsafe_code)]

pub mod category;
pub mod changelog;
pub mod config;
pub mod error;
pub mod flow;
pub mod issue;
pub mod overlap;
pub mod report;
pub mod scope;
pub mod segment;
pub mod time;
pub mod timing;

pub use category::CategorySet;
pub use error::{Diagnostic, DiagnosticCode};
pub use issue::{AnalysisRequest, IssueAnalysis, IssueRecord, analyze_issue};
pub use report::{FlowAverages, FlowReport, analyze_issues};
pub use time::{EpochMillis, ReportingWindow};
