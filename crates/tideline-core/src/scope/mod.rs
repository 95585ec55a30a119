//! Sprint scope and completion series.
//!
//! Two interchangeable reconstructions produce a [`Burndown`]:
//!
//! - [`replay_scope`] replays the sprint report's scope-change feed with
//!   event-level accuracy.
//! - [`daily_burndown`] rebuilds day-granular series from issue histories
//!   when the feed is unavailable.
//!
//! Both attach a guideline from [`project_guideline`].

pub mod daily;
pub mod flag;
pub mod guideline;
pub mod payload;
pub mod replay;
pub mod series;
pub mod state;

pub use daily::{DailyRequest, Membership, SprintMember, WorkLog, daily_burndown};
pub use flag::{DoneDecision, Flag, done_decision, normalize_flag};
pub use guideline::{RateWindow, normalize_rate_windows, project_guideline, weekday_rate_windows};
pub use payload::{ColumnChange, PayloadError, ScopeChangeEvent, ScopeChangePayload, WorkRateData};
pub use replay::{ReplayOptions, ReplayOutcome, replay_scope, replay_scope_with};
pub use series::{Burndown, Marker, MarkerOperation, MarkerSet, SeriesPoint, SeriesSource};
pub use state::{Metric, ScopeReplayState, Transition};
