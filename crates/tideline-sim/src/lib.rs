//! tideline-sim library.
//!
//! Deterministic corpus generation and an invariant oracle for
//! `tideline-core`, run as seeded campaigns.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for return types.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`). Binaries
//!   call [`init_tracing`] once at startup.

#![forbid(unsafe_code)]

pub mod campaign;
pub mod corpus;
pub mod oracle;
pub mod rng;

pub use campaign::{CampaignConfig, CampaignReport, replay_seed, run_campaign};
pub use corpus::{CorpusConfig, SimCorpus, generate_corpus};
pub use oracle::{InvariantViolation, OracleResult, check_corpus};
pub use rng::DeterministicRng;

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber filtered by `TIDELINE_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("TIDELINE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
