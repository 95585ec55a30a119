//! Seeded campaigns over generated corpora.
//!
//! Runs the oracle for every seed in a range and records the first failing
//! seed so it can be replayed in isolation with [`replay_seed`].

use std::collections::BTreeMap;
use std::ops::Range;

use anyhow::{Result, bail};
use serde::Serialize;
use tideline_core::DiagnosticCode;
use tideline_core::issue::AnalysisRequest;
use tideline_core::report::{FlowReport, analyze_issues};
use tideline_core::time::format_timestamp;

use crate::corpus::{CorpusConfig, SimCorpus, generate_corpus};
use crate::oracle::{InvariantViolation, OracleResult, check_corpus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignConfig {
    pub seed_range: Range<u64>,
    pub corpus: CorpusConfig,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            seed_range: 0..64,
            corpus: CorpusConfig::default(),
        }
    }
}

impl CampaignConfig {
    /// # Errors
    ///
    /// Returns an error if the seed range is empty, no issues would be
    /// generated, or the noise rate is not a percentage.
    pub fn validate(&self) -> Result<()> {
        if self.seed_range.is_empty() {
            bail!("seed_range must not be empty");
        }
        if self.corpus.issue_count == 0 {
            bail!("issue_count must be > 0");
        }
        if self.corpus.noise_percent > 100 {
            bail!("noise_percent must be within 0..=100");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedFailure {
    pub seed: u64,
    pub violations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignReport {
    pub seeds_run: usize,
    pub seeds_passed: usize,
    pub first_failure: Option<u64>,
    pub failures: Vec<SeedFailure>,
    /// Diagnostics raised across all seeds, by code.
    pub diagnostics: BTreeMap<DiagnosticCode, u64>,
}

impl CampaignReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything known about one seed, for debugging a failure.
#[derive(Debug, Clone)]
pub struct DetailedTrace {
    pub corpus: SimCorpus,
    pub report: FlowReport,
    pub oracle: OracleResult,
}

/// # Errors
///
/// Returns an error when the config fails validation.
pub fn run_campaign(config: &CampaignConfig) -> Result<CampaignReport> {
    config.validate()?;

    let mut report = CampaignReport {
        seeds_run: 0,
        seeds_passed: 0,
        first_failure: None,
        failures: Vec::new(),
        diagnostics: BTreeMap::new(),
    };

    for seed in config.seed_range.clone() {
        report.seeds_run += 1;
        let trace = trace_seed(seed, config);

        for (code, count) in &trace.report.diagnostics {
            *report.diagnostics.entry(*code).or_default() += count;
        }

        if trace.oracle.passed {
            report.seeds_passed += 1;
        } else {
            tracing::warn!(seed, violations = trace.oracle.violations.len(), "seed failed");
            report.first_failure.get_or_insert(seed);
            report.failures.push(SeedFailure {
                seed,
                violations: trace.oracle.violations.iter().map(format_violation).collect(),
            });
        }
    }

    tracing::info!(
        seeds = report.seeds_run,
        passed = report.seeds_passed,
        "campaign finished"
    );
    Ok(report)
}

/// Oracle verdict for one seed.
#[must_use]
pub fn run_single_seed(seed: u64, config: &CampaignConfig) -> OracleResult {
    check_corpus(&generate_corpus(seed, &config.corpus))
}

/// Regenerate one seed with its corpus and report attached.
///
/// # Errors
///
/// Returns an error when the config fails validation.
pub fn replay_seed(seed: u64, config: &CampaignConfig) -> Result<DetailedTrace> {
    config.validate()?;
    Ok(trace_seed(seed, config))
}

fn trace_seed(seed: u64, config: &CampaignConfig) -> DetailedTrace {
    let corpus = generate_corpus(seed, &config.corpus);
    let request = AnalysisRequest::status(&corpus.config, corpus.window, corpus.now);
    let report = analyze_issues(&corpus.issues, &request);
    let oracle = check_corpus(&corpus);
    DetailedTrace {
        corpus,
        report,
        oracle,
    }
}

fn format_violation(v: &InvariantViolation) -> String {
    match v {
        InvariantViolation::Contiguity { key, gap_at } => {
            format!("Contiguity: {key} has a gap after segment {gap_at}")
        }
        InvariantViolation::Conservation {
            key,
            status_total_ms,
            expected_ms,
        } => format!(
            "Conservation: {key} status totals {status_total_ms}ms, window overlap {expected_ms}ms"
        ),
        InvariantViolation::FlowOrdering {
            key,
            lead_ms,
            cycle_ms,
            wait_ms,
        } => format!("FlowOrdering: {key} lead={lead_ms} cycle={cycle_ms} wait={wait_ms}"),
        InvariantViolation::DoneOutsideScope { step, key } => {
            format!("DoneOutsideScope: {key} done but not in scope after step {step}")
        }
        InvariantViolation::ReplayNondeterministic => {
            "ReplayNondeterministic: two replays of one payload differ".to_string()
        }
        InvariantViolation::CompletedAboveScope { timestamp } => {
            format!(
                "CompletedAboveScope: completed exceeds scope at {}",
                format_timestamp(*timestamp)
            )
        }
        InvariantViolation::MergeOrder => {
            "MergeOrder: report totals depend on fold order".to_string()
        }
        InvariantViolation::DailySeries { timestamp, value } => {
            format!(
                "DailySeries: bad point {value} at {}",
                format_timestamp(*timestamp)
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_seed_range_is_rejected() {
        let config = CampaignConfig {
            seed_range: 5..5,
            ..CampaignConfig::default()
        };
        assert!(run_campaign(&config).is_err());
    }

    #[test]
    fn small_campaign_passes() {
        let config = CampaignConfig {
            seed_range: 0..8,
            ..CampaignConfig::default()
        };
        let report = run_campaign(&config).expect("campaign");
        assert_eq!(report.seeds_run, 8);
        assert!(report.all_passed(), "{:?}", report.failures);
        assert_eq!(report.first_failure, None);
    }

    #[test]
    fn replayed_seed_matches_campaign_verdict() {
        let config = CampaignConfig::default();
        let trace = replay_seed(3, &config).expect("replay");
        assert_eq!(trace.oracle, run_single_seed(3, &config));
        assert_eq!(trace.report.issues(), config.corpus.issue_count as u64);
    }

    #[test]
    fn violations_format_readably() {
        let text = format_violation(&InvariantViolation::DoneOutsideScope {
            step: 2,
            key: "SIM-1".into(),
        });
        assert_eq!(text, "DoneOutsideScope: SIM-1 done but not in scope after step 2");

        let text = format_violation(&InvariantViolation::CompletedAboveScope { timestamp: 0 });
        assert_eq!(
            text,
            "CompletedAboveScope: completed exceeds scope at 1970-01-01T00:00:00+00:00"
        );
    }
}
