#![forbid(unsafe_code)]

use anyhow::Result;
use tideline_core::config::resolve_config;
use tideline_core::timing::{drain_report, set_timing_enabled};
use tideline_sim::{CampaignConfig, init_tracing, run_campaign};

fn main() -> Result<()> {
    init_tracing();
    let effective = resolve_config(&std::env::current_dir()?)?;
    set_timing_enabled(effective.timing);

    let report = run_campaign(&CampaignConfig::default())?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let latency = drain_report();
    if !latency.is_empty() {
        eprint!("{}", latency.to_table());
    }

    if !report.all_passed() {
        anyhow::bail!(
            "{} of {} seeds failed; first failure: {:?}",
            report.failures.len(),
            report.seeds_run,
            report.first_failure
        );
    }
    Ok(())
}
