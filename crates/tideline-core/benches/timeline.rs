mod support;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use support::{TIERS, bench_window, generate_issues};
use tideline_core::category::CategorySet;
use tideline_core::config::AnalyticsConfig;
use tideline_core::{AnalysisRequest, analyze_issue, analyze_issues};

fn config() -> AnalyticsConfig {
    AnalyticsConfig {
        categories: CategorySet::new()
            .with("Open", &["wait"])
            .with("Doing", &["work"])
            .with("Review", &["review", "work"])
            .with("Blocked", &["wait"])
            .with("Done", &["done"]),
        ..AnalyticsConfig::default()
    }
}

fn bench_timeline(c: &mut Criterion) {
    let config = config();
    let window = bench_window();
    let request = AnalysisRequest::status(&config, window, window.end);
    let mut group = c.benchmark_group("timeline.tiered");

    for tier in TIERS {
        let issues = generate_issues(tier, 0x71DE_u64 + tier.issue_count as u64);
        group.throughput(Throughput::Elements(issues.len() as u64));

        group.bench_with_input(BenchmarkId::new("analyze_each", tier.name), &issues, |b, issues| {
            b.iter(|| {
                issues
                    .iter()
                    .map(|issue| black_box(analyze_issue(issue, &request)).segments.len())
                    .sum::<usize>()
            });
        });

        group.bench_with_input(BenchmarkId::new("report", tier.name), &issues, |b, issues| {
            b.iter(|| black_box(analyze_issues(issues, &request)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_timeline);
criterion_main!(benches);
