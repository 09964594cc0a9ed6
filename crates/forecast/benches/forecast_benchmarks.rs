use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use bloodline_core::RegionCatalog;
use bloodline_forecast::{
    DemandRecord, Forecaster, ForecasterConfig, ForestParams, GenerateRequest, SyntheticHistory,
};
use chrono::{DateTime, TimeZone, Utc};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 0, 0, 0).unwrap()
}

fn history(days: u32) -> Vec<DemandRecord> {
    SyntheticHistory::default()
        .with_days(days)
        .generate(&RegionCatalog::default(), now())
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);

    for days in [90u32, 365] {
        let records = history(days);
        group.bench_with_input(BenchmarkId::new("fit_forest", days), &records, |b, records| {
            b.iter(|| {
                let forecaster = Forecaster::new(ForecasterConfig::default());
                forecaster.train(black_box(records), true, now()).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    group.sample_size(20);

    let forecaster = Forecaster::new(
        ForecasterConfig::default().with_forest(ForestParams::default().with_trees(50)),
    );
    forecaster.train(&history(365), false, now()).unwrap();

    // 8 blood types x 8 regions x 7 daily slices.
    for hours in [24u32, 168] {
        group.bench_with_input(BenchmarkId::new("full_catalog", hours), &hours, |b, &hours| {
            b.iter(|| {
                let req = GenerateRequest::new(now(), black_box(hours));
                forecaster.generate(&req, |_, _| 50).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_generate);
criterion_main!(benches);
