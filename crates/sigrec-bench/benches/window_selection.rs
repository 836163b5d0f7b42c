// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sigrec_bench::bursty_channels;
use sigrec_core::{AlignmentPolicy, AnalysisTool, MultiChannelSeries};
use sigrec_window::{EntropyConfig, EntropyProfiler, TrainingWindowSelector};

fn benchmark_window_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_selection");
    group.sample_size(20);

    for &(n, d) in &[(10_000_usize, 1_usize), (10_000, 4), (50_000, 4)] {
        let channels = bursty_channels(n, d, 0x5EED);
        let selector = TrainingWindowSelector::with_params(300, 3, 3, 0.05)
            .expect("benchmark selector config should be valid");
        group.bench_with_input(
            BenchmarkId::new("select", format!("n{n}_d{d}")),
            &channels,
            |b, channels| {
                b.iter(|| {
                    selector
                        .call(black_box(channels))
                        .expect("window selection should succeed");
                })
            },
        );
    }

    let channels = bursty_channels(50_000, 4, 0xFACE);
    let series = MultiChannelSeries::align(channels, AlignmentPolicy::SharedAxis)
        .expect("benchmark channels should align");
    let profiler =
        EntropyProfiler::new(EntropyConfig::default()).expect("entropy config should be valid");
    group.bench_function("entropy_profile_n50000_d4", |b| {
        b.iter(|| profiler.profile(black_box(&series)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_window_selection);
criterion_main!(benches);
