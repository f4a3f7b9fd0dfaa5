//! Criterion benchmarks for the tapdelay kernel and playback cycle
//!
//! Run with: cargo bench -p tapdelay-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use tapdelay_core::{
    CaptureSink, DelayKernel, DivisorGrowth, EffectParameters, I24, MemorySource,
    ParameterStore, PlaybackEngine, RingHistory, Sample, SourceReader, StopSignal,
};

const HISTORY_FRAMES: usize = 65536;
const PERIOD_SIZES: &[usize] = &[64, 256, 1024];
const TAP_COUNTS: &[u32] = &[1, 21, 100];

fn generate_test_signal<S: Sample>(len: usize) -> Vec<S> {
    (0..len)
        .map(|i| {
            let t = i as f32 / 48000.0;
            let x = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
            S::saturate((x * S::MAX as f32) as i32)
        })
        .collect()
}

/// A history with one loaded segment per period, ready for the kernel.
fn loaded_history<S: Sample>(period: usize, channels: usize) -> RingHistory<S> {
    let input = generate_test_signal::<S>(HISTORY_FRAMES * channels);
    let mut reader = SourceReader::new(MemorySource::from_samples(&input));
    let mut history = RingHistory::new(HISTORY_FRAMES, period, channels).unwrap();
    for _ in 0..history.segment_count() {
        history.load_next_segment(&mut reader);
        history.advance();
    }
    history
}

fn bench_kernel_i16(c: &mut Criterion) {
    let mut group = c.benchmark_group("DelayKernel/i16");

    for &period in PERIOD_SIZES {
        let history = loaded_history::<i16>(period, 2);
        let mut out = vec![0i16; period * 2];

        for &n_taps in TAP_COUNTS {
            let kernel = DelayKernel::new(EffectParameters {
                n_delay: 240,
                n_taps,
                alt_polarity: true,
                divisor_growth: DivisorGrowth::Linear,
            });
            group.bench_with_input(
                BenchmarkId::new(format!("taps={n_taps}"), period),
                &period,
                |b, _| {
                    b.iter(|| {
                        kernel.process_segment(black_box(&history), &mut out);
                        black_box(&out);
                    })
                },
            );
        }
    }

    group.finish();
}

fn bench_kernel_i24(c: &mut Criterion) {
    let mut group = c.benchmark_group("DelayKernel/i24");

    for &period in PERIOD_SIZES {
        let history = loaded_history::<I24>(period, 1);
        let mut out = vec![I24::default(); period];
        let kernel = DelayKernel::new(EffectParameters {
            divisor_growth: DivisorGrowth::Exponential,
            ..EffectParameters::STARTUP
        });

        group.bench_with_input(BenchmarkId::new("startup", period), &period, |b, _| {
            b.iter(|| {
                kernel.process_segment(black_box(&history), &mut out);
                black_box(&out);
            })
        });
    }

    group.finish();
}

fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("PlaybackEngine");
    group.sample_size(10);

    let input = generate_test_signal::<i16>(48000 * 2);
    for &period in PERIOD_SIZES {
        group.bench_with_input(BenchmarkId::new("one_second", period), &period, |b, &period| {
            b.iter(|| {
                let params = Arc::new(
                    ParameterStore::new(EffectParameters::STARTUP, HISTORY_FRAMES).unwrap(),
                );
                let mut engine = PlaybackEngine::new(
                    MemorySource::from_samples(&input),
                    CaptureSink::new(period, 2),
                    params,
                    StopSignal::new(),
                    2,
                )
                .unwrap();
                black_box(engine.run().unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kernel_i16, bench_kernel_i24, bench_session);
criterion_main!(benches);
