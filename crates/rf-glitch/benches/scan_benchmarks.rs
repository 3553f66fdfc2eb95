//! Scan Benchmarks
//!
//! Throughput of the single-pass analyzers at render-buffer and file sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rf_glitch::{
    AnalysisConfig, BoundaryPolicy, BufferBoundaryAnalyzer, DiscontinuityDetector,
    FidelityComparator, GlitchAnalyzer, PhaseContinuityAnalyzer, SampleStream,
};

const SAMPLE_RATE: f64 = 44100.0;
const SIZES: &[usize] = &[4096, 65536, 441000];

/// 440 Hz tone rendered in 512-sample blocks with a seam glitch every 8th block
fn render_like(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let tone = 0.8 * (2.0 * std::f64::consts::PI * 440.0 * i as f64 / SAMPLE_RATE).sin();
            if i % 4096 == 0 {
                tone * 0.5
            } else {
                tone
            }
        })
        .collect()
}

fn bench_discontinuity(c: &mut Criterion) {
    let mut group = c.benchmark_group("discontinuity");

    for &size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let samples = render_like(size);
        let detector = DiscontinuityDetector::new(0.1)
            .with_frames(512, BoundaryPolicy::IncludeAndTag)
            .unwrap();

        group.bench_with_input(BenchmarkId::new("detect", size), &size, |b, _| {
            b.iter(|| black_box(detector.detect(0, black_box(&samples), SAMPLE_RATE)))
        });
    }

    group.finish();
}

fn bench_boundary(c: &mut Criterion) {
    let mut group = c.benchmark_group("boundary");

    for &size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let samples = render_like(size);
        let analyzer = BufferBoundaryAnalyzer::new(512, 0.01).unwrap();

        group.bench_with_input(BenchmarkId::new("analyze", size), &size, |b, _| {
            b.iter(|| black_box(analyzer.analyze(0, black_box(&samples), SAMPLE_RATE)))
        });
    }

    group.finish();
}

fn bench_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("phase");

    for &size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let samples = render_like(size);
        let analyzer = PhaseContinuityAnalyzer::new(SAMPLE_RATE, 440.0).unwrap();

        group.bench_with_input(BenchmarkId::new("analyze", size), &size, |b, _| {
            b.iter(|| black_box(analyzer.analyze(0, black_box(&samples))))
        });
    }

    group.finish();
}

fn bench_fidelity(c: &mut Criterion) {
    let mut group = c.benchmark_group("fidelity");

    for &size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let reference = render_like(size);
        let output: Vec<f64> = reference.iter().map(|s| s * 0.999).collect();

        group.bench_with_input(BenchmarkId::new("compare", size), &size, |b, _| {
            b.iter(|| black_box(FidelityComparator::compare(&reference, &output)))
        });

        group.bench_with_input(BenchmarkId::new("windows_1024", size), &size, |b, _| {
            b.iter(|| black_box(FidelityComparator::compare_windows(&reference, &output, 1024)))
        });
    }

    group.finish();
}

fn bench_full_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_analysis");

    for &size in SIZES {
        group.throughput(Throughput::Elements((size * 2) as u64));
        let samples = render_like(size);
        let stream =
            SampleStream::from_channels(SAMPLE_RATE, vec![samples.clone(), samples]).unwrap();
        let analyzer = GlitchAnalyzer::new(AnalysisConfig::render_pipeline(SAMPLE_RATE, 512));

        group.bench_with_input(BenchmarkId::new("stereo", size), &size, |b, _| {
            b.iter(|| black_box(analyzer.analyze(&stream).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_discontinuity,
    bench_boundary,
    bench_phase,
    bench_fidelity,
    bench_full_analysis
);
criterion_main!(benches);
