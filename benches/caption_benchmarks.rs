//! Benchmarks for frame sampling and model preprocessing.
//!
//! Run with: cargo bench
//!
//! The sampling benchmark requires fixture files from
//! `tests/fixtures/generate_fixtures.sh`.

use std::{hint::black_box, path::Path};

use criterion::Criterion;
use framecap::{FfmpegLogLevel, FrameSampler, sampling_interval};

const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

fn benchmark_sampling(criterion: &mut Criterion) {
    framecap::set_ffmpeg_log_level(FfmpegLogLevel::Error);

    criterion.bench_function("sampling interval", |bencher| {
        bencher.iter(|| sampling_interval(black_box(29.97), black_box(1.0)));
    });

    if !Path::new(SAMPLE_VIDEO).exists() {
        eprintln!("Skipping sampling benchmark: fixture not found");
        return;
    }

    criterion.bench_function("sample 10s video at 1 fps", |bencher| {
        bencher.iter(|| {
            let sampler = FrameSampler::open(SAMPLE_VIDEO, 1.0).unwrap();
            black_box(sampler.count())
        });
    });
}

#[cfg(feature = "onnx")]
fn benchmark_preprocess(criterion: &mut Criterion) {
    use framecap::{CaptionModelOptions, preprocess};
    use image::RgbImage;

    let options = CaptionModelOptions::default();
    let frame = RgbImage::from_fn(1280, 720, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });

    criterion.bench_function("preprocess 720p frame", |bencher| {
        bencher.iter(|| preprocess(black_box(&frame), &options));
    });
}

#[cfg(not(feature = "onnx"))]
fn benchmark_preprocess(_criterion: &mut Criterion) {}

criterion::criterion_group!(benches, benchmark_sampling, benchmark_preprocess);
criterion::criterion_main!(benches);
