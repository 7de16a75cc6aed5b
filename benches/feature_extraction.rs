use calmwave::audio::features::{
    AudioFeatureExtractor, AudioWindow, calculate_rms, detect_pitch, zero_crossing_rate,
};
use calmwave::config::AudioConfig;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const SAMPLE_RATE: u32 = 16_000;
const WINDOW: usize = 2048;

/// 2048 samples of a tone at `freq_hz`, or silence for 0.
fn window(freq_hz: f32, amplitude: f32) -> Vec<f32> {
    (0..WINDOW)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * freq_hz * t).sin()
        })
        .collect()
}

fn criterion_benchmark(c: &mut Criterion) {
    let config = AudioConfig::default();
    let extractor = AudioFeatureExtractor::new(&config);

    let mut group = c.benchmark_group("extract");
    for (name, samples) in [
        ("silence", window(0.0, 0.0)),
        ("voiced_200hz", window(200.0, 0.3)),
        ("voiced_120hz", window(120.0, 0.3)),
    ] {
        let audio = AudioWindow::new(samples, SAMPLE_RATE);
        group.bench_with_input(BenchmarkId::from_parameter(name), &audio, |b, audio| {
            b.iter(|| extractor.extract(black_box(audio)))
        });
    }
    group.finish();

    let tone = window(200.0, 0.3);
    c.bench_function("rms", |b| b.iter(|| calculate_rms(black_box(&tone))));
    c.bench_function("zero_crossing_rate", |b| {
        b.iter(|| zero_crossing_rate(black_box(&tone)))
    });
    c.bench_function("detect_pitch", |b| {
        b.iter(|| {
            detect_pitch(
                black_box(&tone),
                SAMPLE_RATE,
                config.min_pitch_lag,
                config.pitch_confidence,
            )
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
