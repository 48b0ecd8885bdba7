//! Performance benchmarks for performance scoring

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use stratum_vocal::features::alignment::{align_sequences, AlignmentConfig};
use stratum_vocal::{compare_features, PitchClassMatrix, RecordingFeatures, ScoringConfig};

const SR: u32 = 22050;
const HOP: usize = 512;

/// Synthetic recording: a repeating melody, one note every 40 frames
fn synthetic(secs: f32, notes: &[usize]) -> RecordingFeatures {
    let n = (secs * SR as f32 / HOP as f32) as usize;
    let frames = (0..n)
        .map(|t| {
            let mut f = [0.02f32; 12];
            f[notes[(t / 40) % notes.len()]] = 1.0;
            f
        })
        .collect();
    RecordingFeatures::from_raw(PitchClassMatrix::new(frames), vec![0.05; n], vec![0.2; n], SR, HOP)
}

fn bench_compare_60s(c: &mut Criterion) {
    // Generate a 60 second reference and a slightly different user take
    let reference = synthetic(60.0, &[0, 4, 0, 7, 0, 5]);
    let user = synthetic(60.0, &[0, 4, 0, 6, 0, 5]);
    let config = ScoringConfig::default();

    c.bench_function("compare_features_60s", |b| {
        b.iter(|| {
            let _ = compare_features(black_box(&reference), black_box(&user), black_box(&config));
        });
    });
}

fn bench_alignment_60s(c: &mut Criterion) {
    let reference = synthetic(60.0, &[0, 4, 0, 7, 0, 5]);
    let user = synthetic(60.0, &[0, 4, 0, 6, 0, 5]);
    let config = AlignmentConfig::default();

    c.bench_function("align_sequences_60s", |b| {
        b.iter(|| {
            let _ = align_sequences(black_box(&reference.unit), black_box(&user.unit), black_box(&config));
        });
    });
}

criterion_group!(benches, bench_compare_60s, bench_alignment_60s);
criterion_main!(benches);
