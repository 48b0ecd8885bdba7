//! Example: Compare a synthetic user take against a synthetic reference
//!
//! Builds two 60 second recordings (the user sings a tone higher, skips a
//! phrase and misses one note), compares them and prints the result as JSON.
//!
//! Run with `RUST_LOG=debug cargo run --example compare_synthetic` to see the
//! pipeline stages. Pass `--weighted` to use the alignment-weighted tuning.

use stratum_vocal::{compare_features, PitchClassMatrix, RecordingFeatures, ScoringConfig};

const SR: u32 = 22050;
const HOP: usize = 512;
const MELODY: [usize; 8] = [0, 4, 7, 4, 0, 5, 9, 7];

fn synthetic(pcs: &[Option<usize>]) -> RecordingFeatures {
    let frames = pcs
        .iter()
        .map(|pc| match pc {
            Some(pc) => {
                let mut f = [0.03f32; 12];
                f[*pc] = 1.0;
                f[(*pc + 7) % 12] = 0.3;
                f
            }
            None => [0.0f32; 12],
        })
        .collect();
    let rms = pcs.iter().map(|pc| if pc.is_some() { 0.06 } else { 0.001 }).collect();
    RecordingFeatures::from_raw(PitchClassMatrix::new(frames), rms, vec![0.25; pcs.len()], SR, HOP)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let n = (60.0 * SR as f32 / HOP as f32) as usize;
    let reference: Vec<Option<usize>> = (0..n).map(|t| Some(MELODY[(t / 43) % MELODY.len()])).collect();

    // A whole tone higher, one skipped phrase, one wrong note
    let user: Vec<Option<usize>> = reference
        .iter()
        .enumerate()
        .map(|(t, pc)| match t {
            900..=1100 => None,
            1800..=1850 => Some(11),
            _ => pc.map(|p| (p + 2) % 12),
        })
        .collect();

    let config = if std::env::args().any(|a| a == "--weighted") {
        ScoringConfig::alignment_weighted()
    } else {
        ScoringConfig::default()
    };

    let result = compare_features(&synthetic(&reference), &synthetic(&user), &config)?;

    println!("Comparison Results:");
    println!("  Score: {:.2} ({})", result.final_score, result.quality_tier);
    println!("  Message: {}", result.message);
    println!("  Key shift: {:?}", result.key_shift);
    println!("  Mistakes: {}", result.mistakes.len());
    println!("  Processing time: {:.2} ms", result.metadata.processing_time_ms);
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
