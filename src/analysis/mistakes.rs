//! Mistake detection
//!
//! Walks the alignment path frame by frame, classifies every `(reference, user)`
//! pair, and debounces the per-frame verdicts into discrete events.
//!
//! # Frame classification (first match wins)
//!
//! 1. Reference voiced, user truly silent → `missing`
//! 2. Reference truly silent, user voiced → `extra`
//! 3. Both voiced → compare dominant pitch classes:
//!    - interval on the harmonic allowlist → fine (harmonic)
//!    - `|delta|` below the semitone threshold → fine (acceptable)
//!    - otherwise graded: `slightly-*` (< 4), `too-*` (4-6), `too-*-major` (≥ 7)
//! 4. Anything else → fine
//!
//! # Debouncing
//!
//! Per-frame verdicts flicker on single-frame alignment noise. A small state
//! machine (`Idle` / `Accumulating`) merges same-reason frames that follow each
//! other within the debounce gap, keeps an event open across short stretches
//! of fine frames, and drops events that end up shorter than the minimum
//! duration.

use super::result::{MistakeEvent, MistakeReason, MistakeSummary};
use crate::features::alignment::AlignmentPath;
use crate::features::chroma::{freq_from_midi, note_name_from_midi};
use crate::features::recording::RecordingFeatures;
use crate::features::threshold::{median_scaled_threshold, SILENCE_EPSILON};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// MIDI note used as the octave anchor when naming pitch classes (C4)
const MIDI_ANCHOR: i32 = 60;

/// Mistake detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MistakeDetectorConfig {
    /// Fraction of the median frame energy that counts as sound (default: 0.12)
    pub energy_threshold: f32,

    /// Extra multiplier applied to the median-scaled threshold (default: 1.5)
    pub threshold_scale: f32,

    /// Threshold factor for the stricter "truly silent" check (default: 0.5)
    pub silence_factor: f32,

    /// Threshold used when a recording has no frames (default: 0.01)
    pub empty_threshold: f32,

    /// Same-reason frames closer than this (seconds) are merged (default: 0.2)
    pub debounce_gap_secs: f32,

    /// Events shorter than this (seconds) after merging are dropped (default: 0.2)
    pub min_event_secs: f32,

    /// Pitch deltas below this many semitones are acceptable (default: 2.0)
    pub semitone_threshold: f32,

    /// Intervals (semitones, mod 12) treated as harmonic and acceptable
    /// (default: `[0, 3, 4, 5]`; `[0, 3, 4, 5, 7]` also accepts the fifth)
    pub harmonic_intervals: Vec<u8>,

    /// Deltas of at least this many semitones are `too-*` (default: 4)
    pub moderate_semitones: u8,

    /// Deltas of at least this many semitones are `too-*-major` (default: 7)
    pub major_semitones: u8,

    /// Severity of a missing note (default: 3)
    pub missing_severity: u8,

    /// Severity of an extra note (default: 1)
    pub extra_severity: u8,
}

impl Default for MistakeDetectorConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.12,
            threshold_scale: 1.5,
            silence_factor: 0.5,
            empty_threshold: 0.01,
            debounce_gap_secs: 0.2,
            min_event_secs: 0.2,
            semitone_threshold: 2.0,
            harmonic_intervals: vec![0, 3, 4, 5],
            moderate_semitones: 4,
            major_semitones: 7,
            missing_severity: 3,
            extra_severity: 1,
        }
    }
}

/// Verdict on the pitch of a frame where both sides are voiced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchVerdict {
    /// Interval is on the harmonic allowlist
    Harmonic(u8),
    /// Delta is below the semitone threshold
    Acceptable,
    /// Graded pitch error
    Error {
        /// Direction and magnitude class
        reason: MistakeReason,
        /// 1 (slight) to 3 (major)
        severity: u8,
    },
}

/// Classify the pitch relation between expected and actual pitch classes
///
/// `delta = actual − expected` on the 0-11 index (not wrapped), so its sign
/// gives the direction and `|delta| mod 12` the interval.
///
/// Because the delta is not wrapped, a one-semitone slip across the B/C
/// boundary (expected B, sung C) reads as −11 and lands in the major band.
/// Pitch classes carry no octave, so the index order is the only direction
/// available.
pub fn classify_pitch(expected: usize, actual: usize, config: &MistakeDetectorConfig) -> PitchVerdict {
    let delta = actual as i32 - expected as i32;
    let magnitude = delta.unsigned_abs();
    let interval = (magnitude % 12) as u8;

    if config.harmonic_intervals.contains(&interval) {
        return PitchVerdict::Harmonic(interval);
    }
    if (magnitude as f32) < config.semitone_threshold {
        return PitchVerdict::Acceptable;
    }

    let sharp = delta > 0;
    let (reason, severity) = if magnitude >= config.major_semitones as u32 {
        if sharp {
            (MistakeReason::TooHighMajor, 3)
        } else {
            (MistakeReason::TooLowMajor, 3)
        }
    } else if magnitude >= config.moderate_semitones as u32 {
        if sharp {
            (MistakeReason::TooHigh, 2)
        } else {
            (MistakeReason::TooLow, 2)
        }
    } else if sharp {
        (MistakeReason::SlightlyHigh, 1)
    } else {
        (MistakeReason::SlightlyLow, 1)
    };

    PitchVerdict::Error { reason, severity }
}

/// Per-frame mistake verdict
#[derive(Debug, Clone, Copy, PartialEq)]
struct FrameMistake {
    reason: MistakeReason,
    severity: u8,
    expected: usize,
    actual: usize,
}

/// An event still collecting frames
#[derive(Debug, Clone, PartialEq)]
struct OpenEvent {
    reason: MistakeReason,
    severity: u8,
    start: f32,
    end: f32,
    expected: usize,
    actual: usize,
    frames: usize,
}

impl OpenEvent {
    fn start(m: FrameMistake, t: f32) -> Self {
        Self {
            reason: m.reason,
            severity: m.severity,
            start: t,
            end: t,
            expected: m.expected,
            actual: m.actual,
            frames: 1,
        }
    }

    fn extend(&mut self, severity: u8, t: f32) {
        self.end = t;
        self.frames += 1;
        self.severity = self.severity.max(severity);
    }
}

/// Debounce state
#[derive(Debug, Clone, PartialEq)]
enum DebounceState {
    Idle,
    Accumulating(OpenEvent),
}

/// Finite-state accumulator turning per-frame verdicts into events
#[derive(Debug)]
struct MistakeAccumulator {
    state: DebounceState,
    gap: f32,
    min_duration: f32,
    events: Vec<OpenEvent>,
}

impl MistakeAccumulator {
    fn new(gap: f32, min_duration: f32) -> Self {
        Self {
            state: DebounceState::Idle,
            gap,
            min_duration,
            events: Vec::new(),
        }
    }

    fn observe(&mut self, t: f32, verdict: Option<FrameMistake>) {
        let state = std::mem::replace(&mut self.state, DebounceState::Idle);
        self.state = match (state, verdict) {
            (DebounceState::Idle, None) => DebounceState::Idle,
            (DebounceState::Idle, Some(m)) => DebounceState::Accumulating(OpenEvent::start(m, t)),
            (DebounceState::Accumulating(mut open), Some(m)) => {
                if m.reason == open.reason && t - open.end < self.gap {
                    open.extend(m.severity, t);
                    DebounceState::Accumulating(open)
                } else {
                    self.flush(open);
                    DebounceState::Accumulating(OpenEvent::start(m, t))
                }
            }
            (DebounceState::Accumulating(open), None) => {
                if t - open.end < self.gap {
                    DebounceState::Accumulating(open)
                } else {
                    self.flush(open);
                    DebounceState::Idle
                }
            }
        };
    }

    /// Emit a closed event: coalesce into the previous event of the same reason
    /// when it ended within the gap, otherwise keep it if long enough.
    fn flush(&mut self, event: OpenEvent) {
        if let Some(last) = self.events.last_mut() {
            if last.reason == event.reason && event.start - last.end < self.gap {
                last.end = last.end.max(event.end);
                last.frames += event.frames;
                last.severity = last.severity.max(event.severity);
                return;
            }
        }
        if event.end - event.start >= self.min_duration {
            self.events.push(event);
        }
    }

    fn finish(mut self) -> Vec<OpenEvent> {
        let state = std::mem::replace(&mut self.state, DebounceState::Idle);
        if let DebounceState::Accumulating(open) = state {
            self.flush(open);
        }
        self.events
    }
}

fn describe(reason: MistakeReason, delta: i32) -> String {
    let magnitude = delta.unsigned_abs();
    match reason {
        MistakeReason::Missing => "Missed a note the reference sings".to_string(),
        MistakeReason::Extra => "Sang where no note was expected".to_string(),
        MistakeReason::SlightlyHigh => format!("Slightly high (+{} semitones)", magnitude),
        MistakeReason::SlightlyLow => format!("Slightly low (-{} semitones)", magnitude),
        MistakeReason::TooHigh => format!("Too high (+{} semitones)", magnitude),
        MistakeReason::TooLow => format!("Too low (-{} semitones)", magnitude),
        MistakeReason::TooHighMajor => format!("Way too high (+{} semitones)", magnitude),
        MistakeReason::TooLowMajor => format!("Way too low (-{} semitones)", magnitude),
    }
}

fn to_event(open: OpenEvent) -> MistakeEvent {
    let delta = open.actual as i32 - open.expected as i32;
    let expected_midi = MIDI_ANCHOR + open.expected as i32;
    let actual_midi = MIDI_ANCHOR + open.actual as i32;
    let pitch_diff_hz = if open.reason == MistakeReason::Missing {
        0.0
    } else {
        (freq_from_midi(expected_midi) - freq_from_midi(actual_midi)).abs()
    };

    MistakeEvent {
        reason: open.reason,
        severity: open.severity,
        start_time: open.start,
        end_time: open.end,
        duration: open.end - open.start,
        expected_pitch_class: open.expected,
        actual_pitch_class: open.actual,
        semitone_delta: delta,
        frame_count: open.frames,
        description: describe(open.reason, delta),
        expected_note: note_name_from_midi(expected_midi),
        actual_note: note_name_from_midi(actual_midi),
        pitch_diff_hz,
    }
}

/// Detect and debounce mistakes along an alignment path
///
/// # Arguments
///
/// * `reference` - Reference features
/// * `user` - User features, already rotated into the reference key
/// * `path` - Alignment path from the sequence aligner
/// * `config` - Detector configuration
///
/// # Returns
///
/// Mistake events in time order. Event times are on the user's timeline.
pub fn detect_mistakes(
    reference: &RecordingFeatures,
    user: &RecordingFeatures,
    path: &AlignmentPath,
    config: &MistakeDetectorConfig,
) -> Vec<MistakeEvent> {
    let scale = config.energy_threshold * config.threshold_scale;
    // Floored so an all-silent side still separates silence from sound
    let thr_ref = median_scaled_threshold(&reference.energy, scale, config.empty_threshold).max(SILENCE_EPSILON);
    let thr_user = median_scaled_threshold(&user.energy, scale, config.empty_threshold).max(SILENCE_EPSILON);
    let hop = user.hop_duration();

    log::debug!(
        "Detecting mistakes over {} path frames (thr_ref={:.4}, thr_user={:.4})",
        path.len(),
        thr_ref,
        thr_user
    );

    let mut accumulator = MistakeAccumulator::new(config.debounce_gap_secs, config.min_event_secs);

    for (ri, ui) in path.iter() {
        if ri >= reference.energy.len() || ui >= user.energy.len() {
            continue;
        }

        let e_ref = reference.energy[ri];
        let e_user = user.energy[ui];
        let t = ui as f32 * hop;
        let expected = reference.unit.dominant_class(ri);
        let actual = user.unit.dominant_class(ui);

        let verdict = if e_ref > thr_ref && e_user < thr_user * config.silence_factor {
            Some((MistakeReason::Missing, config.missing_severity))
        } else if e_ref < thr_ref * config.silence_factor && e_user > thr_user {
            Some((MistakeReason::Extra, config.extra_severity))
        } else if e_ref > thr_ref && e_user > thr_user {
            match classify_pitch(expected, actual, config) {
                PitchVerdict::Error { reason, severity } => Some((reason, severity)),
                PitchVerdict::Harmonic(_) | PitchVerdict::Acceptable => None,
            }
        } else {
            None
        };

        accumulator.observe(
            t,
            verdict.map(|(reason, severity)| FrameMistake {
                reason,
                severity,
                expected,
                actual,
            }),
        );
    }

    let events: Vec<MistakeEvent> = accumulator.finish().into_iter().map(to_event).collect();
    log::debug!("Detected {} mistake events", events.len());
    events
}

/// Count and total duration of events per reason
pub fn summarize_mistakes(events: &[MistakeEvent]) -> BTreeMap<MistakeReason, MistakeSummary> {
    let mut summary: BTreeMap<MistakeReason, MistakeSummary> = BTreeMap::new();
    for event in events {
        let entry = summary.entry(event.reason).or_insert_with(|| MistakeSummary {
            count: 0,
            total_duration: 0.0,
            description: event.description.clone(),
        });
        entry.count += 1;
        entry.total_duration += event.duration;
    }
    summary
}

/// Total number of path frames covered by events
pub fn mistake_frame_count(events: &[MistakeEvent]) -> usize {
    events.iter().map(|e| e.frame_count).sum()
}
