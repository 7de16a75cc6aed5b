//! Default configuration constants for calmwave.
//!
//! Shared by the config sections and by components constructed without a
//! config file, so both agree on the same numbers.

/// Samples per analysis window.
pub const WINDOW_SIZE: usize = 2048;

/// Interval between voice analysis ticks in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 500;

/// RMS above which a window counts as speech.
pub const SPEECH_THRESHOLD: f32 = 0.015;

/// RMS below which no pitch is reported.
///
/// Quiet windows report 0 Hz rather than risk a spurious pitch.
pub const MIN_PITCH_RMS: f32 = 0.01;

/// Minimum normalized-difference correlation to accept a pitch estimate.
pub const PITCH_CONFIDENCE: f32 = 0.9;

/// Smallest autocorrelation lag, in samples, considered for pitch.
pub const MIN_PITCH_LAG: usize = 50;

/// Speech/silence segments retained for breathing analysis.
pub const SEGMENT_HISTORY: usize = 20;

/// Look-back window for speech rate and pause ratio, in seconds.
pub const SPEECH_RATE_WINDOW_SECS: f32 = 10.0;

/// Pitch and volume samples retained by the voice scorer.
pub const VOICE_HISTORY: usize = 30;

/// Weight of the previous score in the voice EMA.
pub const SMOOTHING_FACTOR: f32 = 0.3;

/// Baseline pitch in Hz when no calibration exists.
pub const BASELINE_PITCH_HZ: f32 = 150.0;

/// Baseline RMS volume when no calibration exists.
pub const BASELINE_VOLUME: f32 = 0.3;

/// Baseline speech rate in syllables per second.
pub const BASELINE_SPEECH_RATE: f32 = 4.0;

/// Baseline fraction of time spent pausing.
pub const BASELINE_PAUSE_RATIO: f32 = 0.3;

/// Behavior patterns considered when scoring.
pub const BEHAVIOR_HISTORY: usize = 5;

/// Window over which message frequency is measured, in seconds.
pub const FREQUENCY_WINDOW_SECS: f32 = 60.0;

/// Combined scores retained for trend reporting.
pub const FUSION_HISTORY: usize = 20;

/// Length of a calibration recording in seconds.
pub const CALIBRATION_SECS: f32 = 5.0;

/// Voiced volume samples required for a calibration to succeed.
pub const MIN_CALIBRATION_SAMPLES: usize = 10;

/// Upper bound of every stress score.
pub const MAX_SCORE: u8 = 100;
