//! Instantaneous features of a single audio window.
//!
//! Pure functions: RMS energy, zero-crossing rate, and an autocorrelation
//! pitch estimate. Rolling statistics over many windows live in the voice
//! scorer.

use crate::config::AudioConfig;

/// One analysis window of mono samples in -1.0..=1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioWindow {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioWindow {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Features measured on one window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameFeatures {
    pub rms: f32,
    pub zero_crossing_rate: f32,
    /// Detected pitch, or 0.0 when unvoiced or not confident.
    pub pitch_hz: f32,
    pub is_speech: bool,
}

/// Computes [`FrameFeatures`] from windows using a fixed configuration.
#[derive(Debug, Clone)]
pub struct AudioFeatureExtractor {
    speech_threshold: f32,
    min_pitch_rms: f32,
    pitch_confidence: f32,
    min_pitch_lag: usize,
}

impl Default for AudioFeatureExtractor {
    fn default() -> Self {
        Self::new(&AudioConfig::default())
    }
}

impl AudioFeatureExtractor {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            speech_threshold: config.speech_threshold,
            min_pitch_rms: config.min_pitch_rms,
            pitch_confidence: config.pitch_confidence,
            min_pitch_lag: config.min_pitch_lag,
        }
    }

    pub fn extract(&self, window: &AudioWindow) -> FrameFeatures {
        let rms = calculate_rms(&window.samples);
        let pitch_hz = if rms > self.min_pitch_rms {
            detect_pitch(
                &window.samples,
                window.sample_rate,
                self.min_pitch_lag,
                self.pitch_confidence,
            )
        } else {
            0.0
        };

        FrameFeatures {
            rms,
            zero_crossing_rate: zero_crossing_rate(&window.samples),
            pitch_hz,
            is_speech: rms > self.speech_threshold,
        }
    }

    /// Updates the speech threshold.
    pub fn set_speech_threshold(&mut self, threshold: f32) {
        self.speech_threshold = threshold;
    }

    pub fn speech_threshold(&self) -> f32 {
        self.speech_threshold
    }
}

/// Calculates the Root Mean Square (RMS) of audio samples.
///
/// # Returns
/// RMS value where 0.0 is silence and ~0.707 is a full-scale sine wave.
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Fraction of consecutive sample pairs whose sign differs.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();
    crossings as f32 / samples.len() as f32
}

/// Normalized-difference autocorrelation pitch estimate.
///
/// For each lag from `min_lag` up to half the window, correlation is
/// `1 - mean(|x[i] - x[i + lag]|)` over the first half of the window. The
/// best lag wins (earliest on ties) and is accepted only above
/// `confidence`. Returns 0.0 when no lag qualifies.
pub fn detect_pitch(samples: &[f32], sample_rate: u32, min_lag: usize, confidence: f32) -> f32 {
    let half = samples.len() / 2;
    if half <= min_lag || sample_rate == 0 {
        return 0.0;
    }

    let mut best_lag = 0;
    let mut best_correlation = f32::MIN;

    for lag in min_lag.max(1)..half {
        let diff: f32 = samples[..half]
            .iter()
            .zip(&samples[lag..lag + half])
            .map(|(a, b)| (a - b).abs())
            .sum();
        let correlation = 1.0 - diff / half as f32;
        if correlation > best_correlation {
            best_correlation = correlation;
            best_lag = lag;
        }
    }

    if best_lag > 0 && best_correlation > confidence {
        sample_rate as f32 / best_lag as f32
    } else {
        0.0
    }
}
