//! Personal voice baseline calibration.
//!
//! A short recording session collects pitch and volume from voiced windows
//! only and turns them into a [`VoiceBaseline`]. The calibrator never writes
//! the baseline anywhere itself; the caller persists a successful outcome.

use crate::audio::features::FrameFeatures;
use crate::config::CalibrationConfig;
use crate::defaults;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// A person's calibrated speaking voice. Replaced wholesale, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceBaseline {
    pub pitch_hz: f32,
    pub volume: f32,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "reason")]
pub enum CalibrationFailure {
    /// Fewer voiced windows than required were heard.
    NotEnoughSpeech { captured: usize, required: usize },
}

impl fmt::Display for CalibrationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnoughSpeech { captured, required } => write!(
                f,
                "not enough speech detected ({captured} of {required} voiced samples), please try again and speak clearly"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    Success(VoiceBaseline),
    Failed(CalibrationFailure),
}

impl CalibrationOutcome {
    pub fn baseline(&self) -> Option<&VoiceBaseline> {
        match self {
            Self::Success(baseline) => Some(baseline),
            Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum CalibrationState {
    #[default]
    Idle,
    Recording {
        started_at: Instant,
        pitch_samples: Vec<f32>,
        volume_samples: Vec<f32>,
    },
    Finished(CalibrationOutcome),
}

/// `idle -> recording -> (success | failed)`; `start` may be called again
/// from any state to begin a fresh session.
#[derive(Debug, Clone)]
pub struct BaselineCalibrator {
    duration: Duration,
    min_samples: usize,
    state: CalibrationState,
}

impl BaselineCalibrator {
    pub fn new(config: &CalibrationConfig) -> Self {
        Self {
            duration: Duration::try_from_secs_f32(config.duration_secs.max(0.0))
                .unwrap_or(Duration::from_secs_f32(defaults::CALIBRATION_SECS)),
            min_samples: config.min_samples,
            state: CalibrationState::Idle,
        }
    }

    pub fn start(&mut self, now: Instant) {
        tracing::info!("Calibration started ({:?})", self.duration);
        self.state = CalibrationState::Recording {
            started_at: now,
            pitch_samples: Vec::new(),
            volume_samples: Vec::new(),
        };
    }

    /// Feeds one analysis window. The window that reaches the end of the
    /// recording period still counts and the outcome is returned on that
    /// call; `None` while still recording or when idle.
    pub fn feed(&mut self, frame: &FrameFeatures, now: Instant) -> Option<CalibrationOutcome> {
        let CalibrationState::Recording {
            started_at,
            pitch_samples,
            volume_samples,
        } = &mut self.state
        else {
            return None;
        };

        if frame.is_speech {
            volume_samples.push(frame.rms);
            if frame.pitch_hz > 0.0 {
                pitch_samples.push(frame.pitch_hz);
            }
        }

        if now.saturating_duration_since(*started_at) < self.duration {
            return None;
        }

        let outcome = summarize(pitch_samples, volume_samples, self.min_samples);
        match &outcome {
            CalibrationOutcome::Success(baseline) => tracing::info!(
                "Calibration succeeded: {} Hz, volume {}",
                baseline.pitch_hz,
                baseline.volume
            ),
            CalibrationOutcome::Failed(reason) => {
                tracing::warn!("Calibration failed: {}", reason)
            }
        }
        self.state = CalibrationState::Finished(outcome.clone());
        Some(outcome)
    }

    /// Abandons a running session without producing an outcome.
    pub fn cancel(&mut self) {
        if self.is_recording() {
            tracing::debug!("Calibration cancelled");
        }
        self.state = CalibrationState::Idle;
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, CalibrationState::Recording { .. })
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for BaselineCalibrator {
    fn default() -> Self {
        Self::new(&CalibrationConfig::default())
    }
}

fn summarize(pitch: &[f32], volume: &[f32], min_samples: usize) -> CalibrationOutcome {
    if volume.len() < min_samples {
        return CalibrationOutcome::Failed(CalibrationFailure::NotEnoughSpeech {
            captured: volume.len(),
            required: min_samples,
        });
    }

    let avg_pitch = mean(pitch).unwrap_or(defaults::BASELINE_PITCH_HZ as f64);
    let avg_volume = mean(volume).unwrap_or(0.0);

    CalibrationOutcome::Success(VoiceBaseline {
        pitch_hz: avg_pitch.round() as f32,
        volume: ((avg_volume * 1000.0).round() / 1000.0) as f32,
        captured_at: Utc::now(),
    })
}

fn mean(values: &[f32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voiced(pitch_hz: f32, rms: f32) -> FrameFeatures {
        FrameFeatures {
            rms,
            zero_crossing_rate: 0.05,
            pitch_hz,
            is_speech: true,
        }
    }

    fn silent() -> FrameFeatures {
        FrameFeatures::default()
    }

    /// Runs a full session at 500 ms ticks and returns the outcome.
    fn run(frames: &[FrameFeatures]) -> CalibrationOutcome {
        let mut calibrator = BaselineCalibrator::default();
        let start = Instant::now();
        calibrator.start(start);
        let tick = Duration::from_millis(500);
        for (i, frame) in frames.iter().enumerate() {
            let now = start + tick * i as u32;
            assert!(calibrator.feed(frame, now).is_none(), "finished early");
        }
        calibrator
            .feed(&silent(), start + Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_unrepresentable_duration_falls_back() {
        let calibrator = BaselineCalibrator::new(&CalibrationConfig {
            duration_secs: f32::INFINITY,
            min_samples: 10,
        });
        assert_eq!(calibrator.duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_idle_ignores_frames() {
        let mut calibrator = BaselineCalibrator::default();
        assert_eq!(calibrator.state(), &CalibrationState::Idle);
        assert!(calibrator.feed(&voiced(150.0, 0.3), Instant::now()).is_none());
        assert_eq!(calibrator.state(), &CalibrationState::Idle);
    }

    #[test]
    fn test_success_rounds_pitch_and_volume() {
        let frames: Vec<_> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    voiced(180.0, 0.2)
                } else {
                    voiced(181.0, 0.2345)
                }
            })
            .collect();
        let outcome = run(&frames);
        let baseline = outcome.baseline().unwrap();
        assert_eq!(baseline.pitch_hz, 181.0);
        assert_eq!(baseline.volume, 0.217);
    }

    #[test]
    fn test_unvoiced_pitch_defaults_to_150() {
        let frames = vec![voiced(0.0, 0.1); 10];
        let baseline = run(&frames).baseline().cloned().unwrap();
        assert_eq!(baseline.pitch_hz, 150.0);
        assert_eq!(baseline.volume, 0.1);
    }

    #[test]
    fn test_silence_is_not_recorded() {
        let mut frames = vec![voiced(200.0, 0.3); 9];
        frames.push(silent());
        match run(&frames) {
            CalibrationOutcome::Failed(CalibrationFailure::NotEnoughSpeech {
                captured,
                required,
            }) => {
                assert_eq!(captured, 9);
                assert_eq!(required, 10);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_finished_state_is_kept() {
        let mut calibrator = BaselineCalibrator::default();
        let start = Instant::now();
        calibrator.start(start);
        let outcome = calibrator
            .feed(&silent(), start + Duration::from_secs(6))
            .unwrap();
        assert!(matches!(outcome, CalibrationOutcome::Failed(_)));
        assert_eq!(calibrator.state(), &CalibrationState::Finished(outcome));
        assert!(!calibrator.is_recording());
        // A finished session does not emit again.
        assert!(calibrator.feed(&silent(), start + Duration::from_secs(7)).is_none());
    }

    #[test]
    fn test_same_input_same_baseline() {
        let frames: Vec<_> = (0..10).map(|i| voiced(140.0 + i as f32, 0.25)).collect();
        let first = run(&frames).baseline().cloned().unwrap();
        let second = run(&frames).baseline().cloned().unwrap();
        assert_eq!(first.pitch_hz, second.pitch_hz);
        assert_eq!(first.volume, second.volume);
    }

    #[test]
    fn test_restart_discards_samples() {
        let mut calibrator = BaselineCalibrator::default();
        let start = Instant::now();
        calibrator.start(start);
        for i in 0..9 {
            calibrator.feed(&voiced(120.0, 0.3), start + Duration::from_millis(i * 100));
        }
        calibrator.start(start + Duration::from_secs(1));
        assert!(calibrator.is_recording());
        let outcome = calibrator
            .feed(&silent(), start + Duration::from_secs(6))
            .unwrap();
        assert!(matches!(
            outcome,
            CalibrationOutcome::Failed(CalibrationFailure::NotEnoughSpeech { captured: 0, .. })
        ));
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let mut calibrator = BaselineCalibrator::default();
        calibrator.start(Instant::now());
        calibrator.cancel();
        assert_eq!(calibrator.state(), &CalibrationState::Idle);
    }

    #[test]
    fn test_baseline_json_shape() {
        let baseline = VoiceBaseline {
            pitch_hz: 160.0,
            volume: 0.25,
            captured_at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
        };
        let json = serde_json::to_value(&baseline).unwrap();
        assert_eq!(json["pitchHz"], 160.0);
        assert_eq!(json["volume"], 0.25);
        assert_eq!(json["capturedAt"], "2026-01-02T03:04:05Z");
    }

    #[test]
    fn test_failure_message_mentions_retry() {
        let failure = CalibrationFailure::NotEnoughSpeech {
            captured: 3,
            required: 10,
        };
        assert!(failure.to_string().contains("try again"));
    }
}
