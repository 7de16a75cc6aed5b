//! calmwave - stress inference from voice, text and interaction behavior
//!
//! Scores each channel independently, fuses them into one level and picks a
//! grounding intervention.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod behavior;
pub mod calibration;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod config;
pub mod defaults;
pub mod error;
pub mod events;
pub mod fusion;
pub mod history;
pub mod intervention;
pub mod monitor;
#[cfg(feature = "cli")]
pub mod output;
pub mod runtime;
pub mod store;
pub mod text;
pub mod trigger;
pub mod voice;

// Audio input
pub use audio::features::{AudioFeatureExtractor, AudioWindow, FrameFeatures};
pub use audio::source::{AudioSource, MockAudioSource};
pub use audio::wav::WavAudioSource;

// Channel scorers
pub use behavior::{BehaviorPattern, BehaviorStressResult, BehaviorStressScorer};
pub use text::{TextStressResult, TextStressScorer};
pub use voice::{VoiceMetrics, VoiceStressResult, VoiceStressScorer};

// Fusion and intervention
pub use fusion::{
    CombinedStressAnalysis, RecommendedAction, StressFusionEngine, StressLevel, StressTrend,
};
pub use intervention::{GroundingType, choose_grounding_type};
pub use trigger::{Trigger, Triggers};

// Calibration and persistence
pub use calibration::{BaselineCalibrator, CalibrationOutcome, VoiceBaseline};
pub use store::{BaselineStore, JsonFileBaselineStore, MemoryBaselineStore};

// Orchestration
pub use events::{CollectorSink, EventSink, StressEvent};
pub use monitor::{StressMonitor, VoiceStart};
pub use runtime::{MonitorHandle, spawn_monitor};

// Error handling
pub use error::{CalmwaveError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_has_hash_only_when_built_from_git() {
        let ver = version_string();
        match option_env!("GIT_HASH") {
            Some(hash) if !hash.is_empty() => assert_eq!(ver.split('+').nth(1), Some(hash)),
            _ => assert_eq!(ver, env!("CARGO_PKG_VERSION")),
        }
    }
}
