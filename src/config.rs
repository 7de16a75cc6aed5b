//! Configuration for every scorer, loaded from TOML.
//!
//! Thresholds, weights and lexicons are passed into each component at
//! construction rather than read from globals, so a deployment can retune
//! them (and tests can substitute fixtures) without touching logic.

use crate::defaults;
use crate::error::{CalmwaveError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub segments: SegmentConfig,
    pub voice: VoiceConfig,
    pub text: TextConfig,
    pub behavior: BehaviorConfig,
    pub fusion: FusionConfig,
    pub calibration: CalibrationConfig,
    pub storage: StorageConfig,
}

/// Per-window feature extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub window_size: usize,
    pub tick_interval_ms: u64,
    pub speech_threshold: f32,
    pub min_pitch_rms: f32,
    pub pitch_confidence: f32,
    pub min_pitch_lag: usize,
}

/// Speech/silence segment bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SegmentConfig {
    pub history: usize,
    pub speech_rate_window_secs: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceConfig {
    pub history: usize,
    /// Weight of the previous score when smoothing (0 disables smoothing).
    pub smoothing_factor: f32,
    pub erratic_volume_variation: f32,
    pub zero_crossing_threshold: f32,
    pub baseline: BaselineDefaults,
    pub thresholds: VoiceThresholds,
    pub weights: VoiceWeights,
}

/// Reference voice used until a calibration exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BaselineDefaults {
    pub pitch_hz: f32,
    pub volume: f32,
    pub speech_rate: f32,
    pub pause_ratio: f32,
}

/// Ratios against the baseline (speed, volume, pitch) and absolute pause ratios.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceThresholds {
    pub speed_very_fast: f32,
    pub speed_fast: f32,
    pub speed_slow: f32,
    pub volume_yelling: f32,
    pub volume_loud: f32,
    pub volume_quiet: f32,
    /// Absolute pitch standard deviation (Hz) above which the voice is shaky.
    pub pitch_shaky_variation: f32,
    pub pitch_high: f32,
    pub pitch_low: f32,
    pub pauses_long: f32,
    pub pauses_none: f32,
    pub pauses_short: f32,
}

/// Points added per voice category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceWeights {
    pub breathing_gasping: u32,
    pub breathing_rapid: u32,
    pub breathing_shallow: u32,
    pub speed_very_fast: u32,
    pub speed_fast: u32,
    pub volume_yelling: u32,
    pub volume_loud: u32,
    pub volume_quiet: u32,
    pub pitch_shaky: u32,
    pub pitch_high: u32,
    pub pauses_none: u32,
    pub pauses_short: u32,
    pub zero_crossing: u32,
}

/// Tiered lexicons (regular expressions, matched case-insensitively).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextConfig {
    pub crisis_patterns: Vec<String>,
    pub high_patterns: Vec<String>,
    pub moderate_patterns: Vec<String>,
    pub mild_patterns: Vec<String>,
    pub crisis_points: u32,
    pub high_points: u32,
    pub moderate_points: u32,
    pub mild_points: u32,
    pub caps_lock_points: u32,
    pub fragmented_points: u32,
    pub emphatic_points: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BehaviorConfig {
    pub history: usize,
    pub frequency_window_secs: f32,
    pub rapid_frequency: f32,
    pub frequent_frequency: f32,
    pub rapid_points: u32,
    pub frequent_points: u32,
    pub repetition_points: u32,
    pub caps_points: u32,
    pub fragment_points: u32,
    /// Fragmented messages needed (strictly more than this) before flagging.
    pub fragment_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FusionConfig {
    pub text_weight: f32,
    pub voice_weight: f32,
    pub behavior_weight: f32,
    pub history: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    pub duration_secs: f32,
    pub min_samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Where the calibrated baseline is kept. Defaults to the data directory.
    pub baseline_path: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            window_size: defaults::WINDOW_SIZE,
            tick_interval_ms: defaults::TICK_INTERVAL_MS,
            speech_threshold: defaults::SPEECH_THRESHOLD,
            min_pitch_rms: defaults::MIN_PITCH_RMS,
            pitch_confidence: defaults::PITCH_CONFIDENCE,
            min_pitch_lag: defaults::MIN_PITCH_LAG,
        }
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            history: defaults::SEGMENT_HISTORY,
            speech_rate_window_secs: defaults::SPEECH_RATE_WINDOW_SECS,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            history: defaults::VOICE_HISTORY,
            smoothing_factor: defaults::SMOOTHING_FACTOR,
            erratic_volume_variation: 0.1,
            zero_crossing_threshold: 0.1,
            baseline: BaselineDefaults::default(),
            thresholds: VoiceThresholds::default(),
            weights: VoiceWeights::default(),
        }
    }
}

impl Default for BaselineDefaults {
    fn default() -> Self {
        Self {
            pitch_hz: defaults::BASELINE_PITCH_HZ,
            volume: defaults::BASELINE_VOLUME,
            speech_rate: defaults::BASELINE_SPEECH_RATE,
            pause_ratio: defaults::BASELINE_PAUSE_RATIO,
        }
    }
}

impl Default for VoiceThresholds {
    fn default() -> Self {
        Self {
            speed_very_fast: 1.5,
            speed_fast: 1.125,
            speed_slow: 0.5,
            volume_yelling: 3.0,
            volume_loud: 1.8,
            volume_quiet: 0.4,
            pitch_shaky_variation: 50.0,
            pitch_high: 1.4,
            pitch_low: 0.7,
            pauses_long: 0.4,
            pauses_none: 0.15,
            pauses_short: 0.25,
        }
    }
}

impl Default for VoiceWeights {
    fn default() -> Self {
        Self {
            breathing_gasping: 35,
            breathing_rapid: 25,
            breathing_shallow: 15,
            speed_very_fast: 20,
            speed_fast: 10,
            volume_yelling: 20,
            volume_loud: 10,
            volume_quiet: 8,
            pitch_shaky: 25,
            pitch_high: 12,
            pauses_none: 15,
            pauses_short: 8,
            zero_crossing: 10,
        }
    }
}

fn patterns(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            crisis_patterns: patterns(&[
                r"\b(kill|hurt|harm)\s+(myself|me)\b",
                r"\bsuicid(e|al)\b",
                r"\b(want|wanna|going)\s+to\s+die\b",
                r"\bend\s+(it\s+all|my\s+life)\b",
                r"\bself[-\s]?harm",
                r"\b(can'?t|cannot|can\s+not)\s+breathe\b",
                r"\bemergency\b",
                r"\boverdos(e|ing)\b",
                r"\bno\s+reason\s+to\s+live\b",
                r"\bbetter\s+off\s+(dead|without\s+me)\b",
            ]),
            high_patterns: patterns(&[
                r"\bpanic(king)?(\s+attack)?\b",
                r"\b(can'?t|cannot)\s+(cope|handle\s+(this|it)|take\s+(this|it))\b",
                r"\bfalling\s+apart\b",
                r"\bbreaking\s+down\b",
                r"\blosing\s+(it|my\s+mind)\b",
                r"\bterrified\b",
                r"\bhopeless\b",
                r"\bheart\s+(is\s+)?racing\b",
                r"\bfreaking\s+out\b",
            ]),
            moderate_patterns: patterns(&[
                r"\bstress(ed|ful)?\b",
                r"\banxi(ous|ety)\b",
                r"\bangry\b",
                r"\bworried\b",
                r"\bupset\b",
                r"\bfrustrat(ed|ing)\b",
                r"\bscared\b",
                r"\bnervous\b",
                r"\boverwhelm(ed|ing)?\b",
                r"\bafraid\b",
            ]),
            mild_patterns: patterns(&[
                r"\btired\b",
                r"\bexhausted\b",
                r"\bnot\s+(great|good|okay|ok)\b",
                r"\b(a\s+bit|kinda|kind\s+of)\s+(off|down|low)\b",
                r"\buneasy\b",
                r"\bsad\b",
                r"\bmeh\b",
            ]),
            crisis_points: 40,
            high_points: 25,
            moderate_points: 15,
            mild_points: 8,
            caps_lock_points: 10,
            fragmented_points: 5,
            emphatic_points: 8,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            history: defaults::BEHAVIOR_HISTORY,
            frequency_window_secs: defaults::FREQUENCY_WINDOW_SECS,
            rapid_frequency: 3.0,
            frequent_frequency: 2.0,
            rapid_points: 20,
            frequent_points: 10,
            repetition_points: 15,
            caps_points: 12,
            fragment_points: 10,
            fragment_count: 2,
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            text_weight: 0.4,
            voice_weight: 0.4,
            behavior_weight: 0.2,
            history: defaults::FUSION_HISTORY,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            duration_secs: defaults::CALIBRATION_SECS,
            min_samples: defaults::MIN_CALIBRATION_SAMPLES,
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> CalmwaveError {
    CalmwaveError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing, contains invalid TOML, or
    /// fails validation. Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CalmwaveError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                CalmwaveError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(CalmwaveError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CALMWAVE_SPEECH_THRESHOLD → audio.speech_threshold
    /// - CALMWAVE_TICK_INTERVAL_MS → audio.tick_interval_ms
    /// - CALMWAVE_SMOOTHING_FACTOR → voice.smoothing_factor
    /// - CALMWAVE_BASELINE_PATH → storage.baseline_path
    ///
    /// Empty or unparsable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("CALMWAVE_SPEECH_THRESHOLD")
            && let Ok(threshold) = value.trim().parse()
        {
            self.audio.speech_threshold = threshold;
        }

        if let Ok(value) = std::env::var("CALMWAVE_TICK_INTERVAL_MS")
            && let Ok(interval) = value.trim().parse()
        {
            self.audio.tick_interval_ms = interval;
        }

        if let Ok(value) = std::env::var("CALMWAVE_SMOOTHING_FACTOR")
            && let Ok(factor) = value.trim().parse()
        {
            self.voice.smoothing_factor = factor;
        }

        if let Ok(path) = std::env::var("CALMWAVE_BASELINE_PATH")
            && !path.is_empty()
        {
            self.storage.baseline_path = Some(PathBuf::from(path));
        }

        self
    }

    /// Reject values the scorers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.audio.window_size < 2 * self.audio.min_pitch_lag.max(1) {
            return Err(invalid(
                "audio.window_size",
                "must be at least twice audio.min_pitch_lag",
            ));
        }
        if self.audio.tick_interval_ms == 0 {
            return Err(invalid("audio.tick_interval_ms", "must be positive"));
        }
        if !(0.0..1.0).contains(&self.audio.speech_threshold) {
            return Err(invalid("audio.speech_threshold", "must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.voice.smoothing_factor) {
            return Err(invalid("voice.smoothing_factor", "must be in [0, 1)"));
        }
        let spans = [
            ("segments.speech_rate_window_secs", self.segments.speech_rate_window_secs),
            ("behavior.frequency_window_secs", self.behavior.frequency_window_secs),
            ("calibration.duration_secs", self.calibration.duration_secs),
            ("voice.baseline.pitch_hz", self.voice.baseline.pitch_hz),
            ("voice.baseline.volume", self.voice.baseline.volume),
            ("voice.baseline.speech_rate", self.voice.baseline.speech_rate),
        ];
        for (key, value) in spans {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(key, "must be a positive finite number"));
            }
        }

        let fusion = &self.fusion;
        let weights = [
            ("fusion.text_weight", fusion.text_weight),
            ("fusion.voice_weight", fusion.voice_weight),
            ("fusion.behavior_weight", fusion.behavior_weight),
        ];
        for (key, weight) in weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(invalid(key, "must be a non-negative finite number"));
            }
        }
        let total = fusion.text_weight + fusion.voice_weight + fusion.behavior_weight;
        if (total - 1.0).abs() > 1e-3 {
            return Err(invalid("fusion", format!("weights must sum to 1, got {total}")));
        }

        let lexicons = [
            ("text.crisis_patterns", &self.text.crisis_patterns),
            ("text.high_patterns", &self.text.high_patterns),
            ("text.moderate_patterns", &self.text.moderate_patterns),
            ("text.mild_patterns", &self.text.mild_patterns),
        ];
        for (key, list) in lexicons {
            for pattern in list {
                regex::Regex::new(pattern)
                    .map_err(|e| invalid(key, format!("invalid pattern {pattern:?}: {e}")))?;
            }
        }

        Ok(())
    }

    /// Tick interval as a duration.
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.audio.tick_interval_ms)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/calmwave/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("calmwave").join("config.toml"))
    }

    /// Where the baseline lives: the configured path, else the data directory.
    pub fn baseline_path(&self) -> Option<PathBuf> {
        self.storage.baseline_path.clone().or_else(|| {
            dirs::data_dir().map(|dir| dir.join("calmwave").join("baseline.json"))
        })
    }
}
