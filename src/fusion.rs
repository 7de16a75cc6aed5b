//! Multi-channel stress fusion.
//!
//! Combines the latest text, voice and behavior results into one weighted
//! score, classifies it into a [`StressLevel`] and attaches the recommended
//! action. A channel that has never reported counts as 0.

use crate::behavior::BehaviorStressResult;
use crate::config::FusionConfig;
use crate::defaults::MAX_SCORE;
use crate::history::RingBuffer;
use crate::intervention::{GroundingType, choose_grounding_type};
use crate::text::TextStressResult;
use crate::trigger::Triggers;
use crate::voice::VoiceStressResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Points the newest score must differ from the recent mean to count as a trend.
const TREND_MARGIN: f32 = 5.0;

/// Discrete severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum StressLevel {
    #[default]
    Calm,
    Mild,
    Moderate,
    High,
    Crisis,
}

impl StressLevel {
    /// Fixed thresholds: crisis ≥80, high ≥60, moderate ≥40, mild ≥20.
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => StressLevel::Crisis,
            60..=79 => StressLevel::High,
            40..=59 => StressLevel::Moderate,
            20..=39 => StressLevel::Mild,
            _ => StressLevel::Calm,
        }
    }

    pub fn recommended_action(&self) -> RecommendedAction {
        match self {
            StressLevel::Crisis => RecommendedAction::CrisisResponse,
            StressLevel::High => RecommendedAction::SafetyProtocol,
            StressLevel::Moderate => RecommendedAction::Grounding,
            StressLevel::Mild => RecommendedAction::GentleCheckin,
            StressLevel::Calm => RecommendedAction::Monitor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StressLevel::Calm => "calm",
            StressLevel::Mild => "mild",
            StressLevel::Moderate => "moderate",
            StressLevel::High => "high",
            StressLevel::Crisis => "crisis",
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendedAction {
    #[default]
    Monitor,
    GentleCheckin,
    Grounding,
    SafetyProtocol,
    CrisisResponse,
}

impl RecommendedAction {
    pub fn wants_grounding(&self) -> bool {
        matches!(
            self,
            RecommendedAction::Grounding | RecommendedAction::SafetyProtocol
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::Monitor => "monitor",
            RecommendedAction::GentleCheckin => "gentle-checkin",
            RecommendedAction::Grounding => "grounding",
            RecommendedAction::SafetyProtocol => "safety-protocol",
            RecommendedAction::CrisisResponse => "crisis-response",
        }
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StressTrend {
    Rising,
    Falling,
    #[default]
    Steady,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CombinedStressAnalysis {
    pub level: StressLevel,
    pub score: u8,
    pub triggers: Triggers,
    pub recommended_action: RecommendedAction,
    pub grounding_type: Option<GroundingType>,
}

/// Weighted fusion of the three channels. Pure.
pub fn fuse(
    text: Option<&TextStressResult>,
    voice: Option<&VoiceStressResult>,
    behavior: Option<&BehaviorStressResult>,
    config: &FusionConfig,
) -> CombinedStressAnalysis {
    let text_score = text.map_or(0, |r| r.score) as f64;
    let voice_score = voice.map_or(0, |r| r.stress_score) as f64;
    let behavior_score = behavior.map_or(0, |r| r.score) as f64;

    let combined = text_score * config.text_weight as f64
        + voice_score * config.voice_weight as f64
        + behavior_score * config.behavior_weight as f64;
    let score = combined.round().clamp(0.0, MAX_SCORE as f64) as u8;

    let mut triggers = Triggers::new();
    if let Some(text) = text {
        triggers.extend(text.triggers.iter().copied());
    }
    if let Some(voice) = voice {
        triggers.extend(voice.triggers.iter().copied());
    }
    if let Some(behavior) = behavior {
        triggers.extend(behavior.triggers.iter().copied());
    }

    let level = StressLevel::from_score(score);
    let recommended_action = level.recommended_action();
    let grounding_type = recommended_action
        .wants_grounding()
        .then(|| choose_grounding_type(level, &triggers));

    CombinedStressAnalysis {
        level,
        score,
        triggers,
        recommended_action,
        grounding_type,
    }
}

/// Holds the last result per channel and fuses on every update.
#[derive(Debug, Clone)]
pub struct StressFusionEngine {
    config: FusionConfig,
    text: Option<TextStressResult>,
    voice: Option<VoiceStressResult>,
    behavior: Option<BehaviorStressResult>,
    history: RingBuffer<u8>,
    last: Option<CombinedStressAnalysis>,
}

impl StressFusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            history: RingBuffer::new(config.history),
            config,
            text: None,
            voice: None,
            behavior: None,
            last: None,
        }
    }

    pub fn update_text(&mut self, result: TextStressResult) -> CombinedStressAnalysis {
        self.text = Some(result);
        self.fuse()
    }

    pub fn update_voice(&mut self, result: VoiceStressResult) -> CombinedStressAnalysis {
        self.voice = Some(result);
        self.fuse()
    }

    pub fn update_behavior(&mut self, result: BehaviorStressResult) -> CombinedStressAnalysis {
        self.behavior = Some(result);
        self.fuse()
    }

    /// Records a text and behavior result from the same message as one update.
    pub fn update_message(
        &mut self,
        text: TextStressResult,
        behavior: BehaviorStressResult,
    ) -> CombinedStressAnalysis {
        self.text = Some(text);
        self.behavior = Some(behavior);
        self.fuse()
    }

    /// Fuses the latest known channel results without waiting for fresh ones.
    pub fn fuse(&mut self) -> CombinedStressAnalysis {
        let analysis = fuse(
            self.text.as_ref(),
            self.voice.as_ref(),
            self.behavior.as_ref(),
            &self.config,
        );

        let previous = self.last.as_ref().map(|a| a.level).unwrap_or_default();
        if analysis.level != previous {
            tracing::info!(
                "Stress level {} -> {} (score {})",
                previous,
                analysis.level,
                analysis.score
            );
        }

        self.history.push(analysis.score);
        self.last = Some(analysis.clone());
        analysis
    }

    /// Compares the newest score to the mean of the earlier ones in history.
    pub fn trend(&self) -> StressTrend {
        let Some(&newest) = self.history.latest() else {
            return StressTrend::Steady;
        };
        let earlier = self.history.len().saturating_sub(1);
        if earlier == 0 {
            return StressTrend::Steady;
        }

        let mean = self
            .history
            .iter()
            .take(earlier)
            .map(|&s| s as f32)
            .sum::<f32>()
            / earlier as f32;
        let delta = newest as f32 - mean;
        if delta > TREND_MARGIN {
            StressTrend::Rising
        } else if delta < -TREND_MARGIN {
            StressTrend::Falling
        } else {
            StressTrend::Steady
        }
    }

    pub fn last(&self) -> Option<&CombinedStressAnalysis> {
        self.last.as_ref()
    }

    pub fn history(&self) -> &RingBuffer<u8> {
        &self.history
    }

    /// Forgets the voice channel so it counts as absent. Returns whether a
    /// voice result was held.
    pub fn clear_voice(&mut self) -> bool {
        self.voice.take().is_some()
    }

    pub fn reset(&mut self) {
        self.text = None;
        self.voice = None;
        self.behavior = None;
        self.history.clear();
        self.last = None;
    }
}

impl Default for StressFusionEngine {
    fn default() -> Self {
        Self::new(FusionConfig::default())
    }
}
