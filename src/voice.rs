//! Voice stress scoring.
//!
//! Keeps rolling pitch and volume histories, measures speech rate and pause
//! ratio over recent segments, classifies each dimension against the
//! speaker's baseline, and turns the categories into an additive 0–100
//! score smoothed across ticks.

use crate::audio::breathing::BreathingCategory;
use crate::audio::features::FrameFeatures;
use crate::audio::segmenter::SpeechSegment;
use crate::calibration::VoiceBaseline;
use crate::config::{BaselineDefaults, VoiceConfig, VoiceThresholds, VoiceWeights};
use crate::defaults::MAX_SCORE;
use crate::history::RingBuffer;
use crate::trigger::{Trigger, Triggers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechSpeed {
    Slow,
    #[default]
    Normal,
    Fast,
    VeryFast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VolumeLevel {
    Quiet,
    #[default]
    Normal,
    Loud,
    Yelling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PitchLevel {
    Low,
    #[default]
    Normal,
    High,
    Shaky,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PauseLevel {
    Long,
    #[default]
    Normal,
    Short,
    None,
}

impl SpeechSpeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechSpeed::Slow => "slow",
            SpeechSpeed::Normal => "normal",
            SpeechSpeed::Fast => "fast",
            SpeechSpeed::VeryFast => "very-fast",
        }
    }
}

impl VolumeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeLevel::Quiet => "quiet",
            VolumeLevel::Normal => "normal",
            VolumeLevel::Loud => "loud",
            VolumeLevel::Yelling => "yelling",
        }
    }
}

impl PitchLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PitchLevel::Low => "low",
            PitchLevel::Normal => "normal",
            PitchLevel::High => "high",
            PitchLevel::Shaky => "shaky",
        }
    }
}

impl PauseLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PauseLevel::Long => "long",
            PauseLevel::Normal => "normal",
            PauseLevel::Short => "short",
            PauseLevel::None => "none",
        }
    }
}

impl fmt::Display for VoiceMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "speed {} volume {} pitch {} breathing {} pauses {}",
            self.speed.as_str(),
            self.volume.as_str(),
            self.pitch.as_str(),
            self.breathing,
            self.pauses.as_str()
        )
    }
}

/// Categorized view of the voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VoiceMetrics {
    pub speed: SpeechSpeed,
    pub volume: VolumeLevel,
    pub pitch: PitchLevel,
    pub breathing: BreathingCategory,
    pub pauses: PauseLevel,
}

/// Numeric features derived from the rolling histories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AcousticFeatures {
    pub pitch_hz: f32,
    pub pitch_variation: f32,
    pub volume: f32,
    pub volume_variation: f32,
    pub speech_rate: f32,
    pub pause_ratio: f32,
    pub energy: f32,
    pub zero_crossing_rate: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceStressResult {
    pub metrics: VoiceMetrics,
    pub features: AcousticFeatures,
    pub stress_score: u8,
    pub is_breathing_rapid: bool,
    pub is_speech_fast: bool,
    pub is_pitch_elevated: bool,
    pub is_volume_erratic: bool,
    pub triggers: Triggers,
}

/// Reference voice the categories are measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceReference {
    pub pitch_hz: f32,
    pub volume: f32,
    pub speech_rate: f32,
    pub pause_ratio: f32,
}

impl VoiceReference {
    pub fn from_defaults(defaults: &BaselineDefaults) -> Self {
        Self {
            pitch_hz: defaults.pitch_hz,
            volume: defaults.volume,
            speech_rate: defaults.speech_rate,
            pause_ratio: defaults.pause_ratio,
        }
    }

    /// Calibrated pitch and volume replace the defaults; rate and pauses stay.
    pub fn with_baseline(mut self, baseline: &VoiceBaseline) -> Self {
        if baseline.pitch_hz > 0.0 {
            self.pitch_hz = baseline.pitch_hz;
        }
        if baseline.volume > 0.0 {
            self.volume = baseline.volume;
        }
        self
    }
}

/// Speech rate (syllables/s proxy) and pause ratio over recent segments.
///
/// The rate expression `speech * 4 / max(speech, 1)` is 4 whenever at least
/// one second of speech falls in the window and `4 * speech` below that. It
/// does not track real articulation speed.
pub fn speech_timing<'a, I>(segments: I, now: Instant, window: Duration) -> (f32, f32)
where
    I: IntoIterator<Item = &'a SpeechSegment>,
{
    let mut speech_time = 0.0f32;
    let mut total_time = 0.0f32;
    for segment in segments {
        if now.saturating_duration_since(segment.timestamp) > window {
            continue;
        }
        total_time += segment.duration_secs;
        if segment.is_speech {
            speech_time += segment.duration_secs;
        }
    }

    let pause_ratio = if total_time > 0.0 {
        1.0 - speech_time / total_time
    } else {
        0.3
    };
    let speech_rate = if speech_time > 0.0 {
        (speech_time * 4.0) / speech_time.max(1.0)
    } else {
        4.0
    };

    (speech_rate.min(10.0), pause_ratio)
}

/// Maps numeric features onto categories relative to `reference`.
pub fn classify_metrics(
    features: &AcousticFeatures,
    has_pitch: bool,
    breathing: BreathingCategory,
    reference: &VoiceReference,
    thresholds: &VoiceThresholds,
) -> VoiceMetrics {
    let speed_ratio = features.speech_rate / reference.speech_rate;
    let speed = if speed_ratio > thresholds.speed_very_fast {
        SpeechSpeed::VeryFast
    } else if speed_ratio > thresholds.speed_fast {
        SpeechSpeed::Fast
    } else if speed_ratio < thresholds.speed_slow {
        SpeechSpeed::Slow
    } else {
        SpeechSpeed::Normal
    };

    let volume_ratio = features.volume / reference.volume;
    let volume = if volume_ratio > thresholds.volume_yelling {
        VolumeLevel::Yelling
    } else if volume_ratio > thresholds.volume_loud {
        VolumeLevel::Loud
    } else if volume_ratio < thresholds.volume_quiet {
        VolumeLevel::Quiet
    } else {
        VolumeLevel::Normal
    };

    let pitch = if features.pitch_variation > thresholds.pitch_shaky_variation {
        PitchLevel::Shaky
    } else if !has_pitch {
        PitchLevel::Normal
    } else {
        let pitch_ratio = features.pitch_hz / reference.pitch_hz;
        if pitch_ratio > thresholds.pitch_high {
            PitchLevel::High
        } else if pitch_ratio < thresholds.pitch_low {
            PitchLevel::Low
        } else {
            PitchLevel::Normal
        }
    };

    let pauses = if features.pause_ratio > thresholds.pauses_long {
        PauseLevel::Long
    } else if features.pause_ratio < thresholds.pauses_none {
        PauseLevel::None
    } else if features.pause_ratio < thresholds.pauses_short {
        PauseLevel::Short
    } else {
        PauseLevel::Normal
    };

    VoiceMetrics {
        speed,
        volume,
        pitch,
        breathing,
        pauses,
    }
}

/// Additive score before clamping.
pub fn raw_score(
    metrics: &VoiceMetrics,
    zero_crossing_rate: f32,
    zero_crossing_threshold: f32,
    weights: &VoiceWeights,
) -> u32 {
    let breathing = match metrics.breathing {
        BreathingCategory::Gasping => weights.breathing_gasping,
        BreathingCategory::Rapid => weights.breathing_rapid,
        BreathingCategory::Shallow => weights.breathing_shallow,
        BreathingCategory::Normal | BreathingCategory::Deep => 0,
    };
    let speed = match metrics.speed {
        SpeechSpeed::VeryFast => weights.speed_very_fast,
        SpeechSpeed::Fast => weights.speed_fast,
        SpeechSpeed::Normal | SpeechSpeed::Slow => 0,
    };
    let volume = match metrics.volume {
        VolumeLevel::Yelling => weights.volume_yelling,
        VolumeLevel::Loud => weights.volume_loud,
        VolumeLevel::Quiet => weights.volume_quiet,
        VolumeLevel::Normal => 0,
    };
    let pitch = match metrics.pitch {
        PitchLevel::Shaky => weights.pitch_shaky,
        PitchLevel::High => weights.pitch_high,
        PitchLevel::Normal | PitchLevel::Low => 0,
    };
    let pauses = match metrics.pauses {
        PauseLevel::None => weights.pauses_none,
        PauseLevel::Short => weights.pauses_short,
        PauseLevel::Normal | PauseLevel::Long => 0,
    };
    let noise = if zero_crossing_rate > zero_crossing_threshold {
        weights.zero_crossing
    } else {
        0
    };

    breathing + speed + volume + pitch + pauses + noise
}

/// Clamps a raw score into 0..=100.
pub fn clamp_score(raw: u32) -> u8 {
    raw.min(MAX_SCORE as u32) as u8
}

/// Exponential moving average: `previous * factor + current * (1 - factor)`.
pub fn smooth(previous: u8, current: u8, factor: f32) -> u8 {
    let factor = factor.clamp(0.0, 1.0) as f64;
    let blended = previous as f64 * factor + current as f64 * (1.0 - factor);
    blended.round().clamp(0.0, MAX_SCORE as f64) as u8
}

fn voice_triggers(metrics: &VoiceMetrics) -> Triggers {
    let mut triggers = Triggers::new();
    match metrics.breathing {
        BreathingCategory::Gasping => {
            triggers.insert(Trigger::BreathingCrisis);
        }
        BreathingCategory::Rapid => {
            triggers.insert(Trigger::RapidBreathing);
        }
        BreathingCategory::Shallow => {
            triggers.insert(Trigger::ShallowBreathing);
        }
        BreathingCategory::Normal | BreathingCategory::Deep => {}
    }
    if matches!(metrics.speed, SpeechSpeed::Fast | SpeechSpeed::VeryFast) {
        triggers.insert(Trigger::FastSpeech);
    }
    if matches!(metrics.volume, VolumeLevel::Loud | VolumeLevel::Yelling) {
        triggers.insert(Trigger::RaisedVoice);
    }
    match metrics.pitch {
        PitchLevel::Shaky => {
            triggers.insert(Trigger::ShakyVoice);
        }
        PitchLevel::High => {
            triggers.insert(Trigger::ElevatedPitch);
        }
        PitchLevel::Normal | PitchLevel::Low => {}
    }
    if metrics.pauses == PauseLevel::None {
        triggers.insert(Trigger::NoPauses);
    }
    if metrics.volume == VolumeLevel::Quiet
        && (metrics.pauses == PauseLevel::Long || metrics.speed == SpeechSpeed::Slow)
    {
        triggers.insert(Trigger::WithdrawnVoice);
    }
    triggers
}

/// Stateful voice scorer owning the pitch, volume and score histories.
#[derive(Debug, Clone)]
pub struct VoiceStressScorer {
    config: VoiceConfig,
    speech_rate_window: Duration,
    reference: VoiceReference,
    pitch_history: RingBuffer<f32>,
    volume_history: RingBuffer<f32>,
    score_history: RingBuffer<u8>,
    last: Option<VoiceStressResult>,
}

impl VoiceStressScorer {
    pub fn new(config: VoiceConfig, speech_rate_window: Duration) -> Self {
        Self {
            reference: VoiceReference::from_defaults(&config.baseline),
            pitch_history: RingBuffer::new(config.history),
            volume_history: RingBuffer::new(config.history),
            score_history: RingBuffer::new(config.history),
            speech_rate_window,
            config,
            last: None,
        }
    }

    /// Measure against a calibrated baseline, or the defaults when `None`.
    pub fn set_baseline(&mut self, baseline: Option<&VoiceBaseline>) {
        let defaults = VoiceReference::from_defaults(&self.config.baseline);
        self.reference = match baseline {
            Some(baseline) => defaults.with_baseline(baseline),
            None => defaults,
        };
    }

    pub fn reference(&self) -> &VoiceReference {
        &self.reference
    }

    pub fn set_smoothing_factor(&mut self, factor: f32) {
        self.config.smoothing_factor = factor;
    }

    /// Scores one tick.
    pub fn analyze<'a, I>(
        &mut self,
        frame: &FrameFeatures,
        segments: I,
        breathing: BreathingCategory,
        now: Instant,
    ) -> VoiceStressResult
    where
        I: IntoIterator<Item = &'a SpeechSegment>,
    {
        if frame.pitch_hz > 0.0 {
            self.pitch_history.push(frame.pitch_hz);
        }
        self.volume_history.push(frame.rms);

        let has_pitch = !self.pitch_history.is_empty();
        let pitch_hz = self.pitch_history.mean().unwrap_or(0.0);
        let volume = self.volume_history.mean().unwrap_or(0.0);
        let (speech_rate, pause_ratio) = speech_timing(segments, now, self.speech_rate_window);

        let features = AcousticFeatures {
            pitch_hz,
            pitch_variation: self.pitch_history.std_dev(pitch_hz),
            volume,
            volume_variation: self.volume_history.std_dev(volume),
            speech_rate,
            pause_ratio,
            energy: frame.rms,
            zero_crossing_rate: frame.zero_crossing_rate,
        };

        let metrics = classify_metrics(
            &features,
            has_pitch,
            breathing,
            &self.reference,
            &self.config.thresholds,
        );
        let raw = raw_score(
            &metrics,
            frame.zero_crossing_rate,
            self.config.zero_crossing_threshold,
            &self.config.weights,
        );
        let current = clamp_score(raw);
        let stress_score = match &self.last {
            Some(prev) => smooth(prev.stress_score, current, self.config.smoothing_factor),
            None => current,
        };
        self.score_history.push(stress_score);

        let result = VoiceStressResult {
            metrics,
            features,
            stress_score,
            is_breathing_rapid: matches!(
                breathing,
                BreathingCategory::Rapid | BreathingCategory::Gasping
            ),
            is_speech_fast: matches!(metrics.speed, SpeechSpeed::Fast | SpeechSpeed::VeryFast),
            is_pitch_elevated: matches!(metrics.pitch, PitchLevel::High | PitchLevel::Shaky),
            is_volume_erratic: features.volume_variation > self.config.erratic_volume_variation,
            triggers: voice_triggers(&metrics),
        };
        self.last = Some(result.clone());
        result
    }

    pub fn last_result(&self) -> Option<&VoiceStressResult> {
        self.last.as_ref()
    }

    pub fn score_history(&self) -> &RingBuffer<u8> {
        &self.score_history
    }

    /// Forget all history; the baseline is kept.
    pub fn reset(&mut self) {
        self.pitch_history.clear();
        self.volume_history.clear();
        self.score_history.clear();
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoiceConfig;
    use chrono::Utc;

    const NO_SEGMENTS: &[SpeechSegment] = &[];

    #[test]
    fn test_metrics_display_uses_serde_labels() {
        let metrics = VoiceMetrics {
            speed: SpeechSpeed::VeryFast,
            pauses: PauseLevel::None,
            ..VoiceMetrics::default()
        };
        assert_eq!(
            metrics.to_string(),
            "speed very-fast volume normal pitch normal breathing normal pauses none"
        );
        assert_eq!(
            serde_json::to_string(&SpeechSpeed::VeryFast).unwrap(),
            format!("\"{}\"", SpeechSpeed::VeryFast.as_str())
        );
    }

    fn scorer() -> VoiceStressScorer {
        VoiceStressScorer::new(VoiceConfig::default(), Duration::from_secs(10))
    }

    fn frame(rms: f32, pitch_hz: f32) -> FrameFeatures {
        FrameFeatures {
            rms,
            zero_crossing_rate: 0.02,
            pitch_hz,
            is_speech: rms > 0.015,
        }
    }

    fn tick(
        scorer: &mut VoiceStressScorer,
        frame: FrameFeatures,
        breathing: BreathingCategory,
    ) -> VoiceStressResult {
        scorer.analyze(&frame, NO_SEGMENTS, breathing, Instant::now())
    }

    fn seg(is_speech: bool, duration_secs: f32, timestamp: Instant) -> SpeechSegment {
        SpeechSegment {
            is_speech,
            duration_secs,
            timestamp,
        }
    }

    fn default_reference() -> VoiceReference {
        VoiceReference::from_defaults(&BaselineDefaults::default())
    }

    fn features(
        pitch_hz: f32,
        volume: f32,
        speech_rate: f32,
        pause_ratio: f32,
    ) -> AcousticFeatures {
        AcousticFeatures {
            pitch_hz,
            volume,
            speech_rate,
            pause_ratio,
            ..AcousticFeatures::default()
        }
    }

    #[test]
    fn test_speech_timing_without_segments_uses_defaults() {
        let (rate, pauses) = speech_timing(NO_SEGMENTS, Instant::now(), Duration::from_secs(10));
        assert_eq!(rate, 4.0);
        assert_eq!(pauses, 0.3);
    }

    #[test]
    fn test_speech_timing_pause_ratio() {
        let now = Instant::now();
        let segments = [seg(true, 3.0, now), seg(false, 1.0, now)];
        let (rate, pauses) = speech_timing(&segments, now, Duration::from_secs(10));
        assert!((pauses - 0.25).abs() < 1e-6);
        assert_eq!(rate, 4.0);
    }

    #[test]
    fn test_speech_rate_is_constant_above_one_second_of_speech() {
        // Current behavior: once speech time reaches 1s the rate is always 4,
        // regardless of how much was said.
        let now = Instant::now();
        for speech in [1.0, 2.5, 7.0] {
            let segments = [seg(true, speech, now), seg(false, 0.5, now)];
            let (rate, _) = speech_timing(&segments, now, Duration::from_secs(10));
            assert_eq!(rate, 4.0);
        }
        // Below one second it scales with speech time.
        let segments = [seg(true, 0.25, now), seg(false, 0.5, now)];
        let (rate, _) = speech_timing(&segments, now, Duration::from_secs(10));
        assert_eq!(rate, 1.0);
    }

    #[test]
    fn test_speech_timing_ignores_old_segments() {
        let start = Instant::now();
        let now = start + Duration::from_secs(30);
        let segments = [seg(true, 5.0, start), seg(false, 2.0, now)];
        let (_, pauses) = speech_timing(&segments, now, Duration::from_secs(10));
        assert_eq!(pauses, 1.0);
    }

    #[test]
    fn test_classify_speed_cutoffs() {
        let reference = default_reference();
        let thresholds = VoiceThresholds::default();
        let speed = |rate| {
            classify_metrics(
                &features(150.0, 0.3, rate, 0.3),
                true,
                BreathingCategory::Normal,
                &reference,
                &thresholds,
            )
            .speed
        };
        assert_eq!(speed(6.5), SpeechSpeed::VeryFast);
        assert_eq!(speed(5.0), SpeechSpeed::Fast);
        assert_eq!(speed(4.0), SpeechSpeed::Normal);
        assert_eq!(speed(1.5), SpeechSpeed::Slow);
    }

    #[test]
    fn test_classify_volume_relative_to_baseline() {
        let reference = default_reference();
        let thresholds = VoiceThresholds::default();
        let volume = |v| {
            classify_metrics(
                &features(150.0, v, 4.0, 0.3),
                true,
                BreathingCategory::Normal,
                &reference,
                &thresholds,
            )
            .volume
        };
        assert_eq!(volume(0.95), VolumeLevel::Yelling);
        assert_eq!(volume(0.6), VolumeLevel::Loud);
        assert_eq!(volume(0.3), VolumeLevel::Normal);
        assert_eq!(volume(0.1), VolumeLevel::Quiet);
    }

    #[test]
    fn test_classify_pitch_shaky_overrides_ratio() {
        let reference = default_reference();
        let thresholds = VoiceThresholds::default();
        let mut f = features(100.0, 0.3, 4.0, 0.3);
        f.pitch_variation = 60.0;
        let metrics =
            classify_metrics(&f, true, BreathingCategory::Normal, &reference, &thresholds);
        assert_eq!(metrics.pitch, PitchLevel::Shaky);

        f.pitch_variation = 10.0;
        let metrics =
            classify_metrics(&f, true, BreathingCategory::Normal, &reference, &thresholds);
        assert_eq!(metrics.pitch, PitchLevel::Low);

        f.pitch_hz = 220.0;
        let metrics =
            classify_metrics(&f, true, BreathingCategory::Normal, &reference, &thresholds);
        assert_eq!(metrics.pitch, PitchLevel::High);
    }

    #[test]
    fn test_classify_no_pitch_history_is_normal_pitch() {
        let metrics = classify_metrics(
            &features(0.0, 0.3, 4.0, 0.3),
            false,
            BreathingCategory::Normal,
            &default_reference(),
            &VoiceThresholds::default(),
        );
        assert_eq!(metrics.pitch, PitchLevel::Normal);
    }

    #[test]
    fn test_classify_pauses() {
        let reference = default_reference();
        let thresholds = VoiceThresholds::default();
        let pauses = |ratio| {
            classify_metrics(
                &features(150.0, 0.3, 4.0, ratio),
                true,
                BreathingCategory::Normal,
                &reference,
                &thresholds,
            )
            .pauses
        };
        assert_eq!(pauses(0.5), PauseLevel::Long);
        assert_eq!(pauses(0.3), PauseLevel::Normal);
        assert_eq!(pauses(0.2), PauseLevel::Short);
        assert_eq!(pauses(0.1), PauseLevel::None);
    }

    #[test]
    fn test_raw_score_maxed_metrics_clamps_to_100() {
        let metrics = VoiceMetrics {
            speed: SpeechSpeed::VeryFast,
            volume: VolumeLevel::Yelling,
            pitch: PitchLevel::Shaky,
            breathing: BreathingCategory::Gasping,
            pauses: PauseLevel::None,
        };
        let raw = raw_score(&metrics, 0.0, 0.1, &VoiceWeights::default());
        assert_eq!(raw, 115);
        assert_eq!(clamp_score(raw), 100);
        assert_eq!(clamp_score(raw + 10), 100);
    }

    #[test]
    fn test_raw_score_calm_voice_is_zero() {
        let raw = raw_score(&VoiceMetrics::default(), 0.05, 0.1, &VoiceWeights::default());
        assert_eq!(raw, 0);
    }

    #[test]
    fn test_raw_score_zero_crossing_adds_ten() {
        let raw = raw_score(&VoiceMetrics::default(), 0.2, 0.1, &VoiceWeights::default());
        assert_eq!(raw, 10);
    }

    #[test]
    fn test_smooth_weights_previous_by_factor() {
        assert_eq!(smooth(0, 100, 0.3), 70);
        assert_eq!(smooth(100, 0, 0.3), 30);
        assert_eq!(smooth(50, 50, 0.3), 50);
        assert_eq!(smooth(20, 80, 0.0), 80);
    }

    #[test]
    fn test_smooth_converges_to_constant_input() {
        let mut score = 0;
        for _ in 0..50 {
            score = smooth(score, 73, 0.3);
        }
        assert_eq!(score, 73);
    }

    #[test]
    fn test_first_tick_is_unsmoothed() {
        let mut scorer = scorer();
        let result = tick(&mut scorer, frame(0.0, 0.0), BreathingCategory::Gasping);
        // gasping 35 + quiet 8
        assert_eq!(result.stress_score, 43);
        assert!(result.is_breathing_rapid);
        assert!(result.triggers.contains(&Trigger::BreathingCrisis));
    }

    #[test]
    fn test_subsequent_ticks_are_smoothed() {
        let mut scorer = scorer();
        scorer.set_smoothing_factor(0.25);
        let first = tick(&mut scorer, frame(0.3, 150.0), BreathingCategory::Normal);
        assert_eq!(first.stress_score, 0);

        let second = tick(&mut scorer, frame(0.3, 150.0), BreathingCategory::Gasping);
        // raw 35 smoothed against 0: round(0 * 0.25 + 35 * 0.75) = 26
        assert_eq!(second.stress_score, 26);
    }

    #[test]
    fn test_histories_are_bounded() {
        let mut scorer = scorer();
        for _ in 0..100 {
            tick(&mut scorer, frame(0.3, 150.0), BreathingCategory::Normal);
        }
        assert_eq!(scorer.pitch_history.len(), 30);
        assert_eq!(scorer.volume_history.len(), 30);
        assert_eq!(scorer.score_history().len(), 30);
    }

    #[test]
    fn test_zero_pitch_not_recorded() {
        let mut scorer = scorer();
        tick(&mut scorer, frame(0.3, 200.0), BreathingCategory::Normal);
        let result = tick(&mut scorer, frame(0.3, 0.0), BreathingCategory::Normal);
        assert_eq!(result.features.pitch_hz, 200.0);
        assert_eq!(scorer.pitch_history.len(), 1);
        assert_eq!(scorer.volume_history.len(), 2);
    }

    #[test]
    fn test_shaky_pitch_from_history() {
        let mut scorer = scorer();
        let mut result = None;
        for pitch in [100.0, 260.0, 100.0, 260.0] {
            result = Some(tick(&mut scorer, frame(0.3, pitch), BreathingCategory::Normal));
        }
        let result = result.unwrap();
        assert!(result.features.pitch_variation > 50.0);
        assert_eq!(result.metrics.pitch, PitchLevel::Shaky);
        assert!(result.is_pitch_elevated);
        assert!(result.triggers.contains(&Trigger::ShakyVoice));
    }

    #[test]
    fn test_erratic_volume() {
        let mut scorer = scorer();
        tick(&mut scorer, frame(0.05, 0.0), BreathingCategory::Normal);
        let result = tick(&mut scorer, frame(0.6, 0.0), BreathingCategory::Normal);
        assert!(result.is_volume_erratic);
    }

    #[test]
    fn test_baseline_shifts_volume_reference() {
        let mut scorer = scorer();
        // 0.6 is loud against the default 0.3 reference...
        let loud = tick(&mut scorer, frame(0.6, 0.0), BreathingCategory::Normal);
        assert_eq!(loud.metrics.volume, VolumeLevel::Loud);

        // ...but normal for someone who calibrated at 0.5.
        scorer.reset();
        scorer.set_baseline(Some(&VoiceBaseline {
            pitch_hz: 180.0,
            volume: 0.5,
            captured_at: Utc::now(),
        }));
        assert_eq!(scorer.reference().pitch_hz, 180.0);
        let normal = tick(&mut scorer, frame(0.6, 0.0), BreathingCategory::Normal);
        assert_eq!(normal.metrics.volume, VolumeLevel::Normal);

        scorer.set_baseline(None);
        assert_eq!(scorer.reference().volume, 0.3);
    }

    #[test]
    fn test_withdrawn_voice_trigger() {
        let now = Instant::now();
        let mut scorer = scorer();
        let segments = [seg(true, 1.0, now), seg(false, 4.0, now)];
        let result = scorer.analyze(
            &frame(0.02, 0.0),
            &segments,
            BreathingCategory::Deep,
            now,
        );
        assert_eq!(result.metrics.volume, VolumeLevel::Quiet);
        assert_eq!(result.metrics.pauses, PauseLevel::Long);
        assert!(result.triggers.contains(&Trigger::WithdrawnVoice));
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let mut scorer = scorer();
        let result = tick(&mut scorer, frame(0.3, 150.0), BreathingCategory::Normal);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("stressScore").is_some());
        assert!(json["features"].get("zeroCrossingRate").is_some());
        assert_eq!(json["metrics"]["breathing"], "normal");
    }
}
