//! Interaction-behavior stress scoring.
//!
//! [`BehaviorTracker`] turns each raw chat message into a [`BehaviorPattern`]
//! (pace, length, repetition, shape); [`BehaviorStressScorer`] scores the
//! most recent patterns.

use crate::config::BehaviorConfig;
use crate::defaults::{self, MAX_SCORE};
use crate::history::RingBuffer;
use crate::trigger::{Trigger, Triggers};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Messages remembered for frequency, length and repetition checks.
const MESSAGE_MEMORY: usize = 64;

/// Earlier messages a new one is compared against for repetition.
const REPETITION_LOOKBACK: usize = 3;

const ALL_CAPS_MIN_LETTERS: usize = 5;
const FRAGMENT_MAX_WORDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorPattern {
    /// Messages per minute over the frequency window.
    pub message_frequency: f32,
    pub average_message_length: f32,
    pub repetitive_content: bool,
    pub all_caps: bool,
    pub fragmented_sentences: bool,
    #[serde(skip)]
    pub timestamp: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorStressResult {
    pub score: u8,
    pub triggers: Triggers,
}

#[derive(Debug, Clone)]
struct SeenMessage {
    at: Instant,
    normalized: String,
    chars: usize,
}

/// Derives one [`BehaviorPattern`] per message from recent message history.
#[derive(Debug, Clone)]
pub struct BehaviorTracker {
    window: Duration,
    messages: RingBuffer<SeenMessage>,
}

impl BehaviorTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            messages: RingBuffer::new(MESSAGE_MEMORY),
        }
    }

    pub fn observe(&mut self, message: &str, now: Instant) -> BehaviorPattern {
        let normalized = normalize(message);
        let repetitive_content = !normalized.is_empty()
            && self
                .messages
                .recent(REPETITION_LOOKBACK)
                .any(|seen| seen.normalized == normalized);

        self.messages.push(SeenMessage {
            at: now,
            normalized,
            chars: message.trim().chars().count(),
        });

        let (count, total_chars) = self
            .messages
            .iter()
            .filter(|seen| now.saturating_duration_since(seen.at) <= self.window)
            .fold((0usize, 0usize), |(n, chars), seen| (n + 1, chars + seen.chars));

        let minutes = (self.window.as_secs_f32() / 60.0).max(f32::EPSILON);

        BehaviorPattern {
            message_frequency: count as f32 / minutes,
            average_message_length: total_chars as f32 / count.max(1) as f32,
            repetitive_content,
            all_caps: is_all_caps(message),
            fragmented_sentences: is_fragmented(message),
            timestamp: now,
        }
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }
}

fn normalize(message: &str) -> String {
    message
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_all_caps(message: &str) -> bool {
    let letters = message.chars().filter(|c| c.is_alphabetic()).count();
    letters >= ALL_CAPS_MIN_LETTERS && !message.chars().any(char::is_lowercase)
}

fn is_fragmented(message: &str) -> bool {
    let trimmed = message.trim();
    let words = trimmed.split_whitespace().count();
    words < FRAGMENT_MAX_WORDS && !trimmed.ends_with(['.', '!', '?'])
}

/// Scores a slice of recent patterns, oldest first.
pub fn score_patterns<'a, I>(patterns: I, config: &BehaviorConfig) -> BehaviorStressResult
where
    I: IntoIterator<Item = &'a BehaviorPattern>,
{
    let patterns: Vec<&BehaviorPattern> = patterns.into_iter().collect();
    if patterns.len() < 2 {
        return BehaviorStressResult::default();
    }

    let avg_frequency =
        patterns.iter().map(|p| p.message_frequency).sum::<f32>() / patterns.len() as f32;
    let has_repetition = patterns.iter().any(|p| p.repetitive_content);
    let has_all_caps = patterns.iter().any(|p| p.all_caps);
    let fragments = patterns.iter().filter(|p| p.fragmented_sentences).count();

    let mut total = 0u32;
    let mut triggers = Triggers::new();

    if avg_frequency > config.rapid_frequency {
        total += config.rapid_points;
        triggers.insert(Trigger::RapidMessaging);
    } else if avg_frequency > config.frequent_frequency {
        total += config.frequent_points;
        triggers.insert(Trigger::FrequentMessaging);
    }
    if has_repetition {
        total += config.repetition_points;
        triggers.insert(Trigger::RepetitiveContent);
    }
    if has_all_caps {
        total += config.caps_points;
        triggers.insert(Trigger::CapsUsage);
    }
    if fragments > config.fragment_count {
        total += config.fragment_points;
        triggers.insert(Trigger::FragmentedCommunication);
    }

    BehaviorStressResult {
        score: total.min(MAX_SCORE as u32) as u8,
        triggers,
    }
}

#[derive(Debug, Clone)]
pub struct BehaviorStressScorer {
    config: BehaviorConfig,
    tracker: BehaviorTracker,
    patterns: RingBuffer<BehaviorPattern>,
}

impl BehaviorStressScorer {
    pub fn new(config: BehaviorConfig) -> Self {
        Self {
            tracker: BehaviorTracker::new(
                Duration::try_from_secs_f32(config.frequency_window_secs.max(1.0))
                    .unwrap_or(Duration::from_secs_f32(defaults::FREQUENCY_WINDOW_SECS)),
            ),
            patterns: RingBuffer::new(config.history),
            config,
        }
    }

    /// Records a message and rescores.
    pub fn observe(&mut self, message: &str, now: Instant) -> BehaviorStressResult {
        let pattern = self.tracker.observe(message, now);
        self.record(pattern)
    }

    /// Records an externally derived pattern and rescores.
    pub fn record(&mut self, pattern: BehaviorPattern) -> BehaviorStressResult {
        self.patterns.push(pattern);
        self.score()
    }

    pub fn score(&self) -> BehaviorStressResult {
        score_patterns(self.patterns.iter(), &self.config)
    }

    pub fn patterns(&self) -> &RingBuffer<BehaviorPattern> {
        &self.patterns
    }

    pub fn reset(&mut self) {
        self.tracker.reset();
        self.patterns.clear();
    }
}

impl Default for BehaviorStressScorer {
    fn default() -> Self {
        Self::new(BehaviorConfig::default())
    }
}
