//! Text stress scoring.
//!
//! Each message is matched against four tiered lexicons plus three
//! typographic cues. A tier contributes its points once, on its first
//! matching pattern; tiers and cues add up and the total is capped at 100.

use crate::config::TextConfig;
use crate::defaults::MAX_SCORE;
use crate::error::{CalmwaveError, Result};
use crate::trigger::{Trigger, Triggers};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TextStressResult {
    pub score: u8,
    pub triggers: Triggers,
}

#[derive(Debug, Clone)]
struct Tier {
    patterns: Vec<Regex>,
    points: u32,
    trigger: Trigger,
}

impl Tier {
    fn compile(key: &str, patterns: &[String], points: u32, trigger: Trigger) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| CalmwaveError::ConfigInvalidValue {
                        key: key.to_string(),
                        message: format!("invalid pattern {pattern:?}: {e}"),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            patterns,
            points,
            trigger,
        })
    }

    fn matches(&self, message: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(message))
    }
}

#[derive(Debug, Clone)]
pub struct TextStressScorer {
    tiers: Vec<Tier>,
    caps_run: Regex,
    emphatic: Regex,
    caps_lock_points: u32,
    fragmented_points: u32,
    emphatic_points: u32,
}

/// Messages shorter than this (in chars) can count as fragmented.
const FRAGMENT_MAX_CHARS: usize = 10;

impl TextStressScorer {
    pub fn new(config: &TextConfig) -> Result<Self> {
        let tiers = vec![
            Tier::compile(
                "text.crisis_patterns",
                &config.crisis_patterns,
                config.crisis_points,
                Trigger::CrisisLanguage,
            )?,
            Tier::compile(
                "text.high_patterns",
                &config.high_patterns,
                config.high_points,
                Trigger::HighStressLanguage,
            )?,
            Tier::compile(
                "text.moderate_patterns",
                &config.moderate_patterns,
                config.moderate_points,
                Trigger::StressIndicators,
            )?,
            Tier::compile(
                "text.mild_patterns",
                &config.mild_patterns,
                config.mild_points,
                Trigger::MildConcern,
            )?,
        ];

        let builtin = |pattern: &str| {
            Regex::new(pattern).map_err(|e| CalmwaveError::Other(format!("{pattern}: {e}")))
        };

        Ok(Self {
            tiers,
            caps_run: builtin(r"[A-Z]{5,}")?,
            emphatic: builtin(r"[!?]{2,}")?,
            caps_lock_points: config.caps_lock_points,
            fragmented_points: config.fragmented_points,
            emphatic_points: config.emphatic_points,
        })
    }

    pub fn score(&self, message: &str) -> TextStressResult {
        let mut total = 0u32;
        let mut triggers = Triggers::new();

        for tier in &self.tiers {
            if tier.matches(message) {
                total += tier.points;
                triggers.insert(tier.trigger);
            }
        }

        if self.caps_run.is_match(message) {
            total += self.caps_lock_points;
            triggers.insert(Trigger::CapsLock);
        }

        if self.is_fragmented(message) {
            total += self.fragmented_points;
            triggers.insert(Trigger::FragmentedResponse);
        }

        if self.emphatic.is_match(message) {
            total += self.emphatic_points;
            triggers.insert(Trigger::EmphaticPunctuation);
        }

        TextStressResult {
            score: total.min(MAX_SCORE as u32) as u8,
            triggers,
        }
    }

    /// Short non-blank message. Once word characters are stripped only
    /// punctuation, symbols and whitespace remain, so length decides.
    fn is_fragmented(&self, message: &str) -> bool {
        !message.trim().is_empty() && message.chars().count() < FRAGMENT_MAX_CHARS
    }
}

impl Default for TextStressScorer {
    // The built-in lexicons are covered by tests; failing here is a bug.
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self::new(&TextConfig::default()).expect("default lexicons compile")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(message: &str) -> TextStressResult {
        TextStressScorer::default().score(message)
    }

    fn set(triggers: &[Trigger]) -> Triggers {
        triggers.iter().copied().collect()
    }

    #[test]
    fn test_crisis_language() {
        let result = score("I want to kill myself");
        assert_eq!(result.score, 40);
        assert_eq!(result.triggers, set(&[Trigger::CrisisLanguage]));
    }

    #[test]
    fn test_crisis_variants() {
        for message in [
            "i think about suicide a lot",
            "I can't breathe",
            "this is an emergency",
            "I've been self-harming again",
            "everyone would be better off without me",
        ] {
            let result = score(message);
            assert!(
                result.triggers.contains(&Trigger::CrisisLanguage),
                "{message:?} should be crisis language"
            );
            assert!(result.score >= 40);
        }
    }

    #[test]
    fn test_caps_emphatic_and_moderate_combine() {
        let result = score("I'M SO ANGRY!!!");
        assert_eq!(result.score, 33);
        assert_eq!(
            result.triggers,
            set(&[
                Trigger::StressIndicators,
                Trigger::CapsLock,
                Trigger::EmphaticPunctuation
            ])
        );
    }

    #[test]
    fn test_tier_counts_once_per_message() {
        // Three moderate words still add 15 once.
        let result = score("stressed, anxious and worried");
        assert_eq!(result.score, 15);
        assert_eq!(result.triggers, set(&[Trigger::StressIndicators]));
    }

    #[test]
    fn test_tiers_are_additive() {
        let result = score("I'm panicking and so stressed");
        assert_eq!(result.score, 25 + 15);
        assert_eq!(
            result.triggers,
            set(&[Trigger::HighStressLanguage, Trigger::StressIndicators])
        );
    }

    #[test]
    fn test_mild_concern() {
        let result = score("honestly just tired today");
        assert_eq!(result.score, 8);
        assert_eq!(result.triggers, set(&[Trigger::MildConcern]));
    }

    #[test]
    fn test_calm_message_scores_zero() {
        let result = score("Had a lovely walk in the park this afternoon.");
        assert_eq!(result, TextStressResult::default());
    }

    #[test]
    fn test_fragmented_short_message() {
        assert_eq!(score("...").triggers, set(&[Trigger::FragmentedResponse]));
        assert_eq!(score("ok").score, 5);
        assert!(!score("").triggers.contains(&Trigger::FragmentedResponse));
        assert!(
            !score("this one is long enough")
                .triggers
                .contains(&Trigger::FragmentedResponse)
        );
    }

    #[test]
    fn test_fragment_length_counts_surrounding_whitespace() {
        let padded = "         .";
        assert_eq!(padded.chars().count(), 10);
        assert!(!score(padded).triggers.contains(&Trigger::FragmentedResponse));
        assert!(score("        .").triggers.contains(&Trigger::FragmentedResponse));
    }

    #[test]
    fn test_unicode_punctuation_is_fragmented() {
        assert_eq!(score("…").triggers, set(&[Trigger::FragmentedResponse]));
        assert_eq!(score("’?").triggers, set(&[Trigger::FragmentedResponse]));
        assert_eq!(score("   ").triggers, Triggers::new());
    }

    #[test]
    fn test_emphatic_needs_two_marks() {
        assert!(!score("really?").triggers.contains(&Trigger::EmphaticPunctuation));
        assert!(score("really?!").triggers.contains(&Trigger::EmphaticPunctuation));
    }

    #[test]
    fn test_caps_needs_five_consecutive_uppercase() {
        assert!(!score("I AM OK with it").triggers.contains(&Trigger::CapsLock));
        assert!(score("please HELPME now").triggers.contains(&Trigger::CapsLock));
    }

    #[test]
    fn test_score_is_capped() {
        let result = score("SUICIDE!!! panic attack, so stressed and tired");
        // 40 + 25 + 15 + 8 + 10 + 8 = 106
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_custom_lexicon() {
        let config = TextConfig {
            mild_patterns: vec![r"\bgrumpy\b".to_string()],
            ..TextConfig::default()
        };
        let scorer = TextStressScorer::new(&config).unwrap();
        assert_eq!(scorer.score("feeling GRUMPY").triggers.len(), 2);
        assert_eq!(scorer.score("a bit tired").score, 0);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let config = TextConfig {
            crisis_patterns: vec!["(".to_string()],
            ..TextConfig::default()
        };
        let err = TextStressScorer::new(&config).unwrap_err();
        assert!(matches!(err, CalmwaveError::ConfigInvalidValue { .. }));
    }
}
