//! Trigger tags raised by the scoring channels.
//!
//! The vocabulary is closed: every tag any scorer can emit is a variant here,
//! serialized in kebab-case (`crisis-language`, `rapid-breathing`, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    // Text channel
    CrisisLanguage,
    HighStressLanguage,
    StressIndicators,
    MildConcern,
    CapsLock,
    FragmentedResponse,
    EmphaticPunctuation,

    // Behavior channel
    RapidMessaging,
    FrequentMessaging,
    RepetitiveContent,
    CapsUsage,
    FragmentedCommunication,

    // Voice channel
    BreathingCrisis,
    RapidBreathing,
    ShallowBreathing,
    FastSpeech,
    RaisedVoice,
    ShakyVoice,
    ElevatedPitch,
    WithdrawnVoice,
    NoPauses,
}

/// Deduplicated, ordered trigger set.
pub type Triggers = BTreeSet<Trigger>;

impl Trigger {
    pub const ALL: [Trigger; 21] = [
        Trigger::CrisisLanguage,
        Trigger::HighStressLanguage,
        Trigger::StressIndicators,
        Trigger::MildConcern,
        Trigger::CapsLock,
        Trigger::FragmentedResponse,
        Trigger::EmphaticPunctuation,
        Trigger::RapidMessaging,
        Trigger::FrequentMessaging,
        Trigger::RepetitiveContent,
        Trigger::CapsUsage,
        Trigger::FragmentedCommunication,
        Trigger::BreathingCrisis,
        Trigger::RapidBreathing,
        Trigger::ShallowBreathing,
        Trigger::FastSpeech,
        Trigger::RaisedVoice,
        Trigger::ShakyVoice,
        Trigger::ElevatedPitch,
        Trigger::WithdrawnVoice,
        Trigger::NoPauses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::CrisisLanguage => "crisis-language",
            Trigger::HighStressLanguage => "high-stress-language",
            Trigger::StressIndicators => "stress-indicators",
            Trigger::MildConcern => "mild-concern",
            Trigger::CapsLock => "caps-lock",
            Trigger::FragmentedResponse => "fragmented-response",
            Trigger::EmphaticPunctuation => "emphatic-punctuation",
            Trigger::RapidMessaging => "rapid-messaging",
            Trigger::FrequentMessaging => "frequent-messaging",
            Trigger::RepetitiveContent => "repetitive-content",
            Trigger::CapsUsage => "caps-usage",
            Trigger::FragmentedCommunication => "fragmented-communication",
            Trigger::BreathingCrisis => "breathing-crisis",
            Trigger::RapidBreathing => "rapid-breathing",
            Trigger::ShallowBreathing => "shallow-breathing",
            Trigger::FastSpeech => "fast-speech",
            Trigger::RaisedVoice => "raised-voice",
            Trigger::ShakyVoice => "shaky-voice",
            Trigger::ElevatedPitch => "elevated-pitch",
            Trigger::WithdrawnVoice => "withdrawn-voice",
            Trigger::NoPauses => "no-pauses",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Joins triggers as a comma-separated list for display.
pub fn format_triggers(triggers: &Triggers) -> String {
    triggers
        .iter()
        .map(Trigger::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
