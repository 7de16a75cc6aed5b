//! Breathing pattern inferred from the rhythm of speech and pauses.

use crate::audio::segmenter::SpeechSegment;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BreathingCategory {
    Deep,
    #[default]
    Normal,
    Shallow,
    Rapid,
    Gasping,
}

impl BreathingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreathingCategory::Deep => "deep",
            BreathingCategory::Normal => "normal",
            BreathingCategory::Shallow => "shallow",
            BreathingCategory::Rapid => "rapid",
            BreathingCategory::Gasping => "gasping",
        }
    }
}

impl fmt::Display for BreathingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MIN_SEGMENTS: usize = 3;
const RAPID_PAUSE_SECS: f32 = 0.3;
const RAPID_SPEECH_SECS: f32 = 1.0;
const SHALLOW_PAUSE_SECS: f32 = 0.5;
const DEEP_PAUSE_SECS: f32 = 1.5;

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// Classifies breathing from recent segments.
///
/// Fewer than three segments is not enough to judge and reads as normal.
/// Talking with no pause segments at all reads as gasping.
pub fn classify<'a, I>(segments: I) -> BreathingCategory
where
    I: IntoIterator<Item = &'a SpeechSegment>,
{
    let mut speech = Vec::new();
    let mut pauses = Vec::new();
    for segment in segments {
        if segment.is_speech {
            speech.push(segment.duration_secs);
        } else {
            pauses.push(segment.duration_secs);
        }
    }

    if speech.len() + pauses.len() < MIN_SEGMENTS {
        return BreathingCategory::Normal;
    }
    if pauses.is_empty() {
        return BreathingCategory::Gasping;
    }

    let avg_pause = mean(&pauses);
    let avg_speech = mean(&speech);

    if avg_pause < RAPID_PAUSE_SECS && avg_speech < RAPID_SPEECH_SECS {
        BreathingCategory::Rapid
    } else if avg_pause < SHALLOW_PAUSE_SECS {
        BreathingCategory::Shallow
    } else if avg_pause > DEEP_PAUSE_SECS {
        BreathingCategory::Deep
    } else {
        BreathingCategory::Normal
    }
}
