//! Grounding technique selection and the exercise catalog.

use crate::fusion::StressLevel;
use crate::trigger::{Trigger, Triggers};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroundingType {
    Breathing,
    #[serde(rename = "5-4-3-2-1")]
    FiveFourThreeTwoOne,
    BodyScan,
    SafePlace,
}

/// Renderable description of a grounding technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Exercise {
    pub title: &'static str,
    pub steps: &'static [&'static str],
}

impl GroundingType {
    pub const ALL: [GroundingType; 4] = [
        GroundingType::Breathing,
        GroundingType::FiveFourThreeTwoOne,
        GroundingType::BodyScan,
        GroundingType::SafePlace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroundingType::Breathing => "breathing",
            GroundingType::FiveFourThreeTwoOne => "5-4-3-2-1",
            GroundingType::BodyScan => "body-scan",
            GroundingType::SafePlace => "safe-place",
        }
    }

    pub fn exercise(&self) -> Exercise {
        match self {
            GroundingType::Breathing => Exercise {
                title: "Box breathing",
                steps: &[
                    "Breathe in slowly through your nose for 4 seconds.",
                    "Hold your breath for 4 seconds.",
                    "Breathe out gently through your mouth for 4 seconds.",
                    "Hold for 4 seconds, then repeat four times.",
                ],
            },
            GroundingType::FiveFourThreeTwoOne => Exercise {
                title: "5-4-3-2-1 senses",
                steps: &[
                    "Name 5 things you can see.",
                    "Name 4 things you can touch.",
                    "Name 3 things you can hear.",
                    "Name 2 things you can smell.",
                    "Name 1 thing you can taste.",
                ],
            },
            GroundingType::BodyScan => Exercise {
                title: "Body scan",
                steps: &[
                    "Settle into a comfortable position and close your eyes if you like.",
                    "Notice your feet and let them soften.",
                    "Move your attention up through your legs, belly and chest.",
                    "Relax your shoulders, arms and hands.",
                    "Finish by unclenching your jaw and forehead.",
                ],
            },
            GroundingType::SafePlace => Exercise {
                title: "Safe place",
                steps: &[
                    "Picture a place where you feel calm and safe.",
                    "Notice what you can see there, in detail.",
                    "Notice the sounds and the temperature of the air.",
                    "Stay there for a few slow breaths before coming back.",
                ],
            },
        }
    }
}

impl fmt::Display for GroundingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Picks a technique for the current level and triggers. Total: every input
/// resolves to exactly one type.
pub fn choose_grounding_type(level: StressLevel, triggers: &Triggers) -> GroundingType {
    if triggers.contains(&Trigger::BreathingCrisis) || triggers.contains(&Trigger::RapidBreathing)
    {
        GroundingType::Breathing
    } else if matches!(level, StressLevel::High | StressLevel::Crisis) {
        GroundingType::FiveFourThreeTwoOne
    } else if triggers.contains(&Trigger::ShakyVoice) || triggers.contains(&Trigger::WithdrawnVoice)
    {
        GroundingType::BodyScan
    } else {
        GroundingType::SafePlace
    }
}
