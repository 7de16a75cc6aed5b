//! Terminal rendering for analysis results.
//!
//! Every formatter takes a `color` flag so the same text can go to a
//! terminal or a pipe; tests render without color.

use crate::calibration::{CalibrationOutcome, VoiceBaseline};
use crate::fusion::{CombinedStressAnalysis, StressLevel, StressTrend};
use crate::intervention::GroundingType;
use crate::text::TextStressResult;
use crate::trigger::{Triggers, format_triggers};
use crate::voice::VoiceStressResult;
use owo_colors::{OwoColorize, Style};
use std::time::Duration;

fn paint(text: &str, style: Style, color: bool) -> String {
    if color {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

fn level_style(level: StressLevel) -> Style {
    match level {
        StressLevel::Calm => Style::new().green(),
        StressLevel::Mild => Style::new().cyan(),
        StressLevel::Moderate => Style::new().yellow(),
        StressLevel::High => Style::new().red(),
        StressLevel::Crisis => Style::new().red().bold(),
    }
}

/// Secondary text such as labels.
pub fn format_label(text: &str, color: bool) -> String {
    paint(text, Style::new().dimmed(), color)
}

/// Confirmation that an action completed.
pub fn format_done(text: &str, color: bool) -> String {
    paint(text, Style::new().green(), color)
}

/// Level name, padded so columns line up.
pub fn format_level(level: StressLevel, color: bool) -> String {
    paint(&format!("{:<8}", level.as_str()), level_style(level), color)
}

fn format_trigger_list(triggers: &Triggers, color: bool) -> String {
    if triggers.is_empty() {
        return String::new();
    }
    let list = format!("  [{}]", format_triggers(triggers));
    paint(&list, Style::new().dimmed(), color)
}

/// One line per analyzed tick: offset into the recording, score and
/// categories.
pub fn format_voice_line(offset: Duration, result: &VoiceStressResult, color: bool) -> String {
    let level = StressLevel::from_score(result.stress_score);
    format!(
        "{}  {} {:>3}  {}{}",
        paint(
            &format!("{:>6.1}s", offset.as_secs_f32()),
            Style::new().dimmed(),
            color
        ),
        format_level(level, color),
        result.stress_score,
        result.metrics,
        format_trigger_list(&result.triggers, color)
    )
}

pub fn format_text_result(result: &TextStressResult, color: bool) -> String {
    format!(
        "text {:>3}{}",
        result.score,
        format_trigger_list(&result.triggers, color)
    )
}

/// Combined level, score, action and grounding suggestion on one line.
pub fn format_analysis(analysis: &CombinedStressAnalysis, color: bool) -> String {
    let mut line = format!(
        "{} {:>3}  {}",
        format_level(analysis.level, color),
        analysis.score,
        analysis.recommended_action
    );
    if let Some(grounding) = analysis.grounding_type {
        line.push_str(&format!(" ({grounding})"));
    }
    line.push_str(&format_trigger_list(&analysis.triggers, color));
    line
}

pub fn format_trend(trend: StressTrend, color: bool) -> String {
    match trend {
        StressTrend::Rising => paint("rising", Style::new().red(), color),
        StressTrend::Falling => paint("falling", Style::new().green(), color),
        StressTrend::Steady => "steady".to_string(),
    }
}

/// Numbered steps of a grounding exercise.
pub fn format_exercise(grounding: GroundingType, color: bool) -> String {
    let exercise = grounding.exercise();
    let mut out = paint(exercise.title, Style::new().bold(), color);
    for (i, step) in exercise.steps.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", i + 1, step));
    }
    out
}

pub fn format_baseline(baseline: &VoiceBaseline) -> String {
    format!(
        "pitch {} Hz, volume {}, captured {}",
        baseline.pitch_hz,
        baseline.volume,
        baseline.captured_at.to_rfc3339()
    )
}

pub fn format_calibration(outcome: &CalibrationOutcome, color: bool) -> String {
    match outcome {
        CalibrationOutcome::Success(baseline) => format!(
            "{} {}",
            paint("Calibrated:", Style::new().green(), color),
            format_baseline(baseline)
        ),
        CalibrationOutcome::Failed(reason) => format!(
            "{} {}",
            paint("Calibration failed:", Style::new().yellow(), color),
            reason
        ),
    }
}
