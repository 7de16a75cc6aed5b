//! Command-line interface for calmwave
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::time::Duration;

/// Stress inference from voice, text and typing behavior
#[derive(Parser, Debug)]
#[command(
    name = "calmwave",
    version,
    about = "Stress inference from voice, text and typing behavior"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug logs, -vv: trace logs)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Print results as JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Analysis tick interval (default: from config, 500ms). Examples: 250ms, 1s
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_tick)]
    pub tick: Option<Duration>,
}

/// Parse a tick interval.
///
/// Bare numbers are milliseconds; anything else goes through `humantime`
/// (`250ms`, `1s`, `1s500ms`).
fn parse_tick(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let duration = match s.parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(_) => humantime::parse_duration(s).map_err(|e| e.to_string())?,
    };
    if duration.is_zero() {
        return Err("tick interval must be greater than zero".to_string());
    }
    Ok(duration)
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze the voice in a WAV recording, one line per tick
    Analyze {
        /// WAV file to analyze
        #[arg(value_name = "FILE")]
        wav: PathBuf,
    },

    /// Score chat messages on the text and behavior channels
    Text {
        /// Messages, scored in order
        #[arg(value_name = "MESSAGE", required = true)]
        messages: Vec<String>,
    },

    /// Calibrate a personal voice baseline from a WAV recording
    Calibrate {
        /// WAV file with at least five seconds of normal speech
        #[arg(value_name = "FILE")]
        wav: PathBuf,
    },

    /// Inspect or remove the stored voice baseline
    Baseline {
        #[command(subcommand)]
        action: BaselineAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Monitor the microphone live while reading chat lines from stdin
    #[cfg(feature = "cpal-audio")]
    Listen {
        /// Audio input device name (default: system default)
        #[arg(long, value_name = "DEVICE")]
        device: Option<String>,

        /// Run a calibration session first
        #[arg(long)]
        calibrate: bool,
    },

    /// List available audio input devices
    #[cfg(feature = "cpal-audio")]
    Devices,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Baseline management actions
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineAction {
    /// Print the stored baseline
    Show,
    /// Delete the stored baseline
    Clear,
}

/// Configuration actions
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the default configuration file path
    Path,
}
