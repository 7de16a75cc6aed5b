use anyhow::{Context, Result};
use calmwave::calibration::CalibrationState;
use calmwave::cli::{BaselineAction, Cli, Commands, ConfigAction};
use calmwave::clock::ManualClock;
use calmwave::config::Config;
use calmwave::monitor::{StressMonitor, VoiceStart};
use calmwave::output;
use calmwave::store::{BaselineStore, JsonFileBaselineStore, MemoryBaselineStore};
use calmwave::{CombinedStressAnalysis, WavAudioSource};
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// How results are printed.
#[derive(Debug, Clone, Copy)]
struct Output {
    json: bool,
    quiet: bool,
    color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let out = Output {
        json: cli.json,
        quiet: cli.quiet,
        color: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    };

    match cli.command {
        Commands::Analyze { wav } => {
            let config = load_config(cli.config.as_deref(), cli.tick)?;
            analyze_wav(config, &wav, out)?;
        }
        Commands::Text { messages } => {
            let config = load_config(cli.config.as_deref(), cli.tick)?;
            score_messages(config, &messages, out)?;
        }
        Commands::Calibrate { wav } => {
            let config = load_config(cli.config.as_deref(), cli.tick)?;
            calibrate_from_wav(config, &wav, out)?;
        }
        Commands::Baseline { action } => {
            let config = load_config(cli.config.as_deref(), cli.tick)?;
            handle_baseline_command(action, &config, out)?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref(), cli.tick)?;
        }
        #[cfg(feature = "cpal-audio")]
        Commands::Listen { device, calibrate } => {
            let config = load_config(cli.config.as_deref(), cli.tick)?;
            listen::run(config, device, calibrate, out).await?;
        }
        #[cfg(feature = "cpal-audio")]
        Commands::Devices => {
            list_audio_devices()?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "calmwave", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Logs go to stderr. `RUST_LOG` wins over `-v`/`-q`.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,calmwave={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/calmwave/config.toml)
/// 3. Built-in defaults
///
/// Environment overrides and `--tick` are applied last, then the result is
/// validated again.
fn load_config(custom_path: Option<&Path>, tick: Option<Duration>) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)?,
        None => match Config::default_path() {
            Some(path) => Config::load_or_default(&path)?,
            None => Config::default(),
        },
    };

    let mut config = config.with_env_overrides();
    if let Some(tick) = tick {
        config.audio.tick_interval_ms =
            u64::try_from(tick.as_millis()).context("tick interval too large")?;
    }
    config.validate()?;
    Ok(config)
}

fn open_store(config: &Config) -> Box<dyn BaselineStore> {
    match config.baseline_path() {
        Some(path) => Box::new(JsonFileBaselineStore::new(path)),
        None => {
            tracing::warn!("No data directory found, baseline will not be persisted");
            Box::new(MemoryBaselineStore::new())
        }
    }
}

/// Number of ticks needed to consume `length` of audio.
fn ticks_for(length: Duration, tick: Duration) -> u32 {
    (length.as_secs_f64() / tick.as_secs_f64()).ceil() as u32
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

/// Print the grounding exercise an analysis asks for, if any.
fn print_suggestion(analysis: &CombinedStressAnalysis, out: Output) {
    if let Some(grounding) = analysis.grounding_type {
        println!();
        println!("{}", output::format_exercise(grounding, out.color));
    }
}

/// Replays a WAV recording through the voice channel on a simulated clock.
fn analyze_wav(config: Config, wav: &Path, out: Output) -> Result<()> {
    let tick = config.tick_interval();
    let source = WavAudioSource::open(wav)?.with_chunk_duration(tick);
    let ticks = ticks_for(source.duration(), tick);
    let clock = ManualClock::new();
    let store = open_store(&config);
    let mut monitor = StressMonitor::with_clock(config, store, clock.clone())?;

    if let VoiceStart::Degraded { reason } = monitor.start_voice(Box::new(source)) {
        anyhow::bail!("Cannot analyze {}: {}", wav.display(), reason);
    }

    for i in 1..=ticks {
        clock.advance(tick);
        let Some(result) = monitor.tick() else {
            continue;
        };
        if out.json {
            print_json(&result)?;
        } else if !out.quiet {
            println!("{}", output::format_voice_line(tick * i, &result, out.color));
        }
    }
    monitor.stop_voice();

    let Some(combined) = monitor.last_combined().cloned() else {
        anyhow::bail!("{} is shorter than one analysis window", wav.display());
    };
    if out.json {
        return print_json(&combined);
    }

    println!();
    println!(
        "{} {}  trend {}",
        output::format_label("Overall:", out.color),
        output::format_analysis(&combined, out.color),
        output::format_trend(monitor.trend(), out.color)
    );
    if !out.quiet {
        print_suggestion(&combined, out);
    }
    Ok(())
}

/// Scores messages in order, so behavior sees them as one conversation.
fn score_messages(config: Config, messages: &[String], out: Output) -> Result<()> {
    let store = open_store(&config);
    let mut monitor = StressMonitor::new(config, store)?;

    let mut last = None;
    for message in messages {
        let combined = monitor.handle_message(message);
        if out.json {
            print_json(&combined)?;
        } else {
            if let Some(text) = monitor.last_text()
                && !out.quiet
            {
                println!("{}", output::format_text_result(text, out.color));
            }
            println!("{}", output::format_analysis(&combined, out.color));
        }
        last = Some(combined);
    }

    if let Some(last) = last
        && !out.json
        && !out.quiet
    {
        print_suggestion(&last, out);
    }
    Ok(())
}

/// Calibrates from a recording and saves the baseline on success.
fn calibrate_from_wav(config: Config, wav: &Path, out: Output) -> Result<()> {
    let tick = config.tick_interval();
    let period = Duration::try_from_secs_f32(config.calibration.duration_secs)
        .context("Invalid calibration.duration_secs")?;
    let source = WavAudioSource::open(wav)?.with_chunk_duration(tick);
    if source.duration() < period {
        anyhow::bail!(
            "{} is {:.1}s long; calibration needs at least {:.1}s of speech",
            wav.display(),
            source.duration().as_secs_f32(),
            period.as_secs_f32()
        );
    }

    let ticks = ticks_for(source.duration(), tick);
    let saved_to = config.baseline_path();
    let clock = ManualClock::new();
    let store = open_store(&config);
    let mut monitor = StressMonitor::with_clock(config, store, clock.clone())?;

    if let VoiceStart::Degraded { reason } = monitor.start_voice(Box::new(source)) {
        anyhow::bail!("Cannot read {}: {}", wav.display(), reason);
    }
    monitor.start_calibration();
    for _ in 0..ticks {
        clock.advance(tick);
        monitor.tick();
        if !matches!(monitor.calibration_state(), CalibrationState::Recording { .. }) {
            break;
        }
    }
    monitor.stop_voice();

    let CalibrationState::Finished(outcome) = monitor.calibration_state() else {
        anyhow::bail!("Recording ended before the calibration period finished");
    };

    match outcome.baseline() {
        Some(baseline) => {
            if out.json {
                print_json(baseline)?;
            } else {
                println!("{}", output::format_calibration(outcome, out.color));
                if let Some(path) = saved_to
                    && !out.quiet
                {
                    println!(
                        "{} {}",
                        output::format_label("Saved to", out.color),
                        path.display()
                    );
                }
            }
            Ok(())
        }
        None => {
            eprintln!("{}", output::format_calibration(outcome, out.color));
            std::process::exit(1);
        }
    }
}

fn handle_baseline_command(action: BaselineAction, config: &Config, out: Output) -> Result<()> {
    let mut store = open_store(config);
    match action {
        BaselineAction::Show => match store.load()? {
            Some(baseline) if out.json => print_json(&baseline)?,
            Some(baseline) => println!("{}", output::format_baseline(&baseline)),
            None => {
                let defaults = &config.voice.baseline;
                println!(
                    "No baseline stored (using defaults: pitch {} Hz, volume {})",
                    defaults.pitch_hz, defaults.volume
                );
            }
        },
        BaselineAction::Clear => {
            store.clear()?;
            if !out.quiet {
                println!("{}", output::format_done("Baseline cleared", out.color));
            }
        }
    }
    Ok(())
}

fn handle_config_command(
    action: ConfigAction,
    custom_path: Option<&Path>,
    tick: Option<Duration>,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path, tick)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            let path = custom_path
                .map(Path::to_path_buf)
                .or_else(Config::default_path)
                .context("No configuration directory on this system")?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// List available audio input devices.
#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    let devices = calmwave::audio::capture::list_devices()?;

    if devices.is_empty() {
        eprintln!("No audio input devices found");
        std::process::exit(1);
    }

    println!("Available audio input devices:");
    for (idx, device) in devices.iter().enumerate() {
        println!("  [{}] {}", idx, device);
    }

    Ok(())
}

#[cfg(feature = "cpal-audio")]
mod listen {
    use super::{Output, open_store, print_json, print_suggestion};
    use anyhow::Result;
    use calmwave::audio::capture::CpalAudioSource;
    use calmwave::config::Config;
    use calmwave::events::{ChannelSink, LogSink, StressEvent};
    use calmwave::fusion::StressLevel;
    use calmwave::monitor::{StressMonitor, VoiceStart};
    use calmwave::output;
    use calmwave::runtime::spawn_monitor;
    use tokio::io::{AsyncBufReadExt, BufReader};

    const EVENT_BUFFER: usize = 64;

    /// Live microphone plus chat lines from stdin until EOF or Ctrl+C.
    pub async fn run(
        config: Config,
        device: Option<String>,
        calibrate: bool,
        out: Output,
    ) -> Result<()> {
        let tick = config.tick_interval();
        let calibration_secs = config.calibration.duration_secs;
        let store = open_store(&config);
        let mut monitor = StressMonitor::new(config, store)?;

        let (tx, rx) = crossbeam_channel::bounded(EVENT_BUFFER);
        monitor.subscribe(Box::new(ChannelSink::new(tx)));
        monitor.subscribe(Box::new(LogSink));
        let printer = std::thread::spawn(move || print_events(rx, out));

        let handle = spawn_monitor(monitor, tick);

        match CpalAudioSource::new(device.as_deref()) {
            Ok(source) => match handle.start_voice(Box::new(source)).await? {
                VoiceStart::Started | VoiceStart::AlreadyRunning => {
                    eprintln!("Listening (Ctrl+C to stop)");
                }
                VoiceStart::Degraded { .. } => {}
            },
            Err(e) => eprintln!("Microphone unavailable, text only: {e}"),
        }

        if calibrate {
            eprintln!("Calibrating: speak normally for {calibration_secs} seconds");
            handle.start_calibration().await?;
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let combined = handle.analyze_message(line).await?;
                    if out.json {
                        print_json(&combined)?;
                    } else {
                        println!("{}", output::format_analysis(&combined, out.color));
                        print_suggestion(&combined, out);
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        // Dropping the monitor closes the event channel and ends the printer.
        drop(handle.shutdown().await?);
        if printer.join().is_err() {
            tracing::warn!("Event printer panicked");
        }
        Ok(())
    }

    /// Prints level changes, calibration outcomes and voice failures.
    fn print_events(rx: crossbeam_channel::Receiver<StressEvent>, out: Output) {
        let mut level = StressLevel::Calm;
        for event in rx.iter() {
            match event {
                StressEvent::Combined(combined) if combined.level != level => {
                    level = combined.level;
                    if out.json {
                        if let Ok(json) = serde_json::to_string(&combined) {
                            println!("{json}");
                        }
                    } else if !out.quiet {
                        println!("{}", output::format_analysis(&combined, out.color));
                    }
                }
                StressEvent::Calibration(outcome) => {
                    eprintln!("{}", output::format_calibration(&outcome, out.color));
                }
                StressEvent::VoiceDegraded { reason } => {
                    eprintln!("Voice analysis stopped, text only: {reason}");
                }
                _ => {}
            }
        }
    }
}
