//! Orchestration of the three stress channels.
//!
//! [`StressMonitor`] owns every component and all rolling state. Voice runs
//! on [`StressMonitor::tick`]; text and behavior run on
//! [`StressMonitor::handle_message`]. Both paths fuse with the last known
//! result of the other channels and publish to the event bus.

use crate::audio::breathing;
use crate::audio::features::{AudioFeatureExtractor, AudioWindow, FrameFeatures};
use crate::audio::segmenter::SpeechSegmenter;
use crate::audio::source::AudioSource;
use crate::behavior::{BehaviorStressResult, BehaviorStressScorer};
use crate::calibration::{BaselineCalibrator, CalibrationOutcome, CalibrationState, VoiceBaseline};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{CalmwaveError, Result};
use crate::events::{EventBus, EventSink, StressEvent};
use crate::fusion::{CombinedStressAnalysis, StressFusionEngine, StressTrend};
use crate::store::BaselineStore;
use crate::text::{TextStressResult, TextStressScorer};
use crate::voice::{VoiceStressResult, VoiceStressScorer};
use std::collections::VecDeque;
use std::time::Duration;

/// Result of asking the monitor to start voice analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceStart {
    Started,
    /// A stream was already active; nothing changed.
    AlreadyRunning,
    /// The stream could not be acquired. Text and behavior keep working.
    Degraded { reason: String },
}

/// Scoped ownership of a started audio source.
///
/// The source is stopped when the graph is dropped, including when
/// acquisition fails halfway through.
pub struct AudioGraph {
    source: Box<dyn AudioSource>,
}

impl AudioGraph {
    pub fn acquire(source: Box<dyn AudioSource>) -> Result<Self> {
        let mut graph = Self { source };
        graph.source.start()?;
        if graph.source.sample_rate() == 0 {
            return Err(CalmwaveError::AudioFormat {
                message: "source reports a sample rate of 0 Hz".to_string(),
            });
        }
        Ok(graph)
    }

    pub fn read(&mut self) -> Result<Vec<f32>> {
        self.source.read_samples()
    }

    pub fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }
}

impl Drop for AudioGraph {
    fn drop(&mut self) {
        if let Err(e) = self.source.stop() {
            tracing::warn!("Failed to stop audio source: {}", e);
        }
    }
}

pub struct StressMonitor<C: Clock = SystemClock> {
    config: Config,
    clock: C,
    extractor: AudioFeatureExtractor,
    segmenter: SpeechSegmenter,
    voice: VoiceStressScorer,
    text: TextStressScorer,
    behavior: BehaviorStressScorer,
    fusion: StressFusionEngine,
    calibrator: BaselineCalibrator,
    store: Box<dyn BaselineStore>,
    baseline: Option<VoiceBaseline>,
    bus: EventBus,
    graph: Option<AudioGraph>,
    window: VecDeque<f32>,
    last_text: Option<TextStressResult>,
    last_behavior: Option<BehaviorStressResult>,
}

impl StressMonitor<SystemClock> {
    pub fn new(config: Config, store: Box<dyn BaselineStore>) -> Result<Self> {
        Self::with_clock(config, store, SystemClock)
    }
}

impl<C: Clock> StressMonitor<C> {
    /// Builds every component from `config` and loads any stored baseline.
    /// An unreadable baseline is logged and ignored.
    pub fn with_clock(config: Config, store: Box<dyn BaselineStore>, clock: C) -> Result<Self> {
        config.validate()?;
        let now = clock.now();
        let text = TextStressScorer::new(&config.text)?;
        let mut voice = VoiceStressScorer::new(
            config.voice.clone(),
            Duration::from_secs_f32(config.segments.speech_rate_window_secs),
        );

        let baseline = match store.load() {
            Ok(baseline) => baseline,
            Err(e) => {
                tracing::warn!("Ignoring stored baseline: {}", e);
                None
            }
        };
        if let Some(baseline) = &baseline {
            tracing::debug!(
                "Loaded baseline: {} Hz, volume {}",
                baseline.pitch_hz,
                baseline.volume
            );
        }
        voice.set_baseline(baseline.as_ref());

        Ok(Self {
            extractor: AudioFeatureExtractor::new(&config.audio),
            segmenter: SpeechSegmenter::new(config.segments.history, now),
            voice,
            text,
            behavior: BehaviorStressScorer::new(config.behavior.clone()),
            fusion: StressFusionEngine::new(config.fusion.clone()),
            calibrator: BaselineCalibrator::new(&config.calibration),
            store,
            baseline,
            bus: EventBus::new(),
            graph: None,
            window: VecDeque::with_capacity(config.audio.window_size),
            last_text: None,
            last_behavior: None,
            clock,
            config,
        })
    }

    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.bus.subscribe(sink);
    }

    /// Starts voice analysis on an open stream. Idempotent while a stream is
    /// active; on failure the monitor keeps running without voice.
    pub fn start_voice(&mut self, source: Box<dyn AudioSource>) -> VoiceStart {
        if self.graph.is_some() {
            tracing::debug!("Voice analysis already running");
            return VoiceStart::AlreadyRunning;
        }

        match AudioGraph::acquire(source) {
            Ok(graph) => {
                tracing::info!("Voice analysis started at {} Hz", graph.sample_rate());
                self.graph = Some(graph);
                self.window.clear();
                self.segmenter.reset(self.clock.now());
                self.voice.reset();
                VoiceStart::Started
            }
            Err(e) => self.degrade(e),
        }
    }

    fn degrade(&mut self, error: CalmwaveError) -> VoiceStart {
        self.graph = None;
        let reason = error.to_string();
        tracing::warn!("Voice analysis unavailable, continuing with text only: {}", reason);
        self.bus.publish(&StressEvent::VoiceDegraded {
            reason: reason.clone(),
        });
        // A voice score from before the failure no longer counts.
        if self.fusion.clear_voice() {
            let combined = self.fusion.fuse();
            self.bus.publish(&StressEvent::Combined(combined));
        }
        VoiceStart::Degraded { reason }
    }

    /// Releases the audio stream. The last voice result stays readable.
    pub fn stop_voice(&mut self) {
        if self.graph.take().is_some() {
            tracing::info!("Voice analysis stopped");
            self.window.clear();
            self.bus.publish(&StressEvent::VoiceStopped);
        }
    }

    pub fn is_voice_active(&self) -> bool {
        self.graph.is_some()
    }

    /// Runs one voice analysis step over the newest window of audio.
    ///
    /// Returns `None` when voice is inactive, when no new samples arrived or
    /// when a full window has not yet arrived. A read failure stops voice
    /// analysis.
    pub fn tick(&mut self) -> Option<VoiceStressResult> {
        let graph = self.graph.as_mut()?;
        let sample_rate = graph.sample_rate();
        let samples = match graph.read() {
            Ok(samples) => samples,
            Err(e) => {
                self.degrade(e);
                return None;
            }
        };

        // No fresh audio: do not re-score a stale window.
        if samples.is_empty() {
            return None;
        }

        let window_size = self.config.audio.window_size;
        self.window.extend(samples);
        if self.window.len() > window_size {
            let excess = self.window.len() - window_size;
            self.window.drain(..excess);
        }
        if self.window.len() < window_size {
            return None;
        }

        let window = AudioWindow::new(self.window.iter().copied().collect(), sample_rate);
        let frame = self.extractor.extract(&window);
        Some(self.process_frame(&frame))
    }

    fn process_frame(&mut self, frame: &FrameFeatures) -> VoiceStressResult {
        let now = self.clock.now();

        if let Some(outcome) = self.calibrator.feed(frame, now) {
            self.apply_calibration(outcome);
        }

        self.segmenter.update(frame.is_speech, now);
        let segments = self.segmenter.segments();
        let breathing = breathing::classify(segments.iter());
        let result = self.voice.analyze(frame, segments.iter(), breathing, now);

        self.bus.publish(&StressEvent::Voice(result.clone()));
        let combined = self.fusion.update_voice(result.clone());
        self.bus.publish(&StressEvent::Combined(combined));
        result
    }

    /// Scores one chat message on the text and behavior channels and fuses.
    pub fn handle_message(&mut self, message: &str) -> CombinedStressAnalysis {
        let now = self.clock.now();
        let text = self.text.score(message);
        let behavior = self.behavior.observe(message, now);

        self.bus.publish(&StressEvent::Text(text.clone()));
        self.bus.publish(&StressEvent::Behavior(behavior.clone()));
        self.last_text = Some(text.clone());
        self.last_behavior = Some(behavior.clone());

        let combined = self.fusion.update_message(text, behavior);
        self.bus.publish(&StressEvent::Combined(combined.clone()));
        combined
    }

    /// Begins a calibration session fed by subsequent ticks.
    pub fn start_calibration(&mut self) {
        if !self.is_voice_active() {
            tracing::debug!("Calibration started without an active audio stream");
        }
        self.calibrator.start(self.clock.now());
    }

    pub fn cancel_calibration(&mut self) {
        self.calibrator.cancel();
    }

    fn apply_calibration(&mut self, outcome: CalibrationOutcome) {
        if let CalibrationOutcome::Success(baseline) = &outcome {
            if let Err(e) = self.store.save(baseline) {
                tracing::warn!("Baseline not persisted: {}", e);
            }
            self.voice.set_baseline(Some(baseline));
            self.baseline = Some(baseline.clone());
        }
        self.bus.publish(&StressEvent::Calibration(outcome));
    }

    /// Removes the stored baseline and reverts voice scoring to defaults.
    pub fn clear_baseline(&mut self) -> Result<()> {
        self.store.clear()?;
        self.baseline = None;
        self.voice.set_baseline(None);
        tracing::info!("Baseline cleared");
        Ok(())
    }

    pub fn baseline(&self) -> Option<&VoiceBaseline> {
        self.baseline.as_ref()
    }

    pub fn calibration_state(&self) -> &CalibrationState {
        self.calibrator.state()
    }

    pub fn last_voice(&self) -> Option<&VoiceStressResult> {
        self.voice.last_result()
    }

    pub fn last_text(&self) -> Option<&TextStressResult> {
        self.last_text.as_ref()
    }

    pub fn last_behavior(&self) -> Option<&BehaviorStressResult> {
        self.last_behavior.as_ref()
    }

    pub fn last_combined(&self) -> Option<&CombinedStressAnalysis> {
        self.fusion.last()
    }

    pub fn trend(&self) -> StressTrend {
        self.fusion.trend()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

impl<C: Clock> Drop for StressMonitor<C> {
    fn drop(&mut self) {
        self.stop_voice();
    }
}
