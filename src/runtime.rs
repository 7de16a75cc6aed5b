//! Tick driver: runs a [`StressMonitor`] on its own tokio task.
//!
//! The task owns the monitor outright. Callers talk to it through a
//! [`MonitorHandle`], so no state is shared between the timer and message
//! paths.

use crate::audio::source::AudioSource;
use crate::clock::Clock;
use crate::error::{CalmwaveError, Result};
use crate::fusion::CombinedStressAnalysis;
use crate::monitor::{StressMonitor, VoiceStart};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const COMMAND_BUFFER: usize = 32;

pub enum Command {
    Message {
        text: String,
        reply: oneshot::Sender<CombinedStressAnalysis>,
    },
    StartVoice {
        source: Box<dyn AudioSource>,
        reply: oneshot::Sender<VoiceStart>,
    },
    StopVoice,
    StartCalibration,
    ClearBaseline {
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

pub struct MonitorHandle<C: Clock + 'static> {
    tx: mpsc::Sender<Command>,
    task: JoinHandle<StressMonitor<C>>,
}

fn stopped() -> CalmwaveError {
    CalmwaveError::Other("monitor task has stopped".to_string())
}

/// Spawns the monitor task, ticking every `tick_interval`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_monitor<C: Clock + 'static>(
    monitor: StressMonitor<C>,
    tick_interval: Duration,
) -> MonitorHandle<C> {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(run(monitor, tick_interval, rx));
    MonitorHandle { tx, task }
}

async fn run<C: Clock>(
    mut monitor: StressMonitor<C>,
    tick_interval: Duration,
    mut rx: mpsc::Receiver<Command>,
) -> StressMonitor<C> {
    let mut interval = tokio::time::interval(tick_interval.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tracing::debug!("Monitor task started ({:?} ticks)", tick_interval);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                monitor.tick();
            }
            command = rx.recv() => match command {
                None | Some(Command::Shutdown) => break,
                Some(Command::Message { text, reply }) => {
                    if reply.send(monitor.handle_message(&text)).is_err() {
                        tracing::debug!("Message reply dropped");
                    }
                }
                Some(Command::StartVoice { source, reply }) => {
                    if reply.send(monitor.start_voice(source)).is_err() {
                        tracing::debug!("Start reply dropped");
                    }
                }
                Some(Command::StopVoice) => monitor.stop_voice(),
                Some(Command::StartCalibration) => monitor.start_calibration(),
                Some(Command::ClearBaseline { reply }) => {
                    if reply.send(monitor.clear_baseline()).is_err() {
                        tracing::debug!("Clear reply dropped");
                    }
                }
            }
        }
    }

    monitor.stop_voice();
    tracing::debug!("Monitor task stopped");
    monitor
}

impl<C: Clock + 'static> MonitorHandle<C> {
    async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| stopped())
    }

    /// Submits a chat message and waits for the fused analysis.
    pub async fn analyze_message(&self, text: impl Into<String>) -> Result<CombinedStressAnalysis> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Message {
            text: text.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| stopped())
    }

    pub async fn start_voice(&self, source: Box<dyn AudioSource>) -> Result<VoiceStart> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::StartVoice { source, reply }).await?;
        rx.await.map_err(|_| stopped())
    }

    pub async fn stop_voice(&self) -> Result<()> {
        self.send(Command::StopVoice).await
    }

    pub async fn start_calibration(&self) -> Result<()> {
        self.send(Command::StartCalibration).await
    }

    pub async fn clear_baseline(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::ClearBaseline { reply }).await?;
        rx.await.map_err(|_| stopped())?
    }

    /// Stops the task and hands back the monitor with its last results.
    pub async fn shutdown(self) -> Result<StressMonitor<C>> {
        // The task may already have exited on its own.
        if self.tx.send(Command::Shutdown).await.is_err() {
            tracing::debug!("Monitor task already stopped");
        }
        self.task
            .await
            .map_err(|e| CalmwaveError::Other(format!("monitor task failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MockAudioSource;
    use crate::clock::ManualClock;
    use crate::config::Config;
    use crate::fusion::StressLevel;
    use crate::store::MemoryBaselineStore;

    fn monitor() -> StressMonitor<ManualClock> {
        StressMonitor::with_clock(
            Config::default(),
            Box::new(MemoryBaselineStore::new()),
            ManualClock::new(),
        )
        .unwrap()
    }

    fn tone() -> Vec<f32> {
        (0..2048)
            .map(|i| 0.3 * (2.0 * std::f32::consts::PI * (i % 80) as f32 / 80.0).sin())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_roundtrip() {
        let handle = spawn_monitor(monitor(), Duration::from_millis(500));
        let combined = handle.analyze_message("I want to kill myself").await.unwrap();
        assert_eq!(combined.score, 16);
        assert_eq!(combined.level, StressLevel::Mild);

        let monitor = handle.shutdown().await.unwrap();
        assert_eq!(monitor.last_combined(), Some(&combined));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_drive_voice() {
        let handle = spawn_monitor(monitor(), Duration::from_millis(500));
        let source = MockAudioSource::new().with_samples(tone());
        let probe = source.probe();

        assert_eq!(
            handle.start_voice(Box::new(source)).await.unwrap(),
            VoiceStart::Started
        );
        assert_eq!(
            handle
                .start_voice(Box::new(MockAudioSource::new()))
                .await
                .unwrap(),
            VoiceStart::AlreadyRunning
        );

        tokio::time::sleep(Duration::from_millis(1600)).await;
        let monitor = handle.shutdown().await.unwrap();

        assert!(monitor.last_voice().is_some());
        assert!(!monitor.is_voice_active());
        assert_eq!(probe.stop_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_degraded_voice_keeps_text() {
        let handle = spawn_monitor(monitor(), Duration::from_millis(500));
        let start = handle
            .start_voice(Box::new(MockAudioSource::new().with_start_failure()))
            .await
            .unwrap();
        assert!(matches!(start, VoiceStart::Degraded { .. }));

        let combined = handle.analyze_message("I'M SO ANGRY!!!").await.unwrap();
        assert_eq!(combined.score, 13);
        handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_baseline_replies() {
        let handle = spawn_monitor(monitor(), Duration::from_millis(500));
        handle.clear_baseline().await.unwrap();
        handle.analyze_message("hello").await.unwrap();
        handle.stop_voice().await.unwrap();
        let monitor = handle.shutdown().await.unwrap();
        assert!(monitor.baseline().is_none());
        assert!(monitor.last_text().is_some());
    }
}
