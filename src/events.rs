//! Typed result events and their subscribers.
//!
//! The monitor publishes every result to an [`EventBus`]; it works the same
//! with zero subscribers. A failing subscriber is logged and skipped.

use crate::behavior::BehaviorStressResult;
use crate::calibration::CalibrationOutcome;
use crate::fusion::CombinedStressAnalysis;
use crate::text::TextStressResult;
use crate::voice::VoiceStressResult;

#[derive(Debug, Clone, PartialEq)]
pub enum StressEvent {
    Voice(VoiceStressResult),
    Text(TextStressResult),
    Behavior(BehaviorStressResult),
    Combined(CombinedStressAnalysis),
    Calibration(CalibrationOutcome),
    /// Voice analysis could not start; text and behavior keep running.
    VoiceDegraded { reason: String },
    VoiceStopped,
}

impl StressEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            StressEvent::Voice(_) => "voice",
            StressEvent::Text(_) => "text",
            StressEvent::Behavior(_) => "behavior",
            StressEvent::Combined(_) => "combined",
            StressEvent::Calibration(_) => "calibration",
            StressEvent::VoiceDegraded { .. } => "voice-degraded",
            StressEvent::VoiceStopped => "voice-stopped",
        }
    }
}

/// Pluggable receiver for published events.
pub trait EventSink: Send + 'static {
    fn publish(&mut self, event: &StressEvent) -> crate::error::Result<()>;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Fans events out to every subscribed sink.
#[derive(Default)]
pub struct EventBus {
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn publish(&mut self, event: &StressEvent) {
        for sink in &mut self.sinks {
            if let Err(e) = sink.publish(event) {
                tracing::warn!("Event sink '{}' failed on {}: {}", sink.name(), event.kind(), e);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sinks.iter().map(|s| s.name()))
            .finish()
    }
}

/// Keeps every event; clones share the same buffer so tests can inspect it
/// after handing one copy to the bus.
#[derive(Debug, Clone, Default)]
pub struct CollectorSink {
    events: std::sync::Arc<std::sync::Mutex<Vec<StressEvent>>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StressEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn take(&self) -> Vec<StressEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl EventSink for CollectorSink {
    fn publish(&mut self, event: &StressEvent) -> crate::error::Result<()> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

/// Forwards events over a crossbeam channel without blocking the tick.
/// Events are dropped when the receiver lags.
pub struct ChannelSink {
    tx: crossbeam_channel::Sender<StressEvent>,
}

impl ChannelSink {
    pub fn new(tx: crossbeam_channel::Sender<StressEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn publish(&mut self, event: &StressEvent) -> crate::error::Result<()> {
        match self.tx.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(crossbeam_channel::TrySendError::Full(_)) => {
                tracing::trace!("Event channel full, dropping {}", event.kind());
                Ok(())
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => Err(
                crate::error::CalmwaveError::Other("event receiver disconnected".to_string()),
            ),
        }
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

/// Logs every event at debug level.
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&mut self, event: &StressEvent) -> crate::error::Result<()> {
        match event {
            StressEvent::Voice(v) => tracing::debug!(
                score = v.stress_score,
                breathing = %v.metrics.breathing,
                "voice"
            ),
            StressEvent::Text(t) => tracing::debug!(score = t.score, "text"),
            StressEvent::Behavior(b) => tracing::debug!(score = b.score, "behavior"),
            StressEvent::Combined(c) => tracing::debug!(
                score = c.score,
                level = %c.level,
                action = %c.recommended_action,
                "combined"
            ),
            StressEvent::Calibration(outcome) => {
                tracing::debug!(success = outcome.baseline().is_some(), "calibration")
            }
            StressEvent::VoiceDegraded { reason } => {
                tracing::debug!(%reason, "voice degraded")
            }
            StressEvent::VoiceStopped => tracing::debug!("voice stopped"),
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
