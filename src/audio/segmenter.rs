//! Speech/silence segmentation.
//!
//! Tracks the speech state across ticks and records a segment each time it
//! flips. The segment carries the state that just *ended* and how long it
//! lasted.

use crate::history::RingBuffer;
use std::time::Instant;

/// A closed run of speech or silence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechSegment {
    pub is_speech: bool,
    pub duration_secs: f32,
    /// When the segment ended.
    pub timestamp: Instant,
}

impl SpeechSegment {
    pub fn is_pause(&self) -> bool {
        !self.is_speech
    }
}

#[derive(Debug, Clone)]
pub struct SpeechSegmenter {
    last_speech_state: bool,
    last_transition: Instant,
    segments: RingBuffer<SpeechSegment>,
}

impl SpeechSegmenter {
    /// Starts in the silent state with the transition clock at `started_at`.
    pub fn new(history: usize, started_at: Instant) -> Self {
        Self {
            last_speech_state: false,
            last_transition: started_at,
            segments: RingBuffer::new(history),
        }
    }

    /// Feeds one tick's speech decision. Returns the segment closed by a
    /// state change, if any.
    pub fn update(&mut self, is_speech: bool, now: Instant) -> Option<SpeechSegment> {
        if is_speech == self.last_speech_state {
            return None;
        }

        let segment = SpeechSegment {
            is_speech: self.last_speech_state,
            duration_secs: now.saturating_duration_since(self.last_transition).as_secs_f32(),
            timestamp: now,
        };
        self.segments.push(segment);
        self.last_speech_state = is_speech;
        self.last_transition = now;
        Some(segment)
    }

    pub fn segments(&self) -> &RingBuffer<SpeechSegment> {
        &self.segments
    }

    pub fn is_speaking(&self) -> bool {
        self.last_speech_state
    }

    /// Drops all segments and restarts the transition clock in silence.
    pub fn reset(&mut self, now: Instant) {
        self.segments.clear();
        self.last_speech_state = false;
        self.last_transition = now;
    }
}
