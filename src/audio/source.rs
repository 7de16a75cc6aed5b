use crate::error::{CalmwaveError, Result};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Trait for an open audio stream.
///
/// The capture collaborator owns device selection and permissions; the
/// monitor only starts, drains and stops the stream.
pub trait AudioSource: Send + Sync {
    /// Start delivering audio.
    fn start(&mut self) -> Result<()>;

    /// Stop delivering audio and release the device.
    fn stop(&mut self) -> Result<()>;

    /// Drain the samples captured since the last call (mono, -1.0..=1.0).
    ///
    /// Must not block. An empty vector means nothing new arrived.
    fn read_samples(&mut self) -> Result<Vec<f32>>;

    /// Sample rate of the delivered samples in Hz.
    fn sample_rate(&self) -> u32;
}

/// Shared view into a [`MockAudioSource`] that survives moving the source.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    started: Arc<AtomicBool>,
    stop_calls: Arc<AtomicUsize>,
}

impl MockProbe {
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

/// Mock audio source for testing
#[derive(Debug, Clone)]
pub struct MockAudioSource {
    probe: MockProbe,
    chunks: VecDeque<Vec<f32>>,
    repeat: Option<Vec<f32>>,
    sample_rate: u32,
    should_fail_start: bool,
    should_fail_read: bool,
    error_message: String,
}

impl MockAudioSource {
    /// Create a mock that returns nothing at 16 kHz.
    pub fn new() -> Self {
        Self {
            probe: MockProbe::default(),
            chunks: VecDeque::new(),
            repeat: None,
            sample_rate: 16_000,
            should_fail_start: false,
            should_fail_read: false,
            error_message: "mock audio error".to_string(),
        }
    }

    /// Return these samples on every read once queued chunks run out.
    pub fn with_samples(mut self, samples: Vec<f32>) -> Self {
        self.repeat = Some(samples);
        self
    }

    /// Queue chunks returned one per read, in order.
    pub fn with_chunks(mut self, chunks: Vec<Vec<f32>>) -> Self {
        self.chunks = chunks.into();
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on read once queued chunks run out
    pub fn with_read_failure(mut self) -> Self {
        self.should_fail_read = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Handle for observing start/stop after the mock is moved.
    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }

    pub fn is_started(&self) -> bool {
        self.probe.is_started()
    }

    fn failure(&self) -> CalmwaveError {
        CalmwaveError::AudioCapture {
            message: self.error_message.clone(),
        }
    }
}

impl Default for MockAudioSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSource for MockAudioSource {
    fn start(&mut self) -> Result<()> {
        if self.should_fail_start {
            return Err(self.failure());
        }
        self.probe.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.probe.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.probe.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        if let Some(chunk) = self.chunks.pop_front() {
            return Ok(chunk);
        }
        if self.should_fail_read {
            return Err(self.failure());
        }
        Ok(self.repeat.clone().unwrap_or_default())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_failure_follows_queued_chunks() {
        let mut source = MockAudioSource::new()
            .with_chunks(vec![vec![0.5]])
            .with_read_failure();
        assert_eq!(source.read_samples().unwrap(), vec![0.5]);
        assert!(source.read_samples().is_err());
    }

    #[test]
    fn test_mock_audio_source_returns_configured_samples() {
        let mut source = MockAudioSource::new().with_samples(vec![0.1, 0.2, 0.3]);
        assert_eq!(source.read_samples().unwrap(), vec![0.1, 0.2, 0.3]);
        assert_eq!(source.read_samples().unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_mock_audio_source_default_is_empty() {
        let mut source = MockAudioSource::new();
        assert!(source.read_samples().unwrap().is_empty());
        assert_eq!(source.sample_rate(), 16_000);
    }

    #[test]
    fn test_mock_audio_source_drains_chunks_then_repeats() {
        let mut source = MockAudioSource::new()
            .with_chunks(vec![vec![0.5], vec![0.25]])
            .with_samples(vec![0.0]);
        assert_eq!(source.read_samples().unwrap(), vec![0.5]);
        assert_eq!(source.read_samples().unwrap(), vec![0.25]);
        assert_eq!(source.read_samples().unwrap(), vec![0.0]);
    }

    #[test]
    fn test_mock_audio_source_returns_custom_read_error() {
        let mut source = MockAudioSource::new()
            .with_read_failure()
            .with_error_message("buffer overflow");

        match source.read_samples() {
            Err(CalmwaveError::AudioCapture { message }) => {
                assert_eq!(message, "buffer overflow");
            }
            other => panic!("Expected AudioCapture error, got {:?}", other),
        }
    }

    #[test]
    fn test_mock_audio_source_start_stop_state_management() {
        let mut source = MockAudioSource::new();
        let probe = source.probe();
        assert!(!source.is_started());

        source.start().unwrap();
        assert!(probe.is_started());

        source.stop().unwrap();
        assert!(!probe.is_started());
        assert_eq!(probe.stop_calls(), 1);
    }

    #[test]
    fn test_mock_audio_source_start_failure() {
        let mut source = MockAudioSource::new().with_start_failure();
        assert!(source.start().is_err());
        assert!(!source.is_started());
    }
}
