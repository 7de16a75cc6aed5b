//! WAV file audio source for offline analysis and calibration.

use crate::audio::source::AudioSource;
use crate::error::{CalmwaveError, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

/// Audio source that replays a WAV recording in fixed-duration chunks.
///
/// Accepts integer or float WAVs with any channel count; channels are
/// averaged to mono and samples scaled to -1.0..=1.0. The native sample rate
/// is kept since feature extraction takes the rate with every window.
pub struct WavAudioSource {
    samples: Vec<f32>,
    sample_rate: u32,
    position: usize,
    chunk_size: usize,
}

impl WavAudioSource {
    /// Open a WAV file from disk.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| CalmwaveError::AudioCapture {
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Create from any reader (for testing/flexibility).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut wav_reader =
            hound::WavReader::new(reader).map_err(|e| CalmwaveError::AudioFormat {
                message: format!("Failed to parse WAV file: {}", e),
            })?;

        let spec = wav_reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(CalmwaveError::AudioFormat {
                message: format!(
                    "{} channels at {} Hz",
                    spec.channels, spec.sample_rate
                ),
            });
        }

        let read_error = |e: hound::Error| CalmwaveError::AudioFormat {
            message: format!("Failed to read WAV samples: {}", e),
        };

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => wav_reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(read_error)?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                wav_reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(read_error)?
            }
        };

        let channels = spec.channels as usize;
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            position: 0,
            // 100ms chunks by default
            chunk_size: (spec.sample_rate as usize / 10).max(1),
        })
    }

    /// Deliver `duration` worth of audio per read.
    pub fn with_chunk_duration(mut self, duration: Duration) -> Self {
        let samples = (self.sample_rate as f64 * duration.as_secs_f64()).round() as usize;
        self.chunk_size = samples.max(1);
        self
    }

    /// Length of the recording.
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// True once every sample has been read.
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.samples.len()
    }

    /// Consume the source and return all samples as a single buffer.
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

impl AudioSource for WavAudioSource {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        if self.is_exhausted() {
            return Ok(Vec::new());
        }

        let end = std::cmp::min(self.position + self.chunk_size, self.samples.len());
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;

        Ok(chunk)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
