//! Live microphone capture using CPAL (Cross-Platform Audio Library).

use crate::audio::source::AudioSource;
use crate::error::{CalmwaveError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// CPAL probing prints harmless ALSA/JACK noise that would interleave with
/// the monitor's output.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// List the names of available input devices.
pub fn list_devices() -> Result<Vec<String>> {
    let devices = with_suppressed_stderr(|| cpal::default_host().input_devices()).map_err(
        |e| CalmwaveError::AudioCapture {
            message: format!("Failed to enumerate input devices: {}", e),
        },
    )?;

    Ok(devices.filter_map(|device| device.name().ok()).collect())
}

fn find_device(device_name: Option<&str>) -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();
        match device_name {
            Some(name) => host
                .input_devices()
                .map_err(|e| CalmwaveError::AudioCapture {
                    message: format!("Failed to enumerate devices: {}", e),
                })?
                .find(|dev| dev.name().is_ok_and(|n| n == name))
                .ok_or_else(|| CalmwaveError::AudioDeviceNotFound {
                    device: name.to_string(),
                }),
            None => host
                .default_input_device()
                .ok_or_else(|| CalmwaveError::AudioDeviceNotFound {
                    device: "default".to_string(),
                }),
        }
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: The stream is only touched through the Mutex in CpalAudioSource,
/// from whichever thread currently owns the source.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// Microphone source capturing at the device's native rate, downmixed to mono.
pub struct CpalAudioSource {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
    stream: Mutex<Option<SendableStream>>,
    buffer: Arc<Mutex<Vec<f32>>>,
}

impl CpalAudioSource {
    /// Open a named input device, or the system default.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = find_device(device_name)?;
        let config = device
            .default_input_config()
            .map_err(|e| CalmwaveError::AudioCapture {
                message: format!("Failed to query default input config: {}", e),
            })?;

        Ok(Self {
            device,
            config,
            stream: Mutex::new(None),
            buffer: Arc::new(Mutex::new(Vec::new())),
        })
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let channels = self.config.channels().max(1) as usize;
        let stream_config: cpal::StreamConfig = self.config.clone().into();
        let buffer = Arc::clone(&self.buffer);
        let err_callback = |err| {
            tracing::warn!("Audio stream error: {}", err);
        };

        let stream = match self.config.sample_format() {
            SampleFormat::F32 => self.device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    push_mono(&buffer, data.chunks_exact(channels).map(|frame| {
                        frame.iter().sum::<f32>() / channels as f32
                    }));
                },
                err_callback,
                None,
            ),
            SampleFormat::I16 => self.device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    push_mono(&buffer, data.chunks_exact(channels).map(|frame| {
                        frame.iter().map(|&s| s as f32 / 32768.0).sum::<f32>() / channels as f32
                    }));
                },
                err_callback,
                None,
            ),
            fmt => {
                return Err(CalmwaveError::AudioFormat {
                    message: format!("Unsupported native sample format: {:?}", fmt),
                });
            }
        };

        stream.map_err(|e| CalmwaveError::AudioCapture {
            message: format!("Failed to build input stream: {}", e),
        })
    }
}

fn push_mono(buffer: &Mutex<Vec<f32>>, samples: impl Iterator<Item = f32>) {
    if let Ok(mut buf) = buffer.lock() {
        buf.extend(samples);
    }
}

impl AudioSource for CpalAudioSource {
    fn start(&mut self) -> Result<()> {
        let mut guard = self.stream.lock().map_err(|e| CalmwaveError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;
        if guard.is_some() {
            return Ok(());
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| CalmwaveError::AudioCapture {
            message: format!("Failed to start audio stream: {}", e),
        })?;
        *guard = Some(SendableStream(stream));
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut guard = self.stream.lock().map_err(|e| CalmwaveError::AudioCapture {
            message: format!("Failed to lock stream: {}", e),
        })?;
        // Dropping the stream closes the device
        guard.take();
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
        Ok(())
    }

    fn read_samples(&mut self) -> Result<Vec<f32>> {
        let mut buf = self.buffer.lock().map_err(|e| CalmwaveError::AudioCapture {
            message: format!("Failed to lock buffer: {}", e),
        })?;
        Ok(std::mem::take(&mut *buf))
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }
}
