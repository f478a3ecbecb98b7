//! Microphone capture via cpal

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// A fixed-duration mono audio recording
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Raw f32 samples in [-1.0, 1.0]
    pub samples: Vec<f32>,

    /// Samples per second
    pub sample_rate: u32,
}

impl AudioChunk {
    /// Duration of the recording
    #[must_use]
    pub fn duration(&self) -> Duration {
        #[allow(clippy::cast_precision_loss)]
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// True if nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Captures fixed-duration audio chunks from a microphone
///
/// Implementations block the calling thread for the duration of the
/// capture; callers distribute captures across worker threads.
pub trait Sampler: Send + Sync {
    /// Record a chunk of the given duration
    ///
    /// # Errors
    ///
    /// Returns error if the audio device cannot be opened or the stream
    /// fails
    fn capture(&self, duration: Duration) -> Result<AudioChunk>;
}

/// Production sampler backed by the default cpal input device
pub struct CpalSampler {
    config: StreamConfig,
}

impl CpalSampler {
    /// Create a new sampler, probing the default input device
    ///
    /// # Errors
    ///
    /// Returns error if no input device exists or no mono 16kHz config is
    /// supported — this is the only fatal startup condition
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable audio config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self { config })
    }
}

impl Sampler for CpalSampler {
    fn capture(&self, duration: Duration) -> Result<AudioChunk> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device".to_string()))?;

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let writer = Arc::clone(&buffer);

        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = writer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;
        std::thread::sleep(duration);
        drop(stream);

        let samples = buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();

        Ok(AudioChunk {
            samples,
            sample_rate: SAMPLE_RATE,
        })
    }
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(wav_err)?;

    for &sample in samples {
        // f32 [-1.0, 1.0] to 16-bit PCM
        #[allow(clippy::cast_possible_truncation)]
        let pcm = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        writer.write_sample(pcm).map_err(wav_err)?;
    }
    writer.finalize().map_err(wav_err)?;

    Ok(cursor.into_inner())
}

fn wav_err(e: hound::Error) -> Error {
    Error::Audio(e.to_string())
}
