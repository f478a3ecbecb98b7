//! Speech-to-text recognition
//!
//! Wraps a Whisper-compatible transcription endpoint. Chunks with no
//! recognizable speech are a normal outcome, not an error; only transport
//! and service failures surface as `Error::Stt`.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::audio::{AudioChunk, samples_to_wav};
use crate::config::SttConfig;
use crate::{Error, Result};

/// Outcome of transcribing one audio chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// Non-empty recognized text
    Transcript(String),

    /// The chunk contained no recognizable speech
    NoSpeech,
}

/// Converts an audio chunk to text
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Transcribe a chunk
    ///
    /// # Errors
    ///
    /// Returns `Error::Stt` on transport or service failure
    async fn transcribe(&self, chunk: &AudioChunk) -> Result<Recognition>;
}

/// Whisper-compatible HTTP transcription client
pub struct WhisperStt {
    client: Client,
    config: SttConfig,
}

impl WhisperStt {
    /// Create a new client
    #[must_use]
    pub fn new(config: SttConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Recognizer for WhisperStt {
    async fn transcribe(&self, chunk: &AudioChunk) -> Result<Recognition> {
        if chunk.is_empty() {
            return Ok(Recognition::NoSpeech);
        }

        let wav = samples_to_wav(&chunk.samples, chunk.sample_rate)?;

        let part = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| Error::Stt(format!("invalid mime type: {e}")))?;

        let form = Form::new()
            .text("model", self.config.model.clone())
            .part("file", part);

        let mut request = self.client.post(&self.config.url).multipart(form);
        if let Some(ref key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Stt(format!("transcription request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("service error: {status} - {body}")));
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| Error::Stt(format!("failed to parse response: {e}")))?;

        let text = result.text.trim();
        if text.is_empty() {
            Ok(Recognition::NoSpeech)
        } else {
            Ok(Recognition::Transcript(text.to_string()))
        }
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SAMPLE_RATE;

    #[tokio::test]
    async fn test_empty_chunk_is_no_speech() {
        let stt = WhisperStt::new(SttConfig::default());
        let chunk = AudioChunk {
            samples: Vec::new(),
            sample_rate: SAMPLE_RATE,
        };
        assert_eq!(stt.transcribe(&chunk).await.unwrap(), Recognition::NoSpeech);
    }
}
