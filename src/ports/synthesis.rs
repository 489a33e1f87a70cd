//! Speech synthesis port.
//!
//! Synthesis failures are soft: the pipeline logs a warning and delivers the
//! chunk without audio rather than stopping the session.

use crate::defaults;
use crate::error::{Result, VoxError};

/// Trait for text-to-speech services.
///
/// This trait allows swapping implementations (real service vs mock).
/// Returns compressed audio bytes (mp3) ready to write to disk.
pub trait SynthesisPort: Send + Sync {
    /// Synthesize speech for the given text with the given voice.
    fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>>;
}

/// ElevenLabs text-to-speech implementation.
#[cfg(feature = "online")]
pub struct ElevenLabsSynthesis {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

#[cfg(feature = "online")]
impl ElevenLabsSynthesis {
    const DEFAULT_BASE_URL: &'static str = "https://api.elevenlabs.io";

    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, Self::DEFAULT_BASE_URL)
    }

    /// Point the client at an alternate endpoint, for testing.
    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[cfg(feature = "online")]
impl SynthesisPort for ElevenLabsSynthesis {
    fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, voice_id);

        let body = serde_json::json!({
            "text": text,
            "model_id": defaults::SYNTHESIS_MODEL,
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.8,
                "style": 0.5,
                "use_speaker_boost": true,
            },
        });

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| VoxError::Synthesis {
                message: format!("request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().unwrap_or_default();
            return Err(VoxError::Synthesis {
                message: format!("service returned {}: {}", status, detail),
            });
        }

        let bytes = response.bytes().map_err(|e| VoxError::Synthesis {
            message: format!("failed to read audio body: {}", e),
        })?;
        Ok(bytes.to_vec())
    }
}

/// Mock synthesis port for testing.
#[derive(Debug, Clone)]
pub struct MockSynthesis {
    audio: Vec<u8>,
    should_fail: bool,
    error_message: String,
}

impl MockSynthesis {
    /// Create a mock returning a small fixed payload.
    pub fn new() -> Self {
        Self {
            audio: vec![0xFF, 0xFB, 0x90, 0x00], // mp3 frame header bytes
            should_fail: false,
            error_message: "mock synthesis error".to_string(),
        }
    }

    /// Configure the bytes returned for every synthesis.
    pub fn with_audio(mut self, audio: Vec<u8>) -> Self {
        self.audio = audio;
        self
    }

    /// Configure the mock to fail every synthesis.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Configure the error message for failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }
}

impl Default for MockSynthesis {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthesisPort for MockSynthesis {
    fn synthesize(&self, _text: &str, _voice_id: &str) -> Result<Vec<u8>> {
        if self.should_fail {
            Err(VoxError::Synthesis {
                message: self.error_message.clone(),
            })
        } else {
            Ok(self.audio.clone())
        }
    }
}
