use crate::defaults;
use crate::error::{Result, VoxError};
use crate::languages;
use crate::pipeline::assembler::ChunkingParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub chunking: ChunkingConfig,
    pub transcription: TranscriptionConfig,
    pub languages: LanguageConfig,
    pub elevenlabs: ElevenLabsConfig,
    pub artifacts: ArtifactConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub device: Option<String>,
    pub sample_rate: u32,
}

/// Chunk assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_duration_secs: f32,
    pub overlap_duration_secs: f32,
}

/// Transcription engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub model_path: String,
    /// Feed each chunk's tail text into the next chunk's decode.
    pub carry_context: bool,
    pub threads: Option<usize>,
}

/// Source/target language configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LanguageConfig {
    /// Source language name or code, or "auto" for detection.
    pub source: String,
    /// Target language name or code.
    pub target: String,
}

/// ElevenLabs synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ElevenLabsConfig {
    pub api_key: Option<String>,
    pub voice_id: Option<String>,
}

/// Artifact persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Base directory for recorded chunks and synthesized speech.
    /// None disables persistence.
    pub dir: Option<PathBuf>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_duration_secs: defaults::CHUNK_SECS,
            overlap_duration_secs: defaults::OVERLAP_SECS,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            model_path: "models/ggml-base.bin".to_string(),
            carry_context: false,
            threads: None,
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            source: defaults::AUTO_LANGUAGE.to_string(),
            target: defaults::DEFAULT_TARGET_LANGUAGE.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file is missing or contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VoxError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                VoxError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(VoxError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXBRIDGE_MODEL → transcription.model_path
    /// - VOXBRIDGE_SOURCE_LANGUAGE → languages.source
    /// - VOXBRIDGE_TARGET_LANGUAGE → languages.target
    /// - VOXBRIDGE_AUDIO_DEVICE → audio.device
    /// - VOXBRIDGE_ELEVENLABS_API_KEY → elevenlabs.api_key
    /// - VOXBRIDGE_VOICE_ID → elevenlabs.voice_id
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("VOXBRIDGE_MODEL")
            && !model.is_empty()
        {
            self.transcription.model_path = model;
        }

        if let Ok(source) = std::env::var("VOXBRIDGE_SOURCE_LANGUAGE")
            && !source.is_empty()
        {
            self.languages.source = source;
        }

        if let Ok(target) = std::env::var("VOXBRIDGE_TARGET_LANGUAGE")
            && !target.is_empty()
        {
            self.languages.target = target;
        }

        if let Ok(device) = std::env::var("VOXBRIDGE_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.audio.device = Some(device);
        }

        if let Ok(api_key) = std::env::var("VOXBRIDGE_ELEVENLABS_API_KEY")
            && !api_key.is_empty()
        {
            self.elevenlabs.api_key = Some(api_key);
        }

        if let Ok(voice_id) = std::env::var("VOXBRIDGE_VOICE_ID")
            && !voice_id.is_empty()
        {
            self.elevenlabs.voice_id = Some(voice_id);
        }

        self
    }

    /// Validate the configuration and derive chunking parameters.
    ///
    /// Chunk/overlap bounds and language names are checked here, before any
    /// session starts.
    pub fn validate(&self) -> Result<ChunkingParams> {
        if self.audio.sample_rate == 0 {
            return Err(VoxError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be non-zero".to_string(),
            });
        }

        if languages::resolve(&self.languages.source).is_none() {
            return Err(VoxError::ConfigInvalidValue {
                key: "languages.source".to_string(),
                message: format!("unknown language: {}", self.languages.source),
            });
        }
        let target = &self.languages.target;
        if target.eq_ignore_ascii_case(defaults::AUTO_LANGUAGE)
            || languages::resolve(target).is_none()
        {
            return Err(VoxError::ConfigInvalidValue {
                key: "languages.target".to_string(),
                message: format!("unknown target language: {}", target),
            });
        }

        let params = ChunkingParams::new(
            self.chunking.chunk_duration_secs,
            self.chunking.overlap_duration_secs,
        )?;
        // The duration check can pass while the sample counts round to
        // equality at this rate, leaving no fresh audio per chunk.
        if params.overlap_samples(self.audio.sample_rate)
            >= params.chunk_samples(self.audio.sample_rate)
        {
            return Err(VoxError::ConfigInvalidValue {
                key: "overlap_duration_secs".to_string(),
                message: format!(
                    "rounds to the full chunk at {} Hz, no samples left to advance",
                    self.audio.sample_rate
                ),
            });
        }
        Ok(params)
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxbridge/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxbridge")
            .join("config.toml")
    }
}
