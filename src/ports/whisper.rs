//! Whisper-based transcription port.
//!
//! This module provides a Whisper implementation of the TranscriptionPort
//! trait using whisper-rs.
//!
//! # Feature Gate
//!
//! This module requires the `whisper` feature to be enabled and cmake to be
//! installed. To build with Whisper support:
//!
//! ```bash
//! cargo build --features whisper
//! ```

#[cfg(feature = "whisper")]
use crate::defaults;
use crate::error::{Result, VoxError};
use crate::ports::transcription::TranscriptionPort;
#[cfg(feature = "whisper")]
use crate::ports::transcription::normalize_peak;
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// How many trailing characters of a transcription are carried forward as the
/// decoding hint for the next chunk.
const CONTEXT_TAIL_CHARS: usize = 224;

/// Configuration for the Whisper port.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the Whisper model file
    pub model_path: PathBuf,
    /// Number of threads for inference (None = auto-detect)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            threads: None,
        }
    }
}

/// Whisper-based transcription port.
///
/// Stateless per chunk: each call creates a fresh decoding state, so chunks
/// are independent. The WhisperContext is wrapped in a Mutex to ensure thread
/// safety.
///
/// # Feature Gate
///
/// Real inference is only available when the `whisper` feature is enabled.
#[cfg(feature = "whisper")]
pub struct WhisperPort {
    context: Mutex<WhisperContext>,
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperPort")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Whisper port placeholder (without whisper feature).
///
/// This is a stub implementation that returns errors when used.
/// Enable the `whisper` feature to use real transcription.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperPort {
    config: WhisperConfig,
    model_name: String,
}

fn model_name_from(path: &std::path::Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(feature = "whisper")]
impl WhisperPort {
    /// Create a new Whisper port.
    ///
    /// # Errors
    /// Returns `VoxError::ModelNotFound` if the model file doesn't exist,
    /// `VoxError::Transcription` if model loading fails.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(VoxError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from(&config.model_path);

        let mut context_params = WhisperContextParameters::default();
        // Fused attention kernels avoid the standalone softmax CUDA kernel,
        // which crashes on Blackwell GPUs (sm_120) with ggml <= 1.7.6
        context_params.flash_attn(true);
        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| VoxError::Transcription {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            context_params,
        )
        .map_err(|e| VoxError::Transcription {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        Ok(Self {
            context: Mutex::new(context),
            config,
            model_name,
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }

    /// Transcribe with an optional decoding prompt from earlier audio.
    ///
    /// Normalization to peak amplitude happens here, once; silent audio
    /// yields empty text without touching the engine.
    pub fn transcribe_with_prompt(
        &self,
        samples: &[f32],
        language_hint: &str,
        prompt: Option<&str>,
    ) -> Result<String> {
        let Some(audio) = normalize_peak(samples) else {
            return Ok(String::new());
        };

        let context = self.context.lock().map_err(|e| VoxError::Transcription {
            message: format!("Failed to acquire context lock: {}", e),
        })?;

        let mut state = context.create_state().map_err(|e| VoxError::Transcription {
            message: format!("Failed to create Whisper state: {}", e),
        })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if language_hint == defaults::AUTO_LANGUAGE {
            params.set_language(None);
        } else {
            params.set_language(Some(language_hint));
        }

        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        if let Some(prompt) = prompt {
            params.set_initial_prompt(prompt);
        }

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, &audio)
            .map_err(|e| VoxError::Transcription {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut transcription = String::new();
        for segment in state.as_iter() {
            transcription.push_str(&segment.to_string());
        }

        Ok(transcription.trim().to_string())
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperPort {
    /// Create a new Whisper port (stub implementation).
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(VoxError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from(&config.model_path);
        Ok(Self { config, model_name })
    }

    /// Get the configuration
    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }

    /// Stub: always fails, the binary was built without speech recognition.
    pub fn transcribe_with_prompt(
        &self,
        _samples: &[f32],
        _language_hint: &str,
        _prompt: Option<&str>,
    ) -> Result<String> {
        Err(VoxError::Transcription {
            message: concat!(
                "Whisper feature not enabled. This binary was built without speech recognition.\n",
                "To fix: cargo build --release --features whisper\n",
                "If build fails with cmake errors, install: sudo apt install cmake"
            )
            .to_string(),
        })
    }
}

impl TranscriptionPort for WhisperPort {
    fn transcribe(
        &self,
        samples: &[f32],
        _sample_rate: u32,
        _channels: u16,
        language_hint: &str,
    ) -> Result<String> {
        self.transcribe_with_prompt(samples, language_hint, None)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

/// Stateful wrapper that feeds each chunk's tail text back into the next
/// chunk's decode as an initial prompt.
///
/// Improves continuity across chunk boundaries at the cost of coupling
/// chunks: a mistranscription can propagate into the next chunk's hint.
/// Selected at configuration time; the pipeline only sees the trait.
#[derive(Debug)]
pub struct ContextualPort {
    inner: WhisperPort,
    context: std::sync::Mutex<String>,
}

impl ContextualPort {
    pub fn new(inner: WhisperPort) -> Self {
        Self {
            inner,
            context: std::sync::Mutex::new(String::new()),
        }
    }

    /// Drop the carried context, e.g. between sessions.
    pub fn reset(&self) {
        self.context
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn tail_of(text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        let start = chars.len().saturating_sub(CONTEXT_TAIL_CHARS);
        chars[start..].iter().collect()
    }
}

impl TranscriptionPort for ContextualPort {
    fn transcribe(
        &self,
        samples: &[f32],
        _sample_rate: u32,
        _channels: u16,
        language_hint: &str,
    ) -> Result<String> {
        let prompt = {
            let guard = self.context.lock().unwrap_or_else(|e| e.into_inner());
            if guard.is_empty() {
                None
            } else {
                Some(guard.clone())
            }
        };

        let text = self
            .inner
            .transcribe_with_prompt(samples, language_hint, prompt.as_deref())?;

        if !text.is_empty() {
            let mut guard = self.context.lock().unwrap_or_else(|e| e.into_inner());
            *guard = Self::tail_of(&text);
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whisper_config_default() {
        let config = WhisperConfig::default();
        assert_eq!(config.model_path, PathBuf::from("models/ggml-base.bin"));
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_whisper_port_new_fails_for_missing_model() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/nonexistent/model.bin"),
            threads: None,
        };

        let result = WhisperPort::new(config);
        match result {
            Err(VoxError::ModelNotFound { path }) => {
                assert_eq!(path, "/nonexistent/model.bin");
            }
            _ => panic!("Expected ModelNotFound error"),
        }
    }

    #[test]
    fn test_model_name_extraction() {
        assert_eq!(
            model_name_from(std::path::Path::new("/models/ggml-base.bin")),
            "ggml-base"
        );
        assert_eq!(model_name_from(std::path::Path::new("model")), "model");
    }

    #[cfg(not(feature = "whisper"))]
    #[test]
    fn test_stub_port_errors_on_transcribe() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("ggml-tiny.bin");
        std::fs::write(&model_path, b"fake model data").unwrap();

        let port = WhisperPort::new(WhisperConfig {
            model_path,
            threads: None,
        })
        .unwrap();
        assert_eq!(port.name(), "ggml-tiny");

        let result = port.transcribe(&[0.1; 16000], 16000, 1, "en");
        assert!(matches!(result, Err(VoxError::Transcription { .. })));
    }

    #[test]
    fn test_contextual_tail_keeps_last_chars() {
        let long: String = "abcdefghij".repeat(40); // 400 chars
        let tail = ContextualPort::tail_of(&long);
        assert_eq!(tail.chars().count(), CONTEXT_TAIL_CHARS);
        assert!(long.ends_with(&tail));
    }

    #[test]
    fn test_contextual_tail_short_text_unchanged() {
        assert_eq!(ContextualPort::tail_of("hello"), "hello");
    }

    #[test]
    fn test_whisper_port_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<WhisperPort>();
        assert_sync::<WhisperPort>();
        assert_send::<ContextualPort>();
        assert_sync::<ContextualPort>();
    }

    // Integration tests that need a real model run only when one is
    // installed locally.

    #[cfg(feature = "whisper")]
    fn try_find_model() -> Option<PathBuf> {
        for name in &["base.en", "tiny.en", "base", "tiny", "small"] {
            let filename = format!("ggml-{}.bin", name);
            if let Ok(home) = std::env::var("HOME") {
                let path = PathBuf::from(home)
                    .join(".cache/voxbridge/models")
                    .join(&filename);
                if path.exists() {
                    return Some(path);
                }
            }
            let local = PathBuf::from("models").join(&filename);
            if local.exists() {
                return Some(local);
            }
        }
        eprintln!("voxbridge: no whisper model installed, skipping test");
        None
    }

    #[cfg(feature = "whisper")]
    #[test]
    fn test_whisper_transcribe_silence_is_empty() {
        let Some(model_path) = try_find_model() else {
            return;
        };

        let port = WhisperPort::new(WhisperConfig {
            model_path,
            threads: Some(4),
        })
        .unwrap();

        // All-zero audio never reaches the engine.
        let result = port.transcribe(&vec![0.0f32; 16000], 16000, 1, "en");
        assert_eq!(result.unwrap(), "");
    }
}
