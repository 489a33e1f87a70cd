//! voxbridge - real-time speech-to-speech translation
//!
//! Captures microphone audio, assembles it into overlapping chunks,
//! transcribes each chunk, translates the text, and synthesizes speech in
//! the target language.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod artifacts;
pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod languages;
pub mod pipeline;
pub mod ports;

// Core traits (capture → assemble → transcribe → translate → synthesize)
pub use audio::source::{CaptureSource, FrameSink, MockCapture};
pub use ports::synthesis::SynthesisPort;
pub use ports::transcription::TranscriptionPort;
pub use ports::translation::TranslationPort;

// Pipeline
pub use pipeline::assembler::{ChunkAssembler, ChunkingParams, shared_chunking};
pub use pipeline::coordinator::{Coordinator, CoordinatorConfig, SessionPorts};
pub use pipeline::observer::{CollectorObserver, SessionObserver};

// Error handling
pub use error::{Result, VoxError};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }
}
