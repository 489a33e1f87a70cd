//! Default configuration constants for voxbridge.
//!
//! Shared constants used across configuration types to ensure consistency.

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default channel count. Speech pipelines work on mono audio; multi-channel
/// input is mixed down at capture time.
pub const CHANNELS: u16 = 1;

/// Default chunk duration in seconds.
///
/// Each chunk is submitted to the transcription engine as one unit.
/// 5 seconds keeps per-chunk latency reasonable without cutting most
/// sentences in half.
pub const CHUNK_SECS: f32 = 5.0;

/// Default overlap duration in seconds.
///
/// The trailing overlap of one chunk seeds the next so that words split
/// across a chunk boundary are not truncated.
pub const OVERLAP_SECS: f32 = 0.5;

/// Smallest accepted chunk duration in seconds.
pub const MIN_CHUNK_SECS: f32 = 0.1;

/// Largest accepted chunk duration in seconds.
pub const MAX_CHUNK_SECS: f32 = 10.0;

/// Timeout for the processing worker's queue poll in milliseconds.
///
/// Bounds how long a stop request can go unobserved while the queue is empty.
pub const POLL_TIMEOUT_MS: u64 = 100;

/// Capacity of the frame queue between capture and processing.
///
/// Device callbacks deliver blocks on the order of 10-100ms, so 1024 slots
/// buffer well over a minute of audio before backpressure drops frames.
pub const FRAME_QUEUE_CAPACITY: usize = 1024;

/// Language value that triggers automatic source-language detection.
pub const AUTO_LANGUAGE: &str = "auto";

/// Default target language code for translation.
pub const DEFAULT_TARGET_LANGUAGE: &str = "en";

/// Prefix of the sentinel string a failed translation yields.
///
/// Translation failures are soft: the pipeline carries this sentinel instead
/// of propagating an error, and the session continues.
pub const TRANSLATION_ERROR_PREFIX: &str = "Translation Error";

/// ElevenLabs voice model used for synthesis.
pub const SYNTHESIS_MODEL: &str = "eleven_multilingual_v2";

/// Report the GPU backend compiled into this build.
///
/// Returns a human-readable name based on the compile-time feature flags.
pub fn gpu_backend() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA"
    } else if cfg!(feature = "vulkan") {
        "Vulkan"
    } else {
        "CPU"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_bounds_bracket_the_default() {
        assert!(MIN_CHUNK_SECS < CHUNK_SECS && CHUNK_SECS <= MAX_CHUNK_SECS);
        assert!(OVERLAP_SECS < CHUNK_SECS);
    }

    #[test]
    fn gpu_backend_matches_compiled_feature() {
        let expected = if cfg!(feature = "cuda") {
            "CUDA"
        } else if cfg!(feature = "vulkan") {
            "Vulkan"
        } else {
            "CPU"
        };
        assert_eq!(gpu_backend(), expected);
    }
}
