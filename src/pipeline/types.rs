//! Data types that flow through the translation pipeline.

use std::path::PathBuf;
use std::time::Instant;

/// A block of raw audio samples delivered by the capture device.
///
/// Samples are mono f32 in [-1.0, 1.0] at the session's configured rate;
/// format conversion happens once, at stream-open time. Each frame owns its
/// samples, since the driver reuses its callback buffer.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Sequence number for ordering and gap detection.
    pub sequence: u64,
    /// Timestamp when the block was captured.
    pub timestamp: Instant,
    /// Normalized mono samples.
    pub samples: Vec<f32>,
}

impl AudioFrame {
    /// Creates a new audio frame stamped with the current time.
    pub fn new(sequence: u64, samples: Vec<f32>) -> Self {
        Self {
            sequence,
            timestamp: Instant::now(),
            samples,
        }
    }
}

/// A fixed-duration window of audio ready for transcription.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Monotonic chunk index within the session.
    pub sequence: u64,
    /// Samples, exactly `chunk_samples` long at emission time.
    pub samples: Vec<f32>,
    /// Sample rate the samples were captured at.
    pub sample_rate: u32,
    /// Channel count (mono after capture-time downmix).
    pub channels: u16,
}

/// Text produced for one chunk, tagged with the audio format it was
/// computed from. Created per chunk and consumed immediately downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionResult {
    pub text: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Everything the pipeline produced for one chunk, delivered to the
/// session observer in chunk order.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Chunk index this result belongs to.
    pub sequence: u64,
    /// Transcription of the chunk.
    pub transcription: TranscriptionResult,
    /// Translated text, or the translation-failure sentinel.
    pub translation: String,
    /// Path of the synthesized speech file, when synthesis succeeded.
    pub audio_path: Option<PathBuf>,
}
