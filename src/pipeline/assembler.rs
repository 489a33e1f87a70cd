//! Chunk assembler: accumulates capture frames into fixed-duration,
//! overlapping windows for transcription.
//!
//! The trailing overlap of each emitted chunk is retained as the seed of the
//! next one, so words split across a chunk boundary survive. Chunk and
//! overlap durations are re-read at every `feed` call, so live
//! reconfiguration takes effect at the next chunk boundary, never mid-chunk.

use crate::defaults;
use crate::error::{Result, VoxError};
use crate::pipeline::types::{AudioFrame, Chunk};
use std::sync::{Arc, RwLock};

/// Validated chunk/overlap durations.
///
/// Construction is the only place the chunk/overlap relationship is checked;
/// holders of a `ChunkingParams` never have to re-validate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkingParams {
    chunk_secs: f32,
    overlap_secs: f32,
}

impl ChunkingParams {
    /// Creates validated chunking parameters.
    ///
    /// # Errors
    /// Returns `VoxError::ConfigInvalidValue` when the chunk duration is
    /// outside the accepted range or the overlap is not strictly shorter
    /// than the chunk.
    pub fn new(chunk_secs: f32, overlap_secs: f32) -> Result<Self> {
        if !chunk_secs.is_finite()
            || chunk_secs < defaults::MIN_CHUNK_SECS
            || chunk_secs > defaults::MAX_CHUNK_SECS
        {
            return Err(VoxError::ConfigInvalidValue {
                key: "chunk_duration_secs".to_string(),
                message: format!(
                    "must be between {} and {} seconds, got {}",
                    defaults::MIN_CHUNK_SECS,
                    defaults::MAX_CHUNK_SECS,
                    chunk_secs
                ),
            });
        }
        if !overlap_secs.is_finite() || overlap_secs < 0.0 || overlap_secs >= chunk_secs {
            return Err(VoxError::ConfigInvalidValue {
                key: "overlap_duration_secs".to_string(),
                message: format!(
                    "must be non-negative and shorter than the chunk duration ({} >= {})",
                    overlap_secs, chunk_secs
                ),
            });
        }
        Ok(Self {
            chunk_secs,
            overlap_secs,
        })
    }

    /// Chunk length in samples at the given rate.
    pub fn chunk_samples(&self, sample_rate: u32) -> usize {
        (self.chunk_secs * sample_rate as f32) as usize
    }

    /// Overlap length in samples at the given rate.
    pub fn overlap_samples(&self, sample_rate: u32) -> usize {
        (self.overlap_secs * sample_rate as f32) as usize
    }

    pub fn chunk_secs(&self) -> f32 {
        self.chunk_secs
    }

    pub fn overlap_secs(&self) -> f32 {
        self.overlap_secs
    }
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            chunk_secs: defaults::CHUNK_SECS,
            overlap_secs: defaults::OVERLAP_SECS,
        }
    }
}

/// Live-updatable chunking parameters shared between a session and its
/// owner. Updates are validated before they replace the current values.
pub type SharedChunking = Arc<RwLock<ChunkingParams>>;

/// Creates a shared handle around validated parameters.
pub fn shared_chunking(params: ChunkingParams) -> SharedChunking {
    Arc::new(RwLock::new(params))
}

/// Replaces the parameters behind a shared handle, validating first.
///
/// A shrinking chunk duration can cause the assembler to emit a chunk
/// immediately on its next `feed` call if the buffer already exceeds the new
/// threshold.
pub fn update_chunking(shared: &SharedChunking, chunk_secs: f32, overlap_secs: f32) -> Result<()> {
    let params = ChunkingParams::new(chunk_secs, overlap_secs)?;
    let mut guard = shared.write().unwrap_or_else(|e| e.into_inner());
    *guard = params;
    Ok(())
}

/// Accumulates frames into an append-only sample buffer and cuts
/// fixed-duration chunks out of it.
///
/// Owned exclusively by the processing worker during a session; the only
/// shared state is the parameter handle, read once per `feed`.
pub struct ChunkAssembler {
    sample_rate: u32,
    channels: u16,
    params: SharedChunking,
    buffer: Vec<f32>,
    next_sequence: u64,
}

impl ChunkAssembler {
    /// Creates an assembler with an empty buffer.
    pub fn new(sample_rate: u32, channels: u16, params: SharedChunking) -> Self {
        Self {
            sample_rate,
            channels,
            params,
            buffer: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Appends a frame's samples and returns a chunk once the buffer holds
    /// at least one chunk's worth of audio.
    ///
    /// After extraction the buffer keeps everything from
    /// `chunk_samples - overlap_samples` onward: the trailing overlap plus
    /// any samples beyond the chunk boundary. Nothing is ever skipped — the
    /// overlap region is the only audio that appears in two chunks.
    pub fn feed(&mut self, frame: &AudioFrame) -> Option<Chunk> {
        self.buffer.extend_from_slice(&frame.samples);

        // Parameters are read at the iteration boundary, not cached, so a
        // live reconfiguration takes effect on the next chunk check.
        let params = *self.params.read().unwrap_or_else(|e| e.into_inner());
        let chunk_samples = params.chunk_samples(self.sample_rate);
        // Durations are validated in seconds; truncation to sample counts can
        // still collapse the gap to zero at a given rate. Cap the overlap so
        // every emitted chunk drains at least one sample.
        let overlap_samples = params
            .overlap_samples(self.sample_rate)
            .min(chunk_samples.saturating_sub(1));

        if chunk_samples == 0 || self.buffer.len() < chunk_samples {
            return None;
        }

        let samples = self.buffer[..chunk_samples].to_vec();
        self.buffer.drain(..chunk_samples - overlap_samples);

        let chunk = Chunk {
            sequence: self.next_sequence,
            samples,
            sample_rate: self.sample_rate,
            channels: self.channels,
        };
        self.next_sequence += 1;
        Some(chunk)
    }

    /// Number of samples currently buffered (the next chunk's head).
    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Discards all buffered audio. A partial chunk shorter than one window
    /// is dropped, never flushed.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
