//! On-disk artifacts for a session.
//!
//! Each session gets an input directory (recorded chunks as WAV) and an
//! output directory (synthesized speech as mp3). File names combine a
//! millisecond timestamp with the chunk sequence, so concurrent sessions in
//! the same base directory never collide.

use crate::error::{Result, VoxError};
use crate::pipeline::types::Chunk;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Writes chunk recordings and synthesized speech under a base directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    input_dir: PathBuf,
    output_dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `base`, creating `input/` and `output/`
    /// subdirectories.
    pub fn new(base: &Path) -> Result<Self> {
        let input_dir = base.join("input");
        let output_dir = base.join("output");
        std::fs::create_dir_all(&input_dir)?;
        std::fs::create_dir_all(&output_dir)?;
        Ok(Self {
            input_dir,
            output_dir,
        })
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write a chunk's audio as 16-bit PCM WAV and return the path.
    pub fn save_chunk(&self, chunk: &Chunk) -> Result<PathBuf> {
        let path = self
            .input_dir
            .join(format!("chunk_{}_{:04}.wav", epoch_millis(), chunk.sequence));

        let spec = hound::WavSpec {
            channels: chunk.channels,
            sample_rate: chunk.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&path, spec).map_err(|e| VoxError::Other(
            format!("Failed to create WAV file {}: {}", path.display(), e),
        ))?;
        for &sample in &chunk.samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer
                .write_sample(value)
                .map_err(|e| VoxError::Other(format!("Failed to write WAV sample: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| VoxError::Other(format!("Failed to finalize WAV file: {}", e)))?;

        Ok(path)
    }

    /// Write synthesized speech bytes as an mp3 file and return the path.
    pub fn save_speech(&self, sequence: u64, audio: &[u8]) -> Result<PathBuf> {
        let path = self
            .output_dir
            .join(format!("speech_{}_{:04}.mp3", epoch_millis(), sequence));
        std::fs::write(&path, audio)?;
        Ok(path)
    }
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
