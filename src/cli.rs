//! Command-line interface for voxbridge
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Real-time speech-to-speech translation
#[derive(Parser, Debug)]
#[command(
    name = "voxbridge",
    version,
    about = "Real-time speech-to-speech translation"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Audio input device (run `voxbridge devices` for names)
    #[arg(long, global = true, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Whisper model file path
    #[arg(long, global = true, value_name = "PATH")]
    pub model: Option<String>,

    /// Source language name or code (default: auto-detect)
    #[arg(long, short = 's', global = true, value_name = "LANG")]
    pub source: Option<String>,

    /// Target language name or code
    #[arg(long, short = 't', global = true, value_name = "LANG")]
    pub target: Option<String>,

    /// ElevenLabs voice id for speech synthesis
    #[arg(long, global = true, value_name = "VOICE")]
    pub voice: Option<String>,

    /// Chunk duration. Examples: 5s, 2s, 800ms
    #[arg(long, short = 'c', global = true, value_name = "DURATION", value_parser = parse_secs)]
    pub chunk: Option<f32>,

    /// Overlap duration carried between chunks. Examples: 500ms, 1s
    #[arg(long, global = true, value_name = "DURATION", value_parser = parse_secs)]
    pub overlap: Option<f32>,

    /// Directory for recorded chunks and synthesized speech
    #[arg(long, global = true, value_name = "DIR")]
    pub artifacts: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record and translate until Enter is pressed (default)
    Run,
    /// List available audio input devices
    Devices,
    /// List supported translation languages
    Languages,
}

/// Parse a duration string into fractional seconds.
///
/// Supports any format accepted by `humantime`: bare numbers (seconds),
/// single-unit (`5s`, `500ms`), and compound (`1s500ms`).
fn parse_secs(s: &str) -> Result<f32, String> {
    let s = s.trim();
    if let Ok(secs) = s.parse::<f32>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs_f32())
        .map_err(|e| e.to_string())
}
