use anyhow::Result;
use clap::Parser;
use owo_colors::OwoColorize;
use voxbridge::cli::{Cli, Commands};
use voxbridge::config::Config;
use voxbridge::languages;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Run) => {
            let config = load_config(&cli)?;
            run_session(config)?;
        }
        Some(Commands::Devices) => {
            list_audio_devices()?;
        }
        Some(Commands::Languages) => {
            println!("Supported languages:");
            for (name, code) in languages::LANGUAGES {
                println!("  {:<24} {}", name, code.dimmed());
            }
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults, then layer environment and
/// CLI overrides on top.
///
/// Priority order:
/// 1. CLI flags
/// 2. Environment variables (VOXBRIDGE_*)
/// 3. Config file (--config, else ~/.config/voxbridge/config.toml)
/// 4. Built-in defaults
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(ref path) = cli.config {
        Config::load(path)?
    } else {
        Config::load_or_default(&Config::default_path())?
    }
    .with_env_overrides();

    if let Some(ref device) = cli.device {
        config.audio.device = Some(device.clone());
    }
    if let Some(ref model) = cli.model {
        config.transcription.model_path = model.clone();
    }
    if let Some(ref source) = cli.source {
        config.languages.source = source.clone();
    }
    if let Some(ref target) = cli.target {
        config.languages.target = target.clone();
    }
    if let Some(ref voice) = cli.voice {
        config.elevenlabs.voice_id = Some(voice.clone());
    }
    if let Some(chunk) = cli.chunk {
        config.chunking.chunk_duration_secs = chunk;
    }
    if let Some(overlap) = cli.overlap {
        config.chunking.overlap_duration_secs = overlap;
    }
    if let Some(ref dir) = cli.artifacts {
        config.artifacts.dir = Some(dir.clone());
    }

    Ok(config)
}

/// List available audio input devices.
#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    voxbridge::audio::capture::suppress_audio_warnings();
    let devices = voxbridge::audio::capture::list_devices()?;

    if devices.is_empty() {
        eprintln!("No audio input devices found");
        std::process::exit(1);
    }

    println!("Available audio input devices:");
    for (idx, device) in devices.iter().enumerate() {
        println!("  [{}] {}", idx, device);
    }

    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
fn list_audio_devices() -> Result<()> {
    anyhow::bail!("this build has no audio capture (cpal-audio feature disabled)")
}

#[cfg(all(feature = "cpal-audio", feature = "online"))]
fn run_session(config: Config) -> Result<()> {
    use std::sync::Arc;
    use voxbridge::artifacts::ArtifactStore;
    use voxbridge::audio::capture::{CpalCapture, suppress_audio_warnings};
    use voxbridge::pipeline::assembler::shared_chunking;
    use voxbridge::pipeline::coordinator::{Coordinator, CoordinatorConfig, SessionPorts};
    use voxbridge::ports::synthesis::{ElevenLabsSynthesis, SynthesisPort};
    use voxbridge::ports::transcription::TranscriptionPort;
    use voxbridge::ports::translation::GoogleTranslate;
    use voxbridge::ports::whisper::{ContextualPort, WhisperConfig, WhisperPort};

    suppress_audio_warnings();

    let chunking = shared_chunking(config.validate()?);
    let source_language = languages::resolve(&config.languages.source)
        .unwrap_or(voxbridge::defaults::AUTO_LANGUAGE)
        .to_string();
    let target_language = languages::resolve(&config.languages.target)
        .unwrap_or(voxbridge::defaults::DEFAULT_TARGET_LANGUAGE)
        .to_string();

    let whisper = WhisperPort::new(WhisperConfig {
        model_path: config.transcription.model_path.clone().into(),
        threads: config.transcription.threads,
    })?;
    let transcription: Arc<dyn TranscriptionPort> = if config.transcription.carry_context {
        Arc::new(ContextualPort::new(whisper))
    } else {
        Arc::new(whisper)
    };

    let synthesis: Option<Arc<dyn SynthesisPort>> = config
        .elevenlabs
        .api_key
        .as_deref()
        .map(|key| Arc::new(ElevenLabsSynthesis::new(key)) as Arc<dyn SynthesisPort>);
    if synthesis.is_none() {
        eprintln!("voxbridge: no ElevenLabs API key configured, speech synthesis disabled");
    }

    let ports = SessionPorts {
        transcription,
        translation: Arc::new(GoogleTranslate::new()),
        synthesis,
    };

    let mut coordinator = Coordinator::new(
        CoordinatorConfig {
            sample_rate: config.audio.sample_rate,
            channels: voxbridge::defaults::CHANNELS,
            source_language: source_language.clone(),
            target_language: target_language.clone(),
            voice_id: config.elevenlabs.voice_id.clone(),
        },
        chunking,
        ports,
    );
    if let Some(ref dir) = config.artifacts.dir {
        coordinator = coordinator.with_artifacts(ArtifactStore::new(dir)?);
    }

    let capture = Box::new(CpalCapture::new(
        config.audio.device.as_deref(),
        config.audio.sample_rate,
    )?);

    println!(
        "voxbridge {} ({} inference)",
        voxbridge::version_string(),
        voxbridge::defaults::gpu_backend(),
    );
    println!(
        "Translating {} -> {}",
        languages::name_for(&source_language).unwrap_or("auto-detect"),
        languages::name_for(&target_language).unwrap_or(&target_language),
    );
    println!("Recording. Press Enter to stop.");

    coordinator.start(capture, Box::new(ConsoleObserver))?;

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    coordinator.stop()?;
    Ok(())
}

#[cfg(not(all(feature = "cpal-audio", feature = "online")))]
fn run_session(_config: Config) -> Result<()> {
    anyhow::bail!(
        "this build cannot run a session (cpal-audio and online features are required)"
    )
}

/// Prints each chunk's transcript and translation as it completes.
#[cfg(all(feature = "cpal-audio", feature = "online"))]
struct ConsoleObserver;

#[cfg(all(feature = "cpal-audio", feature = "online"))]
impl voxbridge::pipeline::observer::SessionObserver for ConsoleObserver {
    fn on_result(&mut self, result: &voxbridge::pipeline::types::PipelineResult) {
        println!(
            "{} {}",
            format!("[{}]", result.sequence).dimmed(),
            result.transcription.text.cyan()
        );
        println!("    {}", result.translation.green());
        if let Some(ref path) = result.audio_path {
            println!("    {} {}", "saved".dimmed(), path.display());
        }
    }

    fn on_data_loss(&mut self, dropped: u64) {
        eprintln!(
            "{}",
            format!("voxbridge: {dropped} audio frame(s) lost").yellow()
        );
    }

    fn on_warning(&mut self, message: &str) {
        eprintln!("{}", format!("voxbridge: {message}").yellow());
    }

    fn on_fatal(&mut self, error: &voxbridge::error::VoxError) {
        eprintln!("{}", format!("voxbridge: fatal: {error}").red());
    }
}
