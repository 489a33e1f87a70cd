//! Session lifecycle and the processing worker.
//!
//! The coordinator owns two states, idle and recording. `start` wires a
//! capture source to a fresh processing worker through a bounded frame queue;
//! `stop` tears the session down. All per-session state (queue, assembler
//! buffer, cancellation flag) is created at start, so sessions cannot leak
//! into one another.

use crate::artifacts::ArtifactStore;
use crate::defaults;
use crate::error::{Result, VoxError};
use crate::pipeline::assembler::{ChunkAssembler, SharedChunking};
use crate::pipeline::observer::SessionObserver;
use crate::pipeline::types::{Chunk, PipelineResult, TranscriptionResult};
use crate::ports::synthesis::SynthesisPort;
use crate::ports::transcription::TranscriptionPort;
use crate::ports::translation::{TranslationPort, is_translation_error};
use crate::audio::source::{CaptureSource, FrameSink};
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Service ports a session runs against.
pub struct SessionPorts {
    pub transcription: Arc<dyn TranscriptionPort>,
    pub translation: Arc<dyn TranslationPort>,
    pub synthesis: Option<Arc<dyn SynthesisPort>>,
}

/// Static session parameters, fixed at coordinator construction.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Resolved source language code, or "auto".
    pub source_language: String,
    /// Resolved target language code.
    pub target_language: String,
    /// Synthesis voice; None disables synthesis even when a port is present.
    pub voice_id: Option<String>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            channels: defaults::CHANNELS,
            source_language: defaults::AUTO_LANGUAGE.to_string(),
            target_language: defaults::DEFAULT_TARGET_LANGUAGE.to_string(),
            voice_id: None,
        }
    }
}

/// One active recording session.
struct Session {
    running: Arc<AtomicBool>,
    capture: Box<dyn CaptureSource>,
    worker: Option<JoinHandle<()>>,
}

/// Drives capture and processing for one session at a time.
pub struct Coordinator {
    config: CoordinatorConfig,
    chunking: SharedChunking,
    ports: SessionPorts,
    artifacts: Option<ArtifactStore>,
    session: Option<Session>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig, chunking: SharedChunking, ports: SessionPorts) -> Self {
        Self {
            config,
            chunking,
            ports,
            artifacts: None,
            session: None,
        }
    }

    /// Persist chunk recordings and synthesized speech to this store.
    pub fn with_artifacts(mut self, artifacts: ArtifactStore) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    /// Whether a session is currently active.
    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Start a recording session.
    ///
    /// Opens the capture source and spawns the processing worker. If the
    /// device fails to open, no session is created and the error is returned
    /// directly.
    ///
    /// # Errors
    /// `VoxError::AlreadyActive` if a session is running.
    pub fn start(
        &mut self,
        mut capture: Box<dyn CaptureSource>,
        observer: Box<dyn SessionObserver>,
    ) -> Result<()> {
        if self.session.is_some() {
            return Err(VoxError::AlreadyActive);
        }

        let (tx, rx) = bounded(defaults::FRAME_QUEUE_CAPACITY);
        let sink = FrameSink::new(tx);
        let dropped = sink.dropped_counter();

        // Fail fast: a dead device surfaces here, before any worker exists.
        capture.open(sink)?;

        let running = Arc::new(AtomicBool::new(true));
        let worker = SessionWorker {
            rx,
            running: running.clone(),
            assembler: ChunkAssembler::new(
                self.config.sample_rate,
                self.config.channels,
                self.chunking.clone(),
            ),
            transcription: self.ports.transcription.clone(),
            translation: self.ports.translation.clone(),
            synthesis: self.ports.synthesis.clone(),
            artifacts: self.artifacts.clone(),
            observer,
            dropped,
            dropped_reported: 0,
            source_language: self.config.source_language.clone(),
            target_language: self.config.target_language.clone(),
            voice_id: self.config.voice_id.clone(),
        };

        let handle = thread::spawn(move || worker.run());

        self.session = Some(Session {
            running,
            capture,
            worker: Some(handle),
        });
        Ok(())
    }

    /// Stop the active session.
    ///
    /// Signals the worker, closes the capture source, and waits a bounded
    /// time for the worker to finish. Audio buffered below one chunk is
    /// discarded, not flushed.
    ///
    /// # Errors
    /// `VoxError::NotActive` if no session is running.
    pub fn stop(&mut self) -> Result<()> {
        let mut session = self.session.take().ok_or(VoxError::NotActive)?;

        session.running.store(false, Ordering::SeqCst);

        let close_result = session.capture.close();

        if let Some(handle) = session.worker.take() {
            join_with_deadline(handle, Duration::from_secs(5));
        }

        close_result
    }
}

/// Join a worker thread, detaching it if it overruns the deadline.
fn join_with_deadline(handle: JoinHandle<()>, deadline: Duration) {
    let limit = Instant::now() + deadline;
    while !handle.is_finished() {
        if Instant::now() >= limit {
            eprintln!("voxbridge: shutdown timeout — processing worker still running, detaching");
            // Dropping the JoinHandle detaches the thread; it dies with the process.
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    if let Err(panic_info) = handle.join() {
        let msg = panic_info
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| panic_info.downcast_ref::<String>().map(|s| s.as_str()))
            .unwrap_or("unknown panic");
        eprintln!("voxbridge: processing worker panicked: {msg}");
    }
}

/// The processing worker: drains the frame queue, assembles chunks, and runs
/// each chunk through transcribe → translate → synthesize sequentially.
struct SessionWorker {
    rx: Receiver<crate::pipeline::types::AudioFrame>,
    running: Arc<AtomicBool>,
    assembler: ChunkAssembler,
    transcription: Arc<dyn TranscriptionPort>,
    translation: Arc<dyn TranslationPort>,
    synthesis: Option<Arc<dyn SynthesisPort>>,
    artifacts: Option<ArtifactStore>,
    observer: Box<dyn SessionObserver>,
    dropped: Arc<AtomicU64>,
    dropped_reported: u64,
    source_language: String,
    target_language: String,
    voice_id: Option<String>,
}

impl SessionWorker {
    fn run(mut self) {
        loop {
            // Timed poll: never busy-spins on an empty queue, and a stop
            // request goes unobserved for at most one timeout period.
            match self
                .rx
                .recv_timeout(Duration::from_millis(defaults::POLL_TIMEOUT_MS))
            {
                Ok(frame) => {
                    if let Some(chunk) = self.assembler.feed(&frame)
                        && !self.process_chunk(chunk)
                    {
                        self.running.store(false, Ordering::SeqCst);
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            self.report_data_loss();

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
        }
        self.report_data_loss();
    }

    fn report_data_loss(&mut self) {
        let total = self.dropped.load(Ordering::Relaxed);
        if total > self.dropped_reported {
            let delta = total - self.dropped_reported;
            self.dropped_reported = total;
            eprintln!("voxbridge: {delta} audio frame(s) dropped, queue full");
            self.observer.on_data_loss(delta);
        }
    }

    /// Process one chunk end to end. Returns false on a fatal engine error.
    fn process_chunk(&mut self, chunk: Chunk) -> bool {
        if let Some(ref store) = self.artifacts
            && let Err(e) = store.save_chunk(&chunk)
        {
            self.observer
                .on_warning(&format!("failed to save chunk {}: {}", chunk.sequence, e));
        }

        let text = match self.transcription.transcribe(
            &chunk.samples,
            chunk.sample_rate,
            chunk.channels,
            &self.source_language,
        ) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("voxbridge: fatal transcription error: {e}");
                self.observer.on_fatal(&e);
                return false;
            }
        };

        // Empty text means nothing was said; the chunk is skipped, not an error.
        if text.is_empty() {
            return true;
        }

        let translation =
            self.translation
                .translate(&text, &self.source_language, &self.target_language);
        if is_translation_error(&translation) {
            self.observer.on_warning(&translation);
        }

        let audio_path = self.synthesize(&translation, chunk.sequence);

        self.observer.on_result(&PipelineResult {
            sequence: chunk.sequence,
            transcription: TranscriptionResult {
                text,
                sample_rate: chunk.sample_rate,
                channels: chunk.channels,
            },
            translation,
            audio_path,
        });
        true
    }

    fn synthesize(&mut self, translation: &str, sequence: u64) -> Option<std::path::PathBuf> {
        // No voice, no port, or nothing to speak: synthesis is simply skipped.
        let port = self.synthesis.as_ref()?;
        let voice_id = self.voice_id.as_deref()?;
        if is_translation_error(translation) {
            return None;
        }

        let audio = match port.synthesize(translation, voice_id) {
            Ok(audio) => audio,
            Err(e) => {
                self.observer
                    .on_warning(&format!("synthesis failed for chunk {}: {}", sequence, e));
                return None;
            }
        };

        match self.artifacts.as_ref() {
            Some(store) => match store.save_speech(sequence, &audio) {
                Ok(path) => Some(path),
                Err(e) => {
                    self.observer.on_warning(&format!(
                        "failed to save speech for chunk {}: {}",
                        sequence, e
                    ));
                    None
                }
            },
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::MockCapture;
    use crate::pipeline::assembler::{ChunkingParams, shared_chunking};
    use crate::pipeline::observer::{CollectedEvents, CollectorObserver};
    use crate::ports::synthesis::MockSynthesis;
    use crate::ports::transcription::MockPort;
    use crate::ports::translation::MockTranslation;
    use std::sync::Mutex;

    fn chunking() -> SharedChunking {
        // 0.5s chunks with 0.1s overlap at 16kHz: 8000/1600 samples.
        shared_chunking(ChunkingParams::new(0.5, 0.1).unwrap())
    }

    fn ports(transcription: MockPort) -> SessionPorts {
        SessionPorts {
            transcription: Arc::new(transcription),
            translation: Arc::new(MockTranslation::new()),
            synthesis: None,
        }
    }

    fn coordinator(transcription: MockPort) -> Coordinator {
        let config = CoordinatorConfig {
            target_language: "es".to_string(),
            ..Default::default()
        };
        Coordinator::new(config, chunking(), ports(transcription))
    }

    /// Frames adding up to `chunks` full chunks at the test chunking params.
    fn frames_for(chunks: usize) -> Vec<Vec<f32>> {
        // Each chunk consumes 6400 fresh samples after the first (8000 - 1600
        // overlap); pad generously.
        let total = 8000 + chunks * 8000;
        (0..total / 1600).map(|_| vec![0.1f32; 1600]).collect()
    }

    fn wait_for_results(events: &Arc<Mutex<CollectedEvents>>, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if events.lock().unwrap().results.len() >= count {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_start_twice_is_already_active() {
        let mut coordinator = coordinator(MockPort::new());

        coordinator
            .start(Box::new(MockCapture::new()), Box::new(CollectorObserver::new()))
            .unwrap();
        let second = coordinator.start(
            Box::new(MockCapture::new()),
            Box::new(CollectorObserver::new()),
        );
        assert!(matches!(second, Err(VoxError::AlreadyActive)));

        coordinator.stop().unwrap();
    }

    #[test]
    fn test_stop_without_start_is_not_active() {
        let mut coordinator = coordinator(MockPort::new());
        assert!(matches!(coordinator.stop(), Err(VoxError::NotActive)));
    }

    #[test]
    fn test_stop_twice_is_not_active() {
        let mut coordinator = coordinator(MockPort::new());
        coordinator
            .start(Box::new(MockCapture::new()), Box::new(CollectorObserver::new()))
            .unwrap();
        coordinator.stop().unwrap();
        assert!(matches!(coordinator.stop(), Err(VoxError::NotActive)));
    }

    #[test]
    fn test_failed_device_open_leaves_coordinator_idle() {
        let mut coordinator = coordinator(MockPort::new());

        let result = coordinator.start(
            Box::new(MockCapture::new().with_open_failure()),
            Box::new(CollectorObserver::new()),
        );
        assert!(matches!(result, Err(VoxError::Capture { .. })));
        assert!(!coordinator.is_recording());

        // A new start works after the failure.
        coordinator
            .start(Box::new(MockCapture::new()), Box::new(CollectorObserver::new()))
            .unwrap();
        coordinator.stop().unwrap();
    }

    #[test]
    fn test_session_produces_ordered_results() {
        let mut coordinator = coordinator(MockPort::new().with_response("hello"));
        let observer = CollectorObserver::new();
        let events = observer.events();

        coordinator
            .start(
                Box::new(MockCapture::new().with_frames(frames_for(3))),
                Box::new(observer),
            )
            .unwrap();
        assert!(coordinator.is_recording());

        wait_for_results(&events, 3);
        coordinator.stop().unwrap();
        assert!(!coordinator.is_recording());

        let collected = events.lock().unwrap();
        assert!(collected.results.len() >= 3);
        for (i, result) in collected.results.iter().enumerate() {
            assert_eq!(result.sequence, i as u64);
            assert_eq!(result.transcription.text, "hello");
            assert_eq!(result.translation, "[es] hello");
        }
    }

    #[test]
    fn test_empty_transcription_skips_chunk() {
        // Default mock transcribes everything as empty text.
        let mut coordinator = coordinator(MockPort::new());
        let observer = CollectorObserver::new();
        let events = observer.events();

        coordinator
            .start(
                Box::new(MockCapture::new().with_frames(frames_for(2))),
                Box::new(observer),
            )
            .unwrap();

        thread::sleep(Duration::from_millis(300));
        coordinator.stop().unwrap();

        let collected = events.lock().unwrap();
        assert!(collected.results.is_empty());
        assert!(collected.fatals.is_empty());
    }

    #[test]
    fn test_fatal_transcription_error_terminates_session() {
        let mut coordinator = coordinator(
            MockPort::new()
                .with_response("fine")
                .with_failure("engine crashed"),
        );
        let observer = CollectorObserver::new();
        let events = observer.events();

        coordinator
            .start(
                Box::new(MockCapture::new().with_frames(frames_for(4))),
                Box::new(observer),
            )
            .unwrap();

        wait_for_results(&events, 1);
        thread::sleep(Duration::from_millis(300));
        coordinator.stop().unwrap();

        let collected = events.lock().unwrap();
        // First chunk succeeded, second hit the fatal error, nothing after.
        assert_eq!(collected.results.len(), 1);
        assert_eq!(collected.fatals.len(), 1);
        assert!(collected.fatals[0].contains("engine crashed"));
    }

    #[test]
    fn test_translation_failure_is_soft() {
        let config = CoordinatorConfig {
            target_language: "es".to_string(),
            ..Default::default()
        };
        let ports = SessionPorts {
            transcription: Arc::new(MockPort::new().with_response("hola")),
            translation: Arc::new(MockTranslation::new().with_failure()),
            synthesis: None,
        };
        let mut coordinator = Coordinator::new(config, chunking(), ports);
        let observer = CollectorObserver::new();
        let events = observer.events();

        coordinator
            .start(
                Box::new(MockCapture::new().with_frames(frames_for(2))),
                Box::new(observer),
            )
            .unwrap();

        wait_for_results(&events, 2);
        coordinator.stop().unwrap();

        let collected = events.lock().unwrap();
        // The session keeps delivering results; the sentinel rides in place
        // of the translation and each failure raises a warning.
        assert!(collected.results.len() >= 2);
        assert!(collected.results[0]
            .translation
            .starts_with("Translation Error"));
        assert!(!collected.warnings.is_empty());
        assert!(collected.fatals.is_empty());
    }

    #[test]
    fn test_synthesis_failure_is_soft() {
        let config = CoordinatorConfig {
            target_language: "es".to_string(),
            voice_id: Some("voice-1".to_string()),
            ..Default::default()
        };
        let ports = SessionPorts {
            transcription: Arc::new(MockPort::new().with_response("hola")),
            translation: Arc::new(MockTranslation::new()),
            synthesis: Some(Arc::new(MockSynthesis::new().with_failure())),
        };
        let mut coordinator = Coordinator::new(config, chunking(), ports);
        let observer = CollectorObserver::new();
        let events = observer.events();

        coordinator
            .start(
                Box::new(MockCapture::new().with_frames(frames_for(2))),
                Box::new(observer),
            )
            .unwrap();

        wait_for_results(&events, 2);
        coordinator.stop().unwrap();

        let collected = events.lock().unwrap();
        assert!(collected.results.len() >= 2);
        assert!(collected.results.iter().all(|r| r.audio_path.is_none()));
        assert!(collected
            .warnings
            .iter()
            .any(|w| w.contains("synthesis failed")));
    }

    #[test]
    fn test_synthesis_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();

        let config = CoordinatorConfig {
            target_language: "es".to_string(),
            voice_id: Some("voice-1".to_string()),
            ..Default::default()
        };
        let ports = SessionPorts {
            transcription: Arc::new(MockPort::new().with_response("hola")),
            translation: Arc::new(MockTranslation::new()),
            synthesis: Some(Arc::new(MockSynthesis::new().with_audio(vec![1, 2, 3]))),
        };
        let mut coordinator = Coordinator::new(config, chunking(), ports).with_artifacts(store);
        let observer = CollectorObserver::new();
        let events = observer.events();

        coordinator
            .start(
                Box::new(MockCapture::new().with_frames(frames_for(1))),
                Box::new(observer),
            )
            .unwrap();

        wait_for_results(&events, 1);
        coordinator.stop().unwrap();

        let collected = events.lock().unwrap();
        assert!(!collected.results.is_empty());
        let path = collected.results[0].audio_path.as_ref().unwrap();
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);

        // The chunk recording landed in input/.
        let wavs: Vec<_> = std::fs::read_dir(dir.path().join("input"))
            .unwrap()
            .collect();
        assert!(!wavs.is_empty());
    }

    #[test]
    fn test_stop_discards_partial_chunk() {
        // One frame of 1600 samples is far below the 8000-sample chunk.
        let mut coordinator = coordinator(MockPort::new().with_response("should not appear"));
        let observer = CollectorObserver::new();
        let events = observer.events();

        coordinator
            .start(
                Box::new(MockCapture::new().with_frames(vec![vec![0.1; 1600]])),
                Box::new(observer),
            )
            .unwrap();

        thread::sleep(Duration::from_millis(200));
        coordinator.stop().unwrap();

        assert!(events.lock().unwrap().results.is_empty());
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut coordinator = coordinator(MockPort::new().with_response("first session"));
        let observer = CollectorObserver::new();
        let events = observer.events();

        // Session 1: just under one chunk of audio, then stop. The leftover
        // buffer must not leak into session 2.
        coordinator
            .start(
                Box::new(MockCapture::new().with_frames(vec![vec![0.1; 7000]])),
                Box::new(observer),
            )
            .unwrap();
        thread::sleep(Duration::from_millis(200));
        coordinator.stop().unwrap();
        assert!(events.lock().unwrap().results.is_empty());

        // Session 2: again just under one chunk. If session 1's buffer had
        // survived, this would emit a chunk.
        let observer2 = CollectorObserver::new();
        let events2 = observer2.events();
        coordinator
            .start(
                Box::new(MockCapture::new().with_frames(vec![vec![0.1; 7000]])),
                Box::new(observer2),
            )
            .unwrap();
        thread::sleep(Duration::from_millis(200));
        coordinator.stop().unwrap();
        assert!(events2.lock().unwrap().results.is_empty());
    }
}
