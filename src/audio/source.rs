use crate::error::{Result, VoxError};
use crate::pipeline::types::AudioFrame;
use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Write side of the frame queue handed to a capture source.
///
/// The sink owns the sequence counter, so frames are numbered in push order
/// regardless of which thread the device callback runs on. Pushes never
/// block: when the queue is full the frame is dropped and counted, because a
/// device callback must not stall.
#[derive(Clone)]
pub struct FrameSink {
    tx: Sender<AudioFrame>,
    sequence: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl FrameSink {
    pub fn new(tx: Sender<AudioFrame>) -> Self {
        Self {
            tx,
            sequence: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Pushes one block of samples as a frame.
    ///
    /// Returns false if the frame was dropped (queue full or receiver gone).
    pub fn push(&self, samples: Vec<f32>) -> bool {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        match self.tx.try_send(AudioFrame::new(sequence, samples)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Total frames dropped since the sink was created.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Handle to the drop counter, for observing data loss from another thread.
    pub fn dropped_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

/// Trait for audio capture sources.
///
/// This trait allows swapping implementations (real audio device vs mock).
/// A source pushes frames into the sink from `open` until `close`; frames may
/// arrive from a device callback thread.
pub trait CaptureSource: Send {
    /// Start capturing and push frames into the sink.
    ///
    /// Device resolution and stream setup failures surface here, before any
    /// frame is queued.
    fn open(&mut self, sink: FrameSink) -> Result<()>;

    /// Stop capturing. No frames are pushed after this returns.
    fn close(&mut self) -> Result<()>;
}

/// Mock capture source for testing.
///
/// Pushes its scripted frames into the sink synchronously on `open`.
#[derive(Debug, Clone)]
pub struct MockCapture {
    is_open: bool,
    frames: Vec<Vec<f32>>,
    should_fail_open: bool,
    should_fail_close: bool,
    error_message: String,
}

impl MockCapture {
    /// Create a new mock capture source with default settings.
    pub fn new() -> Self {
        Self {
            is_open: false,
            frames: Vec::new(),
            should_fail_open: false,
            should_fail_close: false,
            error_message: "mock capture error".to_string(),
        }
    }

    /// Configure the mock to push specific frames on open.
    pub fn with_frames(mut self, frames: Vec<Vec<f32>>) -> Self {
        self.frames = frames;
        self
    }

    /// Configure the mock to push one frame repeated `count` times.
    pub fn with_repeated_frame(mut self, frame: Vec<f32>, count: usize) -> Self {
        self.frames = vec![frame; count];
        self
    }

    /// Configure the mock to fail on open.
    pub fn with_open_failure(mut self) -> Self {
        self.should_fail_open = true;
        self
    }

    /// Configure the mock to fail on close.
    pub fn with_close_failure(mut self) -> Self {
        self.should_fail_close = true;
        self
    }

    /// Configure the error message for failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the source is open.
    pub fn is_open(&self) -> bool {
        self.is_open
    }
}

impl Default for MockCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for MockCapture {
    fn open(&mut self, sink: FrameSink) -> Result<()> {
        if self.should_fail_open {
            return Err(VoxError::Capture {
                message: self.error_message.clone(),
            });
        }
        self.is_open = true;
        for frame in &self.frames {
            sink.push(frame.clone());
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.should_fail_close {
            return Err(VoxError::Capture {
                message: self.error_message.clone(),
            });
        }
        self.is_open = false;
        Ok(())
    }
}
