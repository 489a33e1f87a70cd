//! Session observer interface.

use crate::error::VoxError;
use crate::pipeline::types::PipelineResult;
use std::sync::{Arc, Mutex};

/// Receives pipeline output and session events.
///
/// All callbacks are invoked from the session's processing worker thread, so
/// they are serialized and results arrive in chunk order. A slow observer
/// backpressures the pipeline; keep callbacks cheap.
pub trait SessionObserver: Send {
    /// A chunk made it through the whole pipeline.
    fn on_result(&mut self, result: &PipelineResult);

    /// `dropped` frames were lost at the capture queue since the last report.
    fn on_data_loss(&mut self, _dropped: u64) {}

    /// A soft failure occurred; the session keeps running.
    fn on_warning(&mut self, _message: &str) {}

    /// A fatal error occurred; the session is terminating.
    fn on_fatal(&mut self, _error: &VoxError) {}
}

/// Observer that records everything it sees, for tests.
///
/// Clone the handle before passing the observer to a session; events are read
/// back through the shared state after the session stops.
#[derive(Debug, Default)]
pub struct CollectorObserver {
    state: Arc<Mutex<CollectedEvents>>,
}

#[derive(Debug, Default)]
pub struct CollectedEvents {
    pub results: Vec<PipelineResult>,
    pub data_loss: Vec<u64>,
    pub warnings: Vec<String>,
    pub fatals: Vec<String>,
}

impl CollectorObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the collected events.
    pub fn events(&self) -> Arc<Mutex<CollectedEvents>> {
        Arc::clone(&self.state)
    }
}

impl SessionObserver for CollectorObserver {
    fn on_result(&mut self, result: &PipelineResult) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .results
            .push(result.clone());
    }

    fn on_data_loss(&mut self, dropped: u64) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .data_loss
            .push(dropped);
    }

    fn on_warning(&mut self, message: &str) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .warnings
            .push(message.to_string());
    }

    fn on_fatal(&mut self, error: &VoxError) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .fatals
            .push(error.to_string());
    }
}
