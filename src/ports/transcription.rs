use crate::error::{Result, VoxError};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Trait for speech-to-text engines.
///
/// This trait allows swapping implementations (real engine vs mock).
/// Samples are mono f32 in [-1.0, 1.0]. Empty returned text means the chunk
/// contained no recognizable speech and is skipped downstream; an `Err` means
/// the engine itself failed and the session cannot continue.
pub trait TranscriptionPort: Send + Sync {
    /// Transcribe one chunk of audio.
    ///
    /// `language_hint` is a language code, or "auto" for detection.
    fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
        channels: u16,
        language_hint: &str,
    ) -> Result<String>;

    /// Name of the backing engine/model, for logging.
    fn name(&self) -> &str;
}

/// Scale samples so the peak amplitude is 1.0.
///
/// Engines behave better on quiet input when it is brought up to full scale
/// first. Returns `None` for silent audio (peak of zero), which callers treat
/// as "nothing said" rather than attempting a division by zero.
pub fn normalize_peak(samples: &[f32]) -> Option<Vec<f32>> {
    let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if peak == 0.0 {
        return None;
    }
    Some(samples.iter().map(|&s| s / peak).collect())
}

/// A scripted response for the mock port.
#[derive(Debug, Clone)]
enum MockResponse {
    Text(String),
    Failure(String),
}

/// Mock transcription port for testing.
///
/// Returns scripted responses in order, then repeats the last one. Interior
/// mutability keeps the trait's `&self` signature.
#[derive(Debug)]
pub struct MockPort {
    responses: Mutex<VecDeque<MockResponse>>,
    last: Mutex<Option<MockResponse>>,
    calls: Mutex<Vec<String>>,
}

impl MockPort {
    /// Create a mock that transcribes everything as empty text.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text response.
    pub fn with_response(self, text: &str) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(MockResponse::Text(text.to_string()));
        self
    }

    /// Queue a fatal engine failure.
    pub fn with_failure(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(MockResponse::Failure(message.to_string()));
        self
    }

    /// Language hints seen so far, one per call.
    pub fn language_hints(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of transcription calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for MockPort {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptionPort for MockPort {
    fn transcribe(
        &self,
        _samples: &[f32],
        _sample_rate: u32,
        _channels: u16,
        language_hint: &str,
    ) -> Result<String> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(language_hint.to_string());

        let next = self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        let response = match next {
            Some(response) => {
                *self.last.lock().unwrap_or_else(|e| e.into_inner()) = Some(response.clone());
                response
            }
            None => self
                .last
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone()
                .unwrap_or(MockResponse::Text(String::new())),
        };

        match response {
            MockResponse::Text(text) => Ok(text),
            MockResponse::Failure(message) => Err(VoxError::Transcription { message }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_peak_scales_to_full_range() {
        let samples = vec![0.25, -0.5, 0.1];
        let normalized = normalize_peak(&samples).unwrap();
        assert!((normalized[0] - 0.5).abs() < 1e-6);
        assert!((normalized[1] + 1.0).abs() < 1e-6);
        assert!((normalized[2] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_peak_silent_audio_returns_none() {
        assert!(normalize_peak(&[0.0; 100]).is_none());
        assert!(normalize_peak(&[]).is_none());
    }

    #[test]
    fn test_normalize_peak_already_full_scale_unchanged() {
        let samples = vec![1.0, -1.0, 0.5];
        let normalized = normalize_peak(&samples).unwrap();
        assert_eq!(normalized, samples);
    }

    #[test]
    fn test_mock_port_returns_responses_in_order() {
        let port = MockPort::new().with_response("first").with_response("second");

        assert_eq!(port.transcribe(&[0.1], 16000, 1, "en").unwrap(), "first");
        assert_eq!(port.transcribe(&[0.1], 16000, 1, "en").unwrap(), "second");
    }

    #[test]
    fn test_mock_port_repeats_last_response() {
        let port = MockPort::new().with_response("only");

        assert_eq!(port.transcribe(&[0.1], 16000, 1, "en").unwrap(), "only");
        assert_eq!(port.transcribe(&[0.1], 16000, 1, "en").unwrap(), "only");
    }

    #[test]
    fn test_mock_port_empty_by_default() {
        let port = MockPort::new();
        assert_eq!(port.transcribe(&[0.1], 16000, 1, "auto").unwrap(), "");
    }

    #[test]
    fn test_mock_port_failure() {
        let port = MockPort::new().with_failure("engine crashed");

        let result = port.transcribe(&[0.1], 16000, 1, "en");
        match result {
            Err(VoxError::Transcription { message }) => assert_eq!(message, "engine crashed"),
            _ => panic!("Expected Transcription error"),
        }
    }

    #[test]
    fn test_mock_port_records_language_hints() {
        let port = MockPort::new().with_response("hola");
        port.transcribe(&[0.1], 16000, 1, "es").unwrap();
        port.transcribe(&[0.1], 16000, 1, "auto").unwrap();

        assert_eq!(port.language_hints(), vec!["es", "auto"]);
        assert_eq!(port.call_count(), 2);
    }

    #[test]
    fn test_port_is_object_safe_and_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockPort>();

        let port: Box<dyn TranscriptionPort> = Box::new(MockPort::new().with_response("boxed"));
        assert_eq!(port.transcribe(&[0.1], 16000, 1, "en").unwrap(), "boxed");
        assert_eq!(port.name(), "mock");
    }
}
