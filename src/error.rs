//! Error types for voxbridge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    DeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    Capture { message: String },

    // Transcription errors
    #[error("Transcription model not found at {path}")]
    ModelNotFound { path: String },

    #[error("Transcription engine failed: {message}")]
    Transcription { message: String },

    // Speech synthesis errors
    #[error("Speech synthesis failed: {message}")]
    Synthesis { message: String },

    // Session lifecycle misuse
    #[error("A recording session is already active")]
    AlreadyActive,

    #[error("No recording session is active")]
    NotActive,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_invalid_value_display() {
        let error = VoxError::ConfigInvalidValue {
            key: "overlap_duration_secs".to_string(),
            message: "must be shorter than chunk_duration_secs".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for overlap_duration_secs: \
             must be shorter than chunk_duration_secs"
        );
    }

    #[test]
    fn test_device_not_found_display() {
        let error = VoxError::DeviceNotFound {
            device: "default".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device not found: default");
    }

    #[test]
    fn test_capture_display() {
        let error = VoxError::Capture {
            message: "stream build failed".to_string(),
        };
        assert_eq!(error.to_string(), "Audio capture failed: stream build failed");
    }

    #[test]
    fn test_transcription_display() {
        let error = VoxError::Transcription {
            message: "out of memory".to_string(),
        };
        assert_eq!(error.to_string(), "Transcription engine failed: out of memory");
    }

    #[test]
    fn test_session_guard_displays() {
        assert_eq!(
            VoxError::AlreadyActive.to_string(),
            "A recording session is already active"
        );
        assert_eq!(
            VoxError::NotActive.to_string(),
            "No recording session is active"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: VoxError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: VoxError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<VoxError>();
        assert_sync::<VoxError>();
    }
}
