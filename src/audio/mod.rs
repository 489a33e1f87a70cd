//! Audio capture: device-backed and mock sources pushing frames into the
//! pipeline's bounded queue.

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod resample;
pub mod source;

#[cfg(feature = "cpal-audio")]
pub use capture::{CpalCapture, list_devices, suppress_audio_warnings};
pub use source::{CaptureSource, FrameSink, MockCapture};
