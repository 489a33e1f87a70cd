//! Service ports: the seams where speech recognition, translation, and
//! synthesis plug into the pipeline.

pub mod synthesis;
pub mod transcription;
pub mod translation;
pub mod whisper;

pub use synthesis::{MockSynthesis, SynthesisPort};
pub use transcription::{MockPort, TranscriptionPort, normalize_peak};
pub use translation::{MockTranslation, TranslationPort, is_translation_error};
pub use whisper::{ContextualPort, WhisperConfig, WhisperPort};

#[cfg(feature = "online")]
pub use synthesis::ElevenLabsSynthesis;
#[cfg(feature = "online")]
pub use translation::GoogleTranslate;
