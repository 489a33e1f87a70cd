//! Text translation port.
//!
//! Translation is fail-soft: a service error never stops the pipeline, it
//! yields a sentinel string carried in place of the translated text so the
//! chunk's transcript is still delivered.

use crate::defaults;

/// Trait for translation services.
///
/// This trait allows swapping implementations (real service vs mock).
/// `source` may be "auto" for source-language detection. Failures are
/// reported in-band as a `"Translation Error: …"` sentinel, never as an
/// error value.
pub trait TranslationPort: Send + Sync {
    /// Translate text from `source` (or "auto") into `target`.
    fn translate(&self, text: &str, source: &str, target: &str) -> String;
}

/// Build the in-band sentinel for a failed translation.
pub fn translation_error(message: &str) -> String {
    format!("{}: {}", defaults::TRANSLATION_ERROR_PREFIX, message)
}

/// Check whether a translation output is the failure sentinel.
pub fn is_translation_error(text: &str) -> bool {
    text.starts_with(defaults::TRANSLATION_ERROR_PREFIX)
}

/// Google Translate implementation over the public web endpoint.
///
/// Uses the same unauthenticated `translate_a/single` endpoint the
/// deep-translator ecosystem does; no API key required.
#[cfg(feature = "online")]
pub struct GoogleTranslate {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "online")]
impl GoogleTranslate {
    const ENDPOINT: &'static str = "https://translate.googleapis.com/translate_a/single";

    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::blocking::Client::new()),
        }
    }

    fn request(&self, text: &str, source: &str, target: &str) -> reqwest::Result<String> {
        let response = self
            .client
            .get(Self::ENDPOINT)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()?
            .error_for_status()?;

        let body: serde_json::Value = response.json()?;

        // Response shape: [[[translated, original, ...], ...], ...]
        let mut translated = String::new();
        if let Some(segments) = body.get(0).and_then(|v| v.as_array()) {
            for segment in segments {
                if let Some(piece) = segment.get(0).and_then(|v| v.as_str()) {
                    translated.push_str(piece);
                }
            }
        }
        Ok(translated)
    }
}

#[cfg(feature = "online")]
impl Default for GoogleTranslate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "online")]
impl TranslationPort for GoogleTranslate {
    fn translate(&self, text: &str, source: &str, target: &str) -> String {
        match self.request(text, source, target) {
            Ok(translated) if !translated.is_empty() => translated,
            Ok(_) => translation_error("empty response from service"),
            Err(e) => translation_error(&e.to_string()),
        }
    }
}

/// Mock translation port for testing.
#[derive(Debug, Clone)]
pub struct MockTranslation {
    prefix: String,
    should_fail: bool,
}

impl MockTranslation {
    /// Create a mock that "translates" by tagging the text with the target
    /// language.
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            should_fail: false,
        }
    }

    /// Configure a fixed prefix prepended to every translation.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Configure the mock to fail every translation.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Default for MockTranslation {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationPort for MockTranslation {
    fn translate(&self, text: &str, _source: &str, target: &str) -> String {
        if self.should_fail {
            return translation_error("mock translation failure");
        }
        format!("{}[{}] {}", self.prefix, target, text)
    }
}
