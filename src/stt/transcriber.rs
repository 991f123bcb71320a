use crate::defaults;
use crate::error::{MictokError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Output of one transcription call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranscriptionResult {
    /// Best-hypothesis transcript. Empty string when the clip is silence.
    pub text: String,
    /// Detected source language code, when the backend can detect one.
    pub language: Option<String>,
}

/// Selection of a transcription backend for one pipeline run.
///
/// Exactly one branch is active; the model identifier of the active branch
/// must be non-empty.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderConfig {
    /// In-process Whisper model.
    Local {
        /// Model name, e.g. "base" or "small.en".
        model: String,
        /// Explicit model file path. When absent, the model is looked up in
        /// the cache directory and a local `models/` directory.
        model_path: Option<PathBuf>,
    },
    /// Hosted transcription API.
    Remote {
        /// Remote model identifier, e.g. "whisper-1".
        model: String,
        /// Endpoint URL of the transcription API.
        endpoint: String,
        /// Bearer token. When absent, `OPENAI_API_KEY` is consulted.
        api_key: Option<String>,
    },
}

impl ProviderConfig {
    pub fn local(model: impl Into<String>) -> Self {
        Self::Local {
            model: model.into(),
            model_path: None,
        }
    }

    pub fn remote(model: impl Into<String>) -> Self {
        Self::Remote {
            model: model.into(),
            endpoint: defaults::DEFAULT_REMOTE_ENDPOINT.to_string(),
            api_key: None,
        }
    }

    /// Model identifier of the active branch.
    pub fn model(&self) -> &str {
        match self {
            Self::Local { model, .. } | Self::Remote { model, .. } => model,
        }
    }

    /// Check the invariant that the active branch names a model.
    pub fn validate(&self) -> Result<()> {
        if self.model().trim().is_empty() {
            let key = match self {
                Self::Local { .. } => "transcription.local_model",
                Self::Remote { .. } => "transcription.remote_model",
            };
            return Err(MictokError::InvalidConfig {
                key: key.to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Trait for speech-to-text backends.
///
/// Implemented by the local Whisper backend and the remote API backend, and
/// by mocks in tests. Input is 16kHz mono f32 samples in [-1.0, 1.0].
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Transcribe audio samples to text.
    ///
    /// Zero-duration audio produces an empty transcript, not an error.
    async fn transcribe(&self, samples: &[f32]) -> Result<TranscriptionResult>;

    /// Model identifier this backend runs.
    fn model_name(&self) -> &str;
}

/// Implement SpeechBackend for Arc<T> to allow sharing across pipeline runs.
#[async_trait]
impl<T: SpeechBackend> SpeechBackend for Arc<T> {
    async fn transcribe(&self, samples: &[f32]) -> Result<TranscriptionResult> {
        (**self).transcribe(samples).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Mock backend for testing.
#[derive(Debug, Clone)]
pub struct MockBackend {
    model_name: String,
    response: String,
    language: Option<String>,
    should_fail: bool,
}

impl MockBackend {
    /// Create a new mock backend with default settings.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            response: "mock transcription".to_string(),
            language: None,
            should_fail: false,
        }
    }

    /// Configure the mock to return a specific transcript.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to report a detected language.
    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    /// Configure the mock to fail on transcribe.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

#[async_trait]
impl SpeechBackend for MockBackend {
    async fn transcribe(&self, samples: &[f32]) -> Result<TranscriptionResult> {
        if self.should_fail {
            return Err(MictokError::BackendUnavailable {
                backend: "mock".to_string(),
                message: "mock transcription failure".to_string(),
            });
        }
        if samples.is_empty() {
            return Ok(TranscriptionResult::default());
        }
        Ok(TranscriptionResult {
            text: self.response.clone(),
            language: self.language.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_returns_response() {
        let backend = MockBackend::new("test-model").with_response("Hello, this is a test");

        let audio = vec![0.1f32; 1000];
        let result = backend.transcribe(&audio).await.unwrap();

        assert_eq!(result.text, "Hello, this is a test");
        assert_eq!(result.language, None);
    }

    #[tokio::test]
    async fn test_mock_backend_reports_language() {
        let backend = MockBackend::new("test-model")
            .with_response("hallo welt")
            .with_language("de");

        let result = backend.transcribe(&[0.1f32; 10]).await.unwrap();
        assert_eq!(result.language.as_deref(), Some("de"));
    }

    #[tokio::test]
    async fn test_mock_backend_empty_audio_is_empty_transcript() {
        let backend = MockBackend::new("test-model").with_response("should not appear");

        let result = backend.transcribe(&[]).await.unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.language, None);
    }

    #[tokio::test]
    async fn test_mock_backend_failure() {
        let backend = MockBackend::new("test-model").with_failure();

        let result = backend.transcribe(&[0.1f32; 10]).await;
        match result {
            Err(MictokError::BackendUnavailable { backend, message }) => {
                assert_eq!(backend, "mock");
                assert_eq!(message, "mock transcription failure");
            }
            _ => panic!("Expected BackendUnavailable error"),
        }
    }

    #[tokio::test]
    async fn test_backend_trait_is_object_safe() {
        let backend: Box<dyn SpeechBackend> =
            Box::new(MockBackend::new("test-model").with_response("boxed test"));

        assert_eq!(backend.model_name(), "test-model");
        let result = backend.transcribe(&[0.1f32; 10]).await.unwrap();
        assert_eq!(result.text, "boxed test");
    }

    #[tokio::test]
    async fn test_arc_backend_shares() {
        let backend = Arc::new(MockBackend::new("shared").with_response("shared output"));
        let clone = Arc::clone(&backend);

        let result = clone.transcribe(&[0.1f32; 10]).await.unwrap();
        assert_eq!(result.text, "shared output");
        assert_eq!(backend.model_name(), "shared");
    }

    #[test]
    fn test_provider_config_model_accessor() {
        assert_eq!(ProviderConfig::local("base").model(), "base");
        assert_eq!(ProviderConfig::remote("whisper-1").model(), "whisper-1");
    }

    #[test]
    fn test_provider_config_validate_rejects_empty_model() {
        let result = ProviderConfig::local("").validate();
        match result {
            Err(MictokError::InvalidConfig { key, .. }) => {
                assert_eq!(key, "transcription.local_model");
            }
            _ => panic!("Expected InvalidConfig error"),
        }

        let result = ProviderConfig::remote("   ").validate();
        match result {
            Err(MictokError::InvalidConfig { key, .. }) => {
                assert_eq!(key, "transcription.remote_model");
            }
            _ => panic!("Expected InvalidConfig error"),
        }
    }

    #[test]
    fn test_provider_config_validate_accepts_named_models() {
        assert!(ProviderConfig::local("base.en").validate().is_ok());
        assert!(ProviderConfig::remote("whisper-1").validate().is_ok());
    }

    #[test]
    fn test_remote_defaults() {
        match ProviderConfig::remote("whisper-1") {
            ProviderConfig::Remote {
                endpoint, api_key, ..
            } => {
                assert_eq!(endpoint, defaults::DEFAULT_REMOTE_ENDPOINT);
                assert!(api_key.is_none());
            }
            _ => panic!("Expected Remote variant"),
        }
    }
}
