//! Remote hosted transcription backend.
//!
//! Submits the clip as a WAV upload to an OpenAI-compatible transcription
//! endpoint and returns the transcript (plus the reported language when the
//! API provides one).

use crate::audio;
use crate::defaults;
use crate::error::{MictokError, Result};
use crate::stt::transcriber::{SpeechBackend, TranscriptionResult};
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::time::Duration;

/// Configuration for the remote backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteConfig {
    /// Remote model identifier, e.g. "whisper-1".
    pub model: String,
    /// Transcription endpoint URL.
    pub endpoint: String,
    /// Bearer token; falls back to `OPENAI_API_KEY` when absent.
    pub api_key: Option<String>,
    /// Hard deadline for the API call.
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_REMOTE_MODEL.to_string(),
            endpoint: defaults::DEFAULT_REMOTE_ENDPOINT.to_string(),
            api_key: None,
            timeout: Duration::from_secs(defaults::REMOTE_TIMEOUT_SECS),
        }
    }
}

/// Transcription backend talking to a hosted API.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    config: RemoteConfig,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RemoteTranscriptionResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
}

impl RemoteBackend {
    /// Create a backend sharing the given HTTP client.
    pub fn new(config: RemoteConfig, client: reqwest::Client) -> Self {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(defaults::REMOTE_API_KEY_VAR).ok())
            .filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(
                "{} is not set; remote transcription will fail until it is configured",
                defaults::REMOTE_API_KEY_VAR
            );
        }
        Self {
            config,
            api_key,
            client,
        }
    }
}

#[async_trait]
impl SpeechBackend for RemoteBackend {
    async fn transcribe(&self, samples: &[f32]) -> Result<TranscriptionResult> {
        if samples.is_empty() {
            return Ok(TranscriptionResult::default());
        }

        let wav = audio::encode_wav(samples)?;
        let file_part = multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| MictokError::Other(format!("invalid upload mime type: {e}")))?;

        let form = multipart::Form::new()
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .part("file", file_part);

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .timeout(self.config.timeout)
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!(
                    "request to {} timed out after {}s",
                    self.config.endpoint,
                    self.config.timeout.as_secs()
                )
            } else {
                format!("request to {} failed: {e}", self.config.endpoint)
            };
            MictokError::BackendUnavailable {
                backend: "remote".to_string(),
                message,
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MictokError::BackendUnavailable {
                backend: "remote".to_string(),
                message: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(MictokError::Transcription {
                message: format!("transcription API error ({status}): {body}"),
            });
        }

        let parsed: RemoteTranscriptionResponse =
            serde_json::from_str(&body).map_err(|e| MictokError::Transcription {
                message: format!("failed to parse transcription response: {e}"),
            })?;

        Ok(TranscriptionResult {
            text: parsed.text.trim().to_string(),
            language: parsed.language.filter(|l| !l.is_empty()),
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
