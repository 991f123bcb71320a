//! Pipeline orchestrator: audio bytes in, structured result out.
//!
//! One run walks a linear sequence: decode the clip, transcribe it with the
//! selected backend, resolve a tokenizer and encode the transcript, then
//! optionally summarize. Transcription and tokenization failures abort the
//! run; summarization failure only drops the summary/answer fields.

use crate::audio::{self, AudioClip};
use crate::encoding::{self, TokenizerConfig};
use crate::error::{MictokError, Result};
use crate::stt::whisper::{WhisperBackend, WhisperConfig};
use crate::stt::{ProviderConfig, RemoteBackend, RemoteConfig, SpeechBackend};
use crate::summarize::{OllamaSummarizer, Summarizer, SummarizerConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything one pipeline run needs.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// The recorded clip.
    pub audio: AudioClip,
    /// Which transcription backend to use.
    pub provider: ProviderConfig,
    /// Which tokenizer to encode the transcript with.
    pub tokenizer: TokenizerConfig,
    /// Whether to run the summarization step.
    pub summarize: bool,
    /// Summarizer backend settings (ignored unless `summarize` is set).
    pub summarizer: SummarizerConfig,
    /// Deadline for the remote transcription call.
    pub remote_timeout: Duration,
}

impl PipelineRequest {
    pub fn new(audio: AudioClip, provider: ProviderConfig, tokenizer: TokenizerConfig) -> Self {
        Self {
            audio,
            provider,
            tokenizer,
            summarize: false,
            summarizer: SummarizerConfig::default(),
            remote_timeout: Duration::from_secs(crate::defaults::REMOTE_TIMEOUT_SECS),
        }
    }

    pub fn with_summarization(mut self, summarizer: SummarizerConfig) -> Self {
        self.summarize = true;
        self.summarizer = summarizer;
        self
    }
}

/// The single aggregate output of one pipeline run.
///
/// Field names are the wire contract; optional fields are omitted entirely
/// when absent, never serialized as empty strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineResult {
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub encoding_name: String,
    pub token_count: usize,
    pub tokens: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

/// Pipeline orchestrator.
///
/// One instance serves the whole process: it owns the shared HTTP client and
/// the cache of loaded local models. Individual runs share no other state
/// and may execute concurrently.
pub struct Pipeline {
    client: reqwest::Client,
    // Loaded Whisper contexts by model name. The async mutex is held across
    // a load so concurrent first requests for the same model cannot load it
    // twice.
    local_backends: tokio::sync::Mutex<HashMap<String, Arc<WhisperBackend>>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            local_backends: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Run the full pipeline for one request.
    pub async fn run(&self, request: PipelineRequest) -> Result<PipelineResult> {
        let backend = self.backend_for(&request).await?;
        let summarizer: Arc<dyn Summarizer> = Arc::new(OllamaSummarizer::new(
            request.summarizer.clone(),
            self.client.clone(),
        ));
        self.run_with(request, backend, summarizer).await
    }

    /// Run the pipeline, aborting with `Cancelled` when the token fires.
    ///
    /// In-flight HTTP calls are dropped on cancellation; an in-flight local
    /// inference is abandoned (its thread finishes, the result is discarded).
    pub async fn run_cancellable(
        &self,
        request: PipelineRequest,
        cancel: CancellationToken,
    ) -> Result<PipelineResult> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(MictokError::Cancelled),
            result = self.run(request) => result,
        }
    }

    /// Run the pipeline with explicit backends.
    ///
    /// `run` wires up the production backends; tests and embedders inject
    /// their own here.
    pub async fn run_with(
        &self,
        request: PipelineRequest,
        backend: Arc<dyn SpeechBackend>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<PipelineResult> {
        request.provider.validate()?;

        // Decoding may shell out to ffmpeg; keep it off the async runtime.
        let clip = request.audio;
        let samples = tokio::task::spawn_blocking(move || audio::decode(&clip))
            .await
            .map_err(|e| MictokError::Other(format!("audio decode task failed: {e}")))??;

        let transcription = backend.transcribe(&samples).await?;
        tracing::debug!(
            model = backend.model_name(),
            chars = transcription.text.len(),
            language = transcription.language.as_deref().unwrap_or("-"),
            "transcription complete"
        );

        let handle = encoding::resolve(&request.tokenizer)?;
        let tokens = handle.encode(&transcription.text);

        let (summary, answer) = if request.summarize {
            match summarizer.summarize(&transcription.text).await {
                Ok(result) => (Some(result.summary), result.answer),
                Err(e) => {
                    // Soft failure: the transcript and tokens are already in
                    // hand, return them without the enrichment.
                    tracing::warn!(error = %e, "summarization failed, omitting summary and answer");
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        Ok(PipelineResult {
            transcript: transcription.text,
            language: transcription.language,
            encoding_name: handle.encoding_name().to_string(),
            token_count: tokens.len(),
            tokens,
            summary,
            answer,
        })
    }

    /// Build or fetch the transcription backend for a request.
    async fn backend_for(&self, request: &PipelineRequest) -> Result<Arc<dyn SpeechBackend>> {
        request.provider.validate()?;
        match &request.provider {
            ProviderConfig::Local { model, model_path } => {
                let mut cache = self.local_backends.lock().await;
                if let Some(backend) = cache.get(model) {
                    return Ok(Arc::clone(backend) as Arc<dyn SpeechBackend>);
                }

                let config = WhisperConfig {
                    model: model.clone(),
                    model_path: model_path.clone(),
                    threads: None,
                };
                // Loading reads a multi-hundred-MB file; off the runtime.
                let backend = tokio::task::spawn_blocking(move || WhisperBackend::new(config))
                    .await
                    .map_err(|e| MictokError::Other(format!("model load task failed: {e}")))??;
                let backend = Arc::new(backend);
                cache.insert(model.clone(), Arc::clone(&backend));
                tracing::info!(model, "loaded local transcription model");
                Ok(backend as Arc<dyn SpeechBackend>)
            }
            ProviderConfig::Remote {
                model,
                endpoint,
                api_key,
            } => {
                let config = RemoteConfig {
                    model: model.clone(),
                    endpoint: endpoint.clone(),
                    api_key: api_key.clone(),
                    timeout: request.remote_timeout,
                };
                Ok(Arc::new(RemoteBackend::new(config, self.client.clone())))
            }
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
