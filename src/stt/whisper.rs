//! Local Whisper speech-to-text backend.
//!
//! Runs a Whisper model in-process via whisper-rs. The loaded context is an
//! expensive, read-only resource: the pipeline loads it once per model per
//! process and shares it across concurrent runs.
//!
//! # Feature Gate
//!
//! Requires the `whisper` feature (enabled by default) and cmake to build.
//! Without it, a stub is compiled that reports the backend as unavailable.

use crate::defaults;
use crate::error::{MictokError, Result};
use crate::stt::transcriber::{SpeechBackend, TranscriptionResult};
use async_trait::async_trait;
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use std::sync::{Arc, Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Whisper rejects inputs shorter than a model frame; treat them as silence.
#[cfg(feature = "whisper")]
const MIN_SAMPLES: usize = 1600; // 100ms at 16kHz

/// Configuration for the local Whisper backend.
#[derive(Debug, Clone, PartialEq)]
pub struct WhisperConfig {
    /// Model name, e.g. "base" or "small.en".
    pub model: String,
    /// Explicit model file path; overrides the name-based lookup.
    pub model_path: Option<PathBuf>,
    /// Number of inference threads (None = whisper.cpp default).
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_LOCAL_MODEL.to_string(),
            model_path: None,
            threads: None,
        }
    }
}

/// Locate the model file for a model name.
///
/// Checks the explicit path first, then `~/.cache/mictok/models/`, then a
/// local `models/` directory.
pub fn resolve_model_path(model: &str, explicit: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(MictokError::BackendUnavailable {
            backend: "whisper-local".to_string(),
            message: format!("model file not found at {}", path.display()),
        });
    }

    let filename = format!("ggml-{model}.bin");
    let cached = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("mictok")
        .join("models")
        .join(&filename);
    if cached.exists() {
        return Ok(cached);
    }

    let local = PathBuf::from("models").join(&filename);
    if local.exists() {
        return Ok(local);
    }

    Err(MictokError::BackendUnavailable {
        backend: "whisper-local".to_string(),
        message: format!(
            "model '{model}' not installed; looked at {} and {}",
            cached.display(),
            local.display()
        ),
    })
}

/// English-only model variants cannot detect a source language.
fn is_multilingual(model: &str) -> bool {
    !model.ends_with(defaults::ENGLISH_ONLY_SUFFIX)
}

/// Local Whisper backend.
///
/// The WhisperContext is wrapped in a Mutex; inference creates a fresh state
/// per call, so concurrent runs serialize on the context but never mutate
/// shared model weights.
#[cfg(feature = "whisper")]
pub struct WhisperBackend {
    inner: Arc<WhisperInner>,
    model_name: String,
}

#[cfg(feature = "whisper")]
struct WhisperInner {
    context: Mutex<WhisperContext>,
    threads: Option<usize>,
    multilingual: bool,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperBackend")
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Local Whisper backend placeholder (without the whisper feature).
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperBackend {
    model_name: String,
}

#[cfg(feature = "whisper")]
impl WhisperBackend {
    /// Load a Whisper model.
    ///
    /// # Errors
    /// Returns `MictokError::BackendUnavailable` when the model file is
    /// missing or fails to load.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Install logging hooks to suppress whisper.cpp output (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        let model_path = resolve_model_path(&config.model, config.model_path.as_ref())?;

        let context_params = WhisperContextParameters::default();
        let context = WhisperContext::new_with_params(
            model_path
                .to_str()
                .ok_or_else(|| MictokError::BackendUnavailable {
                    backend: "whisper-local".to_string(),
                    message: "invalid UTF-8 in model path".to_string(),
                })?,
            context_params,
        )
        .map_err(|e| MictokError::BackendUnavailable {
            backend: "whisper-local".to_string(),
            message: format!("failed to load Whisper model: {e}"),
        })?;

        Ok(Self {
            inner: Arc::new(WhisperInner {
                context: Mutex::new(context),
                threads: config.threads,
                multilingual: is_multilingual(&config.model),
            }),
            model_name: config.model,
        })
    }
}

#[cfg(feature = "whisper")]
impl WhisperInner {
    fn transcribe_blocking(&self, samples: &[f32]) -> Result<TranscriptionResult> {
        let context = self
            .context
            .lock()
            .map_err(|e| MictokError::Transcription {
                message: format!("failed to acquire context lock: {e}"),
            })?;

        let mut state = context
            .create_state()
            .map_err(|e| MictokError::Transcription {
                message: format!("failed to create Whisper state: {e}"),
            })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        if self.multilingual {
            params.set_language(None); // auto-detect
        } else {
            params.set_language(Some("en"));
        }
        if let Some(threads) = self.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, samples)
            .map_err(|e| MictokError::Transcription {
                message: format!("Whisper inference failed: {e}"),
            })?;

        let language = if self.multilingual {
            let lang_id = state.full_lang_id_from_state();
            whisper_rs::get_lang_str(lang_id)
                .map(str::to_string)
                .filter(|l| !l.is_empty())
        } else {
            None
        };

        let mut transcript = String::new();
        for segment in state.as_iter() {
            transcript.push_str(&segment.to_string());
        }

        Ok(TranscriptionResult {
            text: transcript.trim().to_string(),
            language,
        })
    }
}

#[cfg(feature = "whisper")]
#[async_trait]
impl SpeechBackend for WhisperBackend {
    async fn transcribe(&self, samples: &[f32]) -> Result<TranscriptionResult> {
        if samples.len() < MIN_SAMPLES {
            return Ok(TranscriptionResult::default());
        }

        // Inference is CPU-bound; keep it off the async runtime.
        let inner = Arc::clone(&self.inner);
        let samples = samples.to_vec();
        tokio::task::spawn_blocking(move || inner.transcribe_blocking(&samples))
            .await
            .map_err(|e| MictokError::Transcription {
                message: format!("inference task failed: {e}"),
            })?
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperBackend {
    /// Create a stub backend (whisper feature disabled).
    ///
    /// Succeeds when the model file exists so that configuration problems
    /// still surface early; transcription itself always fails.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        resolve_model_path(&config.model, config.model_path.as_ref())?;
        Ok(Self {
            model_name: config.model,
        })
    }
}

#[cfg(not(feature = "whisper"))]
#[async_trait]
impl SpeechBackend for WhisperBackend {
    async fn transcribe(&self, _samples: &[f32]) -> Result<TranscriptionResult> {
        Err(MictokError::BackendUnavailable {
            backend: "whisper-local".to_string(),
            message: concat!(
                "whisper feature not enabled; this binary was built without local ",
                "speech recognition. Rebuild with: cargo build --release"
            )
            .to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
