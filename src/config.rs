use crate::defaults;
use crate::encoding::TokenizerConfig;
use crate::error::{MictokError, Result};
use crate::stt::ProviderConfig;
use crate::summarize::SummarizerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub transcription: TranscriptionConfig,
    pub tokenizer: TokenizerSection,
    pub summarizer: SummarizerSection,
}

/// Transcription backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub provider: Provider,
    pub local_model: String,
    pub model_path: Option<PathBuf>,
    pub remote_model: String,
    pub remote_endpoint: String,
    pub remote_timeout_secs: u64,
}

/// Transcription provider enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Local,
    Remote,
}

/// Tokenizer selection configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TokenizerSection {
    pub model: Option<String>,
    pub encoding: Option<String>,
}

/// Summarizer backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SummarizerSection {
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Local,
            local_model: defaults::DEFAULT_LOCAL_MODEL.to_string(),
            model_path: None,
            remote_model: defaults::DEFAULT_REMOTE_MODEL.to_string(),
            remote_endpoint: defaults::DEFAULT_REMOTE_ENDPOINT.to_string(),
            remote_timeout_secs: defaults::REMOTE_TIMEOUT_SECS,
        }
    }
}

impl Default for TokenizerSection {
    fn default() -> Self {
        Self {
            model: None,
            encoding: Some(defaults::DEFAULT_ENCODING.to_string()),
        }
    }
}

impl Default for SummarizerSection {
    fn default() -> Self {
        Self {
            url: defaults::DEFAULT_SUMMARIZER_URL.to_string(),
            model: defaults::DEFAULT_SUMMARIZER_MODEL.to_string(),
            timeout_secs: defaults::SUMMARIZER_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Panics on invalid TOML so a broken file is never silently ignored.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(MictokError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => panic!("Failed to load config from {}: {}", path.display(), e),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - MICTOK_PROVIDER → transcription.provider ("local" or "remote")
    /// - MICTOK_LOCAL_MODEL → transcription.local_model
    /// - MICTOK_REMOTE_MODEL → transcription.remote_model
    /// - MICTOK_ENCODING → tokenizer.encoding
    /// - MICTOK_SUMMARIZER_URL → summarizer.url
    /// - MICTOK_SUMMARIZER_MODEL → summarizer.model
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(provider) = std::env::var("MICTOK_PROVIDER")
            && !provider.is_empty()
        {
            match provider.as_str() {
                "local" => self.transcription.provider = Provider::Local,
                "remote" => self.transcription.provider = Provider::Remote,
                other => tracing::warn!("ignoring unknown MICTOK_PROVIDER value '{other}'"),
            }
        }

        if let Ok(model) = std::env::var("MICTOK_LOCAL_MODEL")
            && !model.is_empty()
        {
            self.transcription.local_model = model;
        }

        if let Ok(model) = std::env::var("MICTOK_REMOTE_MODEL")
            && !model.is_empty()
        {
            self.transcription.remote_model = model;
        }

        if let Ok(encoding) = std::env::var("MICTOK_ENCODING")
            && !encoding.is_empty()
        {
            self.tokenizer.encoding = Some(encoding);
            self.tokenizer.model = None;
        }

        if let Ok(url) = std::env::var("MICTOK_SUMMARIZER_URL")
            && !url.is_empty()
        {
            self.summarizer.url = url;
        }

        if let Ok(model) = std::env::var("MICTOK_SUMMARIZER_MODEL")
            && !model.is_empty()
        {
            self.summarizer.model = model;
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/mictok/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("mictok").join("config.toml"))
    }

    /// Transcription provider settings for a pipeline run.
    pub fn provider_config(&self) -> ProviderConfig {
        match self.transcription.provider {
            Provider::Local => ProviderConfig::Local {
                model: self.transcription.local_model.clone(),
                model_path: self.transcription.model_path.clone(),
            },
            Provider::Remote => ProviderConfig::Remote {
                model: self.transcription.remote_model.clone(),
                endpoint: self.transcription.remote_endpoint.clone(),
                api_key: None,
            },
        }
    }

    /// Tokenizer selection for a pipeline run.
    pub fn tokenizer_config(&self) -> TokenizerConfig {
        TokenizerConfig {
            model: self.tokenizer.model.clone(),
            encoding: self.tokenizer.encoding.clone(),
        }
    }

    /// Summarizer settings for a pipeline run.
    pub fn summarizer_config(&self) -> SummarizerConfig {
        SummarizerConfig {
            url: self.summarizer.url.clone(),
            model: self.summarizer.model.clone(),
            timeout: Duration::from_secs(self.summarizer.timeout_secs),
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.transcription.remote_timeout_secs)
    }
}
