//! Error types for mictok.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MictokError {
    // Configuration errors
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio decoding errors
    #[error("Unsupported audio format: {message}")]
    UnsupportedAudioFormat { message: String },

    // Transcription errors
    #[error("Transcription backend {backend} unavailable: {message}")]
    BackendUnavailable { backend: String, message: String },

    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    // Tokenizer resolution errors
    #[error("No tokenizer model or encoding name supplied")]
    UnresolvedEncoding,

    #[error("Unknown tokenizer or encoding: {name}")]
    UnknownEncoding { name: String },

    // Summarization errors (never fatal to a pipeline run)
    #[error("Summarizer unavailable: {message}")]
    SummarizerUnavailable { message: String },

    #[error("Summarizer timed out after {seconds}s")]
    SummarizerTimeout { seconds: u64 },

    // Pipeline control
    #[error("Pipeline run cancelled by caller")]
    Cancelled,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, MictokError>;

impl MictokError {
    /// True for failures that abort a pipeline run with no partial result.
    ///
    /// Summarization failures are soft: the run still succeeds, just without
    /// the summary and answer fields.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MictokError::SummarizerUnavailable { .. } | MictokError::SummarizerTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_invalid_config_display() {
        let error = MictokError::InvalidConfig {
            key: "provider.model".to_string(),
            message: "must not be empty".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for provider.model: must not be empty"
        );
    }

    #[test]
    fn test_unsupported_audio_format_display() {
        let error = MictokError::UnsupportedAudioFormat {
            message: "not a WAV file".to_string(),
        };
        assert_eq!(error.to_string(), "Unsupported audio format: not a WAV file");
    }

    #[test]
    fn test_backend_unavailable_display() {
        let error = MictokError::BackendUnavailable {
            backend: "whisper-local".to_string(),
            message: "model file missing".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Transcription backend whisper-local unavailable: model file missing"
        );
    }

    #[test]
    fn test_transcription_display() {
        let error = MictokError::Transcription {
            message: "inference failed".to_string(),
        };
        assert_eq!(error.to_string(), "Transcription failed: inference failed");
    }

    #[test]
    fn test_unresolved_encoding_display() {
        assert_eq!(
            MictokError::UnresolvedEncoding.to_string(),
            "No tokenizer model or encoding name supplied"
        );
    }

    #[test]
    fn test_unknown_encoding_display() {
        let error = MictokError::UnknownEncoding {
            name: "qx9000_base".to_string(),
        };
        assert_eq!(error.to_string(), "Unknown tokenizer or encoding: qx9000_base");
    }

    #[test]
    fn test_summarizer_unavailable_display() {
        let error = MictokError::SummarizerUnavailable {
            message: "connection refused".to_string(),
        };
        assert_eq!(error.to_string(), "Summarizer unavailable: connection refused");
    }

    #[test]
    fn test_summarizer_timeout_display() {
        let error = MictokError::SummarizerTimeout { seconds: 120 };
        assert_eq!(error.to_string(), "Summarizer timed out after 120s");
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(
            MictokError::Cancelled.to_string(),
            "Pipeline run cancelled by caller"
        );
    }

    #[test]
    fn test_other_display() {
        let error = MictokError::Other("unexpected error".to_string());
        assert_eq!(error.to_string(), "unexpected error");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: MictokError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_str = "invalid = toml = syntax";
        let toml_error = toml::from_str::<toml::Value>(toml_str).unwrap_err();
        let error: MictokError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_summarizer_failures_are_soft() {
        assert!(
            !MictokError::SummarizerUnavailable {
                message: "down".to_string()
            }
            .is_fatal()
        );
        assert!(!MictokError::SummarizerTimeout { seconds: 5 }.is_fatal());
    }

    #[test]
    fn test_transcription_and_tokenizer_failures_are_fatal() {
        assert!(
            MictokError::BackendUnavailable {
                backend: "remote".to_string(),
                message: "unreachable".to_string()
            }
            .is_fatal()
        );
        assert!(MictokError::UnresolvedEncoding.is_fatal());
        assert!(
            MictokError::UnknownEncoding {
                name: "x".to_string()
            }
            .is_fatal()
        );
        assert!(
            MictokError::UnsupportedAudioFormat {
                message: "bad".to_string()
            }
            .is_fatal()
        );
        assert!(MictokError::Cancelled.is_fatal());
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: MictokError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<MictokError>();
        assert_sync::<MictokError>();
    }

    #[test]
    fn test_error_debug_format() {
        let error = MictokError::UnknownEncoding {
            name: "nope".to_string(),
        };
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("UnknownEncoding"));
        assert!(debug_str.contains("nope"));
    }
}
