//! Speech-to-text backends.
//!
//! One trait, two production implementations: an in-process Whisper model
//! and a remote hosted API. Which one runs is decided per pipeline run by
//! [`ProviderConfig`].

pub mod remote;
pub mod transcriber;
pub mod whisper;

pub use remote::{RemoteBackend, RemoteConfig};
pub use transcriber::{MockBackend, ProviderConfig, SpeechBackend, TranscriptionResult};
pub use whisper::{WhisperBackend, WhisperConfig};
