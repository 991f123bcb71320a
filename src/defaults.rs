//! Default configuration constants for mictok.
//!
//! Shared constants used across configuration types to ensure consistency
//! and eliminate duplication.

/// Audio sample rate in Hz expected by the speech models.
///
/// 16kHz is the standard for speech recognition and is what Whisper expects;
/// all decoded audio is resampled to this rate.
pub const SAMPLE_RATE: u32 = 16000;

/// Default local Whisper model name.
///
/// "base" (multilingual) supports auto-detection of the spoken language.
/// Use "base.en" for English-only optimized transcription.
pub const DEFAULT_LOCAL_MODEL: &str = "base";

/// Default remote transcription model identifier.
pub const DEFAULT_REMOTE_MODEL: &str = "whisper-1";

/// Default remote transcription endpoint.
pub const DEFAULT_REMOTE_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Environment variable holding the remote API key.
pub const REMOTE_API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Default encoding name used by the config file when nothing is configured.
///
/// The resolver itself never falls back to this: an unresolvable tokenizer
/// configuration fails the run. This constant only seeds the config file
/// default so the CLI works out of the box.
pub const DEFAULT_ENCODING: &str = "cl100k_base";

/// Default summarizer endpoint (a locally running Ollama server).
pub const DEFAULT_SUMMARIZER_URL: &str = "http://localhost:11434/api/generate";

/// Default summarizer model name.
pub const DEFAULT_SUMMARIZER_MODEL: &str = "llama3";

/// Default timeout for the remote transcription call, in seconds.
pub const REMOTE_TIMEOUT_SECS: u64 = 60;

/// Default timeout for the summarizer call, in seconds.
///
/// Local LLM generation is slow on CPU-only hosts; 120s matches what a
/// three-bullet summary of a few minutes of speech needs on modest hardware.
pub const SUMMARIZER_TIMEOUT_SECS: u64 = 120;

/// Suffix for English-only Whisper model variants.
///
/// English-only models cannot detect a source language, so results from
/// them carry no language field.
pub const ENGLISH_ONLY_SUFFIX: &str = ".en";
