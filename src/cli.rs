//! Command-line interface for mictok
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Transcribe audio and encode the transcript into tokens
#[derive(Parser, Debug)]
#[command(
    name = "mictok",
    version,
    about = "Transcribe audio and encode the transcript into tokens"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Audio file to process (reads stdin when omitted and piped)
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress log output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Transcription provider
    #[arg(long, value_enum, value_name = "PROVIDER")]
    pub provider: Option<ProviderArg>,

    /// Whisper model for local transcription (default: base). Use base.en for English-only
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Explicit path to a local model file (overrides model lookup)
    #[arg(long, value_name = "PATH")]
    pub model_path: Option<PathBuf>,

    /// Pick the tokenizer by model name (e.g., gpt-4o). Wins over --encoding
    #[arg(long, value_name = "MODEL")]
    pub tokenizer_model: Option<String>,

    /// Pick the tokenizer by encoding name (e.g., cl100k_base, o200k_base)
    #[arg(long, value_name = "ENCODING")]
    pub encoding: Option<String>,

    /// Summarize the transcript via the local LLM
    #[arg(long, short = 's')]
    pub summarize: bool,

    /// Summarizer generate endpoint URL
    #[arg(long, value_name = "URL")]
    pub summarizer_url: Option<String>,

    /// Summarizer model name
    #[arg(long, value_name = "MODEL")]
    pub summarizer_model: Option<String>,

    /// Remote call deadline (default from config). Examples: 30s, 2m, 90
    #[arg(long, value_name = "DURATION", value_parser = parse_timeout_secs)]
    pub timeout: Option<u64>,

    /// Pretty-print the JSON result
    #[arg(long)]
    pub pretty: bool,
}

/// Transcription provider argument
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum ProviderArg {
    Local,
    Remote,
}

/// Parse a timeout string into seconds.
///
/// Supports any duration format accepted by `humantime`: bare numbers
/// (seconds), single-unit (`30s`, `5m`), and compound (`1m30s`).
fn parse_timeout_secs(s: &str) -> Result<u64, String> {
    let s = s.trim();
    // Bare number → seconds
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(secs);
    }
    humantime::parse_duration(s)
        .map(|d| d.as_secs())
        .map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List supported tokenizer encodings
    Encodings,
}
