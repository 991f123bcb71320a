//! Tokenizer/encoding resolution.
//!
//! Maps a requested tokenizer model name or encoding name to a concrete BPE
//! encoder. Resolution is strict: an unknown name fails the run, it never
//! silently falls back to a default encoding.

use crate::error::{MictokError, Result};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};
use tiktoken_rs::CoreBPE;
use tiktoken_rs::tokenizer::{Tokenizer, get_tokenizer};

/// Encoding names this resolver recognizes.
pub const ENCODING_NAMES: &[&str] = &[
    "o200k_base",
    "cl100k_base",
    "p50k_base",
    "p50k_edit",
    "r50k_base",
];

/// Tokenizer selection for a pipeline run.
///
/// At least one of the fields must resolve; empty or whitespace-only values
/// are treated as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenizerConfig {
    /// Model name for model-aligned tokenizers (e.g. "gpt-4o-mini").
    pub model: Option<String>,
    /// Explicit encoding table name (e.g. "cl100k_base").
    pub encoding: Option<String>,
}

impl TokenizerConfig {
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            encoding: None,
        }
    }

    pub fn for_encoding(encoding: impl Into<String>) -> Self {
        Self {
            model: None,
            encoding: Some(encoding.into()),
        }
    }
}

/// A resolved tokenizer bound to one encoding table.
///
/// Encoding is deterministic: the same handle and text always produce the
/// same token sequence, and the empty string encodes to an empty sequence.
#[derive(Clone)]
pub struct TokenizerHandle {
    encoding_name: &'static str,
    bpe: Arc<CoreBPE>,
}

impl TokenizerHandle {
    /// Name of the encoding table this handle is bound to.
    pub fn encoding_name(&self) -> &'static str {
        self.encoding_name
    }

    /// Encode text to an ordered sequence of token ids.
    ///
    /// Special-token text is encoded rather than rejected, matching how
    /// transcripts are counted against model context windows.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe
            .encode_with_special_tokens(text)
            .into_iter()
            .map(|id| id as u32)
            .collect()
    }
}

impl std::fmt::Debug for TokenizerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenizerHandle")
            .field("encoding_name", &self.encoding_name)
            .field("bpe", &"<CoreBPE>")
            .finish()
    }
}

/// Resolve a tokenizer configuration to a concrete handle.
///
/// Order: a recognized tokenizer model wins; otherwise a recognized encoding
/// name; otherwise the config is unresolvable. Unknown names produce
/// `UnknownEncoding`, a fully absent config produces `UnresolvedEncoding`.
pub fn resolve(config: &TokenizerConfig) -> Result<TokenizerHandle> {
    let model = config
        .model
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let encoding = config
        .encoding
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    match (model, encoding) {
        (Some(m), fallback) => {
            if let Some(tokenizer) = get_tokenizer(m) {
                by_name(encoding_name_for(tokenizer))
            } else if let Some(e) = fallback {
                by_name(canonical_name(e)?)
            } else {
                Err(MictokError::UnknownEncoding {
                    name: m.to_string(),
                })
            }
        }
        (None, Some(e)) => by_name(canonical_name(e)?),
        (None, None) => Err(MictokError::UnresolvedEncoding),
    }
}

fn canonical_name(requested: &str) -> Result<&'static str> {
    ENCODING_NAMES
        .iter()
        .find(|&&name| name == requested)
        .copied()
        .ok_or_else(|| MictokError::UnknownEncoding {
            name: requested.to_string(),
        })
}

fn encoding_name_for(tokenizer: Tokenizer) -> &'static str {
    match tokenizer {
        Tokenizer::O200kBase => "o200k_base",
        Tokenizer::Cl100kBase => "cl100k_base",
        Tokenizer::P50kBase => "p50k_base",
        Tokenizer::P50kEdit => "p50k_edit",
        Tokenizer::R50kBase | Tokenizer::Gpt2 => "r50k_base",
    }
}

// BPE tables are expensive to build (tens of milliseconds and a few MB
// each), so each is built at most once per process and shared.
static BPE_CACHE: LazyLock<Mutex<HashMap<&'static str, Arc<CoreBPE>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn by_name(name: &'static str) -> Result<TokenizerHandle> {
    let mut cache = BPE_CACHE
        .lock()
        .map_err(|e| MictokError::Other(format!("tokenizer cache poisoned: {e}")))?;

    if let Some(bpe) = cache.get(name) {
        return Ok(TokenizerHandle {
            encoding_name: name,
            bpe: Arc::clone(bpe),
        });
    }

    let built = match name {
        "o200k_base" => tiktoken_rs::o200k_base(),
        "cl100k_base" => tiktoken_rs::cl100k_base(),
        "p50k_base" => tiktoken_rs::p50k_base(),
        "p50k_edit" => tiktoken_rs::p50k_edit(),
        "r50k_base" => tiktoken_rs::r50k_base(),
        other => {
            return Err(MictokError::UnknownEncoding {
                name: other.to_string(),
            });
        }
    }
    .map_err(|e| MictokError::Other(format!("Failed to build {name} encoder: {e}")))?;

    let bpe = Arc::new(built);
    cache.insert(name, Arc::clone(&bpe));
    Ok(TokenizerHandle {
        encoding_name: name,
        bpe,
    })
}
