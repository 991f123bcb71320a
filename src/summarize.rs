//! Transcript summarization via a locally hosted LLM.
//!
//! Talks to an Ollama-style generate endpoint. The model is prompted for
//! exactly three summary bullets plus an `Answer:` line; whether the
//! transcript poses a question is entirely the model's judgment, the
//! pipeline adds no heuristic of its own.
//!
//! Failures here are never fatal to a pipeline run: the orchestrator logs
//! them and assembles the result without summary/answer fields.

use crate::defaults;
use crate::error::{MictokError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the summarizer backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizerConfig {
    /// Generate endpoint URL of the local LLM server.
    pub url: String,
    /// Model name to generate with.
    pub model: String,
    /// Hard deadline for the generate call.
    pub timeout: Duration,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            url: defaults::DEFAULT_SUMMARIZER_URL.to_string(),
            model: defaults::DEFAULT_SUMMARIZER_MODEL.to_string(),
            timeout: Duration::from_secs(defaults::SUMMARIZER_TIMEOUT_SECS),
        }
    }
}

/// Output of one summarization call.
#[derive(Debug, Clone, PartialEq)]
pub struct SummarizationResult {
    /// Normalized three-bullet summary.
    pub summary: String,
    /// Answer to a question posed in the transcript, when the model found one.
    pub answer: Option<String>,
    /// Model that produced the output.
    pub model: String,
}

/// Trait for summarization backends.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize a transcript and answer any question it contains.
    async fn summarize(&self, transcript: &str) -> Result<SummarizationResult>;
}

/// Summarizer backed by an Ollama generate endpoint.
#[derive(Debug, Clone)]
pub struct OllamaSummarizer {
    config: SummarizerConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaSummarizer {
    /// Create a summarizer sharing the given HTTP client.
    pub fn new(config: SummarizerConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<SummarizationResult> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt: build_prompt(transcript),
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        let response = self
            .client
            .post(&self.config.url)
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MictokError::SummarizerTimeout {
                        seconds: self.config.timeout.as_secs(),
                    }
                } else {
                    MictokError::SummarizerUnavailable {
                        message: format!("request to {} failed: {e}", self.config.url),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MictokError::SummarizerUnavailable {
                message: format!("summarizer error ({status}): {}", body.trim()),
            });
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| MictokError::SummarizerUnavailable {
                    message: format!("failed to parse summarizer response: {e}"),
                })?;

        let text = parsed.response.trim();
        if text.is_empty() {
            return Err(MictokError::SummarizerUnavailable {
                message: "summarizer returned an empty response".to_string(),
            });
        }

        let (summary, answer) = split_summary_answer(text);
        Ok(SummarizationResult {
            summary,
            answer,
            model: self.config.model.clone(),
        })
    }
}

/// Build the generation prompt for a transcript.
///
/// The format is rigid on purpose: three bullets, then an `Answer:` line,
/// so the response can be split mechanically.
fn build_prompt(transcript: &str) -> String {
    let cleaned = transcript.trim();
    format!(
        concat!(
            "You are an assistant that summarizes transcripts and answers any questions found within them.\n",
            "If the transcript is empty or only noise, output:\n",
            "Summary:\n- N/A\n- N/A\n- N/A\nAnswer: N/A\n",
            "Otherwise follow these rules exactly:\n",
            "1. Provide exactly three concise bullet points summarizing the transcript.\n",
            "2. After the bullets, write 'Answer:' followed by a short answer to any question in the transcript. ",
            "If there is no question, write 'Answer: N/A'.\n",
            "3. Do not ask for additional context. Never refuse. Never repeat the instructions.\n",
            "Transcript:\n{}\n\n",
            "Summary:\n- "
        ),
        cleaned
    )
}

/// Split a model response into the normalized summary and an optional answer.
///
/// "N/A" answers mean the model found no question and map to `None`, so the
/// result never carries a sentinel string.
fn split_summary_answer(response_text: &str) -> (String, Option<String>) {
    let lower = response_text.to_lowercase();
    let Some(answer_idx) = lower.find("answer:") else {
        return (normalize_summary(response_text), None);
    };

    let summary_raw = response_text[..answer_idx].trim();
    let answer_raw = response_text[answer_idx + "answer:".len()..].trim();

    let answer = if answer_raw.is_empty() || answer_raw.eq_ignore_ascii_case("n/a") {
        None
    } else {
        Some(answer_raw.to_string())
    };

    (normalize_summary(summary_raw), answer)
}

/// Ensure summary text has heading and bullet formatting.
fn normalize_summary(summary_raw: &str) -> String {
    let summary = summary_raw.trim();
    if summary.is_empty() {
        return "Summary:\n- N/A".to_string();
    }

    let summary = if summary.to_lowercase().starts_with("summary") {
        summary.to_string()
    } else {
        format!("Summary:\n{summary}")
    };

    let mut lines = Vec::new();
    for line in summary.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        if stripped.eq_ignore_ascii_case("summary:") {
            lines.push("Summary:".to_string());
            continue;
        }
        if stripped.starts_with('-') {
            lines.push(stripped.to_string());
        } else {
            lines.push(format!("- {}", stripped.trim_start_matches(['-', ' '])));
        }
    }
    lines.join("\n")
}

/// Mock summarizer for testing.
#[derive(Debug, Clone)]
pub struct MockSummarizer {
    summary: String,
    answer: Option<String>,
    should_fail: bool,
}

impl MockSummarizer {
    pub fn new() -> Self {
        Self {
            summary: "Summary:\n- mock summary".to_string(),
            answer: None,
            should_fail: false,
        }
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = summary.to_string();
        self
    }

    pub fn with_answer(mut self, answer: &str) -> Self {
        self.answer = Some(answer.to_string());
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, _transcript: &str) -> Result<SummarizationResult> {
        if self.should_fail {
            return Err(MictokError::SummarizerUnavailable {
                message: "mock summarizer failure".to_string(),
            });
        }
        Ok(SummarizationResult {
            summary: self.summary.clone(),
            answer: self.answer.clone(),
            model: "mock".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_transcript() {
        let prompt = build_prompt("  hello there  ");
        assert!(prompt.contains("Transcript:\nhello there\n"));
        assert!(prompt.ends_with("Summary:\n- "));
    }

    #[test]
    fn test_split_with_answer() {
        let (summary, answer) = split_summary_answer(
            "Summary:\n- point one\n- point two\n- point three\nAnswer: forty-two",
        );
        assert_eq!(summary, "Summary:\n- point one\n- point two\n- point three");
        assert_eq!(answer.as_deref(), Some("forty-two"));
    }

    #[test]
    fn test_split_answer_na_is_absent() {
        let (_, answer) = split_summary_answer("Summary:\n- a point\nAnswer: N/A");
        assert_eq!(answer, None);

        let (_, answer) = split_summary_answer("Summary:\n- a point\nAnswer: n/a");
        assert_eq!(answer, None);
    }

    #[test]
    fn test_split_no_answer_line() {
        let (summary, answer) = split_summary_answer("- just bullets\n- no answer line");
        assert_eq!(summary, "Summary:\n- just bullets\n- no answer line");
        assert_eq!(answer, None);
    }

    #[test]
    fn test_split_empty_answer_is_absent() {
        let (_, answer) = split_summary_answer("Summary:\n- point\nAnswer:");
        assert_eq!(answer, None);
    }

    #[test]
    fn test_split_answer_case_insensitive() {
        let (_, answer) = split_summary_answer("Summary:\n- point\nANSWER: yes");
        assert_eq!(answer.as_deref(), Some("yes"));
    }

    #[test]
    fn test_normalize_adds_heading_and_bullets() {
        let normalized = normalize_summary("first point\nsecond point");
        assert_eq!(normalized, "Summary:\n- first point\n- second point");
    }

    #[test]
    fn test_normalize_keeps_existing_bullets() {
        let normalized = normalize_summary("Summary:\n- already bulleted");
        assert_eq!(normalized, "Summary:\n- already bulleted");
    }

    #[test]
    fn test_normalize_empty_is_na() {
        assert_eq!(normalize_summary("   "), "Summary:\n- N/A");
    }

    #[test]
    fn test_normalize_drops_blank_lines() {
        let normalized = normalize_summary("Summary:\n\n- one\n\n- two");
        assert_eq!(normalized, "Summary:\n- one\n- two");
    }

    #[test]
    fn test_summarizer_config_default() {
        let config = SummarizerConfig::default();
        assert_eq!(config.url, "http://localhost:11434/api/generate");
        assert_eq!(config.model, "llama3");
        assert_eq!(config.timeout, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_mock_summarizer() {
        let summarizer = MockSummarizer::new()
            .with_summary("Summary:\n- something happened")
            .with_answer("yes");

        let result = summarizer.summarize("anything").await.unwrap();
        assert_eq!(result.summary, "Summary:\n- something happened");
        assert_eq!(result.answer.as_deref(), Some("yes"));
        assert_eq!(result.model, "mock");
    }

    #[tokio::test]
    async fn test_mock_summarizer_failure() {
        let summarizer = MockSummarizer::new().with_failure();
        let result = summarizer.summarize("anything").await;
        assert!(matches!(
            result,
            Err(MictokError::SummarizerUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_stalled_endpoint_is_timeout() {
        // Accept the connection but never write a response, so the request
        // runs into the configured deadline rather than a refusal.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                if let Ok((stream, _)) = listener.accept().await {
                    held.push(stream);
                }
            }
        });

        let config = SummarizerConfig {
            url: format!("http://{addr}/api/generate"),
            model: "llama3".to_string(),
            timeout: Duration::from_secs(1),
        };
        let summarizer = OllamaSummarizer::new(config, reqwest::Client::new());

        let result = summarizer.summarize("hello world").await;
        match result {
            Err(MictokError::SummarizerTimeout { seconds }) => assert_eq!(seconds, 1),
            other => panic!("Expected SummarizerTimeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let config = SummarizerConfig {
            url: "http://127.0.0.1:9/api/generate".to_string(),
            model: "llama3".to_string(),
            timeout: Duration::from_secs(2),
        };
        let summarizer = OllamaSummarizer::new(config, reqwest::Client::new());

        let result = summarizer.summarize("hello world").await;
        match result {
            Err(MictokError::SummarizerUnavailable { message }) => {
                assert!(message.contains("127.0.0.1"));
            }
            other => panic!("Expected SummarizerUnavailable, got {:?}", other),
        }
    }
}
