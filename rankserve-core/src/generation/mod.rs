//! Answer generation stage
//!
//! Two generator families: an HTTP client for OpenAI-compatible and
//! Anthropic backends, and an extractive generator used when no backend is
//! configured. Backend calls retry transient transport failures a bounded
//! number of times with exponential backoff; a context-length rejection is
//! surfaced immediately and never retried.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{GeneratorBackend, GeneratorProfile};
use crate::core::{ContextItem, RankServeError, Result};

/// A generation component: `generate(query, contexts) -> answer text`.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a natural-language answer conditioned on `contexts`.
    async fn generate(&self, query: &str, contexts: &[ContextItem]) -> Result<String>;

    /// Backend/model name for logging and cache diagnostics.
    fn name(&self) -> &str;
}

/// Total attempts for a backend call (1 = no retries).
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between attempts.
const BASE_BACKOFF: Duration = Duration::from_millis(200);

/// Run `op` with bounded retry and exponential backoff.
///
/// Only errors classified retryable ([`RankServeError::is_retryable`]) are
/// retried; everything else, including context-length rejections, returns
/// on the first failure.
pub async fn with_retry<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                log::warn!("backend request failed (attempt {attempt}/{MAX_ATTEMPTS}): {err}");
                tokio::time::sleep(BASE_BACKOFF * 2u32.pow(attempt - 1)).await;
                attempt += 1;
            },
            Err(err) => return Err(err),
        }
    }
}

/// Build the generation prompt for a RAG method.
///
/// `zero-shot` ignores the contexts entirely; `chain-of-thought-rag` asks
/// for stepwise reasoning; everything else gets the basic grounded prompt.
pub fn build_prompt(rag_method: &str, query: &str, contexts: &[ContextItem]) -> String {
    if rag_method == "zero-shot" {
        return format!("Answer the following question concisely.\n\nQuestion: {query}\nAnswer:");
    }

    let mut prompt = String::from(
        "Answer the question using only the numbered passages below. \
         If the passages do not contain the answer, say so.\n\n",
    );
    for (i, context) in contexts.iter().enumerate() {
        let title = context.title.as_deref().unwrap_or("");
        if title.is_empty() {
            prompt.push_str(&format!("[{}] {}\n", i + 1, context.text));
        } else {
            prompt.push_str(&format!("[{}] {}: {}\n", i + 1, title, context.text));
        }
    }
    if rag_method == "chain-of-thought-rag" {
        prompt.push_str("\nThink step by step, then state the final answer.\n");
    }
    prompt.push_str(&format!("\nQuestion: {query}\nAnswer:"));
    prompt
}

/// HTTP generator speaking the OpenAI-compatible chat protocol (OpenAI,
/// vLLM, LiteLLM, Azure) or the Anthropic messages protocol.
pub struct HttpGenerator {
    profile: GeneratorProfile,
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpGenerator {
    /// Build the generator for a profile if its backend is configured.
    ///
    /// Returns `Ok(None)` when the credential/endpoint environment variable
    /// named by the profile is unset, so the registry can fall back to the
    /// extractive generator.
    pub fn from_profile(profile: &GeneratorProfile) -> Result<Option<Self>> {
        let configured = match profile.credential_env {
            Some(var) => std::env::var(var).ok(),
            None => None,
        };
        let Some(credential) = configured else {
            return Ok(None);
        };

        let (endpoint, api_key) = match profile.backend {
            GeneratorBackend::Openai => (
                "https://api.openai.com/v1/chat/completions".to_string(),
                Some(credential),
            ),
            GeneratorBackend::Anthropic => (
                "https://api.anthropic.com/v1/messages".to_string(),
                Some(credential),
            ),
            // For self-hosted backends the env var IS the base URL
            GeneratorBackend::Vllm | GeneratorBackend::Litellm => (
                format!("{}/v1/chat/completions", credential.trim_end_matches('/')),
                std::env::var("LLM_API_KEY").ok(),
            ),
            GeneratorBackend::Azure => (
                format!(
                    "{}/chat/completions?api-version=2024-02-01",
                    credential.trim_end_matches('/')
                ),
                std::env::var("AZURE_OPENAI_API_KEY").ok(),
            ),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Some(Self {
            profile: profile.clone(),
            endpoint,
            api_key,
            client,
        }))
    }

    async fn call_backend(&self, prompt: &str) -> Result<String> {
        let request_body = match self.profile.backend {
            GeneratorBackend::Anthropic => serde_json::json!({
                "model": self.profile.model,
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": prompt}],
            }),
            _ => serde_json::json!({
                "model": self.profile.model,
                "messages": [{"role": "user", "content": prompt}],
                "stream": false,
            }),
        };

        let mut request = self.client.post(&self.endpoint).json(&request_body);
        if let Some(key) = &self.api_key {
            request = match self.profile.backend {
                GeneratorBackend::Anthropic => request
                    .header("x-api-key", key)
                    .header("anthropic-version", "2023-06-01"),
                GeneratorBackend::Azure => request.header("api-key", key),
                _ => request.header("Authorization", format!("Bearer {key}")),
            };
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_backend_failure(status.as_u16(), &body));
        }

        let json: serde_json::Value = serde_json::from_str(&body)?;
        extract_answer(self.profile.backend, &json)
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(&self, query: &str, contexts: &[ContextItem]) -> Result<String> {
        let prompt = build_prompt(&self.profile.rag_method, query, contexts);
        with_retry(|| self.call_backend(&prompt)).await
    }

    fn name(&self) -> &str {
        &self.profile.model
    }
}

/// Classify a non-2xx backend response.
///
/// Context-window overflows become the dedicated non-retryable kind; rate
/// limits and server errors stay retryable; anything else is a terminal
/// generation failure.
pub fn classify_backend_failure(status: u16, body: &str) -> RankServeError {
    let lower = body.to_lowercase();
    if lower.contains("context_length_exceeded") || lower.contains("maximum context length") {
        return RankServeError::ContextLength {
            message: truncate_for_log(body),
        };
    }
    if status == 408 || status == 429 || status >= 500 {
        return RankServeError::Backend {
            message: format!("HTTP {status}: {}", truncate_for_log(body)),
        };
    }
    RankServeError::Generation {
        message: format!("HTTP {status}: {}", truncate_for_log(body)),
    }
}

fn truncate_for_log(body: &str) -> String {
    body.chars().take(300).collect()
}

fn extract_answer(backend: GeneratorBackend, json: &serde_json::Value) -> Result<String> {
    let answer = match backend {
        GeneratorBackend::Anthropic => json["content"]
            .as_array()
            .and_then(|blocks| blocks.first())
            .and_then(|block| block["text"].as_str()),
        _ => json["choices"]
            .as_array()
            .and_then(|choices| choices.first())
            .and_then(|choice| choice["message"]["content"].as_str()),
    };

    answer
        .map(|text| text.trim().to_string())
        .ok_or_else(|| RankServeError::Generation {
            message: format!("invalid backend response format: {json}"),
        })
}

/// Extractive generator: selects the highest-scoring context sentences as
/// the answer. Used whenever no HTTP backend is configured, keeping the
/// pipeline fully exercisable offline.
pub struct ExtractiveGenerator {
    max_sentences: usize,
}

impl ExtractiveGenerator {
    /// Default extractive generator (two-sentence answers).
    pub fn new() -> Self {
        Self { max_sentences: 2 }
    }

    fn score_sentence(query_words: &[String], sentence: &str) -> f32 {
        let sentence_lower = sentence.to_lowercase();
        let mut total_score = 0.0;
        let mut matches = 0usize;

        for word in query_words {
            if sentence_lower.contains(word.as_str()) {
                total_score += 2.0;
                matches += 1;
            } else if word.len() > 4 {
                // Partial match for longer words
                for sentence_word in sentence_lower.split_whitespace() {
                    if sentence_word.contains(word.as_str()) || word.contains(sentence_word) {
                        total_score += 1.0;
                        matches += 1;
                        break;
                    }
                }
            }
        }

        let coverage_bonus = matches as f32 / query_words.len().max(1) as f32 * 0.5;
        total_score + coverage_bonus
    }
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for ExtractiveGenerator {
    async fn generate(&self, query: &str, contexts: &[ContextItem]) -> Result<String> {
        let query_lower = query.to_lowercase();
        let query_words: Vec<String> = query_lower
            .split_whitespace()
            .filter(|w| w.len() > 2)
            .map(|w| w.to_string())
            .collect();

        let mut sentences: Vec<(usize, String)> = Vec::new();
        for context in contexts {
            for sentence in split_sentences(&context.text) {
                sentences.push((sentences.len(), sentence));
            }
        }

        if sentences.is_empty() || query_words.is_empty() {
            return Ok(
                "I could not find specific information about this in the provided context."
                    .to_string(),
            );
        }

        let mut scored: Vec<(usize, f32)> = sentences
            .iter()
            .map(|(i, sentence)| (*i, Self::score_sentence(&query_words, sentence)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut selected: Vec<usize> = scored
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .take(self.max_sentences)
            .map(|(i, _)| i)
            .collect();
        if selected.is_empty() {
            return Ok(
                "I could not find specific information about this in the provided context."
                    .to_string(),
            );
        }

        // Present selected sentences in their original reading order
        selected.sort_unstable();
        let answer = selected
            .into_iter()
            .map(|i| sentences[i].1.clone())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(answer)
    }

    fn name(&self) -> &str {
        "extractive"
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split_inclusive(['.', '!', '?'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn extractive_answer_quotes_relevant_sentence() {
        let generator = ExtractiveGenerator::new();
        let contexts = vec![
            ContextItem::new("1", "The capital of France is Paris. It lies on the Seine."),
            ContextItem::new("2", "Berlin is the capital of Germany."),
        ];

        let answer = generator
            .generate("capital of France", &contexts)
            .await
            .unwrap();
        assert!(answer.contains("Paris"));
    }

    #[tokio::test]
    async fn extractive_answer_without_context_is_honest() {
        let generator = ExtractiveGenerator::new();
        let answer = generator.generate("capital of France", &[]).await.unwrap();
        assert!(answer.contains("could not find"));
    }

    #[test]
    fn context_length_failures_are_not_retryable() {
        let err = classify_backend_failure(
            400,
            r#"{"error":{"code":"context_length_exceeded","message":"too long"}}"#,
        );
        assert!(matches!(err, RankServeError::ContextLength { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn server_errors_are_retryable() {
        let err = classify_backend_failure(503, "upstream unavailable");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn retry_stops_after_bounded_attempts() {
        let attempts = AtomicUsize::new(0);
        let result: Result<()> = with_retry(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(RankServeError::Backend {
                    message: "down".to_string(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn retry_skips_non_retryable_errors() {
        let attempts = AtomicUsize::new(0);
        let result: Result<()> = with_retry(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(RankServeError::ContextLength {
                    message: "too long".to_string(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_shot_prompt_omits_contexts() {
        let contexts = vec![ContextItem::new("1", "secret passage text")];
        let prompt = build_prompt("zero-shot", "what is rust?", &contexts);
        assert!(!prompt.contains("secret passage text"));

        let grounded = build_prompt("basic-rag", "what is rust?", &contexts);
        assert!(grounded.contains("secret passage text"));
    }
}
