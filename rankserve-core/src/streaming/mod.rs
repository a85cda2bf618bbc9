//! Streaming protocol encoder
//!
//! Delivers one pipeline run as an ordered sequence of typed events:
//! `retrieved → [reranked] → token* → metrics → done`, with `error`
//! replacing the tail on failure and nothing after termination. Tokens are
//! whitespace-delimited units carrying their trailing space, so
//! concatenating all token contents reconstructs the answer exactly.
//!
//! Pacing between token events is presentation only; ordering never depends
//! on it. When the consumer goes away the producer stops at the next send.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::agent::AgentRecommendation;
use crate::config::{resolve_generator, PipelineConfig, PipelineMode, RerankerCategory};
use crate::core::{ContextItem, Result};
use crate::pipeline::{stages, PipelineRunner};

/// One event on the stream, discriminated by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Retrieval completed
    Retrieved {
        /// Ranked retrieved contexts
        docs: Vec<ContextItem>,
        /// Retrieval latency
        latency_ms: f64,
    },
    /// Reranking completed
    Reranked {
        /// Ranked reranked contexts
        docs: Vec<ContextItem>,
        /// Reranking latency
        latency_ms: f64,
    },
    /// One answer token
    Token {
        /// Token text including its trailing whitespace
        content: String,
    },
    /// One token of the retrieved-only answer in side-by-side mode
    TokenRetrieved {
        /// Token text including its trailing whitespace
        content: String,
    },
    /// One token of the reranked answer in side-by-side mode
    TokenReranked {
        /// Token text including its trailing whitespace
        content: String,
    },
    /// Generation finished; final timings
    Metrics {
        /// Generation latency
        latency_ms: f64,
        /// Resolved RAG method name
        method: String,
    },
    /// Structured advisor recommendation (agent streams only)
    Recommendation(AgentRecommendation),
    /// Successful termination
    Done,
    /// Failed termination
    Error {
        /// Failure description
        message: String,
    },
}

/// Presentation options for a stream.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Delay inserted after each token event
    pub pacing: Duration,
    /// Side-by-side comparison: answer from retrieved-only context vs.
    /// reranked context, token substreams interleaved by position
    pub compare: bool,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(20),
            compare: false,
        }
    }
}

/// Split an answer into whitespace-delimited tokens, each carrying a single
/// trailing space except the last, so concatenation is lossless.
pub fn answer_tokens(answer: &str) -> Vec<String> {
    let words: Vec<&str> = answer.split_whitespace().collect();
    let count = words.len();
    words
        .into_iter()
        .enumerate()
        .map(|(i, word)| {
            if i + 1 < count {
                format!("{word} ")
            } else {
                word.to_string()
            }
        })
        .collect()
}

struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    pacing: Duration,
}

impl EventSink {
    /// Send one event; false means the consumer disconnected.
    async fn emit(&self, event: StreamEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Send one token event followed by the pacing delay.
    async fn emit_paced(&self, event: StreamEvent) -> bool {
        if !self.emit(event).await {
            return false;
        }
        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }
        true
    }
}

/// Produce the full event sequence for one pipeline run into `tx`.
///
/// Terminates with exactly one `done` or `error` event unless the consumer
/// disconnects first, in which case production stops silently at the next
/// send. Completed cache writes are never rolled back.
pub async fn stream_pipeline(
    runner: Arc<PipelineRunner>,
    query: String,
    config: PipelineConfig,
    options: StreamOptions,
    tx: mpsc::Sender<StreamEvent>,
) {
    let sink = EventSink {
        tx,
        pacing: options.pacing,
    };
    match produce(&runner, &query, &config, options.compare, &sink).await {
        Ok(()) => {},
        Err(err) => {
            let _ = sink
                .emit(StreamEvent::Error {
                    message: err.to_string(),
                })
                .await;
        },
    }
}

/// Ok(()) means either a clean `done` or a disconnected consumer; stage
/// failures come back as Err and become the terminal `error` event.
async fn produce(
    runner: &PipelineRunner,
    query: &str,
    config: &PipelineConfig,
    compare: bool,
    sink: &EventSink,
) -> Result<()> {
    // Retrieval
    let retriever = runner.resolve_retriever(config).await?;
    let retrieved = stages::run_retrieve(retriever.as_ref(), query, config.n_docs).await?;
    if !sink
        .emit(StreamEvent::Retrieved {
            docs: retrieved.contexts.clone(),
            latency_ms: retrieved.latency_ms,
        })
        .await
    {
        return Ok(());
    }

    if config.mode == PipelineMode::Retrieve || retrieved.contexts.is_empty() {
        sink.emit(StreamEvent::Done).await;
        return Ok(());
    }

    // Reranking; the `none` sentinel passes contexts through without an event
    let reranked_contexts = if config.reranker_category == RerankerCategory::None {
        let mut passthrough = retrieved.contexts.clone();
        passthrough.truncate(config.n_contexts);
        passthrough
    } else {
        let reranker = runner
            .resolve_reranker(config.reranker_category, &config.reranker_model)
            .await?;
        let reranked = stages::run_rerank(
            reranker.as_ref(),
            query,
            &retrieved.contexts,
            config.n_contexts,
        )
        .await?;
        if !sink
            .emit(StreamEvent::Reranked {
                docs: reranked.contexts.clone(),
                latency_ms: reranked.latency_ms,
            })
            .await
        {
            return Ok(());
        }
        reranked.contexts
    };

    if config.mode == PipelineMode::Rerank {
        sink.emit(StreamEvent::Done).await;
        return Ok(());
    }

    // Generation
    let profile = resolve_generator(&config.generator, &config.rag_method);
    let generator = runner.resolve_generator(&profile).await?;

    let generation_latency_ms = if compare {
        let mut retrieved_only = retrieved.contexts.clone();
        retrieved_only.truncate(config.n_contexts);

        let start = std::time::Instant::now();
        let (answer_retrieved, _) =
            stages::run_generate(generator.as_ref(), query, &retrieved_only).await?;
        let (answer_reranked, _) =
            stages::run_generate(generator.as_ref(), query, &reranked_contexts).await?;
        let latency_ms = stages::elapsed_ms(start);

        // Interleave both substreams position by position
        let tokens_retrieved = answer_tokens(&answer_retrieved);
        let tokens_reranked = answer_tokens(&answer_reranked);
        let positions = tokens_retrieved.len().max(tokens_reranked.len());
        for i in 0..positions {
            if let Some(content) = tokens_retrieved.get(i) {
                if !sink
                    .emit_paced(StreamEvent::TokenRetrieved {
                        content: content.clone(),
                    })
                    .await
                {
                    return Ok(());
                }
            }
            if let Some(content) = tokens_reranked.get(i) {
                if !sink
                    .emit_paced(StreamEvent::TokenReranked {
                        content: content.clone(),
                    })
                    .await
                {
                    return Ok(());
                }
            }
        }
        latency_ms
    } else {
        let (answer, latency_ms) =
            stages::run_generate(generator.as_ref(), query, &reranked_contexts).await?;
        for content in answer_tokens(&answer) {
            if !sink.emit_paced(StreamEvent::Token { content }).await {
                return Ok(());
            }
        }
        latency_ms
    };

    if !sink
        .emit(StreamEvent::Metrics {
            latency_ms: generation_latency_ms,
            method: profile.rag_method.clone(),
        })
        .await
    {
        return Ok(());
    }
    sink.emit(StreamEvent::Done).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_reconstruct_answer_exactly() {
        let answer = "The capital of France is Paris.";
        let tokens = answer_tokens(answer);
        assert_eq!(tokens.concat(), answer);
        assert!(!tokens.last().unwrap().ends_with(' '));
    }

    #[test]
    fn single_word_answer_is_one_token() {
        assert_eq!(answer_tokens("Paris."), vec!["Paris.".to_string()]);
    }

    #[test]
    fn empty_answer_yields_no_tokens() {
        assert!(answer_tokens("").is_empty());
        assert!(answer_tokens("   ").is_empty());
    }

    #[test]
    fn events_serialize_with_type_discriminator() {
        let event = StreamEvent::Token {
            content: "hello ".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"token""#));

        let event = StreamEvent::TokenReranked {
            content: "x".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"token_reranked""#));

        let done = serde_json::to_string(&StreamEvent::Done).unwrap();
        assert_eq!(done, r#"{"type":"done"}"#);
    }
}
