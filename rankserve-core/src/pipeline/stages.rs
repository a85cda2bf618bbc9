//! Stage runners: thin wrappers producing normalized results and timings
//!
//! Each runner invokes one external-collaborator contract, measures its
//! wall-clock cost, and normalizes the output. Runners never mutate the
//! previous stage's result; the rerank runner derives `rank_delta` on its
//! own output list.

use std::time::Instant;

use crate::core::{ContextItem, Result, StageResult};
use crate::generation::Generator;
use crate::reranking::Reranker;
use crate::retrieval::Retriever;

/// Answer placeholder when a backend produces nothing.
pub const NO_ANSWER: &str = "No answer generated.";

/// Elapsed milliseconds since `start`, rounded to one decimal.
pub fn elapsed_ms(start: Instant) -> f64 {
    (start.elapsed().as_secs_f64() * 1000.0 * 10.0).round() / 10.0
}

/// Run retrieval: truncate to `n_docs` and cap display text.
pub async fn run_retrieve(
    retriever: &dyn Retriever,
    query: &str,
    n_docs: usize,
) -> Result<StageResult> {
    let start = Instant::now();
    let mut contexts = retriever.retrieve(query, n_docs).await?;
    contexts.truncate(n_docs);
    for context in &mut contexts {
        context.cap_text();
    }
    Ok(StageResult {
        contexts,
        latency_ms: elapsed_ms(start),
    })
}

/// Run reranking over the full retrieved set, truncate to `n_contexts`, and
/// populate `rank_delta` against the pre-rerank ordering.
pub async fn run_rerank(
    reranker: &dyn Reranker,
    query: &str,
    retrieved: &[ContextItem],
    n_contexts: usize,
) -> Result<StageResult> {
    let start = Instant::now();
    let mut reranked = reranker.rerank(query, retrieved.to_vec()).await?;
    reranked.truncate(n_contexts);
    apply_rank_deltas(retrieved, &mut reranked);
    Ok(StageResult {
        contexts: reranked,
        latency_ms: elapsed_ms(start),
    })
}

/// Derive `rank_delta = old_rank - new_rank` for every item of `current`.
///
/// Identifiers absent from `previous` get delta 0, indistinguishable from
/// "no change" — matching the historical behavior of the serving layer.
pub fn apply_rank_deltas(previous: &[ContextItem], current: &mut [ContextItem]) {
    for (new_rank, item) in current.iter_mut().enumerate() {
        let delta = previous
            .iter()
            .position(|p| p.id == item.id)
            .map(|old_rank| old_rank as i64 - new_rank as i64)
            .unwrap_or(0);
        item.rank_delta = Some(delta);
    }
}

/// Run generation, returning the answer text and its latency.
pub async fn run_generate(
    generator: &dyn Generator,
    query: &str,
    contexts: &[ContextItem],
) -> Result<(String, f64)> {
    let start = Instant::now();
    let answer = generator.generate(query, contexts).await?;
    let answer = if answer.trim().is_empty() {
        NO_ANSWER.to_string()
    } else {
        answer
    };
    Ok((answer, elapsed_ms(start)))
}
