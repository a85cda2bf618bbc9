//! Arena evaluation: head-to-head comparison of two pipeline configurations
//!
//! Runs both configurations' reranking over the same sampled slice of a
//! benchmark dataset (retrieval is assumed pre-materialized by the
//! benchmark) and reports NDCG@10, MRR@10 and mean rerank latency per
//! pipeline. Ground truth comes from cached qrels when available; otherwise
//! both sides score with the binary gold-answer fallback.

pub mod dataset;
pub mod metrics;
pub mod qrels;

pub use dataset::{ArenaDataError, BenchmarkDocument, DatasetStore};
pub use qrels::{QrelIndex, QrelStore};

use std::sync::Arc;
use std::time::Instant;

use rand::seq::SliceRandom;
use serde::Serialize;

use crate::config::{PipelineConfig, RerankerCategory};
use crate::core::{ContextItem, Result};
use crate::pipeline::{stages, PipelineRunner};

/// Metric bundle for one side of an arena run.
#[derive(Debug, Clone, Serialize)]
pub struct ArenaPipelineScore {
    /// NDCG@10 scaled to 0–100
    pub ndcg_10: f64,
    /// MRR@10 scaled to 0–100
    pub mrr_10: f64,
    /// Mean per-query reranking latency in milliseconds
    pub latency_ms: f64,
    /// Whether the binary-relevance fallback produced the scores
    pub used_fallback: bool,
}

/// Outcome of one arena run.
#[derive(Debug, Clone, Serialize)]
pub struct ArenaRunResult {
    /// Dataset key that was evaluated
    pub dataset: String,
    /// Number of sampled queries
    pub query_count: usize,
    /// Scores for configuration A
    pub pipeline_a: ArenaPipelineScore,
    /// Scores for configuration B
    pub pipeline_b: ArenaPipelineScore,
}

/// Drives two configurations over a shared query sample.
pub struct ArenaEvaluator {
    runner: Arc<PipelineRunner>,
    datasets: DatasetStore,
    qrels: QrelStore,
}

impl ArenaEvaluator {
    /// Evaluator sharing the serving layer's component cache via `runner`.
    pub fn new(runner: Arc<PipelineRunner>, datasets: DatasetStore, qrels: QrelStore) -> Self {
        Self {
            runner,
            datasets,
            qrels,
        }
    }

    /// Compare two configurations on `n_queries` sampled from a dataset.
    pub async fn compare(
        &self,
        dataset_key: &str,
        n_docs: usize,
        n_queries: usize,
        config_a: &PipelineConfig,
        config_b: &PipelineConfig,
    ) -> Result<ArenaRunResult> {
        let qrels = self.qrels.load(dataset_key).await;
        let mut documents = self.datasets.load(dataset_key).await?;

        if documents.len() > n_queries {
            let mut rng = rand::thread_rng();
            documents.shuffle(&mut rng);
            documents.truncate(n_queries);
        }

        log::info!(
            "arena run on {dataset_key}: {} queries, qrels {}",
            documents.len(),
            if qrels.is_some() { "loaded" } else { "unavailable" }
        );

        let pipeline_a = self
            .evaluate_side(config_a, &documents, qrels.as_ref(), n_docs)
            .await?;
        let pipeline_b = self
            .evaluate_side(config_b, &documents, qrels.as_ref(), n_docs)
            .await?;

        Ok(ArenaRunResult {
            dataset: dataset_key.to_string(),
            query_count: documents.len(),
            pipeline_a,
            pipeline_b,
        })
    }

    async fn evaluate_side(
        &self,
        config: &PipelineConfig,
        documents: &[BenchmarkDocument],
        qrels: Option<&QrelIndex>,
        n_docs: usize,
    ) -> Result<ArenaPipelineScore> {
        let reranker = if config.reranker_category == RerankerCategory::None {
            None
        } else {
            Some(
                self.runner
                    .resolve_reranker(config.reranker_category, &config.reranker_model)
                    .await?,
            )
        };

        let mut scores = Vec::with_capacity(documents.len());
        let mut total_latency_ms = 0.0;
        let mut used_fallback = qrels.is_none();

        for document in documents {
            let mut candidates = document.contexts.clone();
            candidates.truncate(n_docs);

            let start = Instant::now();
            let ranked = match &reranker {
                Some(reranker) => reranker.rerank(&document.query, candidates).await?,
                None => candidates,
            };
            total_latency_ms += stages::elapsed_ms(start);

            let judged = qrels.and_then(|q| q.judged(&document.query_id));
            let score = match judged {
                Some(judged) => {
                    let ranked_grades: Vec<f32> = ranked
                        .iter()
                        .map(|item| judged.get(&item.id).copied().unwrap_or(0.0))
                        .collect();
                    let all_grades: Vec<f32> = judged.values().copied().collect();
                    metrics::graded_query_score(&ranked_grades, &all_grades)
                },
                None => {
                    // No judgments for this query: binary gold-answer fallback
                    used_fallback = true;
                    let relevant = relevance_from_answers(&ranked, &document.answers);
                    metrics::binary_query_score(&relevant)
                },
            };
            scores.push(score);
        }

        let (ndcg_10, mrr_10) = metrics::aggregate(&scores);
        let latency_ms = if documents.is_empty() {
            0.0
        } else {
            total_latency_ms / documents.len() as f64
        };

        Ok(ArenaPipelineScore {
            ndcg_10,
            mrr_10,
            latency_ms,
            used_fallback,
        })
    }
}

/// Case-insensitive substring membership of any gold answer in each
/// candidate's text.
pub fn relevance_from_answers(ranked: &[ContextItem], answers: &[String]) -> Vec<bool> {
    let answers_lower: Vec<String> = answers.iter().map(|a| a.to_lowercase()).collect();
    ranked
        .iter()
        .map(|item| {
            let text = item.text.to_lowercase();
            answers_lower
                .iter()
                .any(|answer| !answer.is_empty() && text.contains(answer.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_membership_is_case_insensitive() {
        let ranked = vec![
            ContextItem::new("1", "The capital of France is PARIS."),
            ContextItem::new("2", "Berlin is the capital of Germany."),
        ];
        let relevant = relevance_from_answers(&ranked, &["paris".to_string()]);
        assert_eq!(relevant, vec![true, false]);
    }

    #[test]
    fn empty_answers_mark_nothing_relevant() {
        let ranked = vec![ContextItem::new("1", "some text")];
        assert_eq!(relevance_from_answers(&ranked, &[]), vec![false]);
        assert_eq!(
            relevance_from_answers(&ranked, &[String::new()]),
            vec![false]
        );
    }
}
