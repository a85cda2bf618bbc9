//! Reranking stage: reordering a candidate set with a relevance model
//!
//! The in-tree implementation scores query/document pairs jointly with
//! lexical overlap and length signals. Each reranker category tunes the
//! signal weights; the `none` category never reaches this module (the
//! orchestrator short-circuits it).

use std::collections::HashSet;

use async_trait::async_trait;

use crate::config::RerankerCategory;
use crate::core::{ContextItem, Result};

/// A reranking component: `rerank(query, contexts) -> reordered contexts`.
///
/// Implementations score every input item, sort descending, and return a new
/// list; they never mutate rank bookkeeping (the stage runner owns
/// `rank_delta`).
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Rerank `contexts` by relevance to `query`.
    async fn rerank(&self, query: &str, contexts: Vec<ContextItem>) -> Result<Vec<ContextItem>>;

    /// Model name for logging and cache diagnostics.
    fn name(&self) -> &str;
}

/// Cross-scoring reranker: jointly scores each query/document pair from
/// token overlap (Jaccard) and document length, squashed through a sigmoid.
pub struct CrossScoringReranker {
    model_name: String,
    overlap_weight: f32,
    length_weight: f32,
    normalize_scores: bool,
}

impl CrossScoringReranker {
    /// Build the reranker configured for a category/model pair.
    pub fn for_model(category: RerankerCategory, model_name: &str) -> Self {
        let (overlap_weight, length_weight) = match category {
            RerankerCategory::Flashrank => (0.7, 0.3),
            RerankerCategory::TransformerRanker => (0.8, 0.2),
            RerankerCategory::Monot5 => (0.75, 0.25),
            RerankerCategory::ColbertRanker => (0.85, 0.15),
            RerankerCategory::Monobert => (0.8, 0.2),
            // The sentinel is short-circuited upstream; weights are moot.
            RerankerCategory::None => (1.0, 0.0),
        };
        Self {
            model_name: model_name.to_string(),
            overlap_weight,
            length_weight,
            normalize_scores: true,
        }
    }

    /// Relevance of a document to a query in [0, 1].
    fn score_pair(&self, query: &str, document: &str) -> f32 {
        let query_lower = query.to_lowercase();
        let doc_lower = document.to_lowercase();
        let query_tokens: HashSet<&str> = query_lower.split_whitespace().collect();
        let doc_tokens: Vec<&str> = doc_lower.split_whitespace().collect();

        if query_tokens.is_empty() || doc_tokens.is_empty() {
            return 0.0;
        }

        let doc_set: HashSet<&str> = doc_tokens.iter().copied().collect();
        let intersection = query_tokens.intersection(&doc_set).count();
        let union_size = query_tokens.len() + doc_set.len() - intersection;

        let jaccard = if union_size > 0 {
            intersection as f32 / union_size as f32
        } else {
            0.0
        };

        // Longer documents carry more answerable content
        let length_factor = (doc_tokens.len() as f32 / 100.0).min(1.0);

        let raw_score = jaccard * self.overlap_weight + length_factor * self.length_weight;

        if self.normalize_scores {
            1.0 / (1.0 + (-5.0 * (raw_score - 0.5)).exp())
        } else {
            raw_score
        }
    }
}

#[async_trait]
impl Reranker for CrossScoringReranker {
    async fn rerank(&self, query: &str, contexts: Vec<ContextItem>) -> Result<Vec<ContextItem>> {
        if contexts.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ContextItem> = contexts
            .into_iter()
            .map(|mut item| {
                item.score = Some(self.score_pair(query, &item.text));
                item
            })
            .collect();

        // Stable sort keeps the incoming order on ties
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        log::debug!(
            "reranked {} candidates with {}",
            scored.len(),
            self.model_name
        );

        Ok(scored)
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, text: &str) -> ContextItem {
        ContextItem::new(id, text)
    }

    #[tokio::test]
    async fn relevant_document_moves_to_top() {
        let reranker =
            CrossScoringReranker::for_model(RerankerCategory::Flashrank, "ms-marco-MiniLM-L-12-v2");

        let contexts = vec![
            item("1", "the weather today is sunny"),
            item("2", "machine learning algorithms recognize patterns in data"),
            item("3", "a short note"),
        ];

        let ranked = reranker
            .rerank("machine learning algorithms", contexts)
            .await
            .unwrap();

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].id, "2");
        assert!(ranked[0].score.unwrap() >= ranked[1].score.unwrap());
        assert!(ranked[1].score.unwrap() >= ranked[2].score.unwrap());
    }

    #[tokio::test]
    async fn empty_input_returns_empty_output() {
        let reranker =
            CrossScoringReranker::for_model(RerankerCategory::Monot5, "monot5-base-msmarco");
        let ranked = reranker.rerank("anything", vec![]).await.unwrap();
        assert!(ranked.is_empty());
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let reranker =
            CrossScoringReranker::for_model(RerankerCategory::Monobert, "monobert-large");
        let score = reranker.score_pair("artificial intelligence", "AI and ML are related fields");
        assert!((0.0..=1.0).contains(&score));
    }
}
