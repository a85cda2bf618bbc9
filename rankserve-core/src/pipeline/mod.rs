//! Pipeline orchestration
//!
//! The [`PipelineRunner`] sequences retrieve → rerank → generate for one
//! request, resolving each stage's component through the shared
//! [`ComponentCache`], honoring the mode's early exit, and folding any stage
//! failure into the result's `error` field while preserving everything that
//! completed before it.

pub mod registry;
pub mod stages;

pub use registry::ComponentRegistry;

use std::sync::Arc;

use serde::Serialize;

use crate::cache::ComponentCache;
use crate::config::{
    resolve_generator, GeneratorProfile, PipelineConfig, PipelineMode, RerankerCategory,
};
use crate::core::{ContextItem, Result};
use crate::generation::Generator;
use crate::reranking::Reranker;
use crate::retrieval::Retriever;

/// Aggregated outcome of one pipeline run.
///
/// A populated `error` marks a failed run; the other fields still reflect
/// whatever stages completed before the failure.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    /// Original query text
    pub query: String,
    /// Requested stopping mode
    pub mode: PipelineMode,
    /// Retrieval output (ranking order)
    pub retrieved_docs: Vec<ContextItem>,
    /// Reranking output; empty when the stage did not run
    pub reranked_docs: Vec<ContextItem>,
    /// Generated answer, present only for completed rag runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Resolved RAG method name, present once generation was attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_method: Option<String>,
    /// Retrieval latency in milliseconds
    pub retriever_latency_ms: f64,
    /// Reranking latency in milliseconds
    pub reranker_latency_ms: f64,
    /// Generation latency in milliseconds
    pub generator_latency_ms: f64,
    /// First stage failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    fn new(query: &str, mode: PipelineMode) -> Self {
        Self {
            query: query.to_string(),
            mode,
            retrieved_docs: Vec::new(),
            reranked_docs: Vec::new(),
            answer: None,
            rag_method: None,
            retriever_latency_ms: 0.0,
            reranker_latency_ms: 0.0,
            generator_latency_ms: 0.0,
            error: None,
        }
    }
}

/// Sequences the three stages for one request.
pub struct PipelineRunner {
    cache: Arc<ComponentCache>,
    registry: Arc<ComponentRegistry>,
}

impl PipelineRunner {
    /// Build a runner over a shared cache and registry.
    pub fn new(cache: Arc<ComponentCache>, registry: Arc<ComponentRegistry>) -> Self {
        Self { cache, registry }
    }

    /// The shared component cache (used by the health endpoint).
    pub fn cache(&self) -> &Arc<ComponentCache> {
        &self.cache
    }

    /// Resolve the retriever for a config through the cache.
    pub async fn resolve_retriever(&self, config: &PipelineConfig) -> Result<Arc<dyn Retriever>> {
        let registry = self.registry.clone();
        let kind = config.retriever;
        let source = config.data_source;
        self.cache
            .retriever(&config.retriever_cache_key(), || async move {
                registry.build_retriever(kind, source)
            })
            .await
    }

    /// Resolve a reranker through the cache.
    pub async fn resolve_reranker(
        &self,
        category: RerankerCategory,
        model: &str,
    ) -> Result<Arc<dyn Reranker>> {
        let registry = self.registry.clone();
        let key = format!("{}|{}", category.as_str(), model);
        let model = model.to_string();
        self.cache
            .reranker(&key, || async move { registry.build_reranker(category, &model) })
            .await
    }

    /// Resolve the generator for a profile through the cache.
    pub async fn resolve_generator(&self, profile: &GeneratorProfile) -> Result<Arc<dyn Generator>> {
        let registry = self.registry.clone();
        let profile_clone = profile.clone();
        self.cache
            .generator(&profile.cache_key(), || async move {
                registry.build_generator(&profile_clone)
            })
            .await
    }

    /// Run the pipeline to completion or to the mode's stopping point.
    pub async fn run(&self, query: &str, config: &PipelineConfig) -> PipelineResult {
        let mut result = PipelineResult::new(query, config.mode);

        // Retrieval
        let retriever = match self.resolve_retriever(config).await {
            Ok(retriever) => retriever,
            Err(err) => {
                result.error = Some(err.to_string());
                return result;
            },
        };
        match stages::run_retrieve(retriever.as_ref(), query, config.n_docs).await {
            Ok(stage) => {
                result.retriever_latency_ms = stage.latency_ms;
                result.retrieved_docs = stage.contexts;
            },
            Err(err) => {
                result.error = Some(err.to_string());
                return result;
            },
        }

        if config.mode == PipelineMode::Retrieve {
            return result;
        }

        // Nothing retrieved: skip the remaining stages gracefully.
        if result.retrieved_docs.is_empty() {
            return result;
        }

        // Reranking
        if config.reranker_category == RerankerCategory::None {
            let mut passthrough = result.retrieved_docs.clone();
            passthrough.truncate(config.n_contexts);
            result.reranked_docs = passthrough;
        } else {
            let reranker = match self
                .resolve_reranker(config.reranker_category, &config.reranker_model)
                .await
            {
                Ok(reranker) => reranker,
                Err(err) => {
                    result.error = Some(err.to_string());
                    return result;
                },
            };
            match stages::run_rerank(
                reranker.as_ref(),
                query,
                &result.retrieved_docs,
                config.n_contexts,
            )
            .await
            {
                Ok(stage) => {
                    result.reranker_latency_ms = stage.latency_ms;
                    result.reranked_docs = stage.contexts;
                },
                Err(err) => {
                    result.error = Some(err.to_string());
                    return result;
                },
            }
        }

        if config.mode == PipelineMode::Rerank {
            return result;
        }

        // Generation
        let profile = resolve_generator(&config.generator, &config.rag_method);
        result.rag_method = Some(profile.rag_method.clone());

        let generator = match self.resolve_generator(&profile).await {
            Ok(generator) => generator,
            Err(err) => {
                result.error = Some(err.to_string());
                return result;
            },
        };

        match stages::run_generate(generator.as_ref(), query, &result.reranked_docs).await {
            Ok((answer, latency_ms)) => {
                result.answer = Some(answer);
                result.generator_latency_ms = latency_ms;
            },
            Err(err) => {
                result.error = Some(err.to_string());
            },
        }

        result
    }
}
