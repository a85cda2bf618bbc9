//! API Models with Apistos OpenAPI support
//!
//! Request/response models with automatic OpenAPI schema generation. Wire
//! field names follow the demo UI contract: request stage selectors are
//! camelCase, response payloads snake_case.

use std::collections::BTreeMap;
use std::fmt;

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use apistos::ApiComponent;
use apistos_gen::ApiErrorComponent;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use rankserve_core::config::{
    DataSource, PipelineConfig, PipelineMode, RagMethodSelector, RerankerCategory, RetrieverKind,
};
use rankserve_core::pipeline::PipelineResult;

// ============================================================================
// Pipeline Models
// ============================================================================

/// Pipeline request: every stage is chosen per request
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ApiComponent)]
pub struct PipelineRequest {
    /// User query
    pub query: String,

    /// Pipeline mode: retrieve | rerank | rag
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Retriever method
    #[serde(default = "default_retriever")]
    pub retriever: String,

    /// Reranker category ("none" disables reranking)
    #[serde(rename = "rerankerCategory", default = "default_reranker_category")]
    pub reranker_category: String,

    /// Specific reranker model
    #[serde(rename = "rerankerModel", default = "default_reranker_model")]
    pub reranker_model: String,

    /// Logical generator identifier
    #[serde(default = "default_generator")]
    pub generator: String,

    /// RAG method override, or "auto"
    #[serde(rename = "ragMethod", default = "default_rag_method")]
    pub rag_method: String,

    /// Index selector: wiki | msmarco | custom
    #[serde(rename = "dataSource", default = "default_data_source")]
    pub data_source: String,

    /// Number of documents to retrieve
    #[serde(default = "default_n_docs")]
    pub n_docs: usize,

    /// Number of top contexts for generation
    #[serde(default = "default_n_contexts")]
    pub n_contexts: usize,

    /// Streaming only: side-by-side answers from retrieved vs. reranked
    /// contexts
    #[serde(default)]
    pub compare: bool,
}

fn default_mode() -> String {
    "rag".to_string()
}

fn default_retriever() -> String {
    "bm25".to_string()
}

fn default_reranker_category() -> String {
    "flashrank".to_string()
}

fn default_reranker_model() -> String {
    "ms-marco-MiniLM-L-12-v2".to_string()
}

fn default_generator() -> String {
    "openai".to_string()
}

fn default_rag_method() -> String {
    "auto".to_string()
}

fn default_data_source() -> String {
    "wiki".to_string()
}

fn default_n_docs() -> usize {
    10
}

fn default_n_contexts() -> usize {
    5
}

impl PipelineRequest {
    /// Parse the request's stage identifiers into a pipeline configuration.
    /// Unrecognized identifiers map to the documented defaults.
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            mode: PipelineMode::parse_or_default(&self.mode),
            retriever: RetrieverKind::parse_or_default(&self.retriever),
            reranker_category: RerankerCategory::parse_or_default(&self.reranker_category),
            reranker_model: self.reranker_model.clone(),
            generator: self.generator.clone(),
            rag_method: RagMethodSelector::parse(&self.rag_method),
            data_source: DataSource::parse_or_default(&self.data_source),
            n_docs: self.n_docs,
            n_contexts: self.n_contexts,
        }
    }
}

/// One context item in a response
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ApiComponent)]
pub struct DocumentOut {
    /// Context identifier
    pub id: String,

    /// Display text (length-capped)
    pub text: String,

    /// Passage title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Stage-defined relevance score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,

    /// Old rank minus new rank, present only after reranking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_delta: Option<i64>,
}

impl From<rankserve_core::ContextItem> for DocumentOut {
    fn from(item: rankserve_core::ContextItem) -> Self {
        Self {
            id: item.id,
            text: item.text,
            title: item.title,
            score: item.score,
            rank_delta: item.rank_delta,
        }
    }
}

/// Synchronous pipeline response
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ApiComponent)]
pub struct PipelineResponse {
    /// Original query
    pub query: String,

    /// Requested mode
    pub mode: String,

    /// Retrieval output
    pub retrieved_docs: Vec<DocumentOut>,

    /// Reranking output (empty when the stage did not run)
    pub reranked_docs: Vec<DocumentOut>,

    /// Generated answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,

    /// Resolved RAG method
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rag_method: Option<String>,

    /// Retrieval latency in milliseconds
    pub retriever_latency_ms: f64,

    /// Reranking latency in milliseconds
    pub reranker_latency_ms: f64,

    /// Generation latency in milliseconds
    pub generator_latency_ms: f64,

    /// First stage failure; presence marks a failed run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<PipelineResult> for PipelineResponse {
    fn from(result: PipelineResult) -> Self {
        Self {
            query: result.query,
            mode: result.mode.as_str().to_string(),
            retrieved_docs: result.retrieved_docs.into_iter().map(Into::into).collect(),
            reranked_docs: result.reranked_docs.into_iter().map(Into::into).collect(),
            answer: result.answer,
            rag_method: result.rag_method,
            retriever_latency_ms: result.retriever_latency_ms,
            reranker_latency_ms: result.reranker_latency_ms,
            generator_latency_ms: result.generator_latency_ms,
            error: result.error,
        }
    }
}

// ============================================================================
// Arena Models
// ============================================================================

/// One side of an arena comparison
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ApiComponent)]
pub struct ArenaPipelineSpec {
    /// Retriever method (retrieval is pre-materialized by the benchmark)
    #[serde(default = "default_retriever")]
    pub retriever: String,

    /// Reranker category ("none" disables reranking)
    #[serde(rename = "rerankerCategory", default = "default_reranker_category")]
    pub reranker_category: String,

    /// Specific reranker model
    #[serde(rename = "rerankerModel", default)]
    pub reranker_model: String,

    /// Logical generator identifier (unused by the arena metric)
    #[serde(default = "default_generator")]
    pub generator: String,

    /// RAG method (unused by the arena metric)
    #[serde(rename = "ragMethod", default = "default_rag_method")]
    pub rag_method: String,
}

impl ArenaPipelineSpec {
    /// Parse into a rerank-mode pipeline configuration.
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            mode: PipelineMode::Rerank,
            retriever: RetrieverKind::parse_or_default(&self.retriever),
            reranker_category: RerankerCategory::parse_or_default(&self.reranker_category),
            reranker_model: self.reranker_model.clone(),
            generator: self.generator.clone(),
            rag_method: RagMethodSelector::parse(&self.rag_method),
            ..Default::default()
        }
    }
}

/// Arena run request
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ApiComponent)]
pub struct ArenaRequest {
    /// Benchmark dataset key (e.g. "beir-covid")
    pub dataset: String,

    /// Candidate depth per query
    #[serde(default = "default_arena_n_docs")]
    pub n_docs: usize,

    /// Number of queries to sample
    #[serde(default = "default_arena_n_queries")]
    pub n_queries: usize,

    /// Configuration A
    pub pipeline_a: ArenaPipelineSpec,

    /// Configuration B
    pub pipeline_b: ArenaPipelineSpec,
}

fn default_arena_n_docs() -> usize {
    20
}

fn default_arena_n_queries() -> usize {
    5
}

/// Metric bundle for one arena side
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ApiComponent)]
pub struct ArenaScoreOut {
    /// NDCG@10 scaled to 0-100
    pub ndcg_10: f64,

    /// MRR@10 scaled to 0-100
    pub mrr_10: f64,

    /// Mean per-query reranking latency in milliseconds
    pub latency_ms: f64,

    /// Whether the binary-relevance fallback produced the scores
    pub used_fallback: bool,
}

impl From<rankserve_core::arena::ArenaPipelineScore> for ArenaScoreOut {
    fn from(score: rankserve_core::arena::ArenaPipelineScore) -> Self {
        Self {
            ndcg_10: score.ndcg_10,
            mrr_10: score.mrr_10,
            latency_ms: score.latency_ms,
            used_fallback: score.used_fallback,
        }
    }
}

/// Arena run response
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ApiComponent)]
pub struct ArenaResponse {
    /// Dataset key that was evaluated
    pub dataset: String,

    /// Number of sampled queries
    pub query_count: usize,

    /// Scores for configuration A
    pub pipeline_a: ArenaScoreOut,

    /// Scores for configuration B
    pub pipeline_b: ArenaScoreOut,
}

impl From<rankserve_core::arena::ArenaRunResult> for ArenaResponse {
    fn from(result: rankserve_core::arena::ArenaRunResult) -> Self {
        Self {
            dataset: result.dataset,
            query_count: result.query_count,
            pipeline_a: result.pipeline_a.into(),
            pipeline_b: result.pipeline_b.into(),
        }
    }
}

// ============================================================================
// Agent Models
// ============================================================================

/// Agent chat request
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ApiComponent)]
pub struct AgentChatRequest {
    /// Free-text requirement message
    pub message: String,

    /// Conversation session identifier
    pub session_id: String,
}

// ============================================================================
// Introspection Models
// ============================================================================

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ApiComponent)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Loaded retriever cache keys
    pub cached_retrievers: Vec<String>,

    /// Loaded reranker cache keys
    pub cached_rerankers: Vec<String>,

    /// Loaded generator cache keys
    pub cached_generators: Vec<String>,

    /// Live agent session identifiers
    pub cached_agent_sessions: Vec<String>,
}

/// Supported model catalog
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, ApiComponent)]
pub struct ModelsResponse {
    /// Retriever method identifiers
    pub retrievers: Vec<String>,

    /// Reranker categories with their model lists
    pub reranker_categories: BTreeMap<String, Vec<String>>,

    /// Logical generator identifiers
    pub generators: Vec<String>,

    /// RAG method identifiers
    pub rag_methods: Vec<String>,

    /// Benchmark dataset keys accepted by the arena
    pub arena_datasets: Vec<String>,
}

// ============================================================================
// Error Models
// ============================================================================

/// API Error types with OpenAPI documentation
#[derive(Debug, Clone, Serialize, Deserialize, ApiErrorComponent)]
#[openapi_error(
    status(code = 400, description = "Bad Request - Invalid input or parameters"),
    status(code = 404, description = "Not Found - Resource does not exist"),
    status(
        code = 500,
        description = "Internal Server Error - Server encountered an error"
    )
)]
pub enum ApiError {
    /// Bad request error
    BadRequest(String),

    /// Not found error
    NotFound(String),

    /// Internal server error
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(serde_json::json!({
            "error": match self {
                ApiError::BadRequest(_) => "Bad Request",
                ApiError::NotFound(_) => "Not Found",
                ApiError::InternalError(_) => "Internal Server Error",
            },
            "message": self.to_string(),
            "status": status.as_u16(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_match_the_demo_ui() {
        let request: PipelineRequest =
            serde_json::from_str(r#"{"query": "capital of France"}"#).unwrap();
        assert_eq!(request.mode, "rag");
        assert_eq!(request.retriever, "bm25");
        assert_eq!(request.reranker_category, "flashrank");
        assert_eq!(request.reranker_model, "ms-marco-MiniLM-L-12-v2");
        assert_eq!(request.n_docs, 10);
        assert_eq!(request.n_contexts, 5);
        assert!(!request.compare);
    }

    #[test]
    fn camel_case_selectors_deserialize() {
        let request: PipelineRequest = serde_json::from_str(
            r#"{"query": "q", "rerankerCategory": "none", "dataSource": "msmarco"}"#,
        )
        .unwrap();
        let config = request.to_config();
        assert_eq!(config.reranker_category, RerankerCategory::None);
        assert_eq!(config.data_source, DataSource::Msmarco);
    }

    #[test]
    fn unknown_identifiers_fall_back_in_conversion() {
        let request: PipelineRequest = serde_json::from_str(
            r#"{"query": "q", "mode": "bogus", "retriever": "splade"}"#,
        )
        .unwrap();
        let config = request.to_config();
        assert_eq!(config.mode, PipelineMode::Rag);
        assert_eq!(config.retriever, RetrieverKind::Bm25);
    }

    #[test]
    fn arena_spec_converts_to_rerank_mode() {
        let spec: ArenaPipelineSpec = serde_json::from_str(
            r#"{"retriever": "bm25", "rerankerCategory": "flashrank", "rerankerModel": "ms-marco-MiniLM-L-12-v2"}"#,
        )
        .unwrap();
        assert_eq!(spec.to_config().mode, PipelineMode::Rerank);
    }
}
