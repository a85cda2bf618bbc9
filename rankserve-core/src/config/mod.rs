//! Request configuration model
//!
//! Every pipeline request carries a full [`PipelineConfig`]: which retriever,
//! reranker and generator to use, which corpus to search, document counts and
//! the stopping mode. Stage identifiers arriving from the outside world are
//! parsed into closed enums at the boundary; unrecognized values map to an
//! explicit default variant, never silently deep inside logic.

use serde::{Deserialize, Serialize};

/// How far the pipeline runs before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Stop after retrieval
    Retrieve,
    /// Stop after reranking
    Rerank,
    /// Full retrieval-augmented generation
    Rag,
}

impl PipelineMode {
    /// Parse a wire value, falling back to [`PipelineMode::Rag`].
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "retrieve" => Self::Retrieve,
            "rerank" => Self::Rerank,
            _ => Self::Rag,
        }
    }

    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retrieve => "retrieve",
            Self::Rerank => "rerank",
            Self::Rag => "rag",
        }
    }
}

impl Default for PipelineMode {
    fn default() -> Self {
        Self::Rag
    }
}

/// Retrieval method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrieverKind {
    /// Lexical BM25 ranking
    Bm25,
    /// Dense passage retrieval
    Dpr,
    /// ANCE dense retrieval
    Ance,
    /// Contriever dense retrieval
    Contriever,
    /// ColBERT late-interaction retrieval
    Colbert,
    /// BGE dense retrieval
    Bge,
}

impl RetrieverKind {
    /// Every supported retriever, catalog order.
    pub const ALL: [RetrieverKind; 6] = [
        Self::Bm25,
        Self::Dpr,
        Self::Ance,
        Self::Contriever,
        Self::Colbert,
        Self::Bge,
    ];

    /// Parse a wire value, falling back to [`RetrieverKind::Bm25`].
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "bm25" => Self::Bm25,
            "dpr" => Self::Dpr,
            "ance" => Self::Ance,
            "contriever" => Self::Contriever,
            "colbert" => Self::Colbert,
            "bge" => Self::Bge,
            _ => Self::Bm25,
        }
    }

    /// Wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bm25 => "bm25",
            Self::Dpr => "dpr",
            Self::Ance => "ance",
            Self::Contriever => "contriever",
            Self::Colbert => "colbert",
            Self::Bge => "bge",
        }
    }
}

/// Reranker category. `None` is the sentinel for "no reranker configured":
/// the pipeline passes retrieved contexts through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankerCategory {
    /// Reranking disabled
    None,
    /// FlashRank cross-encoders
    Flashrank,
    /// Transformer cross-encoder rankers
    TransformerRanker,
    /// MonoT5 sequence-to-sequence rankers
    Monot5,
    /// ColBERT late-interaction rankers
    ColbertRanker,
    /// MonoBERT pointwise rankers
    Monobert,
}

impl RerankerCategory {
    /// Every category that actually reranks (excludes the `none` sentinel).
    pub const ACTIVE: [RerankerCategory; 5] = [
        Self::Flashrank,
        Self::TransformerRanker,
        Self::Monot5,
        Self::ColbertRanker,
        Self::Monobert,
    ];

    /// Parse a wire value, falling back to [`RerankerCategory::Flashrank`].
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "none" => Self::None,
            "flashrank" => Self::Flashrank,
            "transformer_ranker" => Self::TransformerRanker,
            "monot5" => Self::Monot5,
            "colbert_ranker" => Self::ColbertRanker,
            "monobert" => Self::Monobert,
            _ => Self::Flashrank,
        }
    }

    /// Wire name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Flashrank => "flashrank",
            Self::TransformerRanker => "transformer_ranker",
            Self::Monot5 => "monot5",
            Self::ColbertRanker => "colbert_ranker",
            Self::Monobert => "monobert",
        }
    }
}

/// Corpus index selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Wikipedia index
    Wiki,
    /// MS MARCO passage index
    Msmarco,
    /// User-supplied corpus
    Custom,
}

impl DataSource {
    /// Parse a wire value, falling back to [`DataSource::Wiki`].
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "msmarco" => Self::Msmarco,
            "custom" => Self::Custom,
            _ => Self::Wiki,
        }
    }

    /// Name of the backing index.
    pub fn index_name(&self) -> &'static str {
        match self {
            Self::Wiki => "wiki",
            Self::Msmarco => "msmarco",
            Self::Custom => "custom",
        }
    }
}

/// RAG-method selection: `Auto` defers to the generator profile's default,
/// `Named` overrides it explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RagMethodSelector {
    /// Use the method from the generator lookup table
    Auto,
    /// Explicit method override
    Named(String),
}

impl RagMethodSelector {
    /// Parse a wire value; empty or `"auto"` means no override.
    pub fn parse(value: &str) -> Self {
        match value {
            "" | "auto" => Self::Auto,
            other => Self::Named(other.to_string()),
        }
    }
}

impl Default for RagMethodSelector {
    fn default() -> Self {
        Self::Auto
    }
}

/// Immutable per-request pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Stopping mode
    pub mode: PipelineMode,
    /// Retrieval method
    pub retriever: RetrieverKind,
    /// Reranker category (`None` disables reranking)
    pub reranker_category: RerankerCategory,
    /// Specific reranker model within the category
    pub reranker_model: String,
    /// Logical generator identifier (resolved through the lookup table)
    pub generator: String,
    /// RAG method override
    pub rag_method: RagMethodSelector,
    /// Corpus index selector
    pub data_source: DataSource,
    /// Number of documents to retrieve
    pub n_docs: usize,
    /// Number of top contexts kept after reranking / fed to generation
    pub n_contexts: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Rag,
            retriever: RetrieverKind::Bm25,
            reranker_category: RerankerCategory::Flashrank,
            reranker_model: "ms-marco-MiniLM-L-12-v2".to_string(),
            generator: "openai".to_string(),
            rag_method: RagMethodSelector::Auto,
            data_source: DataSource::Wiki,
            n_docs: 10,
            n_contexts: 5,
        }
    }
}

impl PipelineConfig {
    /// Cache key for the retriever component.
    ///
    /// `n_docs` is deliberately absent: retrievers take the document count at
    /// search time, so it does not affect construction.
    pub fn retriever_cache_key(&self) -> String {
        format!(
            "{}|{}",
            self.retriever.as_str(),
            self.data_source.index_name()
        )
    }

    /// Cache key for the reranker component.
    pub fn reranker_cache_key(&self) -> String {
        format!(
            "{}|{}",
            self.reranker_category.as_str(),
            self.reranker_model
        )
    }
}

/// Concrete generation backend protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorBackend {
    /// OpenAI chat completions
    Openai,
    /// Anthropic messages API
    Anthropic,
    /// vLLM OpenAI-compatible server
    Vllm,
    /// LiteLLM proxy
    Litellm,
    /// Azure OpenAI deployment
    Azure,
}

impl GeneratorBackend {
    /// Wire name of the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Vllm => "vllm",
            Self::Litellm => "litellm",
            Self::Azure => "azure",
        }
    }
}

/// Resolved generator configuration: the concrete (RAG method, backend,
/// model, credential) tuple behind a logical generator identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorProfile {
    /// RAG method driving prompt construction
    pub rag_method: String,
    /// Backend protocol
    pub backend: GeneratorBackend,
    /// Concrete model/checkpoint name
    pub model: String,
    /// Environment variable holding the backend credential, if one is needed
    pub credential_env: Option<&'static str>,
}

impl GeneratorProfile {
    /// Cache key for the generator component.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.rag_method,
            self.model,
            self.backend.as_str()
        )
    }
}

/// Map a logical generator identifier to its concrete profile.
///
/// Unrecognized identifiers fall back to the default (OpenAI) row. An
/// explicit RAG-method override replaces the table's method.
pub fn resolve_generator(logical_id: &str, selector: &RagMethodSelector) -> GeneratorProfile {
    let (method, model, backend, credential_env) = match logical_id {
        "openai" => (
            "basic-rag",
            "gpt-4o-mini",
            GeneratorBackend::Openai,
            Some("OPENAI_API_KEY"),
        ),
        "claude" => (
            "basic-rag",
            "claude-3-5-sonnet",
            GeneratorBackend::Anthropic,
            Some("ANTHROPIC_API_KEY"),
        ),
        "llama-3" => (
            "basic-rag",
            "meta-llama/Meta-Llama-3.1-8B-Instruct",
            GeneratorBackend::Vllm,
            Some("VLLM_BASE_URL"),
        ),
        "mistral" => (
            "basic-rag",
            "mistralai/Mistral-7B-Instruct-v0.3",
            GeneratorBackend::Vllm,
            Some("VLLM_BASE_URL"),
        ),
        "litellm" => (
            "basic-rag",
            "gpt-4o-mini",
            GeneratorBackend::Litellm,
            Some("LITELLM_BASE_URL"),
        ),
        "azure" => (
            "basic-rag",
            "gpt-4o-mini",
            GeneratorBackend::Azure,
            Some("AZURE_OPENAI_ENDPOINT"),
        ),
        _ => (
            "basic-rag",
            "gpt-4o-mini",
            GeneratorBackend::Openai,
            Some("OPENAI_API_KEY"),
        ),
    };

    let rag_method = match selector {
        RagMethodSelector::Auto => method.to_string(),
        RagMethodSelector::Named(name) => name.clone(),
    };

    GeneratorProfile {
        rag_method,
        backend,
        model: model.to_string(),
        credential_env,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_identifiers_map_to_defaults() {
        assert_eq!(PipelineMode::parse_or_default("bogus"), PipelineMode::Rag);
        assert_eq!(
            RetrieverKind::parse_or_default("splade"),
            RetrieverKind::Bm25
        );
        assert_eq!(
            RerankerCategory::parse_or_default("rankgpt"),
            RerankerCategory::Flashrank
        );
        assert_eq!(DataSource::parse_or_default("beir"), DataSource::Wiki);
    }

    #[test]
    fn none_category_is_preserved() {
        assert_eq!(
            RerankerCategory::parse_or_default("none"),
            RerankerCategory::None
        );
    }

    #[test]
    fn cache_keys_separate_stage_parameters() {
        let config = PipelineConfig {
            data_source: DataSource::Msmarco,
            ..Default::default()
        };
        assert_eq!(config.retriever_cache_key(), "bm25|msmarco");
        assert_eq!(
            config.reranker_cache_key(),
            "flashrank|ms-marco-MiniLM-L-12-v2"
        );
    }

    #[test]
    fn generator_lookup_falls_back_to_default_row() {
        let profile = resolve_generator("unknown-model", &RagMethodSelector::Auto);
        assert_eq!(profile.backend, GeneratorBackend::Openai);
        assert_eq!(profile.model, "gpt-4o-mini");
        assert_eq!(profile.rag_method, "basic-rag");
    }

    #[test]
    fn rag_method_override_wins() {
        let profile = resolve_generator(
            "claude",
            &RagMethodSelector::Named("chain-of-thought-rag".to_string()),
        );
        assert_eq!(profile.rag_method, "chain-of-thought-rag");
        assert_eq!(profile.backend, GeneratorBackend::Anthropic);
        assert_eq!(
            profile.cache_key(),
            "chain-of-thought-rag|claude-3-5-sonnet|anthropic"
        );
    }
}
