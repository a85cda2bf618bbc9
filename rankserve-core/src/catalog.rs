//! Static catalog of supported stage identifiers
//!
//! Backs the `/models` introspection endpoint and the agent advisor. Model
//! lists mirror the checkpoints each category ships with.

use crate::config::{RerankerCategory, RetrieverKind};

/// Supported retriever method names.
pub fn retrievers() -> Vec<&'static str> {
    RetrieverKind::ALL.iter().map(|k| k.as_str()).collect()
}

/// Models available within one reranker category.
pub fn reranker_models(category: RerankerCategory) -> &'static [&'static str] {
    match category {
        RerankerCategory::None => &[],
        RerankerCategory::Flashrank => &[
            "ms-marco-TinyBERT-L-2-v2",
            "ms-marco-MiniLM-L-12-v2",
            "ms-marco-MultiBERT-L-12",
            "rank-T5-flan",
            "ce-esci-MiniLM-L12-v2",
        ],
        RerankerCategory::TransformerRanker => &[
            "bge-reranker-base",
            "bge-reranker-large",
            "bge-reranker-v2-m3",
            "mxbai-rerank-base",
            "mxbai-rerank-large",
            "ms-marco-MiniLM-L-6-v2",
            "ms-marco-MiniLM-L-12-v2",
        ],
        RerankerCategory::Monot5 => &[
            "monot5-base-msmarco",
            "monot5-large-msmarco",
            "monot5-base-msmarco-10k",
        ],
        RerankerCategory::ColbertRanker => &["colbertv2.0", "jina-colbert-v1-en"],
        RerankerCategory::Monobert => &["monobert-large"],
    }
}

/// Every active reranker category with its model list.
pub fn reranker_catalog() -> Vec<(&'static str, &'static [&'static str])> {
    RerankerCategory::ACTIVE
        .iter()
        .map(|c| (c.as_str(), reranker_models(*c)))
        .collect()
}

/// Supported logical generator identifiers.
pub fn generators() -> &'static [&'static str] {
    &["openai", "claude", "llama-3", "mistral", "litellm", "azure"]
}

/// Supported RAG method identifiers.
pub fn rag_methods() -> &'static [&'static str] {
    &["basic-rag", "chain-of-thought-rag", "zero-shot"]
}

/// Benchmark dataset keys accepted by the arena endpoint.
pub fn arena_datasets() -> &'static [&'static str] {
    &[
        "dl19",
        "dl20",
        "beir-covid",
        "beir-nfc",
        "beir-touche",
        "beir-dbpedia",
        "beir-scifact",
        "beir-signal",
        "beir-news",
        "beir-robust04",
        "beir-arguana",
        "beir-fever",
        "beir-fiqa",
        "beir-quora",
        "beir-scidocs",
    ]
}
