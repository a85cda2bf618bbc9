//! End-to-end orchestration tests over the fixture corpus

mod common;

use common::{fixture_config, make_runner};

use rankserve_core::config::{DataSource, PipelineConfig, PipelineMode, RerankerCategory};
use rankserve_core::pipeline::{ComponentRegistry, PipelineRunner};
use rankserve_core::ComponentCache;
use std::sync::Arc;

#[tokio::test]
async fn retrieve_mode_stops_after_retrieval() {
    let runner = make_runner();
    let config = fixture_config(PipelineMode::Retrieve, RerankerCategory::Flashrank);

    let result = runner.run("capital of France", &config).await;

    assert!(result.error.is_none());
    assert_eq!(result.retrieved_docs.len(), 2);
    assert_eq!(result.retrieved_docs[0].id, "1");
    assert_eq!(result.retrieved_docs[1].id, "2");
    assert!(
        result.retrieved_docs[0].score.unwrap() > result.retrieved_docs[1].score.unwrap(),
        "BM25 must rank the France document above the Germany document"
    );
    assert!(result.reranked_docs.is_empty());
    assert!(result.answer.is_none());
    assert!(result.retriever_latency_ms >= 0.0);
}

#[tokio::test]
async fn none_category_passes_retrieved_docs_through() {
    let runner = make_runner();
    let mut config = fixture_config(PipelineMode::Rerank, RerankerCategory::None);
    config.n_contexts = 1;

    let result = runner.run("capital of France", &config).await;

    assert!(result.error.is_none());
    assert_eq!(result.reranked_docs.len(), 1);
    assert_eq!(result.reranked_docs[0].id, result.retrieved_docs[0].id);
    assert!(
        result.reranked_docs.iter().all(|d| d.rank_delta.is_none()),
        "the none category must not populate rank deltas"
    );
    assert_eq!(result.reranker_latency_ms, 0.0);
}

#[tokio::test]
async fn rerank_mode_populates_rank_deltas() {
    let runner = make_runner();
    let config = fixture_config(PipelineMode::Rerank, RerankerCategory::Flashrank);

    let result = runner.run("capital of France", &config).await;

    assert!(result.error.is_none());
    assert!(!result.reranked_docs.is_empty());
    for (new_rank, doc) in result.reranked_docs.iter().enumerate() {
        let old_rank = result
            .retrieved_docs
            .iter()
            .position(|r| r.id == doc.id)
            .expect("reranked id came from the retrieved list");
        assert_eq!(doc.rank_delta, Some(old_rank as i64 - new_rank as i64));
    }
    assert!(result.answer.is_none());
}

#[tokio::test]
async fn rag_mode_produces_extractive_answer() {
    let runner = make_runner();
    let config = fixture_config(PipelineMode::Rag, RerankerCategory::Flashrank);

    let result = runner.run("capital of France", &config).await;

    assert!(result.error.is_none(), "error: {:?}", result.error);
    let answer = result.answer.expect("rag mode must produce an answer");
    assert!(answer.contains("Paris"), "answer was: {answer}");
    assert_eq!(result.rag_method.as_deref(), Some("basic-rag"));
    assert!(result.generator_latency_ms >= 0.0);
}

#[tokio::test]
async fn empty_retrieval_skips_later_stages_gracefully() {
    let runner = make_runner();
    // The custom source was never seeded, so retrieval returns nothing.
    let config = PipelineConfig {
        data_source: DataSource::Custom,
        ..fixture_config(PipelineMode::Rag, RerankerCategory::Flashrank)
    };

    let result = runner.run("capital of France", &config).await;

    assert!(result.error.is_none());
    assert!(result.retrieved_docs.is_empty());
    assert!(result.reranked_docs.is_empty());
    assert!(result.answer.is_none());
    assert_eq!(result.reranker_latency_ms, 0.0);
}

#[tokio::test]
async fn repeated_runs_reuse_cached_components() {
    let runner = make_runner();
    let config = fixture_config(PipelineMode::Rerank, RerankerCategory::Flashrank);

    runner.run("capital of France", &config).await;
    runner.run("capital of Germany", &config).await;

    let snapshot = runner.cache().snapshot().await;
    assert_eq!(snapshot.retrievers, vec!["bm25|wiki".to_string()]);
    assert_eq!(
        snapshot.rerankers,
        vec!["flashrank|ms-marco-MiniLM-L-12-v2".to_string()]
    );
}

#[tokio::test]
async fn generation_failure_preserves_earlier_stage_results() {
    // An unreachable self-hosted backend: construction succeeds, the call
    // fails after bounded retries.
    std::env::set_var("VLLM_BASE_URL", "http://127.0.0.1:9");

    let runner = make_runner();
    let config = PipelineConfig {
        generator: "llama-3".to_string(),
        ..fixture_config(PipelineMode::Rag, RerankerCategory::Flashrank)
    };

    let result = runner.run("capital of France", &config).await;

    assert!(result.error.is_some());
    assert_eq!(result.retrieved_docs.len(), 2);
    assert!(!result.reranked_docs.is_empty());
    assert!(result.answer.is_none());
}

#[tokio::test]
async fn construction_failure_leaves_cache_clean_for_retry() {
    // No corpus is wrong enough to fail construction in-tree, so drive the
    // cache directly through the runner's resolve path with an empty
    // registry and confirm the health-visible key set stays consistent.
    let registry = ComponentRegistry::new();
    let cache = Arc::new(ComponentCache::new());
    let runner = PipelineRunner::new(cache, Arc::new(registry));

    // Resolving a reranker for the sentinel category is a config error and
    // must not populate the cache.
    let err = runner
        .resolve_reranker(RerankerCategory::None, "whatever")
        .await;
    assert!(err.is_err());
    assert!(runner.cache().snapshot().await.rerankers.is_empty());

    // A valid category on the same runner succeeds afterwards.
    runner
        .resolve_reranker(RerankerCategory::Monot5, "monot5-base-msmarco")
        .await
        .unwrap();
    assert_eq!(
        runner.cache().snapshot().await.rerankers,
        vec!["monot5|monot5-base-msmarco".to_string()]
    );
}
