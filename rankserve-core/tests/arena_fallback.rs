//! Arena evaluation tests: fallback metrics, graded metrics, cache reuse

mod common;

use common::make_runner;

use rankserve_core::arena::{ArenaEvaluator, BenchmarkDocument, DatasetStore, QrelIndex, QrelStore};
use rankserve_core::config::{PipelineConfig, PipelineMode, RerankerCategory};
use rankserve_core::ContextItem;

/// Base URL that refuses connections immediately, forcing cache-only loads.
const UNREACHABLE: &str = "http://127.0.0.1:9";

fn arena_config(category: RerankerCategory, model: &str) -> PipelineConfig {
    PipelineConfig {
        mode: PipelineMode::Rerank,
        reranker_category: category,
        reranker_model: model.to_string(),
        ..Default::default()
    }
}

fn evaluator(dir: &std::path::Path) -> ArenaEvaluator {
    ArenaEvaluator::new(
        make_runner(),
        DatasetStore::new(dir, UNREACHABLE),
        QrelStore::new(dir, UNREACHABLE),
    )
}

fn write_dataset(dir: &std::path::Path, key: &str, documents: &[BenchmarkDocument]) {
    std::fs::write(
        dir.join(format!("{key}.docs.json")),
        serde_json::to_string(documents).unwrap(),
    )
    .unwrap();
}

/// Three queries with known binary relevance when candidates keep their
/// original order (the `none` category):
/// q1 relevant at rank 1, q2 relevant at rank 2, q3 never relevant.
fn fallback_fixture() -> Vec<BenchmarkDocument> {
    vec![
        BenchmarkDocument {
            query_id: "q1".to_string(),
            query: "capital of France".to_string(),
            answers: vec!["Paris".to_string()],
            contexts: vec![
                ContextItem::new("d1", "The capital of France is Paris."),
                ContextItem::new("d2", "Berlin is the capital of Germany."),
            ],
        },
        BenchmarkDocument {
            query_id: "q2".to_string(),
            query: "capital of Germany".to_string(),
            answers: vec!["Berlin".to_string()],
            contexts: vec![
                ContextItem::new("d3", "Madrid is the capital of Spain."),
                ContextItem::new("d4", "Berlin is the capital of Germany."),
            ],
        },
        BenchmarkDocument {
            query_id: "q3".to_string(),
            query: "tallest mountain".to_string(),
            answers: vec!["Everest".to_string()],
            contexts: vec![
                ContextItem::new("d5", "The Nile is the longest river."),
                ContextItem::new("d6", "Paris is a city in France."),
            ],
        },
    ]
}

#[tokio::test]
async fn fallback_metrics_reproduce_the_binary_formula() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), "dl19", &fallback_fixture());

    let arena = evaluator(dir.path());
    let config = arena_config(RerankerCategory::None, "");

    let result = arena
        .compare("dl19", 20, 3, &config, &config)
        .await
        .unwrap();

    assert_eq!(result.query_count, 3);
    assert!(result.pipeline_a.used_fallback);
    assert!(result.pipeline_b.used_fallback);

    // q1: rr = 1, ndcg = 1; q2: rr = 1/2, ndcg = 1/log2(3); q3: both 0.
    let expected_mrr = (1.0 + 0.5 + 0.0) / 3.0 * 100.0;
    let expected_ndcg = (1.0 + 1.0 / 3f64.log2() + 0.0) / 3.0 * 100.0;
    assert!((result.pipeline_a.mrr_10 - expected_mrr).abs() < 1e-9);
    assert!((result.pipeline_a.ndcg_10 - expected_ndcg).abs() < 1e-9);

    // Identical configurations score identically.
    assert_eq!(result.pipeline_a.ndcg_10, result.pipeline_b.ndcg_10);
    assert_eq!(result.pipeline_a.mrr_10, result.pipeline_b.mrr_10);
}

#[tokio::test]
async fn fallback_scores_stay_within_percentage_bounds() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), "beir-covid", &fallback_fixture());

    let arena = evaluator(dir.path());
    let config_a = arena_config(RerankerCategory::None, "");
    let config_b = arena_config(RerankerCategory::Flashrank, "ms-marco-MiniLM-L-12-v2");

    let result = arena
        .compare("beir-covid", 20, 5, &config_a, &config_b)
        .await
        .unwrap();

    for side in [&result.pipeline_a, &result.pipeline_b] {
        assert!((0.0..=100.0).contains(&side.ndcg_10));
        assert!((0.0..=100.0).contains(&side.mrr_10));
        assert!(side.latency_ms >= 0.0);
    }
}

#[tokio::test]
async fn cached_qrels_drive_graded_metrics() {
    let dir = tempfile::tempdir().unwrap();

    let documents = vec![BenchmarkDocument {
        query_id: "q1".to_string(),
        query: "capital of France".to_string(),
        answers: vec![],
        contexts: vec![
            ContextItem::new("d1", "The capital of France is Paris."),
            ContextItem::new("d2", "Berlin is the capital of Germany."),
        ],
    }];
    write_dataset(dir.path(), "dl20", &documents);

    // d2 is the (only) relevant document, graded 2. With the identity
    // ordering it lands at rank 2.
    let qrels = QrelIndex::from_trec("dl20", "q1 0 d2 2\nq1 0 d1 0\n");
    std::fs::write(
        dir.path().join("dl20.qrels.json"),
        serde_json::to_string(&qrels).unwrap(),
    )
    .unwrap();

    let arena = evaluator(dir.path());
    let config = arena_config(RerankerCategory::None, "");
    let result = arena.compare("dl20", 20, 1, &config, &config).await.unwrap();

    assert!(!result.pipeline_a.used_fallback);
    // DCG = (2^2 - 1)/log2(3), IDCG = (2^2 - 1)/log2(2); rr = 1/2.
    let expected_ndcg = (3.0 / 3f64.log2()) / 3.0 * 100.0;
    assert!((result.pipeline_a.ndcg_10 - expected_ndcg).abs() < 1e-6);
    assert!((result.pipeline_a.mrr_10 - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn shared_reranker_configuration_is_loaded_once() {
    let dir = tempfile::tempdir().unwrap();
    write_dataset(dir.path(), "beir-scifact", &fallback_fixture());

    let runner = make_runner();
    let arena = ArenaEvaluator::new(
        runner.clone(),
        DatasetStore::new(dir.path(), UNREACHABLE),
        QrelStore::new(dir.path(), UNREACHABLE),
    );

    let config = arena_config(RerankerCategory::Flashrank, "ms-marco-MiniLM-L-12-v2");
    arena
        .compare("beir-scifact", 20, 3, &config, &config)
        .await
        .unwrap();

    // Both sides shared one cached reranker instance.
    let snapshot = runner.cache().snapshot().await;
    assert_eq!(
        snapshot.rerankers,
        vec!["flashrank|ms-marco-MiniLM-L-12-v2".to_string()]
    );
}

#[tokio::test]
async fn unavailable_dataset_is_a_hard_error() {
    let dir = tempfile::tempdir().unwrap();
    let arena = evaluator(dir.path());
    let config = arena_config(RerankerCategory::None, "");

    let err = arena.compare("beir-news", 20, 5, &config, &config).await;
    assert!(err.is_err());
}
