//! Shared fixtures for pipeline integration tests

use std::sync::Arc;

use rankserve_core::cache::ComponentCache;
use rankserve_core::config::{DataSource, PipelineConfig, PipelineMode, RerankerCategory};
use rankserve_core::corpus::{Corpus, CorpusDocument};
use rankserve_core::pipeline::{ComponentRegistry, PipelineRunner};

/// Two-document corpus from the France/Germany scenario.
pub fn fixture_corpus() -> Corpus {
    Corpus::new(
        "wiki",
        vec![
            CorpusDocument {
                id: "1".to_string(),
                title: "France".to_string(),
                text: "The capital of France is Paris.".to_string(),
            },
            CorpusDocument {
                id: "2".to_string(),
                title: "Germany".to_string(),
                text: "Berlin is the capital of Germany.".to_string(),
            },
        ],
    )
}

/// A runner over the fixture corpus with a fresh cache.
///
/// Hosted-backend credentials are cleared so generation always uses the
/// deterministic extractive fallback, regardless of the developer machine.
pub fn make_runner() -> Arc<PipelineRunner> {
    std::env::remove_var("OPENAI_API_KEY");
    std::env::remove_var("ANTHROPIC_API_KEY");

    let registry = ComponentRegistry::new().with_corpus(DataSource::Wiki, fixture_corpus());
    Arc::new(PipelineRunner::new(
        Arc::new(ComponentCache::new()),
        Arc::new(registry),
    ))
}

/// Default config narrowed to the fixture corpus sizes.
pub fn fixture_config(mode: PipelineMode, category: RerankerCategory) -> PipelineConfig {
    PipelineConfig {
        mode,
        reranker_category: category,
        n_docs: 2,
        n_contexts: 2,
        ..Default::default()
    }
}
