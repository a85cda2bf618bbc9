//! Component registry: one constructor per stage variant
//!
//! The cache decides *when* to build a component; the registry decides
//! *how*. Each closed enum variant maps to a concrete constructor here, so
//! unrecognized identifiers can never reach construction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{DataSource, GeneratorProfile, RerankerCategory, RetrieverKind};
use crate::core::Result;
use crate::corpus::Corpus;
use crate::generation::{ExtractiveGenerator, Generator, HttpGenerator};
use crate::reranking::{CrossScoringReranker, Reranker};
use crate::retrieval::{Bm25Retriever, Retriever, SemanticRetriever};

/// Maps stage variants to component constructors over the seeded corpora.
pub struct ComponentRegistry {
    corpora: HashMap<String, Arc<Corpus>>,
}

impl ComponentRegistry {
    /// Empty registry; every data source resolves to an empty corpus.
    pub fn new() -> Self {
        Self {
            corpora: HashMap::new(),
        }
    }

    /// Seed the corpus backing a data source.
    pub fn with_corpus(mut self, source: DataSource, corpus: Corpus) -> Self {
        self.corpora
            .insert(source.index_name().to_string(), Arc::new(corpus));
        self
    }

    fn corpus_for(&self, source: DataSource) -> Arc<Corpus> {
        self.corpora
            .get(source.index_name())
            .cloned()
            .unwrap_or_else(|| Arc::new(Corpus::default()))
    }

    /// Construct the retriever for a (kind, source) pair.
    pub fn build_retriever(
        &self,
        kind: RetrieverKind,
        source: DataSource,
    ) -> Result<Arc<dyn Retriever>> {
        let corpus = self.corpus_for(source);
        log::info!(
            "loading retriever: {} [{}] ({} docs)",
            kind.as_str(),
            source.index_name(),
            corpus.len()
        );
        let retriever: Arc<dyn Retriever> = match kind {
            RetrieverKind::Bm25 => Arc::new(Bm25Retriever::from_corpus(&corpus)),
            _ => Arc::new(SemanticRetriever::new(kind, &corpus)),
        };
        Ok(retriever)
    }

    /// Construct the reranker for a (category, model) pair.
    ///
    /// The `none` sentinel is handled before the registry; calling this with
    /// it is a configuration error.
    pub fn build_reranker(
        &self,
        category: RerankerCategory,
        model: &str,
    ) -> Result<Arc<dyn Reranker>> {
        if category == RerankerCategory::None {
            return Err(crate::core::RankServeError::Config {
                message: "cannot construct a reranker for category 'none'".to_string(),
            });
        }
        log::info!("loading reranker: {} / {}", category.as_str(), model);
        Ok(Arc::new(CrossScoringReranker::for_model(category, model)))
    }

    /// Construct the generator for a resolved profile.
    ///
    /// Falls back to the extractive generator when the profile's backend is
    /// not configured in the environment.
    pub fn build_generator(&self, profile: &GeneratorProfile) -> Result<Arc<dyn Generator>> {
        match HttpGenerator::from_profile(profile)? {
            Some(generator) => {
                log::info!(
                    "loading generator: {} / {} [{}]",
                    profile.rag_method,
                    profile.model,
                    profile.backend.as_str()
                );
                Ok(Arc::new(generator))
            },
            None => {
                log::warn!(
                    "generator backend {} not configured, using extractive fallback",
                    profile.backend.as_str()
                );
                Ok(Arc::new(ExtractiveGenerator::new()))
            },
        }
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
