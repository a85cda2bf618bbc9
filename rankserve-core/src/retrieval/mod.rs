//! Retrieval stage: selecting an initial ranked candidate set for a query
//!
//! Two in-tree retriever families back the catalog identifiers: lexical BM25
//! and a deterministic hash-projection semantic retriever standing in for
//! the dense methods.

use async_trait::async_trait;

use crate::core::{ContextItem, Result};

pub mod bm25;
pub mod semantic;

pub use bm25::Bm25Retriever;
pub use semantic::SemanticRetriever;

/// A retrieval component: `retrieve(query) -> ranked contexts`.
///
/// Output order is the ranking; implementations return at most `n_docs`
/// items and never error on an empty index (they return an empty list).
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Retrieve the top `n_docs` contexts for `query`.
    async fn retrieve(&self, query: &str, n_docs: usize) -> Result<Vec<ContextItem>>;

    /// Method name for logging and cache diagnostics.
    fn name(&self) -> &str;
}
