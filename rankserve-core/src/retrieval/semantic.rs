//! Hash-projection semantic retrieval
//!
//! Stands in for the dense retriever methods (DPR, ANCE, Contriever,
//! ColBERT, BGE) with a deterministic hash-based embedding: each word maps to
//! a stable pseudo-random unit vector, a text embeds as the normalized mean
//! of its word vectors, and documents rank by cosine similarity to the
//! query. The method name is mixed into the hash so different retriever
//! kinds project into different spaces.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;

use crate::config::RetrieverKind;
use crate::core::{ContextItem, Result};
use crate::corpus::Corpus;
use crate::retrieval::Retriever;

const EMBEDDING_DIM: usize = 128;

/// Dense-style retriever over hash-projection embeddings.
pub struct SemanticRetriever {
    kind: RetrieverKind,
    /// (id, title, text, embedding) per corpus document
    documents: Vec<(String, String, String, Vec<f32>)>,
}

impl SemanticRetriever {
    /// Embed every corpus document up front.
    pub fn new(kind: RetrieverKind, corpus: &Corpus) -> Self {
        let documents = corpus
            .documents
            .iter()
            .map(|doc| {
                let embedding = embed(kind.as_str(), &format!("{} {}", doc.title, doc.text));
                (
                    doc.id.clone(),
                    doc.title.clone(),
                    doc.text.clone(),
                    embedding,
                )
            })
            .collect();
        Self { kind, documents }
    }
}

#[async_trait]
impl Retriever for SemanticRetriever {
    async fn retrieve(&self, query: &str, n_docs: usize) -> Result<Vec<ContextItem>> {
        let query_embedding = embed(self.kind.as_str(), query);

        let mut scored: Vec<(usize, f32)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(i, (_, _, _, embedding))| (i, cosine_similarity(&query_embedding, embedding)))
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.documents[a.0].0.cmp(&self.documents[b.0].0))
        });
        scored.truncate(n_docs);

        Ok(scored
            .into_iter()
            .map(|(i, score)| {
                let (id, title, text, _) = &self.documents[i];
                let mut item = ContextItem::new(id.clone(), text.clone()).with_score(score);
                if !title.is_empty() {
                    item = item.with_title(title.clone());
                }
                item
            })
            .collect())
    }

    fn name(&self) -> &str {
        self.kind.as_str()
    }
}

/// Embed a text as the normalized mean of its word vectors.
fn embed(method: &str, text: &str) -> Vec<f32> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return vec![0.0; EMBEDDING_DIM];
    }

    let mut result = vec![0.0; EMBEDDING_DIM];
    for word in &words {
        let word_vector = word_vector(method, &word.to_lowercase());
        for (i, value) in word_vector.iter().enumerate() {
            result[i] += value;
        }
    }

    let word_count = words.len() as f32;
    for value in &mut result {
        *value /= word_count;
    }

    normalize(&mut result);
    result
}

/// Stable pseudo-random unit vector for a word, seeded per dimension.
fn word_vector(method: &str, word: &str) -> Vec<f32> {
    let mut vector = Vec::with_capacity(EMBEDDING_DIM);
    for i in 0..EMBEDDING_DIM {
        let mut hasher = DefaultHasher::new();
        method.hash(&mut hasher);
        word.hash(&mut hasher);
        i.hash(&mut hasher);

        let hash = hasher.finish();
        // Map the hash to [-1, 1]
        let value = ((hash % 2000) as f32 - 1000.0) / 1000.0;
        vector.push(value);
    }
    normalize(&mut vector);
    vector
}

fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
