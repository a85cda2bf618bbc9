//! BM25 keyword retrieval over an in-memory corpus

use std::collections::HashMap;

use async_trait::async_trait;

use crate::core::{ContextItem, Result};
use crate::corpus::Corpus;
use crate::retrieval::Retriever;

/// BM25 retrieval system for keyword-based search
pub struct Bm25Retriever {
    /// BM25 parameter k1 (term frequency saturation)
    k1: f32,
    /// BM25 parameter b (length normalization)
    b: f32,
    /// Document text and title by id
    documents: HashMap<String, (String, String)>,
    /// Term frequencies per document: term -> document_id -> frequency
    term_frequencies: HashMap<String, HashMap<String, f32>>,
    /// Document frequencies: term -> number of documents containing term
    document_frequencies: HashMap<String, usize>,
    /// Document lengths (in tokens)
    document_lengths: HashMap<String, usize>,
    /// Average document length
    avg_doc_length: f32,
    /// Total number of documents
    total_docs: usize,
}

impl Bm25Retriever {
    /// Index a corpus with default parameters (k1=1.2, b=0.75).
    pub fn from_corpus(corpus: &Corpus) -> Self {
        Self::with_parameters(corpus, 1.2, 0.75)
    }

    /// Index a corpus with custom BM25 parameters.
    pub fn with_parameters(corpus: &Corpus, k1: f32, b: f32) -> Self {
        let mut retriever = Self {
            k1,
            b,
            documents: HashMap::new(),
            term_frequencies: HashMap::new(),
            document_frequencies: HashMap::new(),
            document_lengths: HashMap::new(),
            avg_doc_length: 0.0,
            total_docs: 0,
        };
        for doc in &corpus.documents {
            retriever.index_document(&doc.id, &doc.title, &doc.text);
        }
        retriever
    }

    fn index_document(&mut self, id: &str, title: &str, text: &str) {
        let tokens = tokenize(text);
        let doc_length = tokens.len();

        let mut term_freq: HashMap<String, usize> = HashMap::new();
        for token in &tokens {
            *term_freq.entry(token.clone()).or_insert(0) += 1;
        }

        for term in term_freq.keys() {
            *self.document_frequencies.entry(term.clone()).or_insert(0) += 1;
        }

        // Store normalized term frequencies
        for (term, freq) in term_freq {
            let normalized_freq = freq as f32 / doc_length.max(1) as f32;
            self.term_frequencies
                .entry(term)
                .or_default()
                .insert(id.to_string(), normalized_freq);
        }

        self.document_lengths.insert(id.to_string(), doc_length);
        self.documents
            .insert(id.to_string(), (title.to_string(), text.to_string()));
        self.total_docs += 1;
        self.update_avg_doc_length();
    }

    /// Score all indexed documents for `query` and return the top `limit`.
    pub fn search(&self, query: &str, limit: usize) -> Vec<ContextItem> {
        if self.total_docs == 0 {
            return Vec::new();
        }

        let query_tokens = tokenize(query);
        let mut doc_scores: HashMap<String, f32> = HashMap::new();

        for token in &query_tokens {
            if let Some(doc_freqs) = self.term_frequencies.get(token) {
                let idf = self.calculate_idf(token);

                for (doc_id, tf) in doc_freqs {
                    let doc_length = *self.document_lengths.get(doc_id).unwrap_or(&0);
                    let term_score = self.calculate_term_score(*tf, doc_length, idf);
                    *doc_scores.entry(doc_id.clone()).or_insert(0.0) += term_score;
                }
            }
        }

        let mut scored: Vec<(String, f32)> = doc_scores.into_iter().collect();
        // Descending score, ascending id as the deterministic tie-break
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(limit);

        scored
            .into_iter()
            .filter_map(|(doc_id, score)| {
                self.documents.get(&doc_id).map(|(title, text)| {
                    let mut item = ContextItem::new(doc_id, text.clone()).with_score(score);
                    if !title.is_empty() {
                        item = item.with_title(title.clone());
                    }
                    item
                })
            })
            .collect()
    }

    /// Total number of indexed documents.
    pub fn document_count(&self) -> usize {
        self.total_docs
    }

    /// Lucene-style IDF: log(N/df) + 1, non-negative for common terms.
    fn calculate_idf(&self, term: &str) -> f32 {
        let doc_freq = self.document_frequencies.get(term).unwrap_or(&0);
        if *doc_freq == 0 {
            return 0.0;
        }
        (self.total_docs as f32 / *doc_freq as f32).ln() + 1.0
    }

    fn calculate_term_score(&self, tf: f32, doc_length: usize, idf: f32) -> f32 {
        let tf_component = (tf * (self.k1 + 1.0))
            / (tf + self.k1 * (1.0 - self.b + self.b * (doc_length as f32 / self.avg_doc_length)));
        idf * tf_component
    }

    fn update_avg_doc_length(&mut self) {
        if self.total_docs > 0 {
            let total_length: usize = self.document_lengths.values().sum();
            self.avg_doc_length = total_length as f32 / self.total_docs as f32;
        }
    }
}

#[async_trait]
impl Retriever for Bm25Retriever {
    async fn retrieve(&self, query: &str, n_docs: usize) -> Result<Vec<ContextItem>> {
        Ok(self.search(query, n_docs))
    }

    fn name(&self) -> &str {
        "bm25"
    }
}

/// Tokenize text into search terms: lowercase, strip punctuation, drop stop
/// words and terms shorter than three characters.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|s| {
            s.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|s| !s.is_empty() && s.len() > 2 && !is_stop_word(s))
        .collect()
}

fn is_stop_word(word: &str) -> bool {
    const STOP_WORDS: &[&str] = &[
        "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for", "not", "on",
        "with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from", "they", "we",
        "say", "her", "she", "or", "an", "will", "my", "one", "all", "would", "there", "their",
        "what", "so", "up", "out", "if", "about", "who", "get", "which", "go", "me", "when",
        "make", "can", "like", "time", "no", "just", "him", "know", "take", "into", "year",
        "your", "some", "could", "them", "see", "other", "than", "then", "now", "only", "its",
        "over", "also", "after", "use", "two", "how", "our", "way", "even", "new", "want",
        "because", "any", "these", "give", "day", "most", "us",
    ];
    STOP_WORDS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusDocument;

    fn fixture_corpus() -> Corpus {
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

    #[test]
    fn france_ranks_above_germany() {
        let retriever = Bm25Retriever::from_corpus(&fixture_corpus());
        let results = retriever.search("capital of France", 2);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "1");
        assert_eq!(results[1].id, "2");
        assert!(results[0].score.unwrap() > results[1].score.unwrap());
    }

    #[test]
    fn empty_corpus_returns_no_results() {
        let retriever = Bm25Retriever::from_corpus(&Corpus::new("wiki", vec![]));
        assert!(retriever.search("anything", 10).is_empty());
    }

    #[test]
    fn tokenization_drops_stop_words_and_punctuation() {
        let tokens = tokenize("The quick, brown fox!");
        assert!(tokens.contains(&"quick".to_string()));
        assert!(tokens.contains(&"brown".to_string()));
        assert!(tokens.contains(&"fox".to_string()));
        assert!(!tokens.contains(&"the".to_string()));
    }

    #[tokio::test]
    async fn retrieve_respects_limit() {
        let retriever = Bm25Retriever::from_corpus(&fixture_corpus());
        let results = retriever.retrieve("capital", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }
}
