//! Corpus loading for the retrieval stage
//!
//! A corpus is a flat list of identified passages. The server seeds one per
//! data source at startup; tests build them inline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::Result;

/// One passage in a corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusDocument {
    /// Unique identifier within the corpus
    pub id: String,
    /// Passage title
    #[serde(default)]
    pub title: String,
    /// Passage text
    pub text: String,
}

/// A named collection of passages backing one retrieval index.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Index name (matches [`crate::config::DataSource::index_name`])
    pub name: String,
    /// All passages
    pub documents: Vec<CorpusDocument>,
}

impl Corpus {
    /// Build a corpus from a document list.
    pub fn new(name: impl Into<String>, documents: Vec<CorpusDocument>) -> Self {
        Self {
            name: name.into(),
            documents,
        }
    }

    /// Load a corpus from a JSON file containing an array of documents.
    pub fn from_json_file(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let documents: Vec<CorpusDocument> = serde_json::from_str(&raw)?;
        Ok(Self::new(name, documents))
    }

    /// Number of passages.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the corpus holds no passages.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_documents_from_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"1","title":"France","text":"The capital of France is Paris."}}]"#
        )
        .unwrap();

        let corpus = Corpus::from_json_file("custom", file.path()).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.documents[0].id, "1");
        assert_eq!(corpus.documents[0].title, "France");
    }
}
