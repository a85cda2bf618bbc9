//! Ground-truth relevance judgments (qrels)
//!
//! Judgments are fetched once per dataset key from the configured source,
//! persisted as JSON in the cache directory, and reused across runs.
//! Acquisition failure is non-fatal: the arena falls back to binary
//! relevance metrics.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Relevance judgments for one dataset: query id → document id → grade.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QrelIndex {
    /// Dataset key these judgments belong to
    pub dataset: String,
    judgments: HashMap<String, HashMap<String, f32>>,
}

impl QrelIndex {
    /// Parse TREC-format qrels: `query_id [iteration] doc_id grade` per line.
    pub fn from_trec(dataset: &str, text: &str) -> Self {
        let mut judgments: HashMap<String, HashMap<String, f32>> = HashMap::new();
        for line in text.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let (query_id, doc_id, grade) = match fields.len() {
                4 => (fields[0], fields[2], fields[3]),
                3 => (fields[0], fields[1], fields[2]),
                _ => continue,
            };
            let Ok(grade) = grade.parse::<f32>() else {
                continue;
            };
            judgments
                .entry(query_id.to_string())
                .or_default()
                .insert(doc_id.to_string(), grade);
        }
        Self {
            dataset: dataset.to_string(),
            judgments,
        }
    }

    /// Relevance grade of (query, doc), zero when unjudged.
    pub fn grade(&self, query_id: &str, doc_id: &str) -> f32 {
        self.judgments
            .get(query_id)
            .and_then(|docs| docs.get(doc_id))
            .copied()
            .unwrap_or(0.0)
    }

    /// All judged documents for a query.
    pub fn judged(&self, query_id: &str) -> Option<&HashMap<String, f32>> {
        self.judgments.get(query_id)
    }

    /// Number of judged queries.
    pub fn len(&self) -> usize {
        self.judgments.len()
    }

    /// Whether no query has judgments.
    pub fn is_empty(&self) -> bool {
        self.judgments.is_empty()
    }
}

/// Lowercase a dataset key and squash anything non-alphanumeric to `-`.
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Fetches and persists qrels, one file per normalized dataset key.
pub struct QrelStore {
    cache_dir: PathBuf,
    base_url: String,
    client: reqwest::Client,
}

impl QrelStore {
    /// Store rooted at `cache_dir`, fetching from `base_url` on miss.
    pub fn new(cache_dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn cache_path(&self, dataset: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.qrels.json", normalize_key(dataset)))
    }

    /// Load judgments for a dataset, fetching and persisting on cache miss.
    ///
    /// Returns `None` on any acquisition failure; callers switch to the
    /// binary-relevance fallback.
    pub async fn load(&self, dataset: &str) -> Option<QrelIndex> {
        let path = self.cache_path(dataset);
        if let Some(index) = read_cached(&path) {
            return Some(index);
        }

        let url = format!("{}/{}.qrels", self.base_url, normalize_key(dataset));
        let text = match self.fetch(&url).await {
            Ok(text) => text,
            Err(err) => {
                log::warn!("qrels for {dataset} unavailable ({err}), using fallback metrics");
                return None;
            },
        };

        let index = QrelIndex::from_trec(dataset, &text);
        if index.is_empty() {
            log::warn!("qrels for {dataset} parsed empty, using fallback metrics");
            return None;
        }

        if let Err(err) = persist(&path, &index) {
            // Persisting is best effort; the in-memory judgments still count.
            log::warn!("could not persist qrels for {dataset}: {err}");
        }
        Some(index)
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }
        response.text().await.map_err(|e| e.to_string())
    }
}

fn read_cached(path: &Path) -> Option<QrelIndex> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(index) => Some(index),
        Err(err) => {
            log::warn!("ignoring corrupt qrels cache {}: {err}", path.display());
            None
        },
    }
}

fn persist(path: &Path, index: &QrelIndex) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string(index)?)
}
