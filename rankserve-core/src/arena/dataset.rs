//! Benchmark dataset store
//!
//! A benchmark document is one query with its pre-retrieved candidate
//! contexts and gold answers. Datasets are cached as JSON files next to the
//! qrels and fetched from the configured source on miss. Unlike qrels, an
//! unavailable dataset is fatal for an arena run: there is nothing to
//! evaluate without the candidates.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::qrels::normalize_key;
use crate::core::{ContextItem, RankServeError};

/// One benchmark query with pre-retrieved candidates and gold answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkDocument {
    /// Query identifier (matches qrels)
    pub query_id: String,
    /// Query text
    pub query: String,
    /// Gold answer strings
    #[serde(default)]
    pub answers: Vec<String>,
    /// Pre-retrieved candidate contexts, ranking order
    pub contexts: Vec<ContextItem>,
}

/// Dataset acquisition errors.
#[derive(Debug, thiserror::Error)]
pub enum ArenaDataError {
    /// Dataset neither cached nor fetchable
    #[error("dataset '{0}' is not cached and could not be fetched: {1}")]
    Unavailable(String, String),

    /// Cached or fetched file did not parse
    #[error("malformed dataset file for '{0}': {1}")]
    Malformed(String, String),

    /// Filesystem failure around the cache directory
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ArenaDataError> for RankServeError {
    fn from(err: ArenaDataError) -> Self {
        RankServeError::Dataset {
            message: err.to_string(),
        }
    }
}

/// Loads benchmark documents, one cached JSON file per dataset key.
pub struct DatasetStore {
    cache_dir: PathBuf,
    base_url: String,
    client: reqwest::Client,
}

impl DatasetStore {
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
            .join(format!("{}.docs.json", normalize_key(dataset)))
    }

    /// Load the benchmark documents for a dataset key.
    pub async fn load(&self, dataset: &str) -> Result<Vec<BenchmarkDocument>, ArenaDataError> {
        let path = self.cache_path(dataset);
        if path.exists() {
            return parse_file(dataset, &path);
        }

        let url = format!("{}/{}.docs.json", self.base_url, normalize_key(dataset));
        let raw = self
            .fetch(&url)
            .await
            .map_err(|err| ArenaDataError::Unavailable(dataset.to_string(), err))?;

        let documents: Vec<BenchmarkDocument> = serde_json::from_str(&raw)
            .map_err(|err| ArenaDataError::Malformed(dataset.to_string(), err.to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, &raw)?;
        log::info!(
            "downloaded benchmark dataset {dataset} ({} queries)",
            documents.len()
        );
        Ok(documents)
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

fn parse_file(dataset: &str, path: &Path) -> Result<Vec<BenchmarkDocument>, ArenaDataError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw)
        .map_err(|err| ArenaDataError::Malformed(dataset.to_string(), err.to_string()))
}
