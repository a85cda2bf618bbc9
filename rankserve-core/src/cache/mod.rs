//! Process-scoped component caches
//!
//! Retrievers, rerankers and generators can take seconds to minutes to
//! construct, so each is built at most once per cache key and then shared for
//! the lifetime of the process. Construction is single-flight per key:
//! concurrent misses on the same key await one construction instead of
//! racing into duplicates. A failed construction leaves the key unpopulated
//! so the next request can retry. Nothing is ever evicted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::agent::AdvisorSession;
use crate::core::Result;
use crate::generation::Generator;
use crate::reranking::Reranker;
use crate::retrieval::Retriever;

/// One single-flight keyed store.
///
/// The cell for a key is registered under the map lock before construction
/// begins, then construction runs outside the lock inside
/// [`OnceCell::get_or_try_init`]. Losers of the registration race await the
/// winner's cell rather than constructing their own instance.
struct SingleFlight<T: Clone> {
    cells: Mutex<HashMap<String, Arc<OnceCell<T>>>>,
}

impl<T: Clone> SingleFlight<T> {
    fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    async fn get_or_build<F, Fut>(&self, key: &str, build: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        // On Err the cell stays empty and the key can be retried later.
        let value = cell.get_or_try_init(build).await?;
        Ok(value.clone())
    }

    /// Keys whose construction has completed successfully.
    async fn keys(&self) -> Vec<String> {
        let cells = self.cells.lock().await;
        let mut keys: Vec<String> = cells
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

/// Snapshot of loaded component keys, exposed by the health endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheSnapshot {
    /// Loaded retriever cache keys
    pub retrievers: Vec<String>,
    /// Loaded reranker cache keys
    pub rerankers: Vec<String>,
    /// Loaded generator cache keys
    pub generators: Vec<String>,
}

/// Keyed lazy-instantiation registry for the three stage component kinds.
pub struct ComponentCache {
    retrievers: SingleFlight<Arc<dyn Retriever>>,
    rerankers: SingleFlight<Arc<dyn Reranker>>,
    generators: SingleFlight<Arc<dyn Generator>>,
}

impl ComponentCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            retrievers: SingleFlight::new(),
            rerankers: SingleFlight::new(),
            generators: SingleFlight::new(),
        }
    }

    /// Get or construct the retriever for `key`.
    pub async fn retriever<F, Fut>(&self, key: &str, build: F) -> Result<Arc<dyn Retriever>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Retriever>>>,
    {
        self.retrievers.get_or_build(key, build).await
    }

    /// Get or construct the reranker for `key`.
    pub async fn reranker<F, Fut>(&self, key: &str, build: F) -> Result<Arc<dyn Reranker>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Reranker>>>,
    {
        self.rerankers.get_or_build(key, build).await
    }

    /// Get or construct the generator for `key`.
    pub async fn generator<F, Fut>(&self, key: &str, build: F) -> Result<Arc<dyn Generator>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<dyn Generator>>>,
    {
        self.generators.get_or_build(key, build).await
    }

    /// Current loaded keys for every component kind.
    pub async fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            retrievers: self.retrievers.keys().await,
            rerankers: self.rerankers.keys().await,
            generators: self.generators.keys().await,
        }
    }
}

impl Default for ComponentCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Conversational agent sessions, keyed by session identifier.
///
/// Same no-eviction lifecycle as [`ComponentCache`], but keyed by caller
/// session rather than component configuration.
pub struct AgentSessionCache {
    sessions: Mutex<HashMap<String, Arc<Mutex<AdvisorSession>>>>,
}

impl AgentSessionCache {
    /// Create an empty session cache.
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create the session for `session_id`.
    pub async fn session(&self, session_id: &str) -> Arc<Mutex<AdvisorSession>> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(AdvisorSession::new(session_id))))
            .clone()
    }

    /// Identifiers of all live sessions.
    pub async fn keys(&self) -> Vec<String> {
        let sessions = self.sessions.lock().await;
        let mut keys: Vec<String> = sessions.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for AgentSessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::core::RankServeError;

    #[tokio::test]
    async fn identical_keys_share_one_instance() {
        let flight: SingleFlight<Arc<AtomicUsize>> = SingleFlight::new();
        let constructions = Arc::new(AtomicUsize::new(0));

        let first = flight
            .get_or_build("bm25|wiki", || {
                let constructions = constructions.clone();
                async move {
                    constructions.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(AtomicUsize::new(7)))
                }
            })
            .await
            .unwrap();

        let second = flight
            .get_or_build("bm25|wiki", || {
                let constructions = constructions.clone();
                async move {
                    constructions.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(AtomicUsize::new(8)))
                }
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_keys_never_collide() {
        let flight: SingleFlight<Arc<AtomicUsize>> = SingleFlight::new();

        let a = flight
            .get_or_build("bm25|wiki", || async { Ok(Arc::new(AtomicUsize::new(1))) })
            .await
            .unwrap();
        let b = flight
            .get_or_build("bm25|msmarco", || async { Ok(Arc::new(AtomicUsize::new(2))) })
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(flight.keys().await.len(), 2);
    }

    #[tokio::test]
    async fn concurrent_misses_construct_once() {
        let flight: Arc<SingleFlight<Arc<AtomicUsize>>> = Arc::new(SingleFlight::new());
        let constructions = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flight = flight.clone();
            let constructions = constructions.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .get_or_build("shared", || {
                        let constructions = constructions.clone();
                        async move {
                            // Hold the construction open so every task hits
                            // the in-flight cell.
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            constructions.fetch_add(1, Ordering::SeqCst);
                            Ok(Arc::new(AtomicUsize::new(0)))
                        }
                    })
                    .await
                    .unwrap()
            }));
        }

        let instances: Vec<_> = futures_join_all(handles).await;
        assert_eq!(constructions.load(Ordering::SeqCst), 1);
        for instance in &instances[1..] {
            assert!(Arc::ptr_eq(&instances[0], instance));
        }
    }

    #[tokio::test]
    async fn failed_construction_is_not_cached() {
        let flight: SingleFlight<Arc<AtomicUsize>> = SingleFlight::new();

        let err = flight
            .get_or_build("flaky", || async {
                Err::<Arc<AtomicUsize>, _>(RankServeError::Backend {
                    message: "checkpoint download failed".to_string(),
                })
            })
            .await;
        assert!(err.is_err());
        assert!(flight.keys().await.is_empty());

        // Retry on the same key succeeds and populates the cache.
        let value = flight
            .get_or_build("flaky", || async { Ok(Arc::new(AtomicUsize::new(3))) })
            .await
            .unwrap();
        assert_eq!(value.load(Ordering::SeqCst), 3);
        assert_eq!(flight.keys().await, vec!["flaky".to_string()]);
    }

    #[tokio::test]
    async fn agent_sessions_are_keyed_by_id() {
        let cache = AgentSessionCache::new();
        let a1 = cache.session("alpha").await;
        let a2 = cache.session("alpha").await;
        let b = cache.session("beta").await;

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
        assert_eq!(cache.keys().await, vec!["alpha", "beta"]);
    }

    async fn futures_join_all<T>(handles: Vec<tokio::task::JoinHandle<T>>) -> Vec<T> {
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.await.unwrap());
        }
        out
    }
}
