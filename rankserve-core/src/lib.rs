//! # RankServe Core
//!
//! Library behind the RankServe serving layer: a per-request pipeline
//! composing three independently swappable inference stages — retrieval,
//! reranking and answer generation — plus the machinery around them:
//!
//! - Request-scoped configuration with closed stage enums and defaults
//! - A process-scoped component cache with single-flight construction
//! - Stage runners producing normalized, timed results
//! - A pipeline orchestrator with mode early-exit and partial results
//! - A streaming protocol encoder for incremental delivery
//! - An arena evaluator comparing two configurations on benchmark data
//! - A conversational advisor recommending pipeline combinations
//!
//! The model internals are external collaborators behind three contracts
//! ([`retrieval::Retriever`], [`reranking::Reranker`],
//! [`generation::Generator`]); the in-tree implementations are lightweight
//! lexical components sufficient to exercise the orchestration end to end.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rankserve_core::cache::ComponentCache;
//! use rankserve_core::config::PipelineConfig;
//! use rankserve_core::pipeline::{ComponentRegistry, PipelineRunner};
//!
//! # async fn example() {
//! let cache = Arc::new(ComponentCache::new());
//! let registry = Arc::new(ComponentRegistry::new());
//! let runner = PipelineRunner::new(cache, registry);
//!
//! let result = runner
//!     .run("capital of France", &PipelineConfig::default())
//!     .await;
//! assert!(result.error.is_none());
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Core data structures and error handling
pub mod core;

/// Request configuration: stage enums, defaults, generator lookup
pub mod config;

/// Corpus loading for retrieval indexes
pub mod corpus;

/// Static catalog of supported stage identifiers
pub mod catalog;

/// Process-scoped component and agent-session caches
pub mod cache;

/// Retrieval stage implementations
pub mod retrieval;

/// Reranking stage implementations
pub mod reranking;

/// Answer generation implementations
pub mod generation;

/// Pipeline orchestration: registry, stage runners, runner
pub mod pipeline;

/// Streaming protocol encoder
pub mod streaming;

/// Arena evaluation: datasets, qrels, metrics, comparison engine
pub mod arena;

/// Conversational pipeline advisor
pub mod agent;

pub use crate::core::{ContextItem, RankServeError, Result, StageResult};
pub use cache::{AgentSessionCache, ComponentCache};
pub use config::{PipelineConfig, PipelineMode};
pub use pipeline::{ComponentRegistry, PipelineRunner};
