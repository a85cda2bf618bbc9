//! Core data structures for the RankServe pipeline
//!
//! Fundamental types shared by every stage: ranked context items, per-stage
//! results, and the central error type.

pub mod error;

pub use error::{RankServeError, Result};

use serde::{Deserialize, Serialize};

/// Character budget for context text returned to clients. Longer passages
/// are cut at this many characters before leaving a stage.
pub const MAX_CONTEXT_CHARS: usize = 600;

/// A candidate passage flowing through the pipeline.
///
/// List position IS the ranking: index 0 is the top-ranked item. The only
/// rank information carried on the item itself is the derived `rank_delta`,
/// populated by the rerank stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    /// Identifier, unique within one stage's output
    pub id: String,

    /// Display text, capped at [`MAX_CONTEXT_CHARS`]
    pub text: String,

    /// Optional passage title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Stage-defined relevance score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,

    /// Old rank minus new rank, set only by the rerank stage. Zero when the
    /// identifier was absent from the previous stage's output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_delta: Option<i64>,
}

impl ContextItem {
    /// Create a context item with capped text and no optional fields.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut item = Self {
            id: id.into(),
            text: text.into(),
            title: None,
            score: None,
            rank_delta: None,
        };
        item.cap_text();
        item
    }

    /// Attach a title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Attach a relevance score.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    /// Enforce the display character budget on a char boundary.
    pub fn cap_text(&mut self) {
        if self.text.chars().count() > MAX_CONTEXT_CHARS {
            self.text = self.text.chars().take(MAX_CONTEXT_CHARS).collect();
        }
    }
}

/// Ordered output of one pipeline stage plus its wall-clock cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    /// Ranked context items (position 0 = top)
    pub contexts: Vec<ContextItem>,

    /// Elapsed wall-clock time in milliseconds
    pub latency_ms: f64,
}

impl StageResult {
    /// A skipped stage: no contexts, zero latency.
    pub fn empty() -> Self {
        Self {
            contexts: Vec::new(),
            latency_ms: 0.0,
        }
    }
}
