//! Unified error handling for the RankServe pipeline
//!
//! One central error type covers every stage of the serving layer. Stage
//! runners return `Result<StageResult>`, and the orchestrator inspects the
//! error to decide whether to keep partial results or abort the request.

use std::fmt;

/// Main error type for the RankServe system
#[derive(Debug)]
pub enum RankServeError {
    /// Configuration-related errors
    Config {
        /// Error message
        message: String,
    },

    /// Retrieval stage errors
    Retrieval {
        /// Error message
        message: String,
    },

    /// Reranking stage errors
    Reranking {
        /// Error message
        message: String,
    },

    /// Answer generation errors
    Generation {
        /// Error message
        message: String,
    },

    /// The generation backend rejected the request because the prompt
    /// exceeded its context window. Never retried.
    ContextLength {
        /// Error message
        message: String,
    },

    /// Transient transport failure talking to a generation backend.
    /// Eligible for bounded retry.
    Backend {
        /// Error message
        message: String,
    },

    /// Benchmark dataset acquisition errors
    Dataset {
        /// Error message
        message: String,
    },

    /// Resource not found errors
    NotFound {
        /// Resource type
        resource: String,
        /// Resource identifier
        id: String,
    },

    /// I/O errors from file operations
    Io(std::io::Error),

    /// JSON serialization/deserialization errors
    SerdeJson(serde_json::Error),

    /// HTTP request errors
    Http(String),
}

impl fmt::Display for RankServeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankServeError::Config { message } => {
                write!(f, "Configuration error: {message}")
            },
            RankServeError::Retrieval { message } => {
                write!(f, "Retrieval error: {message}")
            },
            RankServeError::Reranking { message } => {
                write!(f, "Reranking error: {message}")
            },
            RankServeError::Generation { message } => {
                write!(f, "Answer generation error: {message}")
            },
            RankServeError::ContextLength { message } => {
                write!(f, "Context length exceeded: {message}")
            },
            RankServeError::Backend { message } => {
                write!(
                    f,
                    "Backend error: {message}. \
                     Solution: Check network connectivity and backend availability"
                )
            },
            RankServeError::Dataset { message } => {
                write!(
                    f,
                    "Dataset error: {message}. \
                     Solution: Check the dataset key and that the cache directory is writable"
                )
            },
            RankServeError::NotFound { resource, id } => {
                write!(f, "{resource} not found: {id}")
            },
            RankServeError::Io(err) => {
                write!(f, "I/O error: {err}")
            },
            RankServeError::SerdeJson(err) => {
                write!(f, "JSON serialization error: {err}")
            },
            RankServeError::Http(msg) => {
                write!(f, "HTTP request error: {msg}")
            },
        }
    }
}

impl std::error::Error for RankServeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RankServeError::Io(err) => Some(err),
            RankServeError::SerdeJson(err) => Some(err),
            _ => None,
        }
    }
}

impl RankServeError {
    /// Whether a bounded wait-and-retry is appropriate for this error.
    ///
    /// Only transient transport failures qualify; a context-length rejection
    /// is deterministic and retrying it would always fail again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RankServeError::Backend { .. } | RankServeError::Http(_)
        )
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for RankServeError {
    fn from(err: std::io::Error) -> Self {
        RankServeError::Io(err)
    }
}

impl From<serde_json::Error> for RankServeError {
    fn from(err: serde_json::Error) -> Self {
        RankServeError::SerdeJson(err)
    }
}

impl From<reqwest::Error> for RankServeError {
    fn from(err: reqwest::Error) -> Self {
        RankServeError::Backend {
            message: err.to_string(),
        }
    }
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, RankServeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        let transport = RankServeError::Backend {
            message: "connection reset".to_string(),
        };
        assert!(transport.is_retryable());

        let overflow = RankServeError::ContextLength {
            message: "prompt is 9000 tokens, limit is 8192".to_string(),
        };
        assert!(!overflow.is_retryable());

        let config = RankServeError::Config {
            message: "bad".to_string(),
        };
        assert!(!config.is_retryable());
    }
}
