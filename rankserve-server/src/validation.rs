//! Input validation for the RankServe server
//!
//! Required fields fail the request outright; everything else falls back to
//! defaults during parsing (see the core config module).

/// Maximum request body size (1MB)
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Maximum query length
pub const MAX_QUERY_LENGTH: usize = 10_000;

/// Maximum number of documents to retrieve
pub const MAX_N_DOCS: usize = 100;

/// Maximum number of contexts kept for generation
pub const MAX_N_CONTEXTS: usize = 50;

/// Maximum number of arena queries per run
pub const MAX_ARENA_QUERIES: usize = 100;

/// Validation error with the offending field
#[derive(Debug, serde::Serialize)]
pub struct ValidationError {
    /// Human-readable error
    pub error: String,
    /// Offending request field
    pub field: Option<String>,
}

fn invalid(field: &str, error: impl Into<String>) -> ValidationError {
    ValidationError {
        error: error.into(),
        field: Some(field.to_string()),
    }
}

/// Validate the required query string.
pub fn validate_query(query: &str) -> Result<(), ValidationError> {
    if query.trim().is_empty() {
        return Err(invalid("query", "Query cannot be empty"));
    }
    if query.len() > MAX_QUERY_LENGTH {
        return Err(invalid(
            "query",
            format!("Query exceeds maximum length of {MAX_QUERY_LENGTH} characters"),
        ));
    }
    Ok(())
}

/// Validate document counts.
pub fn validate_counts(n_docs: usize, n_contexts: usize) -> Result<(), ValidationError> {
    if n_docs == 0 || n_docs > MAX_N_DOCS {
        return Err(invalid(
            "n_docs",
            format!("n_docs must be between 1 and {MAX_N_DOCS}"),
        ));
    }
    if n_contexts == 0 || n_contexts > MAX_N_CONTEXTS {
        return Err(invalid(
            "n_contexts",
            format!("n_contexts must be between 1 and {MAX_N_CONTEXTS}"),
        ));
    }
    Ok(())
}

/// Validate the arena query sample size.
pub fn validate_arena_queries(n_queries: usize) -> Result<(), ValidationError> {
    if n_queries == 0 || n_queries > MAX_ARENA_QUERIES {
        return Err(invalid(
            "n_queries",
            format!("n_queries must be between 1 and {MAX_ARENA_QUERIES}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_rejected() {
        assert!(validate_query("").is_err());
        assert!(validate_query("   ").is_err());
        assert!(validate_query("capital of France").is_ok());
    }

    #[test]
    fn count_bounds_are_enforced() {
        assert!(validate_counts(10, 5).is_ok());
        assert!(validate_counts(0, 5).is_err());
        assert!(validate_counts(10, 0).is_err());
        assert!(validate_counts(MAX_N_DOCS + 1, 5).is_err());
    }

    #[test]
    fn arena_query_bounds_are_enforced() {
        assert!(validate_arena_queries(5).is_ok());
        assert!(validate_arena_queries(0).is_err());
        assert!(validate_arena_queries(MAX_ARENA_QUERIES + 1).is_err());
    }
}
