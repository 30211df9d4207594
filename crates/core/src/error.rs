use crate::types::Id;

/// Domain-level error taxonomy.
///
/// `Validation` is rejected before any storage round-trip and is never
/// retried. `StorageUnavailable` is retryable: joins, matches, and
/// reservations are idempotent by construction, so callers may safely
/// re-invoke. `PoolExhausted` is terminal for a given call; retrying
/// without new generated content cannot succeed. `Generator` is surfaced
/// only after the adapter's own bounded retry gave up.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: Id },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Question pool exhausted: {available} of {requested} requested questions available")]
    PoolExhausted { requested: usize, available: usize },

    #[error("Question generation failed for \"{movie_title}\": {message}")]
    Generator { movie_title: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether a caller may safely retry the failed operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::StorageUnavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_unavailable_is_retryable() {
        assert!(CoreError::StorageUnavailable("connection refused".into()).is_retryable());
    }

    #[test]
    fn pool_exhausted_is_terminal() {
        let err = CoreError::PoolExhausted {
            requested: 5,
            available: 2,
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("2 of 5"));
    }

    #[test]
    fn generator_error_names_the_movie() {
        let err = CoreError::Generator {
            movie_title: "The Grand Adventure of Elias".into(),
            message: "malformed JSON".into(),
        };
        assert!(err.to_string().contains("The Grand Adventure of Elias"));
    }
}
