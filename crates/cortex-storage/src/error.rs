//! Storage error types.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The `.cx` directory or database has not been initialized.
    #[error("store not initialized: {reason}")]
    NotInitialized {
        /// Why the store is considered uninitialized.
        reason: String,
    },

    /// The requested record was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of record (e.g., "entity", "metrics").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// A record with this id already exists and upsert was not requested.
    #[error("already exists: {id}")]
    AlreadyExists {
        /// The colliding identifier.
        id: String,
    },

    /// A caller-supplied argument was invalid.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// A dependency endpoint or versioning ref does not resolve.
    #[error("invalid ref {reference:?}: {reason}")]
    InvalidRef {
        /// The offending reference (entity id, branch, tag, or hash).
        reference: String,
        /// Why it does not resolve.
        reason: String,
    },

    /// A query that requires metrics found none; recompute first.
    #[error("metrics not computed; run rank with --recompute")]
    StaleMetrics,

    /// A concurrent or conflicting write was rejected.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Failed to establish or maintain a database connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// A raw SQLite query error.
    #[error("query error: {0}")]
    Query(#[from] rusqlite::Error),

    /// JSON serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the storage crate.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    // -- Constructors --------------------------------------------------------

    /// Creates a [`StorageError::NotFound`] for the given record kind and id.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a [`StorageError::InvalidArgument`] with the given message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a [`StorageError::InvalidRef`] for the given reference.
    pub fn invalid_ref(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRef {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`StorageError::NotInitialized`] with the given reason.
    pub fn not_initialized(reason: impl Into<String>) -> Self {
        Self::NotInitialized {
            reason: reason.into(),
        }
    }

    // -- Predicates ----------------------------------------------------------

    /// Returns `true` if this is a [`StorageError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a [`StorageError::StaleMetrics`].
    pub fn is_stale_metrics(&self) -> bool {
        matches!(self, Self::StaleMetrics)
    }
}

impl From<cortex_core::entity::ValidationError> for StorageError {
    fn from(e: cortex_core::entity::ValidationError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_and_predicate() {
        let e = StorageError::not_found("entity", "sa-fn-aaaaaa-X");
        assert!(e.is_not_found());
        assert_eq!(e.to_string(), "entity not found: sa-fn-aaaaaa-X");
    }

    #[test]
    fn invalid_ref_display() {
        let e = StorageError::invalid_ref("feature-x", "unknown branch, tag, or commit");
        assert!(e.to_string().contains("feature-x"));
    }
}
