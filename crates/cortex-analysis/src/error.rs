//! Analysis error types.
//!
//! Store errors surface with the failing operation prepended; budget and
//! exclusion events are never errors -- they land in the result's
//! `warnings` and `excluded` fields instead.

use cortex_storage::StorageError;

/// Errors from context, impact, dead-code, and rank queries.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// A store operation failed; `op` names what the analysis was doing.
    #[error("{op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: StorageError,
    },

    /// Graph construction or metric computation failed.
    #[error(transparent)]
    Graph(#[from] cortex_graph::GraphError),

    /// The computation was cancelled or timed out.
    #[error(transparent)]
    Cancelled(#[from] cortex_graph::Cancelled),

    /// The query target does not resolve to anything.
    #[error("target not found: {target}")]
    TargetNotFound { target: String },

    /// A request parameter was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Convenience alias used throughout the analysis crate.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Wraps a store result with the failing operation name.
pub(crate) fn store_op<T>(
    op: &'static str,
    result: cortex_storage::error::Result<T>,
) -> Result<T> {
    result.map_err(|source| AnalysisError::Store { op, source })
}

/// Like [`store_op`], but treats `NotFound` as `None`.
pub(crate) fn store_opt<T>(
    op: &'static str,
    result: cortex_storage::error::Result<T>,
) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(source) => Err(AnalysisError::Store { op, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_carry_the_operation() {
        let err = store_op::<()>(
            "failed to query entities",
            Err(StorageError::Internal("disk on fire".into())),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed to query entities: internal error: disk on fire"
        );
    }

    #[test]
    fn not_found_becomes_none() {
        let value = store_opt(
            "failed to fetch metrics",
            Err::<(), _>(StorageError::not_found("metrics", "sa-fn-aaaaaa-X")),
        )
        .unwrap();
        assert!(value.is_none());
    }
}
