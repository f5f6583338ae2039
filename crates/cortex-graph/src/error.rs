//! Graph error types.

use crate::cancel::Cancelled;

/// Errors that can occur while building graphs or computing metrics.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The computation was cancelled or timed out.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// Loading the snapshot from the store failed.
    #[error("failed to load graph: {0}")]
    Storage(#[from] cortex_storage::StorageError),

    /// Unexpected internal failure (e.g. worker pool construction).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the graph crate.
pub type Result<T> = std::result::Result<T, GraphError>;
