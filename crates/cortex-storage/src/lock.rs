//! Advisory write lock for the `.cx` directory.
//!
//! The store supports one writer at a time across processes. Write-path
//! callers (scan, import, versioning commands) take this lock before
//! opening the store; read-only callers skip it.

use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use crate::error::{Result, StorageError};

/// Name of the lock file inside the `.cx` directory.
pub const LOCK_FILE_NAME: &str = "cortex.lock";

/// Holds the exclusive write lock for the lifetime of the value.
///
/// The lock is released when the guard is dropped (or the process exits).
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
}

impl StoreLock {
    /// Attempts to take the exclusive write lock without blocking.
    ///
    /// Fails with [`StorageError::Conflict`] when another process holds it.
    pub fn acquire(cx_dir: &Path) -> Result<Self> {
        let path = cx_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| {
                StorageError::Connection(format!("failed to open {}: {e}", path.display()))
            })?;

        file.try_lock_exclusive().map_err(|_| {
            StorageError::Conflict(format!(
                "another process holds the write lock at {}",
                path.display()
            ))
        })?;

        Ok(Self { _file: file })
    }
}
