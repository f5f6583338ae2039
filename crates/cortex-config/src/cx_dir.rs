//! Discovery and creation of the `.cx/` directory.
//!
//! The `.cx/` directory at the repository root holds the database, the
//! config file, and the optional `PRIME.md` override streamed by session
//! recovery. Discovery walks up the directory tree, with the `CX_DIR`
//! environment variable as an override.

use std::path::{Path, PathBuf};

use crate::config::{ConfigError, Result};

/// The name of the cortex metadata directory.
pub const CX_DIR_NAME: &str = ".cx";

/// The database file inside `.cx/`.
pub const DB_FILE_NAME: &str = "cortex.db";

/// The config file inside `.cx/`.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Optional user-provided override streamed by session recovery.
pub const PRIME_FILE_NAME: &str = "PRIME.md";

/// The environment variable that overrides directory discovery.
const CX_DIR_ENV: &str = "CX_DIR";

/// Walks up the directory tree from `start` looking for a `.cx/` directory.
///
/// The `CX_DIR` environment variable is checked first. Returns `None` when
/// the filesystem root is reached without finding one.
pub fn find_cx_dir(start: &Path) -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(CX_DIR_ENV) {
        let env_path = PathBuf::from(&env_dir);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }

    let start = start.canonicalize().ok()?;
    let mut current = start.as_path();
    loop {
        let candidate = current.join(CX_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Creates the `.cx/` directory under `repo_root` and returns its path.
///
/// Idempotent: an existing directory is returned as-is.
pub fn create_cx_dir(repo_root: &Path) -> Result<PathBuf> {
    let dir = repo_root.join(CX_DIR_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Resolves the `.cx` directory or fails with [`ConfigError::CxDirNotFound`].
pub fn require_cx_dir(start: &Path) -> Result<PathBuf> {
    find_cx_dir(start).ok_or(ConfigError::CxDirNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let first = create_cx_dir(tmp.path()).unwrap();
        let second = create_cx_dir(tmp.path()).unwrap();
        assert_eq!(first, second);
        assert!(first.is_dir());
    }

    #[test]
    fn find_walks_up_from_nested_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let cx = create_cx_dir(tmp.path()).unwrap();
        let nested = tmp.path().join("src/inner");
        std::fs::create_dir_all(&nested).unwrap();

        let found = find_cx_dir(&nested).unwrap();
        assert_eq!(found.canonicalize().unwrap(), cx.canonicalize().unwrap());
    }

    #[test]
    fn missing_dir_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(find_cx_dir(tmp.path()).is_none());
    }
}
