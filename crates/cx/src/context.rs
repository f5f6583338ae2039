//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds what every command handler needs: the
//! resolved `.cx` directory, global flags, the cancellation token wired
//! to Ctrl+C, and helpers to open the store and load config.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};

use cortex_config::{load_config, CxConfig, DB_FILE_NAME};
use cortex_graph::CancelToken;
use cortex_storage::{SqliteStore, StoreLock};

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Explicit `.cx` directory from `--db`/`CX_DIR`, if any.
    pub db_path: Option<PathBuf>,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,

    /// Assume yes for destructive confirmations.
    pub yes: bool,

    /// Cancellation token wired to Ctrl+C in `main`.
    pub cancel: CancelToken,
}

impl RuntimeContext {
    /// Builds a `RuntimeContext` from parsed global arguments.
    pub fn from_global_args(global: &GlobalArgs, cancel: CancelToken) -> Self {
        Self {
            db_path: global.db.as_ref().map(PathBuf::from),
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
            yes: global.yes,
            cancel,
        }
    }

    /// Resolves the `.cx` directory, walking up from the current directory
    /// when no explicit path was given.
    pub fn resolve_cx_dir(&self) -> Option<PathBuf> {
        if let Some(ref path) = self.db_path {
            if path.is_dir() {
                return Some(path.clone());
            }
        }
        let cwd = env::current_dir().ok()?;
        cortex_config::find_cx_dir(&cwd)
    }

    /// Like [`RuntimeContext::resolve_cx_dir`], but an error when absent.
    pub fn require_cx_dir(&self) -> Result<PathBuf> {
        match self.resolve_cx_dir() {
            Some(dir) => Ok(dir),
            None => bail!("store not initialized: no .cx directory found (run 'cx init' first)"),
        }
    }

    /// Opens the store read-only (no write lock).
    pub fn open_store(&self) -> Result<(PathBuf, SqliteStore)> {
        let cx_dir = self.require_cx_dir()?;
        let store = SqliteStore::open(cx_dir.join(DB_FILE_NAME))
            .context("failed to open cortex database")?;
        Ok((cx_dir, store))
    }

    /// Opens the store for writing, taking the single-writer lock.
    pub fn open_store_for_write(&self) -> Result<(PathBuf, StoreLock, SqliteStore)> {
        let cx_dir = self.require_cx_dir()?;
        let lock = StoreLock::acquire(&cx_dir).context("failed to take the write lock")?;
        let store = SqliteStore::open(cx_dir.join(DB_FILE_NAME))
            .context("failed to open cortex database")?;
        Ok((cx_dir, lock, store))
    }

    /// Loads the effective configuration for the resolved `.cx` directory.
    pub fn load_config(&self) -> Result<CxConfig> {
        let cx_dir = self.require_cx_dir()?;
        load_config(&cx_dir).context("failed to load config")
    }
}
