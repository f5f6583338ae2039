//! The [`Store`] trait -- the public API for entity persistence.
//!
//! Consumers depend on this trait rather than on the concrete SQLite
//! implementation so that alternative backends (mocks, in-memory fixtures)
//! can be substituted.

use chrono::{DateTime, Utc};

use cortex_core::dependency::Dependency;
use cortex_core::entity::{CoverageRecord, Entity, FileIndexEntry};
use cortex_core::filter::{DependencyFilter, EntityFilter};
use cortex_core::metrics::EntityMetrics;

use crate::error::Result;

// ---------------------------------------------------------------------------
// View / helper types
// ---------------------------------------------------------------------------

/// How `reset` treats the working set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    /// Move the branch head only; live tables keep their contents.
    Soft,
    /// Move the branch head and restore live tables from the snapshot.
    Hard,
}

impl ResetMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

/// One commit in the version log.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CommitInfo {
    pub hash: String,
    /// Parent commit hash, empty for the root commit.
    pub parent: String,
    /// Branch the commit was created on.
    pub branch: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of the working set, for `status`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WorkingStatus {
    /// Current branch, or empty when HEAD is detached.
    pub branch: String,
    /// Head commit hash, `None` before the first commit.
    pub head: Option<String>,
    /// Whether the working set has uncommitted writes.
    pub dirty: bool,
    pub active_entities: i64,
    pub archived_entities: i64,
    pub dependencies: i64,
    pub files: i64,
}

/// Result of a read-only SQL query.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SqlRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Primary storage interface for the cortex engine.
///
/// A single writer owns the working set at a time; readers see committed
/// state plus the writer's working set within the same session.
pub trait Store: Send + Sync {
    // -- Entity CRUD ---------------------------------------------------------

    /// Creates a new entity. Fails with `AlreadyExists` on id collision.
    fn create_entity(&self, entity: &Entity) -> Result<()>;

    /// Creates multiple entities atomically.
    ///
    /// With `upsert`, existing rows are overwritten by id; without it, any
    /// collision aborts the whole batch.
    fn create_entities_bulk(&self, entities: &[Entity], upsert: bool) -> Result<()>;

    /// Retrieves an entity by id.
    fn get_entity(&self, id: &str) -> Result<Entity>;

    /// Queries entities, ordered by (file_path, line_start).
    fn query_entities(&self, filter: &EntityFilter) -> Result<Vec<Entity>>;

    /// Counts entities matching the filter.
    fn count_entities(&self, filter: &EntityFilter) -> Result<i64>;

    /// Overwrites an entity by id (rescan path). Bumps `updated_at`.
    fn update_entity(&self, entity: &Entity) -> Result<()>;

    /// Marks an entity archived. Archived entities survive for history and
    /// are only removed by an explicit hard reset.
    fn archive_entity(&self, id: &str) -> Result<()>;

    // -- Dependencies --------------------------------------------------------

    /// Adds a dependency edge. Idempotent over (from, to, type); missing
    /// endpoints are rejected with `InvalidRef`.
    fn create_dependency(&self, dep: &Dependency) -> Result<()>;

    /// Replaces the outgoing edge set of one entity (scan path): the stored
    /// set is diffed against `deps`, removing stale edges and adding new
    /// ones atomically.
    fn replace_dependencies_from(&self, from_id: &str, deps: &[Dependency]) -> Result<()>;

    /// Queries dependency edges.
    fn get_dependencies(&self, filter: &DependencyFilter) -> Result<Vec<Dependency>>;

    /// Counts all dependency edges.
    fn count_dependencies(&self) -> Result<i64>;

    // -- Metrics -------------------------------------------------------------

    /// Overwrites metrics for one entity.
    fn save_metrics(&self, metrics: &EntityMetrics) -> Result<()>;

    /// Overwrites metrics for many entities atomically.
    fn save_bulk_metrics(&self, metrics: &[EntityMetrics]) -> Result<()>;

    /// Retrieves metrics for an entity; `NotFound` if never computed.
    fn get_metrics(&self, entity_id: &str) -> Result<EntityMetrics>;

    /// Returns all stored metrics.
    fn get_all_metrics(&self) -> Result<Vec<EntityMetrics>>;

    /// Returns the top `n` metric rows by descending PageRank.
    fn get_top_by_page_rank(&self, n: usize) -> Result<Vec<EntityMetrics>>;

    // -- File index and coverage ---------------------------------------------

    /// Inserts or updates a file index entry by path.
    fn upsert_file(&self, file: &FileIndexEntry) -> Result<()>;

    /// Retrieves a file index entry by path.
    fn get_file(&self, file_path: &str) -> Result<FileIndexEntry>;

    /// Counts indexed files.
    fn count_files(&self) -> Result<i64>;

    /// Inserts or updates a coverage record by entity id.
    fn save_coverage(&self, coverage: &CoverageRecord) -> Result<()>;

    /// Retrieves coverage for an entity, `None` if never imported.
    fn get_coverage(&self, entity_id: &str) -> Result<Option<CoverageRecord>>;

    // -- Versioning ----------------------------------------------------------

    /// Commits the working set and returns the new commit hash.
    fn commit(&self, message: &str) -> Result<String>;

    /// Creates a branch at `from` (default: HEAD) without switching to it.
    fn branch(&self, name: &str, from: Option<&str>) -> Result<()>;

    /// Switches the working set to a branch, tag, or commit. Non-branch
    /// refs leave the store with a detached HEAD.
    fn checkout(&self, reference: &str) -> Result<()>;

    /// Creates a tag pointing at `reference` (default: HEAD).
    fn tag(&self, name: &str, reference: Option<&str>) -> Result<()>;

    /// Moves the current branch head to `reference`.
    fn reset(&self, reference: &str, mode: ResetMode) -> Result<()>;

    /// Returns up to `limit` commits, newest first, from the current head.
    fn log(&self, limit: usize) -> Result<Vec<CommitInfo>>;

    /// Returns the working-set status.
    fn status(&self) -> Result<WorkingStatus>;

    /// Time-travel read: all entities as of `reference`.
    fn entities_at(&self, reference: &str) -> Result<Vec<Entity>>;

    /// Time-travel read: all dependencies as of `reference`.
    fn dependencies_at(&self, reference: &str) -> Result<Vec<Dependency>>;

    // -- Introspection -------------------------------------------------------

    /// Runs a read-only SQL statement against the live tables.
    ///
    /// Anything other than SELECT/WITH/PRAGMA/EXPLAIN is rejected with
    /// `InvalidArgument`.
    fn query_sql(&self, sql: &str, params: &[serde_json::Value]) -> Result<SqlRows>;
}
