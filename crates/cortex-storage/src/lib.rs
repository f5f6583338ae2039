//! Versioned storage for the cortex code-intelligence engine.
//!
//! Provides the [`Store`] trait and a SQLite implementation
//! ([`SqliteStore`]) with commit/branch/tag/reset semantics emulated over
//! per-commit snapshot tables.

pub mod error;
pub mod lock;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience.
pub use error::StorageError;
pub use lock::StoreLock;
pub use sqlite::SqliteStore;
pub use traits::{CommitInfo, ResetMode, SqlRows, Store, WorkingStatus};

// ---------------------------------------------------------------------------
// Store trait implementation for SqliteStore
// ---------------------------------------------------------------------------

use cortex_core::dependency::Dependency;
use cortex_core::entity::{CoverageRecord, Entity, FileIndexEntry};
use cortex_core::filter::{DependencyFilter, EntityFilter};
use cortex_core::metrics::EntityMetrics;

use crate::error::Result;

impl Store for SqliteStore {
    fn create_entity(&self, entity: &Entity) -> Result<()> {
        self.create_entity_impl(entity)
    }

    fn create_entities_bulk(&self, entities: &[Entity], upsert: bool) -> Result<()> {
        self.create_entities_bulk_impl(entities, upsert)
    }

    fn get_entity(&self, id: &str) -> Result<Entity> {
        self.get_entity_impl(id)
    }

    fn query_entities(&self, filter: &EntityFilter) -> Result<Vec<Entity>> {
        self.query_entities_impl(filter)
    }

    fn count_entities(&self, filter: &EntityFilter) -> Result<i64> {
        self.count_entities_impl(filter)
    }

    fn update_entity(&self, entity: &Entity) -> Result<()> {
        self.update_entity_impl(entity)
    }

    fn archive_entity(&self, id: &str) -> Result<()> {
        self.archive_entity_impl(id)
    }

    fn create_dependency(&self, dep: &Dependency) -> Result<()> {
        self.create_dependency_impl(dep)
    }

    fn replace_dependencies_from(&self, from_id: &str, deps: &[Dependency]) -> Result<()> {
        self.replace_dependencies_from_impl(from_id, deps)
    }

    fn get_dependencies(&self, filter: &DependencyFilter) -> Result<Vec<Dependency>> {
        self.get_dependencies_impl(filter)
    }

    fn count_dependencies(&self) -> Result<i64> {
        self.count_dependencies_impl()
    }

    fn save_metrics(&self, metrics: &EntityMetrics) -> Result<()> {
        self.save_metrics_impl(metrics)
    }

    fn save_bulk_metrics(&self, metrics: &[EntityMetrics]) -> Result<()> {
        self.save_bulk_metrics_impl(metrics)
    }

    fn get_metrics(&self, entity_id: &str) -> Result<EntityMetrics> {
        self.get_metrics_impl(entity_id)
    }

    fn get_all_metrics(&self) -> Result<Vec<EntityMetrics>> {
        self.get_all_metrics_impl()
    }

    fn get_top_by_page_rank(&self, n: usize) -> Result<Vec<EntityMetrics>> {
        self.get_top_by_page_rank_impl(n)
    }

    fn upsert_file(&self, file: &FileIndexEntry) -> Result<()> {
        self.upsert_file_impl(file)
    }

    fn get_file(&self, file_path: &str) -> Result<FileIndexEntry> {
        self.get_file_impl(file_path)
    }

    fn count_files(&self) -> Result<i64> {
        self.count_files_impl()
    }

    fn save_coverage(&self, coverage: &CoverageRecord) -> Result<()> {
        self.save_coverage_impl(coverage)
    }

    fn get_coverage(&self, entity_id: &str) -> Result<Option<CoverageRecord>> {
        self.get_coverage_impl(entity_id)
    }

    fn commit(&self, message: &str) -> Result<String> {
        self.commit_impl(message)
    }

    fn branch(&self, name: &str, from: Option<&str>) -> Result<()> {
        self.branch_impl(name, from)
    }

    fn checkout(&self, reference: &str) -> Result<()> {
        self.checkout_impl(reference)
    }

    fn tag(&self, name: &str, reference: Option<&str>) -> Result<()> {
        self.tag_impl(name, reference)
    }

    fn reset(&self, reference: &str, mode: ResetMode) -> Result<()> {
        self.reset_impl(reference, mode)
    }

    fn log(&self, limit: usize) -> Result<Vec<CommitInfo>> {
        self.log_impl(limit)
    }

    fn status(&self) -> Result<WorkingStatus> {
        self.status_impl()
    }

    fn entities_at(&self, reference: &str) -> Result<Vec<Entity>> {
        self.entities_at_impl(reference)
    }

    fn dependencies_at(&self, reference: &str) -> Result<Vec<Dependency>> {
        self.dependencies_at_impl(reference)
    }

    fn query_sql(&self, sql: &str, params: &[serde_json::Value]) -> Result<SqlRows> {
        self.query_sql_impl(sql, params)
    }
}
