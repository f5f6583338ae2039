//! Target resolution for context and impact queries.
//!
//! A target string is classified, in order: task id (when a task tracker
//! collaborator is wired in), file path, entity id. Task descriptions can
//! reference entities by id; those references become the hop-0 set.

use cortex_core::entity::Entity;
use cortex_core::filter::EntityFilter;
use cortex_core::idgen;
use cortex_storage::Store;

use crate::error::{store_op, store_opt, AnalysisError, Result};

/// Source-file extensions recognized by the file-path heuristic.
const SOURCE_EXTENSIONS: &[&str] = &[
    "go", "rs", "py", "ts", "tsx", "js", "jsx", "java", "kt", "c", "h", "cpp", "hpp", "cs",
    "rb", "php", "swift", "scala",
];

/// A task fetched from the external tracker collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInfo {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// External task-tracker collaborator (e.g. the `bd` issue tracker).
///
/// The core only needs lookup; everything else about the tracker stays
/// outside this crate.
pub trait TaskTracker {
    /// Fetches a task by id; `Ok(None)` when the tracker has no such task.
    fn get_task(&self, id: &str) -> std::result::Result<Option<TaskInfo>, String>;
}

/// What a target string resolved to.
#[derive(Debug, Clone)]
pub enum ResolvedTarget {
    /// A tracker task plus the entities its description references.
    Task {
        task: TaskInfo,
        entities: Vec<Entity>,
    },
    /// All active entities in one file.
    File { path: String, entities: Vec<Entity> },
    /// A single entity.
    Entity(Entity),
}

impl ResolvedTarget {
    /// The hop-0 entity set.
    pub fn entities(&self) -> &[Entity] {
        match self {
            Self::Task { entities, .. } => entities,
            Self::File { entities, .. } => entities,
            Self::Entity(entity) => std::slice::from_ref(entity),
        }
    }
}

/// Returns `true` if the string has the shape of a tracker task id:
/// a dash-bearing token without path separators or extensions.
pub fn looks_like_task_id(s: &str) -> bool {
    if s.contains('/') || s.contains('.') {
        return false;
    }
    s.starts_with("bd-") || s.starts_with("sa-") || s.contains('-')
}

/// Returns `true` if the string looks like a repository file path.
pub fn looks_like_file_path(s: &str) -> bool {
    if s.contains('/') {
        return true;
    }
    match s.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && SOURCE_EXTENSIONS.contains(&ext),
        None => false,
    }
}

/// Extracts `sa-` entity ids referenced in free text.
///
/// Tokens are stripped of surrounding punctuation before matching.
pub fn extract_entity_mentions(text: &str) -> Vec<String> {
    let mut mentions = Vec::new();
    for token in text.split_whitespace() {
        let trimmed =
            token.trim_matches(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        if trimmed.starts_with("sa-") && idgen::looks_like_entity_id(trimmed) {
            mentions.push(trimmed.to_owned());
        }
    }
    mentions
}

/// Resolves a target string against the store and optional task tracker.
pub fn resolve_target(
    store: &dyn Store,
    tracker: Option<&dyn TaskTracker>,
    target: &str,
) -> Result<ResolvedTarget> {
    // 1. Task id, when a tracker is available.
    if looks_like_task_id(target) {
        if let Some(tracker) = tracker {
            let task = tracker
                .get_task(target)
                .map_err(AnalysisError::InvalidArgument)?;
            if let Some(task) = task {
                let mut entities = Vec::new();
                for id in extract_entity_mentions(&task.description) {
                    if let Some(entity) =
                        store_opt("failed to fetch entity", store.get_entity(&id))?
                    {
                        entities.push(entity);
                    }
                }
                return Ok(ResolvedTarget::Task { task, entities });
            }
        }
    }

    // 2. File path.
    if looks_like_file_path(target) {
        let entities = store_op(
            "failed to query entities",
            store.query_entities(&EntityFilter::active_in_file(target)),
        )?;
        if entities.is_empty() {
            return Err(AnalysisError::TargetNotFound {
                target: target.to_owned(),
            });
        }
        return Ok(ResolvedTarget::File {
            path: target.to_owned(),
            entities,
        });
    }

    // 3. Entity id.
    match store_opt("failed to fetch entity", store.get_entity(target))? {
        Some(entity) => Ok(ResolvedTarget::Entity(entity)),
        None => Err(AnalysisError::TargetNotFound {
            target: target.to_owned(),
        }),
    }
}
