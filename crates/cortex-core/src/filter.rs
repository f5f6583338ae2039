//! Filter types for store queries.

use crate::enums::{DepType, EntityKind, EntityStatus, Visibility};

/// Filter for entity queries. `None`/empty fields match everything.
///
/// Results are always ordered by (file_path, line_start).
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    /// Exact file path match.
    pub file_path: Option<String>,

    pub status: Option<EntityStatus>,

    pub entity_type: Option<EntityKind>,

    pub visibility: Option<Visibility>,

    pub language: Option<String>,

    /// Substring match against the entity name (case-insensitive).
    pub name_like: Option<String>,

    /// Prefix match against the entity id (e.g. "sa-fn-").
    pub id_prefix: Option<String>,

    pub limit: Option<i64>,
}

impl EntityFilter {
    /// Filter for active entities only.
    pub fn active() -> Self {
        Self {
            status: Some(EntityStatus::Active),
            ..Self::default()
        }
    }

    /// Filter for active entities in one file.
    pub fn active_in_file(file_path: impl Into<String>) -> Self {
        Self {
            file_path: Some(file_path.into()),
            status: Some(EntityStatus::Active),
            ..Self::default()
        }
    }
}

/// Filter for dependency queries. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct DependencyFilter {
    pub from_id: Option<String>,
    pub to_id: Option<String>,
    pub dep_type: Option<DepType>,
}

impl DependencyFilter {
    /// All outgoing edges of one entity.
    pub fn from(id: impl Into<String>) -> Self {
        Self {
            from_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// All incoming edges of one entity.
    pub fn to(id: impl Into<String>) -> Self {
        Self {
            to_id: Some(id.into()),
            ..Self::default()
        }
    }
}
