//! Entity types -- named code units and their per-file bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{EntityKind, EntityStatus, Visibility};

/// A named code unit produced by a language parser.
///
/// Entities are content-addressed: `id` is stable for a given
/// (file, kind, name, signature) tuple, so rescans update in place rather
/// than accumulating duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable id in the form `sa-<kind2>-<hash>-<Name>`.
    pub id: String,

    /// Source-visible name.
    pub name: String,

    pub entity_type: EntityKind,

    /// Repository-relative path.
    pub file_path: String,

    /// 1-based inclusive start line, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,

    /// 1-based inclusive end line, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_end: Option<u32>,

    /// Short textual summary, e.g. `func Foo(x int) error`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub signature: String,

    #[serde(default)]
    pub visibility: Visibility,

    /// Source language tag (e.g. "go", "rust").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,

    #[serde(default)]
    pub status: EntityStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Creates an active entity with the current timestamp and a generated
    /// content-addressed id.
    pub fn new(
        name: impl Into<String>,
        entity_type: EntityKind,
        file_path: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let file_path = file_path.into();
        let now = Utc::now();
        Self {
            id: crate::idgen::entity_id(entity_type, &file_path, &name, ""),
            name,
            entity_type,
            file_path,
            line_start: None,
            line_end: None,
            signature: String::new(),
            visibility: Visibility::Private,
            language: String::new(),
            status: EntityStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` if the entity is active (not archived).
    pub fn is_active(&self) -> bool {
        self.status == EntityStatus::Active
    }

    /// Returns `true` if this entity spans a single source line.
    pub fn is_single_line(&self) -> bool {
        match (self.line_start, self.line_end) {
            (Some(start), Some(end)) => start == end,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// The last two components of the file path, for compact display.
    pub fn short_path(&self) -> String {
        let parts: Vec<&str> = self.file_path.rsplitn(3, '/').collect();
        match parts.as_slice() {
            [file] => (*file).to_owned(),
            [file, dir, ..] => format!("{dir}/{file}"),
            [] => String::new(),
        }
    }

    /// Validates structural invariants.
    ///
    /// `id` and `name` must be non-empty; when both line bounds are present,
    /// `line_end >= line_start`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyField("id"));
        }
        if self.name.is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if let (Some(start), Some(end)) = (self.line_start, self.line_end) {
            if end < start {
                return Err(ValidationError::InvalidLineRange { start, end });
            }
        }
        Ok(())
    }
}

/// Errors raised by [`Entity::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("entity field {0:?} must not be empty")]
    EmptyField(&'static str),

    #[error("invalid line range: end {end} before start {start}")]
    InvalidLineRange { start: u32, end: u32 },
}

/// One scanned file, tracked for incremental rescans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIndexEntry {
    pub file_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,

    pub last_scanned: DateTime<Utc>,

    /// Hash of the file contents at last scan.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_hash: String,
}

/// Test-coverage figures for one entity, imported from an external report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRecord {
    pub entity_id: String,
    pub coverage_percent: f64,
    pub lines_covered: i64,
    pub lines_total: i64,

    /// Which importer produced this record (e.g. "go-cover", "lcov").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_tag: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entity_is_active_with_generated_id() {
        let e = Entity::new("ParseFile", EntityKind::Function, "pkg/parser.go");
        assert!(e.is_active());
        assert!(e.id.starts_with("sa-fn-"));
        assert!(e.id.ends_with("-ParseFile"));
    }

    #[test]
    fn validate_rejects_inverted_line_range() {
        let mut e = Entity::new("Foo", EntityKind::Function, "a.go");
        e.line_start = Some(10);
        e.line_end = Some(5);
        assert_eq!(
            e.validate(),
            Err(ValidationError::InvalidLineRange { start: 10, end: 5 })
        );
    }

    #[test]
    fn validate_accepts_equal_line_bounds() {
        let mut e = Entity::new("MaxRetries", EntityKind::Constant, "a.go");
        e.line_start = Some(7);
        e.line_end = Some(7);
        assert!(e.validate().is_ok());
        assert!(e.is_single_line());
    }

    #[test]
    fn short_path_keeps_last_two_components() {
        let mut e = Entity::new("Foo", EntityKind::Function, "internal/pkg/handler.go");
        assert_eq!(e.short_path(), "pkg/handler.go");
        e.file_path = "main.go".into();
        assert_eq!(e.short_path(), "main.go");
    }

    #[test]
    fn entity_serde_round_trip() {
        let e = Entity::new("Handler", EntityKind::Type, "pkg/http.go");
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains(r#""entity_type":"type""#));
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
