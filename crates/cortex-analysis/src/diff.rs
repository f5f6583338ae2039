//! Diff context: derive the hop-0 set from a unified diff.
//!
//! The CLI captures `git diff` output (worktree, staged, or a commit
//! range); this module parses the hunks, locates the entities whose line
//! ranges the hunks touch, classifies each change, and pulls in callers
//! of the changed entities. Budget enforcement is shared with the plain
//! assembler.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use cortex_config::BudgetMode;
use cortex_core::entity::Entity;
use cortex_core::filter::EntityFilter;

use crate::context::{ContextAssembler, ContextEntry, ContextOutput, ContextRequest};
use crate::error::{store_op, store_opt, Result};
use crate::tokens::Density;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Parameters for a diff-driven context query.
#[derive(Debug, Clone)]
pub struct DiffContextRequest {
    /// Unified diff text, as produced by `git diff`.
    pub diff_text: String,
    /// How far to chase callers of changed entities.
    pub depth: usize,
    pub max_tokens: usize,
    pub budget_mode: BudgetMode,
    pub density: Density,
}

impl DiffContextRequest {
    pub fn new(diff_text: impl Into<String>) -> Self {
        Self {
            diff_text: diff_text.into(),
            depth: 1,
            max_tokens: 4000,
            budget_mode: BudgetMode::Importance,
            density: Density::Medium,
        }
    }
}

/// How a changed entity was touched by the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    /// A hunk overlaps the entity's first line.
    SignatureChange,
    /// Hunks touch the body only.
    BodyChange,
}

impl ChangeKind {
    fn reason(&self) -> &'static str {
        match self {
            Self::Added => "Added in diff",
            Self::Removed => "Removed in diff",
            Self::SignatureChange => "Modified in diff (signature change)",
            Self::BodyChange => "Modified in diff (body change)",
        }
    }
}

// ---------------------------------------------------------------------------
// Unified diff parsing
// ---------------------------------------------------------------------------

/// One file's worth of diff: paths plus changed line ranges on the new side.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FileDiff {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    /// (start, count) line ranges, 1-based, new side.
    pub hunks: Vec<(u32, u32)>,
}

impl FileDiff {
    fn is_added(&self) -> bool {
        self.old_path.is_none() && self.new_path.is_some()
    }

    fn is_removed(&self) -> bool {
        self.old_path.is_some() && self.new_path.is_none()
    }
}

/// Strips the `a/` / `b/` prefix git puts on diff paths.
fn strip_git_prefix(path: &str) -> Option<String> {
    if path == "/dev/null" {
        return None;
    }
    let stripped = path
        .strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path);
    Some(stripped.to_owned())
}

/// Parses `@@ -old_start,old_count +new_start,new_count @@` headers.
fn parse_hunk_header(line: &str) -> Option<(u32, u32)> {
    let rest = line.strip_prefix("@@ ")?;
    let plus = rest.split_whitespace().find(|p| p.starts_with('+'))?;
    let spec = &plus[1..];
    match spec.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((spec.parse().ok()?, 1)),
    }
}

/// Parses a unified diff into per-file change records.
pub(crate) fn parse_unified_diff(text: &str) -> Vec<FileDiff> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current: Option<FileDiff> = None;

    for line in text.lines() {
        if let Some(path) = line.strip_prefix("--- ") {
            if let Some(done) = current.take() {
                files.push(done);
            }
            current = Some(FileDiff {
                old_path: strip_git_prefix(path.trim()),
                new_path: None,
                hunks: Vec::new(),
            });
        } else if let Some(path) = line.strip_prefix("+++ ") {
            if let Some(ref mut file) = current {
                file.new_path = strip_git_prefix(path.trim());
            }
        } else if line.starts_with("@@ ") {
            if let (Some(file), Some(hunk)) = (current.as_mut(), parse_hunk_header(line)) {
                file.hunks.push(hunk);
            }
        }
    }
    if let Some(done) = current.take() {
        files.push(done);
    }
    files
}

/// Returns `true` if the entity's line range intersects the hunk.
fn overlaps(entity: &Entity, (start, count): (u32, u32)) -> bool {
    let Some(entity_start) = entity.line_start else {
        // Entities without line info in a changed file count as touched.
        return true;
    };
    let entity_end = entity.line_end.unwrap_or(entity_start);
    let hunk_end = start + count.max(1) - 1;
    entity_start <= hunk_end && start <= entity_end
}

fn classify(entity: &Entity, hunks: &[(u32, u32)]) -> Option<ChangeKind> {
    let touching: Vec<&(u32, u32)> = hunks.iter().filter(|h| overlaps(entity, **h)).collect();
    if touching.is_empty() {
        return None;
    }
    let signature_hit = entity.line_start.is_none_or(|line_start| {
        touching
            .iter()
            .any(|&&(start, count)| start <= line_start && line_start <= start + count.max(1) - 1)
    });
    Some(if signature_hit {
        ChangeKind::SignatureChange
    } else {
        ChangeKind::BodyChange
    })
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

impl ContextAssembler<'_> {
    /// Runs a diff-driven context query.
    pub fn assemble_diff(&self, req: &DiffContextRequest) -> Result<ContextOutput> {
        let inner = ContextRequest {
            target: String::new(),
            hops: req.depth,
            max_tokens: req.max_tokens,
            budget_mode: req.budget_mode,
            density: req.density,
            include: Vec::new(),
            exclude: Vec::new(),
            with_coverage: false,
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut entries: Vec<ContextEntry> = Vec::new();
        let mut frontier: Vec<String> = Vec::new();

        for file in parse_unified_diff(&req.diff_text) {
            let changes: Vec<(Entity, ChangeKind)> = if file.is_added() {
                let path = file.new_path.as_deref().unwrap_or_default();
                self.entities_in(path)?
                    .into_iter()
                    .map(|e| (e, ChangeKind::Added))
                    .collect()
            } else if file.is_removed() {
                let path = file.old_path.as_deref().unwrap_or_default();
                self.entities_in(path)?
                    .into_iter()
                    .map(|e| (e, ChangeKind::Removed))
                    .collect()
            } else {
                let path = file.new_path.as_deref().unwrap_or_default();
                self.entities_in(path)?
                    .into_iter()
                    .filter_map(|e| classify(&e, &file.hunks).map(|kind| (e, kind)))
                    .collect()
            };

            for (entity, kind) in changes {
                if !seen.insert(entity.id.clone()) {
                    continue;
                }
                entries.push(self.annotate(&entity, 0, kind.reason().into(), &inner)?);
                if kind != ChangeKind::Removed {
                    frontier.push(entity.id.clone());
                }
            }
        }

        // Callers of changed entities, up to depth.
        for hop in 1..=req.depth {
            let mut next = Vec::new();
            for id in &frontier {
                for (caller, _) in self.graph.predecessors(id) {
                    if seen.contains(caller) {
                        continue;
                    }
                    let Some(entity) =
                        store_opt("failed to fetch entity", self.store.get_entity(caller))?
                    else {
                        continue;
                    };
                    seen.insert(caller.to_owned());
                    entries.push(self.annotate(
                        &entity,
                        hop,
                        format!("Hop {hop} from target"),
                        &inner,
                    )?);
                    next.push(caller.to_owned());
                }
            }
            frontier = next;
        }

        self.finish(
            "diff".into(),
            None,
            None,
            entries,
            BTreeMap::new(),
            false,
            &inner,
        )
    }

    fn entities_in(&self, path: &str) -> Result<Vec<Entity>> {
        store_op(
            "failed to query entities",
            self.store
                .query_entities(&EntityFilter::active_in_file(path)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_config::CxConfig;
    use cortex_core::dependency::Dependency;
    use cortex_core::enums::{DepType, EntityKind};
    use cortex_graph::DepGraph;
    use cortex_storage::{SqliteStore, Store};

    #[test]
    fn parses_modified_file_hunks() {
        let diff = "\
--- a/pkg/handler.go
+++ b/pkg/handler.go
@@ -10,3 +10,5 @@ func HandleRequest
 context
+added line
+another
 context
@@ -40,2 +44,2 @@
 more
";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].new_path.as_deref(), Some("pkg/handler.go"));
        assert_eq!(files[0].hunks, vec![(10, 5), (44, 2)]);
    }

    #[test]
    fn parses_added_and_removed_files() {
        let diff = "\
--- /dev/null
+++ b/pkg/new.go
@@ -0,0 +1,10 @@
--- a/pkg/old.go
+++ /dev/null
@@ -1,8 +0,0 @@
";
        let files = parse_unified_diff(diff);
        assert_eq!(files.len(), 2);
        assert!(files[0].is_added());
        assert!(files[1].is_removed());
    }

    fn entity_at(name: &str, file: &str, start: u32, end: u32) -> Entity {
        let mut e = Entity::new(name, EntityKind::Function, file);
        e.line_start = Some(start);
        e.line_end = Some(end);
        e
    }

    #[test]
    fn signature_vs_body_classification() {
        let entity = entity_at("Foo", "a.go", 10, 30);
        // Hunk covering line 10 touches the signature.
        assert_eq!(
            classify(&entity, &[(9, 3)]),
            Some(ChangeKind::SignatureChange)
        );
        // Hunk inside the body only.
        assert_eq!(classify(&entity, &[(15, 2)]), Some(ChangeKind::BodyChange));
        // Hunk elsewhere in the file.
        assert_eq!(classify(&entity, &[(100, 2)]), None);
    }

    #[test]
    fn diff_context_includes_callers_of_changed_entities() {
        let store = SqliteStore::open_in_memory().unwrap();
        let changed = entity_at("Parse", "internal/parse.go", 10, 40);
        let untouched = entity_at("Format", "internal/parse.go", 50, 80);
        let caller = entity_at("Compile", "internal/compile.go", 5, 25);
        store.create_entity(&changed).unwrap();
        store.create_entity(&untouched).unwrap();
        store.create_entity(&caller).unwrap();
        store
            .create_dependency(&Dependency::new(&caller.id, &changed.id, DepType::Calls))
            .unwrap();

        let diff = "\
--- a/internal/parse.go
+++ b/internal/parse.go
@@ -15,2 +15,4 @@
";
        let graph = DepGraph::build_from_store(&store).unwrap();
        let config = CxConfig::default();
        let output = ContextAssembler::new(&store, &graph, &config)
            .assemble_diff(&DiffContextRequest::new(diff))
            .unwrap();

        let by_id = |id: &str| output.relevant.iter().find(|e| e.id == id);
        let changed_entry = by_id(&changed.id).expect("changed entity present");
        assert_eq!(changed_entry.reason, "Modified in diff (body change)");
        assert!(by_id(&untouched.id).is_none());
        let caller_entry = by_id(&caller.id).expect("caller present");
        assert_eq!(caller_entry.hop, 1);
    }
}
