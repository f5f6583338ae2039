//! Session recovery: the no-argument digest AI agents use to re-acquire
//! workflow context.

use std::fmt::Write as _;
use std::path::Path;

use cortex_storage::Store;

use crate::error::{store_op, store_opt, Result};

/// Fixed command-guidance block appended to every digest.
const COMMAND_GUIDANCE: &str = "\
## Commands

- `cx context <target>` -- assemble a context pack around a file or entity
- `cx impact <target>` -- blast radius and risk for a change
- `cx dead --tier 3` -- find dead and transitively dead code
- `cx rank --top 10` -- most important entities by PageRank
- `cx status` / `cx log` -- working-set state and commit history
";

/// Builds the session-recovery digest as markdown.
///
/// `full` appends the top-5 entities by PageRank. When the `.cx` directory
/// contains a `PRIME.md` override, its contents are streamed verbatim at
/// the end.
pub fn digest(store: &dyn Store, cx_dir: Option<&Path>, full: bool) -> Result<String> {
    let status = store_op("failed to read status", store.status())?;

    let mut out = String::new();
    out.push_str("# Session Recovery\n\n");

    let head = status.head.as_deref().unwrap_or("no commits");
    let branch = if status.branch.is_empty() {
        "detached".to_owned()
    } else {
        status.branch.clone()
    };
    let _ = writeln!(out, "Store: initialized ({branch} @ {head})");
    let _ = writeln!(out, "- Active entities: {}", status.active_entities);
    let _ = writeln!(out, "- Archived entities: {}", status.archived_entities);
    let _ = writeln!(out, "- Dependencies: {}", status.dependencies);
    let _ = writeln!(out, "- Files indexed: {}", status.files);
    if status.dirty {
        out.push_str("- Working set has uncommitted changes\n");
    }
    out.push('\n');

    if full {
        let top = store_op("failed to load metrics", store.get_top_by_page_rank(5))?;
        if !top.is_empty() {
            out.push_str("## Top entities by PageRank\n\n");
            for metrics in top {
                let Some(entity) = store_opt(
                    "failed to fetch entity",
                    store.get_entity(&metrics.entity_id),
                )?
                else {
                    continue;
                };
                let line = entity.line_start.unwrap_or(0);
                let _ = writeln!(
                    out,
                    "- {} ({}) @ {}:{}",
                    entity.name,
                    entity.entity_type.as_str(),
                    entity.short_path(),
                    line
                );
            }
            out.push('\n');
        }
    }

    out.push_str(COMMAND_GUIDANCE);

    if let Some(cx_dir) = cx_dir {
        let prime = cx_dir.join(cortex_config::PRIME_FILE_NAME);
        if let Ok(content) = std::fs::read_to_string(&prime) {
            out.push('\n');
            out.push_str(&content);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::entity::Entity;
    use cortex_core::enums::EntityKind;
    use cortex_core::metrics::EntityMetrics;
    use cortex_storage::SqliteStore;

    #[test]
    fn digest_reports_counts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let e = Entity::new("Foo", EntityKind::Function, "pkg/a.go");
        store.create_entity(&e).unwrap();

        let text = digest(&store, None, false).unwrap();
        assert!(text.contains("Active entities: 1"));
        assert!(text.contains("Dependencies: 0"));
        assert!(text.contains("cx context"));
        assert!(!text.contains("Top entities"));
    }

    #[test]
    fn full_digest_lists_top_entities_with_short_paths() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut e = Entity::new("Handler", EntityKind::Function, "internal/pkg/http.go");
        e.line_start = Some(42);
        store.create_entity(&e).unwrap();
        store
            .save_metrics(&EntityMetrics {
                page_rank: 0.8,
                ..EntityMetrics::zero(&e.id)
            })
            .unwrap();

        let text = digest(&store, None, true).unwrap();
        assert!(text.contains("Top entities by PageRank"));
        assert!(text.contains("Handler (function) @ pkg/http.go:42"));
    }

    #[test]
    fn prime_override_is_streamed_verbatim() {
        let store = SqliteStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(cortex_config::PRIME_FILE_NAME),
            "Project-specific priming notes.",
        )
        .unwrap();

        let text = digest(&store, Some(dir.path()), false).unwrap();
        assert!(text.ends_with("Project-specific priming notes."));
    }
}
