//! The context assembler: hop-bounded expansion around a target, pruned
//! to a token budget.
//!
//! Expansion walks the dependency graph outward from the hop-0 set,
//! honoring the include set (`deps`, `callers`, `types`) and exclusion
//! substrings. Each included entity is annotated with importance,
//! relevance, and an estimated token cost; when the total exceeds the
//! budget, entries are dropped according to the budget mode. Task entries
//! are never dropped.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::debug;

use cortex_config::{BudgetMode, CxConfig};
use cortex_core::entity::Entity;
use cortex_core::enums::{DepType, EntityKind};
use cortex_graph::DepGraph;
use cortex_storage::Store;

use crate::error::{store_opt, Result};
use crate::smart::Intent;
use crate::target::{resolve_target, ResolvedTarget, TaskTracker};
use crate::tokens::{self, Density};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Parameters for a context query.
#[derive(Debug, Clone)]
pub struct ContextRequest {
    pub target: String,
    /// Expansion radius in hops.
    pub hops: usize,
    pub max_tokens: usize,
    pub budget_mode: BudgetMode,
    pub density: Density,
    /// Expansion set; empty means the configured default.
    pub include: Vec<String>,
    /// Extra exclusion substrings on top of the configured default.
    pub exclude: Vec<String>,
    pub with_coverage: bool,
}

impl ContextRequest {
    /// A request with spec defaults for the given target.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            hops: 1,
            max_tokens: 4000,
            budget_mode: BudgetMode::Importance,
            density: Density::Medium,
            include: Vec::new(),
            exclude: Vec::new(),
            with_coverage: false,
        }
    }
}

/// Which edge directions and edge types expansion follows.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ExpandSet {
    pub deps: bool,
    pub callers: bool,
    pub types: bool,
    pub tests: bool,
    pub mocks: bool,
}

impl ExpandSet {
    /// Builds the set from the request include list, falling back to the
    /// configured default when the user supplied none.
    pub(crate) fn from_include(include: &[String], default_include: &[String]) -> Self {
        let effective = if include.is_empty() {
            default_include
        } else {
            include
        };
        let mut set = Self::default();
        for item in effective {
            match item.to_ascii_lowercase().as_str() {
                "deps" => set.deps = true,
                "callers" => set.callers = true,
                "types" => set.types = true,
                "tests" => set.tests = true,
                "mocks" => set.mocks = true,
                _ => {}
            }
        }
        set
    }
}

/// Builds the lowercase exclusion substrings for a request.
///
/// The configured defaults (`tests`, `mocks`) expand to the `test`,
/// `_test`, and `mock` substrings unless the include set pulls them back
/// in; user-supplied excludes are matched verbatim.
pub(crate) fn exclusion_substrings(
    expand: &ExpandSet,
    default_exclude: &[String],
    extra: &[String],
) -> Vec<String> {
    let mut subs: Vec<String> = Vec::new();
    for item in default_exclude {
        match item.as_str() {
            "tests" if !expand.tests => {
                subs.push("test".into());
                subs.push("_test".into());
            }
            "mocks" if !expand.mocks => subs.push("mock".into()),
            "tests" | "mocks" => {}
            other => subs.push(other.to_lowercase()),
        }
    }
    for item in extra {
        if !item.is_empty() {
            subs.push(item.to_lowercase());
        }
    }
    subs
}

fn is_excluded(id: &str, substrings: &[String]) -> bool {
    let lower = id.to_lowercase();
    substrings.iter().any(|s| lower.contains(s))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Relevance class derived from importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relevance {
    High,
    Medium,
    Low,
}

impl Relevance {
    fn of(importance: f64) -> Self {
        if importance >= 0.5 {
            Self::High
        } else if importance < 0.1 {
            Self::Low
        } else {
            Self::Medium
        }
    }
}

/// One entry in the assembled context pack.
#[derive(Debug, Clone, Serialize)]
pub struct ContextEntry {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityKind>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    pub hop: usize,
    pub is_task: bool,
    pub reason: String,
    pub importance: f64,
    pub is_keystone: bool,
    pub relevance: Relevance,
    pub estimated_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_percent: Option<f64>,
}

/// The assembled, budget-bounded context pack.
#[derive(Debug, Clone, Serialize)]
pub struct ContextOutput {
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    /// Hop-0 entries present because a task context was requested.
    pub entry_points: Vec<ContextEntry>,
    /// Every included code entity.
    pub relevant: Vec<ContextEntry>,
    /// Ids removed from the pack, keyed by reason.
    pub excluded: BTreeMap<String, Vec<String>>,
    pub total_tokens: usize,
    pub max_tokens: usize,
    pub dropped: usize,
    pub warnings: Vec<String>,
}

/// Exclusion-map key for entries removed by the substring filter.
pub const EXCLUDED_BY_FILTER: &str = "excluded by filter";
/// Exclusion-map key for entries removed by budget pruning.
pub const EXCLUDED_BY_BUDGET: &str = "budget";

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

/// Assembles context packs from a store snapshot and its graph.
pub struct ContextAssembler<'a> {
    pub(crate) store: &'a dyn Store,
    pub(crate) graph: &'a DepGraph,
    pub(crate) config: &'a CxConfig,
    pub(crate) tracker: Option<&'a dyn TaskTracker>,
}

impl<'a> ContextAssembler<'a> {
    pub fn new(store: &'a dyn Store, graph: &'a DepGraph, config: &'a CxConfig) -> Self {
        Self {
            store,
            graph,
            config,
            tracker: None,
        }
    }

    /// Wires in the task-tracker collaborator.
    pub fn with_tracker(mut self, tracker: &'a dyn TaskTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Runs a plain (target-based) context query.
    pub fn assemble(&self, req: &ContextRequest) -> Result<ContextOutput> {
        let expand = ExpandSet::from_include(&req.include, &self.config.expand.default_include);
        let exclusions = exclusion_substrings(
            &expand,
            &self.config.expand.default_exclude,
            &req.exclude,
        );

        let resolved = resolve_target(self.store, self.tracker, &req.target)?;
        let task_linked = matches!(resolved, ResolvedTarget::Task { .. });

        let mut excluded: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut entries: Vec<ContextEntry> = Vec::new();
        let mut frontier: Vec<String> = Vec::new();

        // Task entries are pinned: never excluded, never budget-dropped.
        let task_entry = match &resolved {
            ResolvedTarget::Task { task, .. } => Some(ContextEntry {
                id: task.id.clone(),
                name: task.title.clone(),
                entity_type: None,
                file_path: String::new(),
                line_start: None,
                hop: 0,
                is_task: true,
                reason: "Requested task".into(),
                importance: 1.0,
                is_keystone: false,
                relevance: Relevance::High,
                estimated_tokens: tokens::task_tokens(&task.title, &task.description),
                coverage_percent: None,
            }),
            _ => None,
        };

        // Hop 0.
        let hop0_reason = if task_linked {
            "Linked from task description"
        } else {
            "Hop 0 from target"
        };
        for entity in resolved.entities() {
            if is_excluded(&entity.id, &exclusions) {
                excluded
                    .entry(EXCLUDED_BY_FILTER.into())
                    .or_default()
                    .push(entity.id.clone());
                continue;
            }
            if !seen.insert(entity.id.clone()) {
                continue;
            }
            entries.push(self.annotate(entity, 0, hop0_reason.into(), req)?);
            frontier.push(entity.id.clone());
        }

        // Expansion.
        for hop in 1..=req.hops {
            let mut next: Vec<String> = Vec::new();
            for id in &frontier {
                for (neighbor, dep_type) in self.neighbors(id, &expand) {
                    if seen.contains(&neighbor) {
                        continue;
                    }
                    if is_excluded(&neighbor, &exclusions) {
                        excluded
                            .entry(EXCLUDED_BY_FILTER.into())
                            .or_default()
                            .push(neighbor.clone());
                        continue;
                    }
                    let Some(entity) = store_opt(
                        "failed to fetch entity",
                        self.store.get_entity(&neighbor),
                    )?
                    else {
                        continue;
                    };
                    seen.insert(neighbor.clone());
                    let reason = if dep_type == DepType::UsesType {
                        "Type reference".to_owned()
                    } else {
                        format!("Hop {hop} from target")
                    };
                    entries.push(self.annotate(&entity, hop, reason, req)?);
                    next.push(neighbor);
                }
            }
            frontier = next;
        }

        debug!(
            entries = entries.len(),
            hops = req.hops,
            "expanded context set"
        );

        self.finish(
            req.target.clone(),
            None,
            task_entry,
            entries,
            excluded,
            task_linked,
            req,
        )
    }

    /// Neighbors reachable under the expansion set, with the edge type that
    /// admitted them.
    fn neighbors(&self, id: &str, expand: &ExpandSet) -> Vec<(String, DepType)> {
        let mut out: Vec<(String, DepType)> = Vec::new();
        if expand.deps || expand.types {
            for (n, t) in self.graph.successors(id) {
                let allowed = if t == DepType::UsesType {
                    expand.types
                } else {
                    expand.deps
                };
                if allowed {
                    out.push((n.to_owned(), t));
                }
            }
        }
        if expand.callers {
            for (n, t) in self.graph.predecessors(id) {
                if t != DepType::UsesType || expand.types {
                    out.push((n.to_owned(), t));
                }
            }
        }
        out
    }

    /// Annotates one entity with metrics-derived importance and token cost.
    pub(crate) fn annotate(
        &self,
        entity: &Entity,
        hop: usize,
        reason: String,
        req: &ContextRequest,
    ) -> Result<ContextEntry> {
        let metrics = store_opt(
            "failed to fetch metrics",
            self.store.get_metrics(&entity.id),
        )?;
        let (page_rank, in_degree) = metrics
            .map(|m| (m.page_rank, m.in_degree))
            .unwrap_or((0.0, 0));

        let importance = 0.7 * page_rank + 0.3 * (in_degree as f64 / 100.0).min(1.0);
        let is_keystone = page_rank >= self.config.metrics.keystone_threshold;

        let coverage_percent = if req.with_coverage {
            store_opt(
                "failed to fetch coverage",
                self.store.get_coverage(&entity.id),
            )?
            .flatten()
            .map(|c| c.coverage_percent)
        } else {
            None
        };

        Ok(ContextEntry {
            id: entity.id.clone(),
            name: entity.name.clone(),
            entity_type: Some(entity.entity_type),
            file_path: entity.file_path.clone(),
            line_start: entity.line_start,
            hop,
            is_task: false,
            reason,
            importance,
            is_keystone,
            relevance: Relevance::of(importance),
            estimated_tokens: tokens::entity_tokens(req.density, &entity.name, &entity.signature),
            coverage_percent,
        })
    }

    /// Applies the budget and classifies the output.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn finish(
        &self,
        target: String,
        intent: Option<Intent>,
        task_entry: Option<ContextEntry>,
        mut entries: Vec<ContextEntry>,
        mut excluded: BTreeMap<String, Vec<String>>,
        task_context: bool,
        req: &ContextRequest,
    ) -> Result<ContextOutput> {
        let task_cost: usize = task_entry.as_ref().map(|t| t.estimated_tokens).unwrap_or(0);
        let entry_cost: usize = entries.iter().map(|e| e.estimated_tokens).sum();
        let mut total = task_cost + entry_cost;
        let mut dropped = 0;
        let mut warnings = Vec::new();

        if total > req.max_tokens {
            match req.budget_mode {
                BudgetMode::Importance => entries.sort_by(|a, b| {
                    b.importance
                        .partial_cmp(&a.importance)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.hop.cmp(&b.hop))
                        .then(a.id.cmp(&b.id))
                }),
                BudgetMode::Distance => entries.sort_by(|a, b| {
                    a.hop
                        .cmp(&b.hop)
                        .then(
                            b.importance
                                .partial_cmp(&a.importance)
                                .unwrap_or(std::cmp::Ordering::Equal),
                        )
                        .then(a.id.cmp(&b.id))
                }),
            }

            // Task entries are pinned even when they alone exceed the
            // budget; code entries fill whatever remains, as a prefix of
            // the sorted order.
            let remaining = req.max_tokens.saturating_sub(task_cost);
            let mut kept = Vec::new();
            let mut used = 0;
            let mut iter = entries.into_iter();
            for entry in iter.by_ref() {
                if used + entry.estimated_tokens <= remaining {
                    used += entry.estimated_tokens;
                    kept.push(entry);
                } else {
                    dropped += 1;
                    excluded
                        .entry(EXCLUDED_BY_BUDGET.into())
                        .or_default()
                        .push(entry.id);
                    break;
                }
            }
            for entry in iter {
                dropped += 1;
                excluded
                    .entry(EXCLUDED_BY_BUDGET.into())
                    .or_default()
                    .push(entry.id);
            }

            warnings.push(format!(
                "Budget exceeded: dropped {dropped} entries to fit {} tokens",
                req.max_tokens
            ));
            total = task_cost + used;
            entries = kept;
        }

        // Stable presentation order.
        entries.sort_by(|a, b| {
            a.hop
                .cmp(&b.hop)
                .then(a.file_path.cmp(&b.file_path))
                .then(a.line_start.cmp(&b.line_start))
        });
        for ids in excluded.values_mut() {
            ids.sort();
            ids.dedup();
        }

        let mut entry_points: Vec<ContextEntry> = Vec::new();
        if let Some(task) = task_entry {
            entry_points.push(task);
        }
        if task_context {
            entry_points.extend(entries.iter().filter(|e| e.hop == 0).cloned());
        }

        Ok(ContextOutput {
            target,
            intent,
            entry_points,
            relevant: entries,
            excluded,
            total_tokens: total,
            max_tokens: req.max_tokens,
            dropped,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::dependency::Dependency;
    use cortex_core::enums::EntityKind;
    use cortex_core::metrics::EntityMetrics;
    use cortex_storage::SqliteStore;

    fn seed(store: &SqliteStore, name: &str, file: &str) -> Entity {
        let e = Entity::new(name, EntityKind::Function, file);
        store.create_entity(&e).unwrap();
        e
    }

    fn link(store: &SqliteStore, from: &Entity, to: &Entity, t: DepType) {
        store
            .create_dependency(&Dependency::new(&from.id, &to.id, t))
            .unwrap();
    }

    fn assemble(store: &SqliteStore, req: &ContextRequest) -> ContextOutput {
        let graph = DepGraph::build_from_store(store).unwrap();
        let config = CxConfig::default();
        ContextAssembler::new(store, &graph, &config)
            .assemble(req)
            .unwrap()
    }

    #[test]
    fn file_target_with_callers_matches_expected_set() {
        let store = SqliteStore::open_in_memory().unwrap();
        let func_a = seed(&store, "FuncA", "pkg/handler.go");
        let func_b = seed(&store, "FuncB", "pkg/handler.go");
        let func_c = seed(&store, "FuncC", "cmd/main.go");
        link(&store, &func_c, &func_a, DepType::Calls);

        let mut req = ContextRequest::new("pkg/handler.go");
        req.include = vec!["callers".into()];
        let output = assemble(&store, &req);

        let ids: Vec<&str> = output.relevant.iter().map(|e| e.id.as_str()).collect();
        assert!(ids.contains(&func_a.id.as_str()));
        assert!(ids.contains(&func_b.id.as_str()));
        assert!(ids.contains(&func_c.id.as_str()));

        let caller = output
            .relevant
            .iter()
            .find(|e| e.id == func_c.id)
            .unwrap();
        assert_eq!(caller.hop, 1);
        assert_eq!(caller.reason, "Hop 1 from target");
    }

    #[test]
    fn single_entity_with_no_neighbors_is_one_hop0_entry() {
        let store = SqliteStore::open_in_memory().unwrap();
        let lone = seed(&store, "Lone", "pkg/lone.go");

        let output = assemble(&store, &ContextRequest::new(lone.id.clone()));
        assert_eq!(output.relevant.len(), 1);
        assert_eq!(output.relevant[0].hop, 0);
        assert_eq!(output.relevant[0].reason, "Hop 0 from target");
    }

    #[test]
    fn default_expansion_follows_deps_and_types_only() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = seed(&store, "Root", "pkg/root.go");
        let dep = seed(&store, "Dep", "pkg/dep.go");
        let caller = seed(&store, "Caller", "pkg/caller.go");
        link(&store, &root, &dep, DepType::Calls);
        link(&store, &caller, &root, DepType::Calls);

        let output = assemble(&store, &ContextRequest::new(root.id.clone()));
        let ids: Vec<&str> = output.relevant.iter().map(|e| e.id.as_str()).collect();
        assert!(ids.contains(&dep.id.as_str()));
        assert!(!ids.contains(&caller.id.as_str()));
    }

    #[test]
    fn type_edges_get_the_type_reference_reason() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = seed(&store, "Root", "pkg/root.go");
        let config_type = seed(&store, "Config", "pkg/config.go");
        link(&store, &root, &config_type, DepType::UsesType);

        let output = assemble(&store, &ContextRequest::new(root.id.clone()));
        let entry = output
            .relevant
            .iter()
            .find(|e| e.id == config_type.id)
            .unwrap();
        assert_eq!(entry.reason, "Type reference");
    }

    #[test]
    fn test_entities_are_excluded_by_default() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = seed(&store, "Root", "pkg/root.go");
        let helper = Entity::new("TestHelper", EntityKind::Function, "pkg/root_test.go");
        store.create_entity(&helper).unwrap();
        link(&store, &root, &helper, DepType::Calls);

        let output = assemble(&store, &ContextRequest::new(root.id.clone()));
        assert_eq!(output.relevant.len(), 1);
        assert!(output.excluded[EXCLUDED_BY_FILTER].contains(&helper.id));
    }

    #[test]
    fn budget_pruning_importance_mode_keeps_prefix() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = seed(&store, "Root", "pkg/root.go");
        let mid = seed(&store, "Mid", "pkg/mid.go");
        let low = seed(&store, "Low", "pkg/low.go");
        link(&store, &root, &mid, DepType::Calls);
        link(&store, &root, &low, DepType::Calls);

        // Importance comes from stored metrics.
        store
            .save_bulk_metrics(&[
                EntityMetrics {
                    page_rank: 0.9 / 0.7,
                    ..EntityMetrics::zero(&root.id)
                },
                EntityMetrics {
                    page_rank: 0.5 / 0.7,
                    ..EntityMetrics::zero(&mid.id)
                },
                EntityMetrics {
                    page_rank: 0.05 / 0.7,
                    ..EntityMetrics::zero(&low.id)
                },
            ])
            .unwrap();

        let mut req = ContextRequest::new(root.id.clone());
        // Sparse entries cost 18 tokens each; allow exactly one.
        req.density = Density::Sparse;
        req.max_tokens = 30;
        let output = assemble(&store, &req);

        assert_eq!(output.relevant.len(), 1);
        assert_eq!(output.relevant[0].id, root.id);
        assert_eq!(output.dropped, 2);
        assert!(output.warnings.iter().any(|w| w.contains("Budget exceeded")));
        assert_eq!(output.excluded[EXCLUDED_BY_BUDGET].len(), 2);
        assert!(output.total_tokens <= req.max_tokens);
    }

    #[test]
    fn distance_mode_prefers_closer_entries() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = seed(&store, "Root", "pkg/root.go");
        let near = seed(&store, "Near", "pkg/near.go");
        let far = seed(&store, "Far", "pkg/far.go");
        link(&store, &root, &near, DepType::Calls);
        link(&store, &near, &far, DepType::Calls);

        // Make the far entry the most important one.
        store
            .save_metrics(&EntityMetrics {
                page_rank: 1.0,
                ..EntityMetrics::zero(&far.id)
            })
            .unwrap();

        let mut req = ContextRequest::new(root.id.clone());
        req.hops = 2;
        req.density = Density::Sparse;
        req.max_tokens = 36; // two sparse entries
        req.budget_mode = BudgetMode::Distance;
        let output = assemble(&store, &req);

        let ids: Vec<&str> = output.relevant.iter().map(|e| e.id.as_str()).collect();
        assert!(ids.contains(&root.id.as_str()));
        assert!(ids.contains(&near.id.as_str()));
        assert!(!ids.contains(&far.id.as_str()));
    }

    #[test]
    fn unknown_target_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let graph = DepGraph::build_from_store(&store).unwrap();
        let config = CxConfig::default();
        let err = ContextAssembler::new(&store, &graph, &config)
            .assemble(&ContextRequest::new("pkg/ghost.go"))
            .unwrap_err();
        assert!(matches!(err, crate::AnalysisError::TargetNotFound { .. }));
    }
}
