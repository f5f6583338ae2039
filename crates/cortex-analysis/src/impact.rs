//! Impact analysis: reverse-BFS blast radius with risk scoring.
//!
//! From a resolved target, walk the reverse graph to the requested depth,
//! tagging each dependent with its hop (shortest distance), whether it is
//! a test, and a reason. Tests co-located with a root are associated even
//! without an edge. Risk and recommendations are derived deterministically
//! from the result.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;
use tracing::debug;

use cortex_config::CxConfig;
use cortex_core::entity::Entity;
use cortex_core::filter::EntityFilter;
use cortex_graph::DepGraph;
use cortex_storage::Store;

use crate::error::{store_op, store_opt, Result};
use crate::target::{resolve_target, TaskTracker};

/// PageRank at which a poorly covered root is worth a warning.
const COVERAGE_WARNING_RANK: f64 = 0.15;

/// Coverage percent below which a root is called out.
const LOW_COVERAGE_PERCENT: f64 = 50.0;

// ---------------------------------------------------------------------------
// Request / output
// ---------------------------------------------------------------------------

/// Parameters for an impact query.
#[derive(Debug, Clone)]
pub struct ImpactRequest {
    pub target: String,
    /// Reverse-BFS depth.
    pub depth: usize,
}

impl ImpactRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            depth: 2,
        }
    }
}

/// Overall risk of changing the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One entity in the blast radius.
#[derive(Debug, Clone, Serialize)]
pub struct AffectedEntity {
    pub id: String,
    pub name: String,
    pub file_path: String,
    /// Shortest reverse-graph distance from a root.
    pub hop: usize,
    pub is_test: bool,
    pub is_keystone: bool,
    pub reason: String,
}

/// The result of an impact query.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactOutput {
    pub targets: Vec<String>,
    pub affected: Vec<AffectedEntity>,
    pub risk_level: RiskLevel,
    /// Suggested test-runner invocation over the affected packages.
    pub suggested_tests: String,
    pub recommendations: Vec<String>,
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Computes blast radii over a store snapshot and its graph.
pub struct ImpactAnalyzer<'a> {
    store: &'a dyn Store,
    graph: &'a DepGraph,
    config: &'a CxConfig,
    tracker: Option<&'a dyn TaskTracker>,
}

/// Returns `true` if the entity looks like a test.
pub(crate) fn is_test_entity(entity: &Entity) -> bool {
    entity.file_path.contains("_test")
        || entity.name.to_lowercase().starts_with("test")
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(store: &'a dyn Store, graph: &'a DepGraph, config: &'a CxConfig) -> Self {
        Self {
            store,
            graph,
            config,
            tracker: None,
        }
    }

    pub fn with_tracker(mut self, tracker: &'a dyn TaskTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Runs the impact query.
    pub fn analyze(&self, req: &ImpactRequest) -> Result<ImpactOutput> {
        let resolved = resolve_target(self.store, self.tracker, &req.target)?;
        let roots: Vec<Entity> = resolved.entities().to_vec();
        let root_ids: HashSet<&str> = roots.iter().map(|e| e.id.as_str()).collect();
        let root_label = roots
            .first()
            .map(|e| e.name.clone())
            .unwrap_or_else(|| req.target.clone());

        // Reverse BFS; `hops` records shortest distances.
        let mut hops: HashMap<String, usize> = HashMap::new();
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        for root in &roots {
            hops.insert(root.id.clone(), 0);
            queue.push_back((root.id.clone(), 0));
        }

        let mut affected: Vec<AffectedEntity> = Vec::new();
        while let Some((id, hop)) = queue.pop_front() {
            if hop >= req.depth {
                continue;
            }
            for (caller, _) in self.graph.predecessors(&id) {
                if hops.contains_key(caller) {
                    continue;
                }
                let next_hop = hop + 1;
                hops.insert(caller.to_owned(), next_hop);
                queue.push_back((caller.to_owned(), next_hop));

                let Some(entity) =
                    store_opt("failed to fetch entity", self.store.get_entity(caller))?
                else {
                    continue;
                };
                let is_test = is_test_entity(&entity);
                let reason = if is_test {
                    format!("Tests {root_label}")
                } else if next_hop == 1 {
                    format!("Directly calls {root_label}")
                } else {
                    format!("Depends on {root_label}")
                };
                affected.push(AffectedEntity {
                    is_keystone: self.is_keystone(&entity.id)?,
                    id: entity.id,
                    name: entity.name,
                    file_path: entity.file_path,
                    hop: next_hop,
                    is_test,
                    reason,
                });
            }
        }

        // Same-directory test association, independent of edges.
        let mut associated_tests = 0;
        for root in &roots {
            for test in self.associated_tests(root)? {
                if hops.contains_key(&test.id) || root_ids.contains(test.id.as_str()) {
                    continue;
                }
                hops.insert(test.id.clone(), 1);
                associated_tests += 1;
                affected.push(AffectedEntity {
                    is_keystone: false,
                    id: test.id,
                    name: test.name,
                    file_path: test.file_path,
                    hop: 1,
                    is_test: true,
                    reason: format!("Tests {} (file association)", root.name),
                });
            }
        }

        affected.sort_by(|a, b| {
            a.hop
                .cmp(&b.hop)
                .then(a.file_path.cmp(&b.file_path))
                .then(a.name.cmp(&b.name))
        });

        let direct_dependents = affected
            .iter()
            .filter(|a| a.hop == 1 && !a.is_test)
            .count();
        let has_tests = associated_tests > 0 || affected.iter().any(|a| a.is_test);

        let mut any_keystone_root = false;
        let mut roots_without_coverage = 0;
        let mut low_coverage_notes: Vec<String> = Vec::new();
        for root in &roots {
            let rank = self.page_rank(&root.id)?;
            if rank >= self.config.metrics.keystone_threshold {
                any_keystone_root = true;
            }
            match store_opt("failed to fetch coverage", self.store.get_coverage(&root.id))?
                .flatten()
            {
                Some(cov) if cov.coverage_percent < LOW_COVERAGE_PERCENT => {
                    low_coverage_notes.push(format!(
                        "Low coverage on {} ({:.0}%)",
                        root.name, cov.coverage_percent
                    ));
                }
                Some(_) => {}
                None => {
                    roots_without_coverage += 1;
                    if rank >= COVERAGE_WARNING_RANK {
                        low_coverage_notes
                            .push(format!("No coverage recorded for {}", root.name));
                    }
                }
            }
        }

        let risk_level = if any_keystone_root || direct_dependents >= 10 {
            RiskLevel::High
        } else if direct_dependents >= 5
            || (direct_dependents >= 3 && roots_without_coverage == roots.len() && !has_tests)
        {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        let suggested_tests = self.suggest_tests(&roots, &affected);
        let mut recommendations = low_coverage_notes;
        if risk_level == RiskLevel::High {
            recommendations.push("Review all direct dependents before merging".into());
        }

        debug!(
            affected = affected.len(),
            direct = direct_dependents,
            risk = risk_level.as_str(),
            "impact analysis complete"
        );

        Ok(ImpactOutput {
            targets: roots.into_iter().map(|e| e.id).collect(),
            affected,
            risk_level,
            suggested_tests,
            recommendations,
        })
    }

    fn page_rank(&self, id: &str) -> Result<f64> {
        Ok(
            store_opt("failed to fetch metrics", self.store.get_metrics(id))?
                .map(|m| m.page_rank)
                .unwrap_or(0.0),
        )
    }

    fn is_keystone(&self, id: &str) -> Result<bool> {
        Ok(self.page_rank(id)? >= self.config.metrics.keystone_threshold)
    }

    /// Tests in the root's directory whose names reference the root.
    fn associated_tests(&self, root: &Entity) -> Result<Vec<Entity>> {
        let dir = match root.file_path.rsplit_once('/') {
            Some((dir, _)) => dir.to_owned(),
            None => String::new(),
        };
        let candidates = store_op(
            "failed to query entities",
            self.store.query_entities(&EntityFilter {
                name_like: Some(root.name.clone()),
                ..EntityFilter::active()
            }),
        )?;

        let root_lower = root.name.to_lowercase();
        Ok(candidates
            .into_iter()
            .filter(|e| is_test_entity(e))
            .filter(|e| match e.file_path.rsplit_once('/') {
                Some((candidate_dir, _)) => candidate_dir == dir,
                None => dir.is_empty(),
            })
            .filter(|e| {
                let name = e.name.to_lowercase();
                name.contains(&root_lower) || root_lower.starts_with(&name)
            })
            .collect())
    }

    /// Builds a deduplicated, sorted test invocation over affected packages.
    fn suggest_tests(&self, roots: &[Entity], affected: &[AffectedEntity]) -> String {
        let mut dirs: BTreeSet<String> = BTreeSet::new();
        for path in roots
            .iter()
            .map(|e| e.file_path.as_str())
            .chain(affected.iter().map(|a| a.file_path.as_str()))
        {
            if let Some((dir, _)) = path.rsplit_once('/') {
                dirs.insert(format!("./{dir}/..."));
            }
        }
        if dirs.is_empty() {
            return "go test ./...".into();
        }
        let packages: Vec<String> = dirs.into_iter().collect();
        format!("go test {}", packages.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::dependency::Dependency;
    use cortex_core::enums::{DepType, EntityKind};
    use cortex_core::metrics::EntityMetrics;
    use cortex_storage::SqliteStore;

    fn seed(store: &SqliteStore, name: &str, file: &str) -> Entity {
        let e = Entity::new(name, EntityKind::Function, file);
        store.create_entity(&e).unwrap();
        e
    }

    fn analyze(store: &SqliteStore, req: &ImpactRequest) -> ImpactOutput {
        let graph = DepGraph::build_from_store(store).unwrap();
        let config = CxConfig::default();
        ImpactAnalyzer::new(store, &graph, &config)
            .analyze(req)
            .unwrap()
    }

    #[test]
    fn chain_of_dependents_with_shortest_hops() {
        let store = SqliteStore::open_in_memory().unwrap();
        let parse = seed(&store, "Parse", "internal/parse.go");
        let compile = seed(&store, "Compile", "internal/compile.go");
        let main = seed(&store, "Main", "cmd/main.go");
        store
            .create_dependency(&Dependency::new(&compile.id, &parse.id, DepType::Calls))
            .unwrap();
        store
            .create_dependency(&Dependency::new(&main.id, &compile.id, DepType::Calls))
            .unwrap();

        let output = analyze(&store, &ImpactRequest::new(parse.id.clone()));

        assert_eq!(output.affected.len(), 2);
        let compile_hit = output.affected.iter().find(|a| a.id == compile.id).unwrap();
        assert_eq!(compile_hit.hop, 1);
        assert_eq!(compile_hit.reason, "Directly calls Parse");
        let main_hit = output.affected.iter().find(|a| a.id == main.id).unwrap();
        assert_eq!(main_hit.hop, 2);
        assert_eq!(main_hit.reason, "Depends on Parse");

        assert_eq!(output.risk_level, RiskLevel::Low);
        assert!(output.suggested_tests.contains("./internal/"));
    }

    #[test]
    fn depth_bounds_the_walk() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = seed(&store, "A", "pkg/a.go");
        let b = seed(&store, "B", "pkg/b.go");
        let c = seed(&store, "C", "pkg/c.go");
        store
            .create_dependency(&Dependency::new(&b.id, &a.id, DepType::Calls))
            .unwrap();
        store
            .create_dependency(&Dependency::new(&c.id, &b.id, DepType::Calls))
            .unwrap();

        let mut req = ImpactRequest::new(a.id.clone());
        req.depth = 1;
        let output = analyze(&store, &req);
        assert_eq!(output.affected.len(), 1);
        assert!(output.affected.iter().all(|e| e.hop <= 1));
    }

    #[test]
    fn test_callers_get_the_tests_reason() {
        let store = SqliteStore::open_in_memory().unwrap();
        let parse = seed(&store, "Parse", "internal/parse.go");
        let test = seed(&store, "TestParse", "internal/parse_test.go");
        store
            .create_dependency(&Dependency::new(&test.id, &parse.id, DepType::Calls))
            .unwrap();

        let output = analyze(&store, &ImpactRequest::new(parse.id.clone()));
        let hit = output.affected.iter().find(|a| a.id == test.id).unwrap();
        assert!(hit.is_test);
        assert_eq!(hit.reason, "Tests Parse");
    }

    #[test]
    fn co_located_tests_are_associated_without_edges() {
        let store = SqliteStore::open_in_memory().unwrap();
        let parse = seed(&store, "Parse", "internal/parse.go");
        let test = seed(&store, "TestParse", "internal/parse_test.go");
        let far_test = seed(&store, "TestParse", "other/parse_test.go");

        let output = analyze(&store, &ImpactRequest::new(parse.id.clone()));
        let hit = output.affected.iter().find(|a| a.id == test.id).unwrap();
        assert_eq!(hit.reason, "Tests Parse (file association)");
        assert!(!output.affected.iter().any(|a| a.id == far_test.id));
    }

    #[test]
    fn keystone_root_is_high_risk() {
        let store = SqliteStore::open_in_memory().unwrap();
        let core = seed(&store, "Core", "pkg/core.go");
        store
            .save_metrics(&EntityMetrics {
                page_rank: 0.4,
                ..EntityMetrics::zero(&core.id)
            })
            .unwrap();

        let output = analyze(&store, &ImpactRequest::new(core.id.clone()));
        assert_eq!(output.risk_level, RiskLevel::High);
        assert!(output
            .recommendations
            .iter()
            .any(|r| r.contains("Review all direct dependents")));
    }

    #[test]
    fn many_direct_dependents_raise_risk() {
        let store = SqliteStore::open_in_memory().unwrap();
        let hub = seed(&store, "Hub", "pkg/hub.go");
        for i in 0..5 {
            let caller = seed(&store, &format!("Caller{i}"), &format!("pkg/c{i}.go"));
            store
                .create_dependency(&Dependency::new(&caller.id, &hub.id, DepType::Calls))
                .unwrap();
        }

        let output = analyze(&store, &ImpactRequest::new(hub.id.clone()));
        assert_eq!(output.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn low_coverage_on_root_is_called_out() {
        let store = SqliteStore::open_in_memory().unwrap();
        let parse = seed(&store, "Parse", "internal/parse.go");
        store
            .save_coverage(&cortex_core::entity::CoverageRecord {
                entity_id: parse.id.clone(),
                coverage_percent: 20.0,
                lines_covered: 2,
                lines_total: 10,
                source_tag: "go-cover".into(),
            })
            .unwrap();

        let output = analyze(&store, &ImpactRequest::new(parse.id.clone()));
        assert!(output
            .recommendations
            .iter()
            .any(|r| r.contains("Low coverage on Parse")));
    }
}
