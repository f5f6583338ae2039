//! Dead-code analysis: three confidence tiers with fixpoint propagation
//! and connected-component chain labeling.
//!
//! Tier 1 (definite): private, never referenced. Tier 2 (probable):
//! public, never referenced -- only reported when exports are included.
//! Tier 3 (suspicious): referenced, but every caller is itself dead;
//! computed by iterating until no new entries appear. Imports and known
//! entry points never count as dead.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use cortex_config::CxConfig;
use cortex_core::entity::Entity;
use cortex_core::enums::{EntityKind, Visibility};
use cortex_core::filter::EntityFilter;
use cortex_graph::DepGraph;
use cortex_storage::Store;

use crate::error::{store_op, AnalysisError, Result};

// ---------------------------------------------------------------------------
// Request / output
// ---------------------------------------------------------------------------

/// Parameters for a dead-code query.
#[derive(Debug, Clone)]
pub struct DeadRequest {
    /// Highest confidence tier to analyze (1..=3).
    pub tier: u8,
    /// Whether public never-referenced entities (tier 2) participate.
    pub include_exports: bool,
    /// Restrict results to one entity kind.
    pub type_filter: Option<EntityKind>,
    /// Group dead entities into connected-component chains.
    pub chains: bool,
}

impl DeadRequest {
    pub fn new(tier: u8) -> Self {
        Self {
            tier,
            include_exports: false,
            type_filter: None,
            chains: false,
        }
    }
}

/// Confidence that an entity is dead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Definite,
    Probable,
    Suspicious,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Definite => "definite",
            Self::Probable => "probable",
            Self::Suspicious => "suspicious",
        }
    }
}

/// One dead entity.
#[derive(Debug, Clone, Serialize)]
pub struct DeadEntity {
    pub id: String,
    pub name: String,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    pub confidence: Confidence,
    pub reason: String,
    /// Chain id; 0 means the entity is not part of a chain.
    pub chain: usize,
}

/// The result of a dead-code query.
#[derive(Debug, Clone, Serialize)]
pub struct DeadOutput {
    pub results: Vec<DeadEntity>,
    /// Number of chains with more than one member.
    pub chain_count: usize,
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Finds unreferenced and transitively unreferenced entities.
pub struct DeadCodeAnalyzer<'a> {
    store: &'a dyn Store,
    graph: &'a DepGraph,
    config: &'a CxConfig,
}

impl<'a> DeadCodeAnalyzer<'a> {
    pub fn new(store: &'a dyn Store, graph: &'a DepGraph, config: &'a CxConfig) -> Self {
        Self {
            store,
            graph,
            config,
        }
    }

    /// Runs the dead-code query.
    pub fn analyze(&self, req: &DeadRequest) -> Result<DeadOutput> {
        if !(1..=3).contains(&req.tier) {
            return Err(AnalysisError::InvalidArgument(format!(
                "tier must be 1, 2, or 3, got {}",
                req.tier
            )));
        }

        let entities = store_op(
            "failed to query entities",
            self.store.query_entities(&EntityFilter::active()),
        )?;

        // Candidates: active entities that could be dead at all.
        let candidates: Vec<&Entity> = entities
            .iter()
            .filter(|e| e.entity_type != EntityKind::Import)
            .filter(|e| !self.is_entry_point(e))
            .collect();
        let by_id: HashMap<&str, &Entity> =
            candidates.iter().map(|e| (e.id.as_str(), *e)).collect();

        let mut dead: HashMap<String, (Confidence, String)> = HashMap::new();

        // Tiers 1 and 2: never referenced.
        for entity in &candidates {
            if self.graph.in_degree(&entity.id) > 0 {
                continue;
            }
            match entity.visibility {
                Visibility::Private => {
                    dead.insert(
                        entity.id.clone(),
                        (Confidence::Definite, "private and never referenced".into()),
                    );
                }
                Visibility::Public if req.tier >= 2 && req.include_exports => {
                    dead.insert(
                        entity.id.clone(),
                        (Confidence::Probable, "public but never referenced".into()),
                    );
                }
                Visibility::Public => {}
            }
        }

        // Tier 3: fixpoint over "all callers are dead".
        if req.tier >= 3 {
            loop {
                let mut grew = false;
                for entity in &candidates {
                    if dead.contains_key(&entity.id) {
                        continue;
                    }
                    let callers: Vec<&str> = self
                        .graph
                        .predecessors(&entity.id)
                        .into_iter()
                        .map(|(id, _)| id)
                        .filter(|id| *id != entity.id)
                        .collect();
                    if callers.is_empty() {
                        continue;
                    }
                    if callers.iter().all(|id| dead.contains_key(*id)) {
                        dead.insert(
                            entity.id.clone(),
                            (Confidence::Suspicious, "all callers are dead".into()),
                        );
                        grew = true;
                    }
                }
                if !grew {
                    break;
                }
            }
        }

        // Chains over the dead-induced subgraph.
        let chain_ids = if req.chains {
            self.label_chains(&dead)
        } else {
            HashMap::new()
        };
        let chain_count = chain_ids
            .values()
            .filter(|&&c| c > 0)
            .collect::<HashSet<_>>()
            .len();

        let mut results: Vec<DeadEntity> = dead
            .into_iter()
            .filter_map(|(id, (confidence, reason))| {
                let entity = by_id.get(id.as_str())?;
                if let Some(kind) = req.type_filter {
                    if entity.entity_type != kind {
                        return None;
                    }
                }
                Some(DeadEntity {
                    chain: chain_ids.get(&id).copied().unwrap_or(0),
                    id,
                    name: entity.name.clone(),
                    file_path: entity.file_path.clone(),
                    line_start: entity.line_start,
                    confidence,
                    reason,
                })
            })
            .collect();
        results.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then(a.line_start.cmp(&b.line_start))
                .then(a.name.cmp(&b.name))
        });

        debug!(dead = results.len(), chains = chain_count, "dead-code analysis complete");
        Ok(DeadOutput {
            results,
            chain_count,
        })
    }

    /// Known entry points are never dead.
    fn is_entry_point(&self, entity: &Entity) -> bool {
        if entity.entity_type == EntityKind::Function && entity.name == "init" {
            return true;
        }
        if entity.file_path.contains("/cmd/")
            && (entity.name.starts_with("run") || entity.name.starts_with("Run"))
        {
            return true;
        }
        if entity.is_single_line()
            && matches!(
                entity.entity_type,
                EntityKind::Constant | EntityKind::Variable
            )
            && self
                .config
                .dead
                .common_locals
                .iter()
                .any(|l| l == &entity.name)
        {
            return true;
        }
        false
    }

    /// Union-find over dead entities and the edges between them.
    ///
    /// Components of size 1 get chain id 0; larger components get
    /// sequential positive ids, ordered by their smallest member id.
    fn label_chains(&self, dead: &HashMap<String, (Confidence, String)>) -> HashMap<String, usize> {
        let ids: Vec<&String> = {
            let mut v: Vec<&String> = dead.keys().collect();
            v.sort();
            v
        };
        let index: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut uf = UnionFind::new(ids.len());
        for (id, &i) in &index {
            for (neighbor, _) in self.graph.successors(id) {
                if let Some(&j) = index.get(neighbor) {
                    uf.union(i, j);
                }
            }
        }

        // Component -> members, in deterministic id order.
        let mut components: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..ids.len() {
            components.entry(uf.find(i)).or_default().push(i);
        }
        let mut roots: Vec<usize> = components
            .iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(&root, _)| root)
            .collect();
        roots.sort_by_key(|root| components[root][0]);

        let mut labels: HashMap<String, usize> = HashMap::new();
        for (chain, root) in roots.iter().enumerate() {
            for &member in &components[root] {
                labels.insert(ids[member].clone(), chain + 1);
            }
        }
        for id in ids {
            labels.entry(id.clone()).or_insert(0);
        }
        labels
    }
}

/// Minimal union-find with path compression.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::dependency::Dependency;
    use cortex_core::enums::DepType;
    use cortex_storage::SqliteStore;

    fn seed(store: &SqliteStore, name: &str, file: &str, vis: Visibility) -> Entity {
        let mut e = Entity::new(name, EntityKind::Function, file);
        e.visibility = vis;
        store.create_entity(&e).unwrap();
        e
    }

    fn analyze(store: &SqliteStore, req: &DeadRequest) -> DeadOutput {
        let graph = DepGraph::build_from_store(store).unwrap();
        let config = CxConfig::default();
        DeadCodeAnalyzer::new(store, &graph, &config)
            .analyze(req)
            .unwrap()
    }

    /// The spec's tier scenario: deadPrivate -> suspicious, caller -> alive.
    fn tier_fixture(store: &SqliteStore) -> (Entity, Entity, Entity, Entity) {
        let dead_private = seed(store, "deadPrivate", "pkg/a.go", Visibility::Private);
        let suspicious = seed(store, "suspicious", "pkg/a.go", Visibility::Private);
        let caller = seed(store, "caller", "pkg/b.go", Visibility::Public);
        let alive = seed(store, "alive", "pkg/b.go", Visibility::Private);
        store
            .create_dependency(&Dependency::new(
                &dead_private.id,
                &suspicious.id,
                DepType::Calls,
            ))
            .unwrap();
        store
            .create_dependency(&Dependency::new(&caller.id, &alive.id, DepType::Calls))
            .unwrap();
        (dead_private, suspicious, caller, alive)
    }

    #[test]
    fn tier1_finds_only_definite() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (dead_private, ..) = tier_fixture(&store);

        let output = analyze(&store, &DeadRequest::new(1));
        assert_eq!(output.results.len(), 1);
        assert_eq!(output.results[0].id, dead_private.id);
        assert_eq!(output.results[0].confidence, Confidence::Definite);
    }

    #[test]
    fn tier3_without_exports_propagates_from_private_seed() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (dead_private, suspicious, _, _) = tier_fixture(&store);

        let output = analyze(&store, &DeadRequest::new(3));
        let ids: Vec<&str> = output.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&dead_private.id.as_str()));
        assert!(ids.contains(&suspicious.id.as_str()));
    }

    #[test]
    fn tier3_with_exports_pulls_the_whole_cascade() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (dead_private, suspicious, caller, alive) = tier_fixture(&store);

        let mut req = DeadRequest::new(3);
        req.include_exports = true;
        req.chains = true;
        let output = analyze(&store, &req);

        let find = |id: &str| output.results.iter().find(|r| r.id == id).unwrap();
        assert_eq!(find(&dead_private.id).confidence, Confidence::Definite);
        assert_eq!(find(&suspicious.id).confidence, Confidence::Suspicious);
        assert_eq!(find(&caller.id).confidence, Confidence::Probable);
        assert_eq!(find(&alive.id).confidence, Confidence::Suspicious);

        // Two chains: {deadPrivate, suspicious} and {caller, alive}.
        assert_eq!(output.chain_count, 2);
        assert_eq!(find(&dead_private.id).chain, find(&suspicious.id).chain);
        assert_eq!(find(&caller.id).chain, find(&alive.id).chain);
        assert_ne!(find(&dead_private.id).chain, find(&caller.id).chain);
        assert!(find(&dead_private.id).chain > 0);
    }

    #[test]
    fn fixpoint_is_stable_on_rerun() {
        let store = SqliteStore::open_in_memory().unwrap();
        tier_fixture(&store);

        let mut req = DeadRequest::new(3);
        req.include_exports = true;
        let first = analyze(&store, &req);
        let second = analyze(&store, &req);
        let ids = |o: &DeadOutput| {
            o.results
                .iter()
                .map(|r| r.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn entry_points_are_never_dead() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(&store, "init", "pkg/setup.go", Visibility::Private);
        seed(&store, "runServer", "app/cmd/server.go", Visibility::Private);

        let mut common_local = Entity::new("err", EntityKind::Variable, "pkg/a.go");
        common_local.line_start = Some(12);
        common_local.line_end = Some(12);
        store.create_entity(&common_local).unwrap();

        let output = analyze(&store, &DeadRequest::new(3));
        assert!(output.results.is_empty());
    }

    #[test]
    fn imports_are_always_excluded() {
        let store = SqliteStore::open_in_memory().unwrap();
        let import = Entity::new("fmt", EntityKind::Import, "pkg/a.go");
        store.create_entity(&import).unwrap();

        let output = analyze(&store, &DeadRequest::new(1));
        assert!(output.results.is_empty());
    }

    #[test]
    fn multi_pass_fixpoint_marks_a_dead_chain() {
        let store = SqliteStore::open_in_memory().unwrap();
        let root = seed(&store, "orphan", "pkg/x.go", Visibility::Private);
        let a = seed(&store, "stepA", "pkg/x.go", Visibility::Private);
        let b = seed(&store, "stepB", "pkg/x.go", Visibility::Private);
        // orphan -> a -> b: b only becomes suspicious after a does.
        store
            .create_dependency(&Dependency::new(&root.id, &a.id, DepType::Calls))
            .unwrap();
        store
            .create_dependency(&Dependency::new(&a.id, &b.id, DepType::Calls))
            .unwrap();

        let output = analyze(&store, &DeadRequest::new(3));
        let ids: Vec<&str> = output.results.iter().map(|r| r.id.as_str()).collect();
        assert!(ids.contains(&root.id.as_str()));
        assert!(ids.contains(&a.id.as_str()));
        assert!(ids.contains(&b.id.as_str()));
    }

    #[test]
    fn cycles_keep_themselves_alive() {
        let store = SqliteStore::open_in_memory().unwrap();
        let a = seed(&store, "cycleA", "pkg/x.go", Visibility::Private);
        let b = seed(&store, "cycleB", "pkg/x.go", Visibility::Private);
        store
            .create_dependency(&Dependency::new(&a.id, &b.id, DepType::Calls))
            .unwrap();
        store
            .create_dependency(&Dependency::new(&b.id, &a.id, DepType::Calls))
            .unwrap();

        // Each has a live caller (the other), so the fixpoint never marks
        // them.
        let output = analyze(&store, &DeadRequest::new(3));
        assert!(output.results.is_empty());
    }

    #[test]
    fn invalid_tier_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let graph = DepGraph::build_from_store(&store).unwrap();
        let config = CxConfig::default();
        let err = DeadCodeAnalyzer::new(&store, &graph, &config)
            .analyze(&DeadRequest::new(4))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidArgument(_)));
    }

    #[test]
    fn singleton_dead_entity_has_chain_zero() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(&store, "lonely", "pkg/a.go", Visibility::Private);

        let mut req = DeadRequest::new(1);
        req.chains = true;
        let output = analyze(&store, &req);
        assert_eq!(output.results.len(), 1);
        assert_eq!(output.results[0].chain, 0);
        assert_eq!(output.chain_count, 0);
    }
}
