//! [`DepGraph`] -- directed multigraph over entity ids.
//!
//! Ids are interned into dense indices so the metric kernels work on
//! `Vec`s instead of hash maps. Duplicate (from, to, type) edges are
//! collapsed; self-loops are preserved in the adjacency lists but
//! excluded from the degree counts used by metrics and dead-code
//! analysis.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use cortex_core::dependency::Dependency;
use cortex_core::enums::DepType;
use cortex_core::filter::{DependencyFilter, EntityFilter};
use cortex_storage::Store;

use crate::error::Result;

/// In-memory directed multigraph with typed edges.
pub struct DepGraph {
    /// Index -> entity id.
    ids: Vec<String>,
    /// Entity id -> index.
    index: HashMap<String, usize>,
    /// Outgoing adjacency: what each entity depends on.
    forward: Vec<Vec<(usize, DepType)>>,
    /// Incoming adjacency: who depends on each entity.
    reverse: Vec<Vec<(usize, DepType)>>,
}

impl DepGraph {
    /// Materializes the graph from all active entities in the store.
    ///
    /// Edges touching non-active entities are skipped, so every id in the
    /// adjacency sets corresponds to an active entity at build time.
    pub fn build_from_store(store: &dyn Store) -> Result<Self> {
        let entities = store.query_entities(&EntityFilter::active())?;
        let ids: Vec<String> = entities.into_iter().map(|e| e.id).collect();
        let deps = store.get_dependencies(&DependencyFilter::default())?;
        Ok(Self::from_parts(ids, &deps))
    }

    /// Builds the graph from an id set and an edge list.
    ///
    /// Used directly for time-travel snapshots and tests.
    pub fn from_parts(ids: Vec<String>, deps: &[Dependency]) -> Self {
        let index: HashMap<String, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut forward: Vec<Vec<(usize, DepType)>> = vec![Vec::new(); ids.len()];
        let mut reverse: Vec<Vec<(usize, DepType)>> = vec![Vec::new(); ids.len()];
        let mut seen: HashSet<(usize, usize, DepType)> = HashSet::new();

        for dep in deps {
            let (Some(&from), Some(&to)) = (index.get(&dep.from_id), index.get(&dep.to_id))
            else {
                continue;
            };
            if !seen.insert((from, to, dep.dep_type)) {
                continue;
            }
            forward[from].push((to, dep.dep_type));
            reverse[to].push((from, dep.dep_type));
        }

        debug!(
            nodes = ids.len(),
            edges = seen.len(),
            "materialized dependency graph"
        );

        Self {
            ids,
            index,
            forward,
            reverse,
        }
    }

    // -- Node access ---------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All node ids, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    // -- Edge access ---------------------------------------------------------

    /// Out-neighbors with edge types: the entities `id` depends on.
    pub fn successors(&self, id: &str) -> Vec<(&str, DepType)> {
        self.neighbors(id, &self.forward)
    }

    /// In-neighbors with edge types: the callers of `id`.
    pub fn predecessors(&self, id: &str) -> Vec<(&str, DepType)> {
        self.neighbors(id, &self.reverse)
    }

    fn neighbors<'a>(
        &'a self,
        id: &str,
        adjacency: &'a [Vec<(usize, DepType)>],
    ) -> Vec<(&'a str, DepType)> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        adjacency[idx]
            .iter()
            .map(|&(n, t)| (self.ids[n].as_str(), t))
            .collect()
    }

    /// Distinct in-neighbors, self-loops excluded.
    pub fn in_degree(&self, id: &str) -> usize {
        self.degree(id, &self.reverse)
    }

    /// Distinct out-neighbors, self-loops excluded.
    pub fn out_degree(&self, id: &str) -> usize {
        self.degree(id, &self.forward)
    }

    fn degree(&self, id: &str, adjacency: &[Vec<(usize, DepType)>]) -> usize {
        let Some(&idx) = self.index.get(id) else {
            return 0;
        };
        adjacency[idx]
            .iter()
            .filter(|&&(n, _)| n != idx)
            .map(|&(n, _)| n)
            .collect::<HashSet<_>>()
            .len()
    }

    // -- Interned access for the metric kernels ------------------------------

    pub(crate) fn id_of(&self, idx: usize) -> &str {
        &self.ids[idx]
    }

    pub(crate) fn out_edges(&self, idx: usize) -> &[(usize, DepType)] {
        &self.forward[idx]
    }

    pub(crate) fn in_edges(&self, idx: usize) -> &[(usize, DepType)] {
        &self.reverse[idx]
    }

    /// Distinct out-neighbor indices, self-loops excluded.
    pub(crate) fn distinct_out(&self, idx: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self.forward[idx]
            .iter()
            .filter(|&&(n, _)| n != idx)
            .map(|&(n, _)| n)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Distinct in-neighbor indices, self-loops excluded.
    pub(crate) fn distinct_in(&self, idx: usize) -> Vec<usize> {
        let mut inn: Vec<usize> = self.reverse[idx]
            .iter()
            .filter(|&&(n, _)| n != idx)
            .map(|&(n, _)| n)
            .collect();
        inn.sort_unstable();
        inn.dedup();
        inn
    }
}

impl std::fmt::Debug for DepGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepGraph")
            .field("nodes", &self.ids.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;

    /// Builds a graph from string edges like `("A", "B", DepType::Calls)`.
    pub fn graph(nodes: &[&str], edges: &[(&str, &str, DepType)]) -> DepGraph {
        let ids: Vec<String> = nodes.iter().map(|s| s.to_string()).collect();
        let deps: Vec<Dependency> = edges
            .iter()
            .map(|&(from, to, t)| Dependency::new(from, to, t))
            .collect();
        DepGraph::from_parts(ids, &deps)
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::graph;
    use super::*;

    #[test]
    fn duplicate_edges_are_collapsed() {
        let g = graph(
            &["A", "B"],
            &[
                ("A", "B", DepType::Calls),
                ("A", "B", DepType::Calls),
                ("A", "B", DepType::UsesType),
            ],
        );
        assert_eq!(g.successors("A").len(), 2);
        assert_eq!(g.out_degree("A"), 1);
        assert_eq!(g.in_degree("B"), 1);
    }

    #[test]
    fn edges_to_unknown_nodes_are_skipped() {
        let g = graph(&["A"], &[("A", "Ghost", DepType::Calls)]);
        assert!(g.successors("A").is_empty());
    }

    #[test]
    fn self_loops_kept_but_not_counted_in_degrees() {
        let g = graph(&["A", "B"], &[("A", "A", DepType::Calls), ("B", "A", DepType::Calls)]);
        assert_eq!(g.successors("A").len(), 1);
        assert_eq!(g.in_degree("A"), 1);
        assert_eq!(g.out_degree("A"), 0);
    }

    #[test]
    fn predecessors_mirror_successors() {
        let g = graph(
            &["A", "B", "C"],
            &[("A", "C", DepType::Calls), ("B", "C", DepType::UsesType)],
        );
        let preds = g.predecessors("C");
        assert_eq!(preds.len(), 2);
        assert!(preds.contains(&("A", DepType::Calls)));
        assert!(preds.contains(&("B", DepType::UsesType)));
    }

    #[test]
    fn unknown_id_has_no_neighbors() {
        let g = graph(&["A"], &[]);
        assert!(g.successors("Z").is_empty());
        assert_eq!(g.in_degree("Z"), 0);
        assert!(!g.contains("Z"));
    }
}
