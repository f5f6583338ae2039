//! Metric computation orchestration.

use chrono::Utc;
use tracing::info;

use cortex_core::metrics::EntityMetrics;

use crate::betweenness::betweenness;
use crate::cancel::CancelToken;
use crate::error::{GraphError, Result};
use crate::graph::DepGraph;
use crate::pagerank::page_rank;

/// Tuning knobs for metric computation.
#[derive(Debug, Clone)]
pub struct MetricsOptions {
    /// PageRank damping factor.
    pub damping: f64,
    /// PageRank iteration cap.
    pub max_iterations: usize,
    /// PageRank L1 convergence tolerance.
    pub tolerance: f64,
    /// Maximum betweenness sources before stride sampling kicks in.
    pub betweenness_sample: Option<usize>,
    /// Worker threads for betweenness; defaults to the CPU count.
    pub threads: Option<usize>,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-4,
            betweenness_sample: Some(512),
            threads: None,
        }
    }
}

/// Computes PageRank, betweenness, and degrees for every node.
///
/// Results carry a shared `computed_at` stamp; the caller persists them via
/// `save_bulk_metrics`. On cancellation partial results are discarded.
pub fn compute_all(
    graph: &DepGraph,
    opts: &MetricsOptions,
    cancel: &CancelToken,
) -> Result<Vec<EntityMetrics>> {
    let threads = opts.threads.unwrap_or_else(num_cpus::get).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| GraphError::Internal(e.to_string()))?;

    let ranks = page_rank(graph, opts, cancel)?;
    let centralities = pool.install(|| betweenness(graph, opts, cancel))?;
    cancel.checkpoint()?;

    let computed_at = Utc::now();
    let metrics: Vec<EntityMetrics> = (0..graph.node_count())
        .map(|i| {
            let id = graph.id_of(i);
            EntityMetrics {
                entity_id: id.to_owned(),
                page_rank: ranks[i],
                betweenness: centralities[i],
                in_degree: graph.in_degree(id) as i64,
                out_degree: graph.out_degree(id) as i64,
                computed_at,
            }
        })
        .collect();

    info!(nodes = metrics.len(), threads, "computed graph metrics");
    Ok(metrics)
}
