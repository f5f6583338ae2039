//! PageRank over the dependency graph.
//!
//! Importance flows along dependency edges, from callers to callees: an
//! entity that many other entities (transitively) depend on accumulates
//! rank. Scores form a probability distribution -- they sum to 1.0 over
//! all nodes, and dangling mass (entities with no outgoing edges) is
//! redistributed uniformly each iteration.
//!
//! ```text
//! PR(v) = (1-d)/N + d * ( Σ PR(u)/outdeg(u) + dangling/N )
//!                        u→v
//! ```

use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::Result;
use crate::graph::DepGraph;
use crate::metrics::MetricsOptions;

/// Computes PageRank scores indexed by node index.
///
/// Self-loops are ignored. Terminates when the L1 norm of the score delta
/// drops below the tolerance, or after `max_iterations`.
pub(crate) fn page_rank(
    graph: &DepGraph,
    opts: &MetricsOptions,
    cancel: &CancelToken,
) -> Result<Vec<f64>> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(Vec::new());
    }

    let damping = opts.damping;
    let n_f = n as f64;

    // Distinct-neighbor adjacency, self-loops dropped.
    let out_lists: Vec<Vec<usize>> = (0..n).map(|i| graph.distinct_out(i)).collect();
    let in_lists: Vec<Vec<usize>> = (0..n).map(|i| graph.distinct_in(i)).collect();
    let out_degrees: Vec<usize> = out_lists.iter().map(Vec::len).collect();
    let dangling: Vec<usize> = (0..n).filter(|&i| out_degrees[i] == 0).collect();

    let mut scores = vec![1.0 / n_f; n];

    for iteration in 0..opts.max_iterations {
        cancel.checkpoint()?;

        let dangling_mass: f64 = dangling.iter().map(|&i| scores[i]).sum();
        let base = (1.0 - damping) / n_f + damping * dangling_mass / n_f;

        let mut next = vec![0.0; n];
        let mut delta = 0.0;
        for v in 0..n {
            let incoming: f64 = in_lists[v]
                .iter()
                .map(|&u| scores[u] / out_degrees[u] as f64)
                .sum();
            let score = base + damping * incoming;
            delta += (score - scores[v]).abs();
            next[v] = score;
        }
        scores = next;

        if delta < opts.tolerance {
            debug!(iterations = iteration + 1, "PageRank converged");
            break;
        }
    }

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testutil::graph;
    use cortex_core::enums::DepType;

    fn opts() -> MetricsOptions {
        MetricsOptions::default()
    }

    fn sum(scores: &[f64]) -> f64 {
        scores.iter().sum()
    }

    #[test]
    fn empty_graph_is_empty() {
        let g = graph(&[], &[]);
        let scores = page_rank(&g, &opts(), &CancelToken::new()).unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn scores_sum_to_one() {
        let g = graph(
            &["A", "B", "C", "D"],
            &[
                ("A", "B", DepType::Calls),
                ("B", "C", DepType::Calls),
                ("D", "C", DepType::Calls),
            ],
        );
        let scores = page_rank(&g, &opts(), &CancelToken::new()).unwrap();
        assert!((sum(&scores) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn callee_outranks_caller_chain() {
        // A -> B -> C: importance accumulates at C.
        let g = graph(
            &["A", "B", "C"],
            &[("A", "B", DepType::Calls), ("B", "C", DepType::Calls)],
        );
        let scores = page_rank(&g, &opts(), &CancelToken::new()).unwrap();
        assert!(scores[2] > scores[1]);
        assert!(scores[1] > scores[0]);
    }

    #[test]
    fn cycle_converges_and_sums_to_one() {
        let g = graph(
            &["A", "B"],
            &[("A", "B", DepType::Calls), ("B", "A", DepType::Calls)],
        );
        let scores = page_rank(&g, &opts(), &CancelToken::new()).unwrap();
        assert!((sum(&scores) - 1.0).abs() < 1e-3);
        assert!((scores[0] - scores[1]).abs() < 1e-6);
    }

    #[test]
    fn self_loop_is_ignored() {
        let g = graph(
            &["A", "B"],
            &[("A", "A", DepType::Calls), ("A", "B", DepType::Calls)],
        );
        let scores = page_rank(&g, &opts(), &CancelToken::new()).unwrap();
        assert!((sum(&scores) - 1.0).abs() < 1e-3);
        assert!(scores[1] > scores[0]);
    }

    #[test]
    fn cancellation_aborts() {
        let g = graph(&["A", "B"], &[("A", "B", DepType::Calls)]);
        let token = CancelToken::new();
        token.cancel();
        assert!(page_rank(&g, &opts(), &token).is_err());
    }

    #[test]
    fn recompute_is_deterministic() {
        let g = graph(
            &["A", "B", "C"],
            &[
                ("A", "B", DepType::Calls),
                ("B", "C", DepType::Calls),
                ("C", "A", DepType::Calls),
            ],
        );
        let first = page_rank(&g, &opts(), &CancelToken::new()).unwrap();
        let second = page_rank(&g, &opts(), &CancelToken::new()).unwrap();
        for (a, b) in first.iter().zip(&second) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
