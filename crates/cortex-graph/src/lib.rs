//! In-memory dependency graph and importance metrics.
//!
//! [`DepGraph`] materializes the active entities and edges of a store
//! snapshot into interned adjacency lists; the metric modules compute
//! PageRank, betweenness centrality, and degrees over it. Graph instances
//! are per-request and never shared across threads; metrics computation
//! parallelizes internally but never blocks on I/O.

pub mod cancel;
pub mod error;
pub mod graph;
pub mod metrics;

mod betweenness;
mod pagerank;

pub use cancel::{CancelToken, Cancelled};
pub use error::GraphError;
pub use graph::DepGraph;
pub use metrics::{compute_all, MetricsOptions};
