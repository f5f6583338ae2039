//! Core types for the cortex code-intelligence engine.
//!
//! This crate defines the data model shared by the storage, graph, and
//! analysis layers: entities, typed dependency edges, per-entity metrics,
//! the file index, coverage records, query filters, and content-addressed
//! id generation. It has no I/O; persistence lives in `cortex-storage`.

pub mod dependency;
pub mod entity;
pub mod enums;
pub mod filter;
pub mod idgen;
pub mod metrics;

pub use dependency::Dependency;
pub use entity::{CoverageRecord, Entity, FileIndexEntry};
pub use enums::{DepType, EntityKind, EntityStatus, ParseEnumError, Visibility};
pub use filter::{DependencyFilter, EntityFilter};
pub use metrics::{Classification, EntityMetrics, Thresholds};
