//! Query layer for the cortex code-intelligence engine.
//!
//! Composes the store, graph, and metrics into the user-facing queries:
//! context assembly (plain, smart, diff), impact analysis, dead-code
//! detection, ranked listings, and the session-recovery digest.

pub mod context;
pub mod dead;
pub mod diff;
pub mod error;
pub mod impact;
pub mod rank;
pub mod recover;
pub mod smart;
pub mod target;
pub mod tokens;

pub use context::{ContextAssembler, ContextEntry, ContextOutput, ContextRequest, Relevance};
pub use dead::{Confidence, DeadCodeAnalyzer, DeadEntity, DeadOutput, DeadRequest};
pub use diff::{ChangeKind, DiffContextRequest};
pub use error::AnalysisError;
pub use impact::{AffectedEntity, ImpactAnalyzer, ImpactOutput, ImpactRequest, RiskLevel};
pub use rank::{rank, RankRequest, RankedEntity, RankedList};
pub use recover::digest;
pub use smart::{detect_intent, Intent, SmartContextRequest};
pub use target::{resolve_target, ResolvedTarget, TaskInfo, TaskTracker};
pub use tokens::Density;
