//! Smart context: free-text task descriptions instead of explicit targets.
//!
//! Keyword extraction and pattern detection produce an [`Intent`]; entry
//! points are keystones whose names match the intent, plus any entities
//! the description mentions by id. Expansion and budget enforcement are
//! shared with the plain assembler.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::debug;

use cortex_config::BudgetMode;
use cortex_core::enums::DepType;

use crate::context::{
    exclusion_substrings, ContextAssembler, ContextEntry, ContextOutput, ContextRequest,
    ExpandSet, EXCLUDED_BY_FILTER,
};
use crate::error::{store_op, store_opt, AnalysisError, Result};
use crate::target::extract_entity_mentions;
use crate::tokens::Density;

// ---------------------------------------------------------------------------
// Request and intent
// ---------------------------------------------------------------------------

/// Parameters for a smart context query.
#[derive(Debug, Clone)]
pub struct SmartContextRequest {
    /// Free-text task description; must be non-empty.
    pub description: String,
    /// BFS expansion depth from the entry points.
    pub depth: usize,
    pub max_tokens: usize,
    pub budget_mode: BudgetMode,
    pub density: Density,
}

impl SmartContextRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            depth: 2,
            max_tokens: 4000,
            budget_mode: BudgetMode::Importance,
            density: Density::Medium,
        }
    }
}

/// What the description was understood to mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Intent {
    /// Salient lowercased keywords, in order of first occurrence.
    pub keywords: Vec<String>,
    /// Detected change pattern (e.g. "add-feature", "fix-bug").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Entity ids mentioned verbatim in the description.
    pub entity_mentions: Vec<String>,
}

/// Words carrying no intent signal on their own.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "are", "was", "were", "have",
    "has", "had", "not", "but", "can", "will", "should", "would", "could", "all", "any", "out",
    "get", "set", "use", "using", "add", "fix", "make", "need", "needs", "want", "when",
    "where", "how", "why", "what", "which", "their", "there", "then", "than", "some", "more",
    "most", "also", "very", "just", "like", "only", "over", "under", "each", "both", "such",
    "same", "new", "our", "your", "its", "they", "them", "being", "been", "does", "done",
];

/// Keyword lists per change pattern; first hit wins.
const PATTERNS: &[(&str, &[&str])] = &[
    ("add-feature", &["add", "implement", "create", "support", "introduce"]),
    ("fix-bug", &["fix", "bug", "broken", "crash", "repair", "regression"]),
    ("refactor", &["refactor", "restructure", "cleanup", "simplify", "extract"]),
    ("optimize", &["optimize", "performance", "speed", "slow", "faster"]),
    ("add-tests", &["test", "tests", "coverage"]),
];

/// Extracts the intent from a free-text description.
pub fn detect_intent(description: &str) -> Intent {
    let words: Vec<String> = description
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut keywords = Vec::new();
    let mut seen = HashSet::new();
    for word in &words {
        if word.len() < 3 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if seen.insert(word.clone()) {
            keywords.push(word.clone());
        }
    }

    let pattern = PATTERNS
        .iter()
        .find(|(_, triggers)| words.iter().any(|w| triggers.contains(&w.as_str())))
        .map(|(name, _)| (*name).to_owned());

    Intent {
        keywords,
        pattern,
        entity_mentions: extract_entity_mentions(description),
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

impl ContextAssembler<'_> {
    /// Runs a smart (description-driven) context query.
    ///
    /// An empty description is an `InvalidArgument` error.
    pub fn assemble_smart(&self, req: &SmartContextRequest) -> Result<ContextOutput> {
        if req.description.trim().is_empty() {
            return Err(AnalysisError::InvalidArgument(
                "smart context needs a non-empty task description".into(),
            ));
        }

        let intent = detect_intent(&req.description);
        debug!(keywords = intent.keywords.len(), pattern = ?intent.pattern, "detected intent");

        // Shared annotation/budget parameters.
        let inner = ContextRequest {
            target: String::new(),
            hops: req.depth,
            max_tokens: req.max_tokens,
            budget_mode: req.budget_mode,
            density: req.density,
            include: Vec::new(),
            exclude: Vec::new(),
            with_coverage: false,
        };
        let expand = ExpandSet::from_include(&[], &self.config.expand.default_include);
        let exclusions = exclusion_substrings(
            &expand,
            &self.config.expand.default_exclude,
            &[],
        );

        let mut excluded: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut entries: Vec<ContextEntry> = Vec::new();
        let mut frontier: Vec<String> = Vec::new();

        // Entry points: keystones whose names match a keyword.
        let threshold = self.config.metrics.keystone_threshold;
        let all_metrics = store_op("failed to load metrics", self.store.get_all_metrics())?;
        for metrics in all_metrics {
            if metrics.page_rank < threshold {
                continue;
            }
            let Some(entity) = store_opt(
                "failed to fetch entity",
                self.store.get_entity(&metrics.entity_id),
            )?
            else {
                continue;
            };
            if !entity.is_active() {
                continue;
            }
            let name = entity.name.to_lowercase();
            if !intent.keywords.iter().any(|k| name.contains(k)) {
                continue;
            }
            if seen.insert(entity.id.clone()) {
                entries.push(self.annotate(&entity, 0, "Matches task intent".into(), &inner)?);
                frontier.push(entity.id.clone());
            }
        }

        // Entities mentioned by id.
        for id in &intent.entity_mentions {
            if seen.contains(id) {
                continue;
            }
            let Some(entity) = store_opt("failed to fetch entity", self.store.get_entity(id))?
            else {
                continue;
            };
            seen.insert(id.clone());
            entries.push(self.annotate(
                &entity,
                0,
                "Linked from task description".into(),
                &inner,
            )?);
            frontier.push(id.clone());
        }

        // BFS to depth, default expansion set.
        for hop in 1..=req.depth {
            let mut next = Vec::new();
            for id in &frontier {
                for (neighbor, dep_type) in self.graph.successors(id) {
                    let allowed = if dep_type == DepType::UsesType {
                        expand.types
                    } else {
                        expand.deps
                    };
                    if !allowed || seen.contains(neighbor) {
                        continue;
                    }
                    if neighbor.to_lowercase().contains_any(&exclusions) {
                        excluded
                            .entry(EXCLUDED_BY_FILTER.into())
                            .or_default()
                            .push(neighbor.to_owned());
                        continue;
                    }
                    let Some(entity) = store_opt(
                        "failed to fetch entity",
                        self.store.get_entity(neighbor),
                    )?
                    else {
                        continue;
                    };
                    seen.insert(neighbor.to_owned());
                    let reason = if dep_type == DepType::UsesType {
                        "Type reference".to_owned()
                    } else {
                        format!("Hop {hop} from target")
                    };
                    entries.push(self.annotate(&entity, hop, reason, &inner)?);
                    next.push(neighbor.to_owned());
                }
            }
            frontier = next;
        }

        self.finish(
            req.description.clone(),
            Some(intent),
            None,
            entries,
            excluded,
            true,
            &inner,
        )
    }
}

/// Substring-set containment helper.
trait ContainsAny {
    fn contains_any(&self, needles: &[String]) -> bool;
}

impl ContainsAny for String {
    fn contains_any(&self, needles: &[String]) -> bool {
        needles.iter().any(|n| self.contains(n))
    }
}
