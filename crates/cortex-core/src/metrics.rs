//! Per-entity graph metrics and their derived classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Precomputed graph-importance scalars for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetrics {
    pub entity_id: String,

    /// PageRank over the reversed call graph. Sums to ~1.0 across all
    /// active entities.
    pub page_rank: f64,

    /// Normalized betweenness centrality in [0, 1].
    pub betweenness: f64,

    /// Distinct in-neighbors (self-loops excluded).
    pub in_degree: i64,

    /// Distinct out-neighbors (self-loops excluded).
    pub out_degree: i64,

    pub computed_at: DateTime<Utc>,
}

impl EntityMetrics {
    /// Zeroed metrics for an entity, stamped now.
    pub fn zero(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            page_rank: 0.0,
            betweenness: 0.0,
            in_degree: 0,
            out_degree: 0,
            computed_at: Utc::now(),
        }
    }
}

/// Classification thresholds, sourced from config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// PageRank at or above which an entity is a keystone.
    pub keystone: f64,
    /// Betweenness at or above which an entity is a bottleneck.
    pub bottleneck: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            keystone: 0.30,
            bottleneck: 0.20,
        }
    }
}

/// Derived importance class. Not stored; computed on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// High PageRank: many paths lead here.
    Keystone,
    /// High betweenness: sits on many shortest paths.
    Bottleneck,
    /// No callers at all.
    Leaf,
    Normal,
}

impl Classification {
    /// Classifies metrics against thresholds.
    ///
    /// Precedence when several apply: keystone, then bottleneck, then leaf.
    pub fn of(metrics: &EntityMetrics, thresholds: &Thresholds) -> Self {
        if metrics.page_rank >= thresholds.keystone {
            Self::Keystone
        } else if metrics.betweenness >= thresholds.bottleneck {
            Self::Bottleneck
        } else if metrics.in_degree == 0 {
            Self::Leaf
        } else {
            Self::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keystone => "keystone",
            Self::Bottleneck => "bottleneck",
            Self::Leaf => "leaf",
            Self::Normal => "normal",
        }
    }
}

/// Returns `true` if the metrics mark a keystone under the given threshold.
pub fn is_keystone(metrics: &EntityMetrics, thresholds: &Thresholds) -> bool {
    metrics.page_rank >= thresholds.keystone
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(pr: f64, bw: f64, in_deg: i64) -> EntityMetrics {
        EntityMetrics {
            page_rank: pr,
            betweenness: bw,
            in_degree: in_deg,
            ..EntityMetrics::zero("sa-fn-000000-X")
        }
    }

    #[test]
    fn classification_precedence() {
        let t = Thresholds::default();
        assert_eq!(
            Classification::of(&metrics(0.35, 0.5, 0), &t),
            Classification::Keystone
        );
        assert_eq!(
            Classification::of(&metrics(0.1, 0.25, 0), &t),
            Classification::Bottleneck
        );
        assert_eq!(
            Classification::of(&metrics(0.1, 0.1, 0), &t),
            Classification::Leaf
        );
        assert_eq!(
            Classification::of(&metrics(0.1, 0.1, 3), &t),
            Classification::Normal
        );
    }

    #[test]
    fn thresholds_defaults_match_config() {
        let t = Thresholds::default();
        assert_eq!(t.keystone, 0.30);
        assert_eq!(t.bottleneck, 0.20);
    }
}
