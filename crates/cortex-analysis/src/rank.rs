//! Ranked entity listings by graph importance.

use serde::Serialize;

use cortex_config::CxConfig;
use cortex_core::entity::Entity;
use cortex_core::filter::EntityFilter;
use cortex_core::metrics::{Classification, EntityMetrics, Thresholds};
use cortex_storage::{Store, StorageError};

use crate::error::{store_op, store_opt, AnalysisError, Result};

/// Parameters for a rank query.
#[derive(Debug, Clone)]
pub struct RankRequest {
    /// How many entries to return.
    pub top: usize,
    /// Restrict to keystones.
    pub keystones: bool,
    /// Restrict to bottlenecks.
    pub bottlenecks: bool,
    /// Restrict to leaves (in-degree zero).
    pub leaves: bool,
}

impl Default for RankRequest {
    fn default() -> Self {
        Self {
            top: 20,
            keystones: false,
            bottlenecks: false,
            leaves: false,
        }
    }
}

/// One ranked entity with its metrics and derived class.
#[derive(Debug, Clone, Serialize)]
pub struct RankedEntity {
    pub id: String,
    pub name: String,
    pub entity_type: cortex_core::enums::EntityKind,
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_start: Option<u32>,
    pub page_rank: f64,
    pub betweenness: f64,
    pub in_degree: i64,
    pub out_degree: i64,
    pub classification: Classification,
}

/// The result of a rank query, descending by PageRank.
#[derive(Debug, Clone, Serialize)]
pub struct RankedList {
    pub entries: Vec<RankedEntity>,
    pub total_ranked: usize,
}

/// Runs a rank query against stored metrics.
///
/// With no entities at all the store is uninitialized; with entities but
/// no metrics the caller is asked to recompute.
pub fn rank(store: &dyn Store, config: &CxConfig, req: &RankRequest) -> Result<RankedList> {
    let metrics = store_op("failed to load metrics", store.get_all_metrics())?;
    if metrics.is_empty() {
        let entity_count = store_op(
            "failed to count entities",
            store.count_entities(&EntityFilter::active()),
        )?;
        let source = if entity_count == 0 {
            StorageError::not_initialized("no entities scanned yet; run a scan first")
        } else {
            StorageError::StaleMetrics
        };
        return Err(AnalysisError::Store {
            op: "rank",
            source,
        });
    }

    let thresholds = Thresholds {
        keystone: config.metrics.keystone_threshold,
        bottleneck: config.metrics.bottleneck_threshold,
    };

    let mut joined: Vec<(Entity, EntityMetrics)> = Vec::new();
    for m in metrics {
        let Some(entity) = store_opt("failed to fetch entity", store.get_entity(&m.entity_id))?
        else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        joined.push((entity, m));
    }

    joined.sort_by(|(_, a), (_, b)| {
        b.page_rank
            .partial_cmp(&a.page_rank)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.entity_id.cmp(&b.entity_id))
    });

    let total_ranked = joined.len();
    let entries: Vec<RankedEntity> = joined
        .into_iter()
        .map(|(entity, m)| RankedEntity {
            id: entity.id,
            name: entity.name,
            entity_type: entity.entity_type,
            file_path: entity.file_path,
            line_start: entity.line_start,
            page_rank: m.page_rank,
            betweenness: m.betweenness,
            in_degree: m.in_degree,
            out_degree: m.out_degree,
            classification: Classification::of(&m, &thresholds),
        })
        .filter(|e| {
            let wanted_any = req.keystones || req.bottlenecks || req.leaves;
            if !wanted_any {
                return true;
            }
            (req.keystones && e.page_rank >= thresholds.keystone)
                || (req.bottlenecks && e.betweenness >= thresholds.bottleneck)
                || (req.leaves && e.in_degree == 0)
        })
        .take(req.top)
        .collect();

    Ok(RankedList {
        entries,
        total_ranked,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::enums::EntityKind;
    use cortex_storage::SqliteStore;

    fn seed(store: &SqliteStore, name: &str, pr: f64, betweenness: f64, in_deg: i64) -> Entity {
        let e = Entity::new(name, EntityKind::Function, "pkg/a.go");
        store.create_entity(&e).unwrap();
        store
            .save_metrics(&EntityMetrics {
                page_rank: pr,
                betweenness,
                in_degree: in_deg,
                ..EntityMetrics::zero(&e.id)
            })
            .unwrap();
        e
    }

    #[test]
    fn empty_store_is_not_initialized() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = rank(&store, &CxConfig::default(), &RankRequest::default()).unwrap_err();
        assert!(err.to_string().contains("not initialized"));
    }

    #[test]
    fn entities_without_metrics_are_stale() {
        let store = SqliteStore::open_in_memory().unwrap();
        let e = Entity::new("Foo", EntityKind::Function, "a.go");
        store.create_entity(&e).unwrap();

        let err = rank(&store, &CxConfig::default(), &RankRequest::default()).unwrap_err();
        assert!(err.to_string().contains("recompute"));
    }

    #[test]
    fn entries_are_descending_by_page_rank() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(&store, "Low", 0.1, 0.0, 1);
        seed(&store, "High", 0.6, 0.0, 5);
        seed(&store, "Mid", 0.3, 0.0, 2);

        let list = rank(&store, &CxConfig::default(), &RankRequest::default()).unwrap();
        let names: Vec<&str> = list.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["High", "Mid", "Low"]);
        assert_eq!(list.total_ranked, 3);
    }

    #[test]
    fn keystone_filter_applies_threshold() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(&store, "Low", 0.1, 0.0, 1);
        let high = seed(&store, "High", 0.6, 0.0, 5);

        let req = RankRequest {
            keystones: true,
            ..RankRequest::default()
        };
        let list = rank(&store, &CxConfig::default(), &req).unwrap();
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.entries[0].id, high.id);
        assert_eq!(list.entries[0].classification, Classification::Keystone);
    }

    #[test]
    fn leaves_filter_selects_zero_in_degree() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(&store, "Leaf", 0.05, 0.0, 0);
        seed(&store, "Inner", 0.05, 0.0, 3);

        let req = RankRequest {
            leaves: true,
            ..RankRequest::default()
        };
        let list = rank(&store, &CxConfig::default(), &req).unwrap();
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.entries[0].name, "Leaf");
    }
}
