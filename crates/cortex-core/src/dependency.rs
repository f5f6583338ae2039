//! Dependency types -- typed directed edges between entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::DepType;

/// A directed, typed edge between two entity ids.
///
/// Multiple distinct `dep_type`s between the same pair are permitted; two
/// edges with identical (from, to, type) are one edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub from_id: String,

    pub to_id: String,

    /// Edge type (serialised as "type" in JSON).
    #[serde(rename = "type")]
    pub dep_type: DepType,

    pub created_at: DateTime<Utc>,
}

impl Dependency {
    /// Creates an edge stamped with the current time.
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, dep_type: DepType) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            dep_type,
            created_at: Utc::now(),
        }
    }

    /// The deduplication key: (from, to, type).
    pub fn key(&self) -> (&str, &str, DepType) {
        (&self.from_id, &self.to_id, self.dep_type)
    }

    /// Returns `true` if both endpoints are the same entity.
    ///
    /// Self-loops are stored but ignored by metrics and degree counts.
    pub fn is_self_loop(&self) -> bool {
        self.from_id == self.to_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_serde_round_trip() {
        let dep = Dependency::new("sa-fn-aaaaaa-Caller", "sa-fn-bbbbbb-Callee", DepType::Calls);
        let json = serde_json::to_string(&dep).unwrap();
        assert!(json.contains(r#""type":"calls""#));
        let back: Dependency = serde_json::from_str(&json).unwrap();
        assert_eq!(back.key(), dep.key());
    }

    #[test]
    fn self_loop_detection() {
        let dep = Dependency::new("sa-fn-aaaaaa-Recurse", "sa-fn-aaaaaa-Recurse", DepType::Calls);
        assert!(dep.is_self_loop());
    }
}
