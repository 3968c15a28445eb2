//! Community analysis module

pub mod detection;
pub mod metrics;
pub mod stability;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A disjoint division of the graph's node set into communities.
///
/// Communities have no identity beyond their contents and position; the JSON
/// form is a plain array of node-identifier arrays so partitions written by
/// one tool remain consumable by another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Partition {
    pub communities: Vec<Vec<String>>,
}

/// Partitions of the same graph produced with independent seeds, in run order.
pub type MultiRunPartitionSet = Vec<Partition>;

impl Partition {
    pub fn new(communities: Vec<Vec<String>>) -> Self {
        Self { communities }
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    /// Total number of nodes across all communities.
    pub fn node_count(&self) -> usize {
        self.communities.iter().map(|c| c.len()).sum()
    }

    /// Community sizes in community order.
    pub fn sizes(&self) -> Vec<usize> {
        self.communities.iter().map(|c| c.len()).collect()
    }

    /// Node identifier -> community index.
    pub fn label_map(&self) -> HashMap<&str, usize> {
        let mut labels = HashMap::with_capacity(self.node_count());
        for (comm_id, community) in self.communities.iter().enumerate() {
            for node in community {
                labels.insert(node.as_str(), comm_id);
            }
        }
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_map_assigns_each_node_once() {
        let p = Partition::new(vec![
            vec!["a".into(), "b".into()],
            vec!["c".into()],
        ]);
        let labels = p.label_map();
        assert_eq!(labels.len(), 3);
        assert_eq!(labels["a"], 0);
        assert_eq!(labels["b"], 0);
        assert_eq!(labels["c"], 1);
    }

    #[test]
    fn json_round_trip_is_arrays_of_arrays() {
        let p = Partition::new(vec![vec!["a".into()], vec!["b".into(), "c".into()]]);
        let text = serde_json::to_string(&p).unwrap();
        assert_eq!(text, r#"[["a"],["b","c"]]"#);
        let back: Partition = serde_json::from_str(&text).unwrap();
        assert_eq!(back, p);
    }
}
