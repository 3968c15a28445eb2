//! Community stability under stochastic re-detection

use crate::cluster::detection::CommunityDetector;
use crate::cluster::metrics::{ami, nmi};
use crate::cluster::{MultiRunPartitionSet, Partition};
use crate::graph::WeightedGraph;
use itertools::Itertools;
use log;
use rayon::prelude::*;

/// Pairwise agreement scores over a multi-run partition set.
#[derive(Debug, Clone, Default)]
pub struct StabilityReport {
    pub nmi_values: Vec<f64>,
    pub ami_values: Vec<f64>,
}

impl StabilityReport {
    pub fn mean_nmi(&self) -> Option<f64> {
        mean(&self.nmi_values)
    }

    pub fn mean_ami(&self) -> Option<f64> {
        mean(&self.ami_values)
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Repeats community detection with distinct seeds and scores how well the
/// resulting partitions agree.
#[derive(Debug, Clone)]
pub struct StabilityEvaluator {
    /// Number of detection runs
    pub runs: usize,

    /// Communities smaller than this are dropped before comparison
    pub min_community_size: usize,

    /// Seed of the first run; run r uses `base_seed + r`
    pub base_seed: u64,
}

impl StabilityEvaluator {
    pub fn new(runs: usize, min_community_size: usize, base_seed: u64) -> Self {
        Self {
            runs,
            min_community_size,
            base_seed,
        }
    }

    /// Run the detector `runs` times. Runs are independent, so they are
    /// dispatched to the rayon pool.
    pub fn detect_runs(&self, graph: &WeightedGraph) -> MultiRunPartitionSet {
        let detector = CommunityDetector::new();
        (0..self.runs as u64)
            .into_par_iter()
            .map(|r| detector.detect(graph, self.base_seed + r))
            .collect()
    }

    /// Score pairwise agreement across the runs.
    ///
    /// Fewer than two runs allow no pairwise comparison: the report is
    /// empty, not an error, since the caller controls the run count.
    pub fn evaluate(&self, partitions: &MultiRunPartitionSet) -> StabilityReport {
        if partitions.len() < 2 {
            log::warn!(
                "Stability evaluation needs at least 2 runs, got {}",
                partitions.len()
            );
            return StabilityReport::default();
        }

        let filtered = filter_largest_communities(partitions, self.min_community_size);
        let label_maps: Vec<_> = filtered.iter().map(|p| p.label_map()).collect();

        let mut report = StabilityReport::default();
        for (i, j) in (0..label_maps.len()).tuple_combinations() {
            // Guard against node-set drift between runs
            let mut common: Vec<&str> = label_maps[i]
                .keys()
                .filter(|node| label_maps[j].contains_key(*node))
                .copied()
                .collect();
            common.sort_unstable();

            let labels_i: Vec<usize> = common.iter().map(|n| label_maps[i][n]).collect();
            let labels_j: Vec<usize> = common.iter().map(|n| label_maps[j][n]).collect();
            report.nmi_values.push(nmi(&labels_i, &labels_j));
            report.ami_values.push(ami(&labels_i, &labels_j));
        }
        report
    }

    /// Convenience wrapper: detect, then evaluate.
    pub fn run(&self, graph: &WeightedGraph) -> (MultiRunPartitionSet, StabilityReport) {
        let partitions = self.detect_runs(graph);
        let report = self.evaluate(&partitions);
        (partitions, report)
    }
}

/// Drop communities below `min_size` from every run, then truncate each run
/// to the minimum remaining community count across runs, keeping the
/// largest. This stops runs that happen to retain more tiny communities
/// from biasing the comparison.
pub fn filter_largest_communities(
    partitions: &MultiRunPartitionSet,
    min_size: usize,
) -> MultiRunPartitionSet {
    let kept: Vec<Vec<Vec<String>>> = partitions
        .iter()
        .map(|p| {
            p.communities
                .iter()
                .filter(|c| c.len() >= min_size)
                .cloned()
                .collect()
        })
        .collect();

    let min_count = kept.iter().map(|p| p.len()).min().unwrap_or(0);

    kept.into_iter()
        .map(|mut communities| {
            // Stable by size: original index breaks ties
            communities.sort_by(|a, b| b.len().cmp(&a.len()));
            communities.truncate(min_count);
            Partition::new(communities)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partition(groups: &[&[&str]]) -> Partition {
        Partition::new(
            groups
                .iter()
                .map(|g| g.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn fewer_than_two_runs_gives_empty_report() {
        let evaluator = StabilityEvaluator::new(1, 1, 0);
        let runs = vec![partition(&[&["a", "b"]])];
        let report = evaluator.evaluate(&runs);
        assert!(report.nmi_values.is_empty());
        assert!(report.mean_nmi().is_none());
        assert!(report.mean_ami().is_none());
    }

    #[test]
    fn identical_runs_score_one() {
        let evaluator = StabilityEvaluator::new(2, 1, 0);
        let runs = vec![
            partition(&[&["A", "B"], &["C", "D"]]),
            partition(&[&["A", "B"], &["C", "D"]]),
        ];
        let report = evaluator.evaluate(&runs);
        assert_eq!(report.nmi_values.len(), 1);
        assert!((report.mean_nmi().unwrap() - 1.0).abs() < 1e-9);
        assert!((report.mean_ami().unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn comparison_restricts_to_common_nodes() {
        let runs = vec![
            partition(&[&["a", "b"], &["c", "d"]]),
            partition(&[&["a", "b"], &["c", "e"]]),
        ];
        let evaluator = StabilityEvaluator::new(2, 1, 0);
        let report = evaluator.evaluate(&runs);
        // Over the common nodes {a,b,c} the labelings agree exactly
        assert!((report.nmi_values[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pair_count_is_r_choose_two() {
        let run = partition(&[&["a", "b"], &["c"]]);
        let runs = vec![run.clone(), run.clone(), run.clone(), run];
        let evaluator = StabilityEvaluator::new(4, 1, 0);
        let report = evaluator.evaluate(&runs);
        assert_eq!(report.nmi_values.len(), 6);
        assert_eq!(report.ami_values.len(), 6);
    }

    #[test]
    fn filtering_truncates_to_common_count() {
        let runs = vec![
            partition(&[&["a", "b", "c"], &["d", "e"], &["f"]]),
            partition(&[&["a", "b", "c", "d"], &["e", "f"]]),
        ];
        let filtered = filter_largest_communities(&runs, 2);
        // Run 1 keeps {a,b,c} and {d,e}; run 2 keeps both of its
        // communities; min count is 2
        assert_eq!(filtered[0].len(), 2);
        assert_eq!(filtered[1].len(), 2);
        // Largest first after filtering
        assert_eq!(filtered[0].communities[0].len(), 3);
    }

    #[test]
    fn default_min_size_drops_singletons() {
        let runs = vec![
            partition(&[&["a", "b"], &["x"]]),
            partition(&[&["a", "b"], &["y"]]),
        ];
        let filtered =
            filter_largest_communities(&runs, crate::config::DEFAULT_MIN_COMMUNITY_SIZE);
        assert_eq!(filtered[0].len(), 1);
        assert_eq!(filtered[1].len(), 1);
        assert_eq!(filtered[0].communities[0], vec!["a", "b"]);
    }

    #[test]
    fn detect_runs_produces_one_partition_per_seed() {
        let mut g = WeightedGraph::new();
        g.add_edge("a", "b", 3.0);
        g.add_edge("b", "c", 3.0);
        let evaluator = StabilityEvaluator::new(3, 1, 11);
        let runs = evaluator.detect_runs(&g);
        assert_eq!(runs.len(), 3);
        for p in &runs {
            assert_eq!(p.node_count(), 3);
        }
    }
}
