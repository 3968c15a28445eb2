//! Seeded weighted Louvain community detection

use crate::cluster::Partition;
use crate::graph::WeightedGraph;
use log;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

/// Weighted modularity-optimizing partitioner (Blondel et al. 2008).
///
/// The seed controls only the node-visitation order during local moving, so
/// the same graph and seed always produce the identical partition.
#[derive(Debug, Clone)]
pub struct CommunityDetector {
    /// Maximum local-moving passes per aggregation level
    max_passes: usize,
}

impl Default for CommunityDetector {
    fn default() -> Self {
        Self { max_passes: 100 }
    }
}

/// One contracted-graph generation of the aggregation loop.
///
/// Each generation owns its node range `0..n`, its inter-node edges and the
/// self-loop weights accumulated from contracted intra-community edges.
struct Generation {
    n: usize,
    edges: Vec<(usize, usize, f64)>,
    self_loops: Vec<f64>,
}

impl Generation {
    fn from_graph(graph: &WeightedGraph) -> Self {
        Self {
            n: graph.node_count(),
            edges: graph
                .edges()
                .into_iter()
                .map(|(u, v, w)| (u as usize, v as usize, w))
                .collect(),
            self_loops: vec![0.0; graph.node_count()],
        }
    }

    fn total_weight(&self) -> f64 {
        self.edges.iter().map(|&(_, _, w)| w).sum::<f64>() + self.self_loops.iter().sum::<f64>()
    }

    /// Contract each community into a super-node. Inter-community weights
    /// are summed; intra-community weight becomes a self-loop.
    fn aggregate(&self, comm: &[usize], compressed: &[usize], n_comms: usize) -> Generation {
        let mut self_loops = vec![0.0; n_comms];
        let mut between: BTreeMap<(usize, usize), f64> = BTreeMap::new();

        for &(i, j, w) in &self.edges {
            let ci = compressed[comm[i]];
            let cj = compressed[comm[j]];
            if ci == cj {
                self_loops[ci] += w;
            } else {
                *between.entry((ci.min(cj), ci.max(cj))).or_insert(0.0) += w;
            }
        }
        for (i, &sl) in self.self_loops.iter().enumerate() {
            self_loops[compressed[comm[i]]] += sl;
        }

        Generation {
            n: n_comms,
            edges: between.into_iter().map(|((i, j), w)| (i, j, w)).collect(),
            self_loops,
        }
    }
}

/// Compress community labels to `0..count` in order of first occurrence.
fn renumber(comm: &[usize]) -> (Vec<usize>, usize) {
    let mut compressed = vec![usize::MAX; comm.len()];
    let mut next = 0;
    for &c in comm {
        if compressed[c] == usize::MAX {
            compressed[c] = next;
            next += 1;
        }
    }
    (compressed, next)
}

impl CommunityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detect communities, expanding memberships back through the
    /// aggregation history to the original node identifiers.
    pub fn detect(&self, graph: &WeightedGraph, seed: u64) -> Partition {
        let n0 = graph.node_count();
        if n0 == 0 {
            return Partition::new(Vec::new());
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut generation = Generation::from_graph(graph);
        // Original node -> node of the current generation
        let mut membership: Vec<usize> = (0..n0).collect();

        loop {
            let comm = self.local_moving(&generation, &mut rng);
            let (compressed, n_comms) = renumber(&comm);

            for m in membership.iter_mut() {
                *m = compressed[comm[*m]];
            }

            // Aggregation that leaves the community count unchanged has
            // converged
            if n_comms == generation.n {
                break;
            }
            generation = generation.aggregate(&comm, &compressed, n_comms);
        }

        // Compressed labels are contiguous from zero, each with a member
        let final_count = membership.iter().copied().max().map_or(0, |m| m + 1);

        let mut communities: Vec<Vec<String>> = vec![Vec::new(); final_count];
        for (node, &c) in membership.iter().enumerate() {
            communities[c].push(graph.node_id(node as u32).to_string());
        }
        for community in &mut communities {
            community.sort();
        }

        log::debug!(
            "Louvain (seed {}) found {} communities over {} nodes",
            seed,
            communities.len(),
            n0
        );
        Partition::new(communities)
    }

    /// Phase 1: move nodes between neighboring communities while modularity
    /// improves. Candidate communities are scanned in ascending index with a
    /// strictly-greater gain test, so ties resolve to the lowest index.
    fn local_moving(&self, generation: &Generation, rng: &mut StdRng) -> Vec<usize> {
        let n = generation.n;
        let m = generation.total_weight();
        if m == 0.0 {
            return (0..n).collect();
        }

        let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for &(i, j, w) in &generation.edges {
            adj[i].push((j, w));
            adj[j].push((i, w));
        }

        let mut degrees = vec![0.0; n];
        for &(i, j, w) in &generation.edges {
            degrees[i] += w;
            degrees[j] += w;
        }
        for (i, &sl) in generation.self_loops.iter().enumerate() {
            degrees[i] += 2.0 * sl;
        }

        let mut communities: Vec<usize> = (0..n).collect();
        let mut community_degrees = degrees.clone();

        // The seed only decides this visitation order
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        for _pass in 0..self.max_passes {
            let mut improved = false;

            for &node in &order {
                let current = communities[node];
                let ki = degrees[node];
                community_degrees[current] -= ki;

                let mut community_weights: BTreeMap<usize, f64> = BTreeMap::new();
                for &(neighbor, w) in &adj[node] {
                    *community_weights.entry(communities[neighbor]).or_insert(0.0) += w;
                }

                let mut best_community = current;
                let mut best_gain = 0.0;
                for (&candidate, &ki_in) in &community_weights {
                    let sigma_tot = community_degrees[candidate];
                    let gain = ki_in / m - sigma_tot * ki / (2.0 * m * m);
                    if gain > best_gain {
                        best_gain = gain;
                        best_community = candidate;
                    }
                }

                communities[node] = best_community;
                community_degrees[best_community] += ki;
                if best_community != current {
                    improved = true;
                }
            }

            if !improved {
                break;
            }
        }

        communities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn two_cliques() -> WeightedGraph {
        let mut g = WeightedGraph::new();
        for (u, v) in [("a0", "a1"), ("a1", "a2"), ("a0", "a2")] {
            g.add_edge(u, v, 5.0);
        }
        for (u, v) in [("b0", "b1"), ("b1", "b2"), ("b0", "b2")] {
            g.add_edge(u, v, 5.0);
        }
        g.add_edge("a2", "b0", 1.0);
        g
    }

    fn assert_valid_partition(partition: &Partition, graph: &WeightedGraph) {
        let mut seen = HashSet::new();
        for community in &partition.communities {
            for node in community {
                assert!(seen.insert(node.clone()), "node {node} appears twice");
                assert!(graph.index(node).is_some());
            }
        }
        assert_eq!(seen.len(), graph.node_count());
    }

    #[test]
    fn separates_two_cliques() {
        let g = two_cliques();
        let partition = CommunityDetector::new().detect(&g, 7);
        assert_valid_partition(&partition, &g);
        assert_eq!(partition.len(), 2);

        let labels = partition.label_map();
        assert_eq!(labels["a0"], labels["a1"]);
        assert_eq!(labels["a1"], labels["a2"]);
        assert_eq!(labels["b0"], labels["b1"]);
        assert_eq!(labels["b1"], labels["b2"]);
        assert_ne!(labels["a0"], labels["b0"]);
    }

    #[test]
    fn same_seed_is_deterministic() {
        let g = two_cliques();
        let detector = CommunityDetector::new();
        let first = detector.detect(&g, 1234);
        let second = detector.detect(&g, 1234);
        assert_eq!(first, second);
    }

    #[test]
    fn covers_nodes_for_any_seed() {
        let g = two_cliques();
        let detector = CommunityDetector::new();
        for seed in 0..10 {
            let partition = detector.detect(&g, seed);
            assert_valid_partition(&partition, &g);
        }
    }

    #[test]
    fn empty_graph_gives_empty_partition() {
        let g = WeightedGraph::new();
        let partition = CommunityDetector::new().detect(&g, 0);
        assert!(partition.is_empty());
    }

    #[test]
    fn isolated_nodes_stay_singletons() {
        let mut g = WeightedGraph::new();
        g.add_node("lonely");
        g.add_edge("a", "b", 3.0);
        let partition = CommunityDetector::new().detect(&g, 0);
        assert_valid_partition(&partition, &g);
        let labels = partition.label_map();
        assert_eq!(labels["a"], labels["b"]);
        assert_ne!(labels["lonely"], labels["a"]);
    }
}
