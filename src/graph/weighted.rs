//! In-memory undirected weighted network

use std::collections::HashMap;

/// Undirected weighted co-authorship network.
///
/// String author identifiers are interned to compact `u32` indices so that
/// the hot loops (degree sums, modularity gains) never hash strings. The
/// original identifiers remain the externally visible node keys.
#[derive(Debug, Clone, Default)]
pub struct WeightedGraph {
    /// Node string IDs, indexed by internal node index
    ids: Vec<String>,

    /// Mapping from string IDs to node indices
    index_of: HashMap<String, u32>,

    /// Adjacency: neighbor index -> accumulated edge weight
    adj: Vec<HashMap<u32, f64>>,

    /// Number of undirected edges
    edge_count: usize,
}

impl WeightedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            ids: Vec::with_capacity(nodes),
            index_of: HashMap::with_capacity(nodes),
            adj: Vec::with_capacity(nodes),
            edge_count: 0,
        }
    }

    /// Get or create the internal index for a node ID. Idempotent.
    pub fn add_node(&mut self, id: &str) -> u32 {
        if let Some(&idx) = self.index_of.get(id) {
            return idx;
        }
        let idx = self.ids.len() as u32;
        self.index_of.insert(id.to_string(), idx);
        self.ids.push(id.to_string());
        self.adj.push(HashMap::new());
        idx
    }

    /// Add an undirected edge, accumulating weight onto an existing edge.
    ///
    /// Self-loops carry no co-authorship meaning and are dropped.
    pub fn add_edge(&mut self, u: &str, v: &str, weight: f64) {
        if u == v {
            return;
        }
        let ui = self.add_node(u);
        let vi = self.add_node(v);
        let fresh = !self.adj[ui as usize].contains_key(&vi);
        *self.adj[ui as usize].entry(vi).or_insert(0.0) += weight;
        *self.adj[vi as usize].entry(ui).or_insert(0.0) += weight;
        if fresh {
            self.edge_count += 1;
        }
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// String identifier for an internal node index.
    pub fn node_id(&self, idx: u32) -> &str {
        &self.ids[idx as usize]
    }

    /// Internal index for a string identifier, if the node exists.
    pub fn index(&self, id: &str) -> Option<u32> {
        self.index_of.get(id).copied()
    }

    /// All node identifiers in insertion order.
    pub fn node_ids(&self) -> &[String] {
        &self.ids
    }

    /// Unweighted incident-edge count.
    pub fn degree(&self, idx: u32) -> usize {
        self.adj[idx as usize].len()
    }

    /// Sum of incident edge weights.
    pub fn weighted_degree(&self, idx: u32) -> f64 {
        self.adj[idx as usize].values().sum()
    }

    /// Neighbors of a node with edge weights, in unspecified order.
    pub fn neighbors(&self, idx: u32) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.adj[idx as usize].iter().map(|(&v, &w)| (v, w))
    }

    pub fn has_edge(&self, u: u32, v: u32) -> bool {
        self.adj[u as usize].contains_key(&v)
    }

    pub fn edge_weight(&self, u: u32, v: u32) -> Option<f64> {
        self.adj[u as usize].get(&v).copied()
    }

    /// Every undirected edge exactly once as `(u, v, w)` with `u < v`,
    /// sorted by `(u, v)` for deterministic iteration.
    pub fn edges(&self) -> Vec<(u32, u32, f64)> {
        let mut out = Vec::with_capacity(self.edge_count);
        for u in 0..self.adj.len() as u32 {
            let mut incident: Vec<(u32, f64)> = self
                .neighbors(u)
                .filter(|&(v, _)| u < v)
                .collect();
            incident.sort_unstable_by_key(|&(v, _)| v);
            out.extend(incident.into_iter().map(|(v, w)| (u, v, w)));
        }
        out
    }

    /// Total edge weight, each undirected edge counted once.
    pub fn total_weight(&self) -> f64 {
        (0..self.adj.len() as u32)
            .map(|u| self.weighted_degree(u))
            .sum::<f64>()
            / 2.0
    }

    /// |E| / (|V| * (|V| - 1) / 2), or -1.0 for graphs with fewer than
    /// two nodes.
    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n < 2 {
            return -1.0;
        }
        self.edge_count as f64 / (n as f64 * (n as f64 - 1.0) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_edge_accumulates_weight() {
        let mut g = WeightedGraph::new();
        g.add_edge("a", "b", 1.0);
        g.add_edge("b", "a", 2.0);
        assert_eq!(g.edge_count(), 1);
        let (a, b) = (g.index("a").unwrap(), g.index("b").unwrap());
        assert_eq!(g.edge_weight(a, b), Some(3.0));
        assert_eq!(g.edge_weight(b, a), Some(3.0));
    }

    #[test]
    fn self_loops_are_dropped() {
        let mut g = WeightedGraph::new();
        g.add_edge("a", "a", 5.0);
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn add_node_is_idempotent() {
        let mut g = WeightedGraph::new();
        let first = g.add_node("x");
        let second = g.add_node("x");
        assert_eq!(first, second);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn degrees_and_total_weight() {
        let mut g = WeightedGraph::new();
        g.add_edge("a", "b", 10.0);
        g.add_edge("a", "c", 1.0);
        let a = g.index("a").unwrap();
        assert_eq!(g.degree(a), 2);
        assert!((g.weighted_degree(a) - 11.0).abs() < 1e-12);
        assert!((g.total_weight() - 11.0).abs() < 1e-12);
    }

    #[test]
    fn density_sentinel_for_degenerate_graphs() {
        let mut g = WeightedGraph::new();
        assert_eq!(g.density(), -1.0);
        g.add_node("only");
        assert_eq!(g.density(), -1.0);
        g.add_edge("a", "b", 1.0);
        assert!(g.density() > 0.0);
    }

    #[test]
    fn edges_are_deterministic_and_unique() {
        let mut g = WeightedGraph::new();
        g.add_edge("a", "b", 1.0);
        g.add_edge("b", "c", 2.0);
        g.add_edge("a", "c", 3.0);
        let edges = g.edges();
        assert_eq!(edges.len(), 3);
        assert_eq!(edges, g.edges());
        for &(u, v, _) in &edges {
            assert!(u < v);
        }
    }
}
