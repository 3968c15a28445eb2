//! Graph algorithms for analysis

use crate::graph::WeightedGraph;
use petgraph::unionfind::UnionFind;
use std::collections::{HashMap, HashSet};

/// Partition of node indices into maximal connected subsets.
///
/// Components are returned largest first; within a component, node indices
/// are ascending.
pub fn connected_components(graph: &WeightedGraph) -> Vec<Vec<u32>> {
    let n = graph.node_count();
    let mut sets: UnionFind<u32> = UnionFind::new(n);
    for (u, v, _) in graph.edges() {
        sets.union(u, v);
    }

    let mut by_root: HashMap<u32, Vec<u32>> = HashMap::new();
    for node in 0..n as u32 {
        by_root.entry(sets.find(node)).or_default().push(node);
    }

    let mut components: Vec<Vec<u32>> = by_root.into_values().collect();
    // Largest first; first member breaks ties so the order is reproducible
    components.sort_by(|a, b| b.len().cmp(&a.len()).then(a[0].cmp(&b[0])));
    components
}

pub fn component_count(graph: &WeightedGraph) -> usize {
    connected_components(graph).len()
}

/// New graph containing only the given nodes and edges with both endpoints
/// among them. The subgraph owns independent copies of ids and weights.
pub fn induced_subgraph(graph: &WeightedGraph, nodes: &HashSet<u32>) -> WeightedGraph {
    let mut sub = WeightedGraph::with_capacity(nodes.len());
    let mut sorted: Vec<u32> = nodes.iter().copied().collect();
    sorted.sort_unstable();
    for &u in &sorted {
        sub.add_node(graph.node_id(u));
    }
    for (u, v, w) in graph.edges() {
        if nodes.contains(&u) && nodes.contains(&v) {
            sub.add_edge(graph.node_id(u), graph.node_id(v), w);
        }
    }
    sub
}

/// Subgraph induced by the component with the most nodes.
pub fn largest_connected_component(graph: &WeightedGraph) -> WeightedGraph {
    match connected_components(graph).into_iter().next() {
        Some(component) => induced_subgraph(graph, &component.into_iter().collect()),
        None => WeightedGraph::new(),
    }
}

/// Global clustering coefficient: closed triads / all triads.
///
/// Returns -1.0 for graphs with fewer than two nodes and 0.0 when the graph
/// has no triads at all.
pub fn transitivity(graph: &WeightedGraph) -> f64 {
    let n = graph.node_count();
    if n < 2 {
        return -1.0;
    }

    let mut triads = 0u64;
    let mut closed = 0u64;
    for u in 0..n as u32 {
        let k = graph.degree(u) as u64;
        triads += k * k.saturating_sub(1) / 2;

        let mut neigh: Vec<u32> = graph.neighbors(u).map(|(v, _)| v).collect();
        neigh.sort_unstable();
        for i in 0..neigh.len() {
            for j in (i + 1)..neigh.len() {
                if graph.has_edge(neigh[i], neigh[j]) {
                    closed += 1;
                }
            }
        }
    }

    if triads == 0 {
        return 0.0;
    }
    // `closed` counts every triangle three times, once per vertex
    closed as f64 / triads as f64
}
