//! Statistical backbone extraction (disparity filter)

use crate::data::edgelist;
use crate::graph::WeightedGraph;
use crate::Result;
use log;
use std::path::Path;

/// Significance of edge `(i, j)` seen from `i`: the probability that a
/// uniform redistribution of `i`'s weight over its `k` edges yields an edge
/// at least this strong.
///
/// `p` is the normalized weight w_ij / s_i. Degree-one nodes concentrate all
/// weight on their single edge, which carries no evidence, so they score 1.
fn disparity_pvalue(p: f64, degree: usize) -> f64 {
    if degree <= 1 {
        return 1.0;
    }
    (1.0 - p).powi(degree as i32 - 1)
}

/// Reduce a weighted network to its statistically significant backbone.
///
/// An edge survives when the disparity test passes from at least one
/// endpoint (high-degree nodes dilute p values for their neighbors, so
/// requiring both sides would discard real structure) and its normalized
/// weight clears `weight_cutoff` on both endpoints. Surviving edges keep
/// their original weights; nodes isolated by the filter are dropped.
pub fn extract_backbone(graph: &WeightedGraph, alpha: f64, weight_cutoff: f64) -> WeightedGraph {
    log::info!(
        "Extracting backbone (alpha = {}, weight cutoff = {}) from {} nodes / {} edges",
        alpha,
        weight_cutoff,
        graph.node_count(),
        graph.edge_count()
    );

    // Strengths and degrees are reused for both endpoints of every edge
    let n = graph.node_count();
    let mut strength = vec![0.0f64; n];
    let mut degree = vec![0usize; n];
    for idx in 0..n as u32 {
        strength[idx as usize] = graph.weighted_degree(idx);
        degree[idx as usize] = graph.degree(idx);
    }

    let mut backbone = WeightedGraph::new();
    for (u, v, w) in graph.edges() {
        let (ui, vi) = (u as usize, v as usize);
        let p_uv = if strength[ui] > 0.0 { w / strength[ui] } else { 0.0 };
        let p_vu = if strength[vi] > 0.0 { w / strength[vi] } else { 0.0 };

        let significant = disparity_pvalue(p_uv, degree[ui]) < alpha
            || disparity_pvalue(p_vu, degree[vi]) < alpha;
        if !significant {
            continue;
        }
        if p_uv < weight_cutoff || p_vu < weight_cutoff {
            continue;
        }
        backbone.add_edge(graph.node_id(u), graph.node_id(v), w);
    }

    log::info!(
        "Backbone has {} nodes and {} edges ({:.1}% of edges retained)",
        backbone.node_count(),
        backbone.edge_count(),
        if graph.edge_count() > 0 {
            100.0 * backbone.edge_count() as f64 / graph.edge_count() as f64
        } else {
            0.0
        }
    );
    backbone
}

/// Extract one window's backbone from `input` into `output`.
///
/// An existing output file is left untouched, so a rerun over the same
/// directory never rewrites completed windows.
pub fn extract_backbone_file(
    input: &Path,
    output: &Path,
    alpha: f64,
    weight_cutoff: f64,
    has_header: bool,
) -> Result<()> {
    if output.exists() {
        log::info!("Backbone already computed for {}", input.display());
        return Ok(());
    }
    let graph = edgelist::load_weighted_graph(input, has_header)?;
    let backbone = extract_backbone(&graph, alpha, weight_cutoff);
    edgelist::write_edge_list(output, &backbone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_triangle_yields_empty_backbone() {
        // A-B:10, A-C:1, B-C:1. At A (k=2, s=11): alpha_AB = 0.091,
        // alpha_AC = 0.909; symmetric at B; at C both edges score 0.5.
        // Nothing is significant at alpha = 0.05.
        let mut g = WeightedGraph::new();
        g.add_edge("A", "B", 10.0);
        g.add_edge("A", "C", 1.0);
        g.add_edge("B", "C", 1.0);

        let backbone = extract_backbone(&g, 0.05, 0.05);
        assert_eq!(backbone.node_count(), 0);
        assert_eq!(backbone.edge_count(), 0);
    }

    #[test]
    fn backbone_is_a_subgraph_with_original_weights() {
        let mut g = WeightedGraph::new();
        // Hub with one dominant edge among many weak ones
        g.add_edge("hub", "main", 100.0);
        for i in 0..10 {
            g.add_edge("hub", &format!("leaf{i}"), 1.0);
        }

        let backbone = extract_backbone(&g, 0.05, 0.05);
        assert!(backbone.edge_count() >= 1);
        for (u, v, w) in backbone.edges() {
            let gu = g.index(backbone.node_id(u)).unwrap();
            let gv = g.index(backbone.node_id(v)).unwrap();
            assert_eq!(g.edge_weight(gu, gv), Some(w));
        }
    }

    #[test]
    fn dominant_hub_edge_survives() {
        let mut g = WeightedGraph::new();
        g.add_edge("hub", "main", 100.0);
        for i in 0..10 {
            g.add_edge("hub", &format!("leaf{i}"), 1.0);
        }
        // p(hub->main) = 100/110, alpha = (1 - 0.909)^10 << 0.05;
        // p(main->hub) = 1.0 clears the flat cutoff.
        let backbone = extract_backbone(&g, 0.05, 0.05);
        let hub = backbone.index("hub").expect("hub retained");
        let main = backbone.index("main").expect("main retained");
        assert_eq!(backbone.edge_weight(hub, main), Some(100.0));
    }

    #[test]
    fn rerunning_extraction_leaves_output_unchanged() {
        use std::io::Write;

        let dir = std::env::temp_dir().join(format!("backbone_rerun_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("edges.csv");
        let output = dir.join("backbone_edges.csv");

        let mut rows = String::from("source,target,weight\nhub,main,100\n");
        for i in 0..10 {
            rows.push_str(&format!("hub,leaf{i},1\n"));
        }
        std::fs::write(&input, &rows).unwrap();

        extract_backbone_file(&input, &output, 0.05, 0.05, true).unwrap();
        let first = std::fs::read(&output).unwrap();

        // Even with new input rows, the completed window is not recomputed
        let mut f = std::fs::OpenOptions::new().append(true).open(&input).unwrap();
        f.write_all(b"other,peer,50\n").unwrap();
        extract_backbone_file(&input, &output, 0.05, 0.05, true).unwrap();
        let second = std::fs::read(&output).unwrap();

        assert_eq!(first, second);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn degree_one_pendant_is_not_significant() {
        let mut g = WeightedGraph::new();
        g.add_edge("a", "b", 7.0);
        // Both endpoints have degree 1: p-value 1.0 from each side.
        let backbone = extract_backbone(&g, 0.05, 0.05);
        assert_eq!(backbone.edge_count(), 0);
    }
}
