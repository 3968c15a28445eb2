//! Structural statistics for monitoring raw and backbone networks

use crate::graph::{algorithms, WeightedGraph};
use crate::Result;
use anyhow::Context;
use log;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fs::OpenOptions;
use std::path::Path;

/// One row of the structural statistics table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralStats {
    pub graph_name: String,
    pub number_of_nodes: usize,
    pub number_of_edges: usize,
    pub min_degree: f64,
    pub max_degree: f64,
    pub mean_degree: f64,
    pub median_degree: f64,
    pub degree_std: f64,
    pub w_min_degree: f64,
    pub w_max_degree: f64,
    pub w_mean_degree: f64,
    pub w_median_degree: f64,
    pub w_degree_std: f64,
    pub density: f64,
    pub transitivity: f64,
    pub n_connected_components: usize,
}

/// Median with averaging of the middle pair for even-length samples.
fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

fn sequence_stats(mut seq: Vec<f64>) -> (f64, f64, f64, f64, f64) {
    if seq.is_empty() {
        return (f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN);
    }
    seq.sort_by(|a, b| a.total_cmp(b));
    let min = seq[0];
    let max = seq[seq.len() - 1];
    let mean = (&seq).mean();
    let med = median(&seq);
    let std = (&seq).population_std_dev();
    (min, max, mean, med, std)
}

/// Descriptive structural metrics for one graph.
pub fn compute_structural_stats(graph: &WeightedGraph, graph_name: &str) -> StructuralStats {
    let degrees: Vec<f64> = (0..graph.node_count() as u32)
        .map(|n| graph.degree(n) as f64)
        .collect();
    let weighted: Vec<f64> = (0..graph.node_count() as u32)
        .map(|n| graph.weighted_degree(n))
        .collect();

    let (min_degree, max_degree, mean_degree, median_degree, degree_std) =
        sequence_stats(degrees);
    let (w_min_degree, w_max_degree, w_mean_degree, w_median_degree, w_degree_std) =
        sequence_stats(weighted);

    StructuralStats {
        graph_name: graph_name.to_string(),
        number_of_nodes: graph.node_count(),
        number_of_edges: graph.edge_count(),
        min_degree,
        max_degree,
        mean_degree,
        median_degree,
        degree_std,
        w_min_degree,
        w_max_degree,
        w_mean_degree,
        w_median_degree,
        w_degree_std,
        density: graph.density(),
        transitivity: algorithms::transitivity(graph),
        n_connected_components: algorithms::component_count(graph),
    }
}

/// True when the table's first column already carries `key`. Append-only
/// tables stay resumable through this check: reruns skip the row and leave
/// the file byte-identical.
pub fn table_has_row(path: &Path, key: &str) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening table {}", path.display()))?;
    for record in reader.records() {
        let record = record?;
        if record.get(0) == Some(key) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Append one row, creating the table with a header only when it does not
/// exist yet.
pub fn append_stats_row(path: &Path, stats: &StructuralStats) -> Result<()> {
    let write_header = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening stats table {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    writer.serialize(stats)?;
    writer.flush()?;
    log::debug!("Appended stats row for {} to {}", stats.graph_name, path.display());
    Ok(())
}
