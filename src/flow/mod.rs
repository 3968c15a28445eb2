//! Cross-interval community flow tracking

use crate::cluster::Partition;
use log;
use ndarray::Array2;
use std::collections::{BTreeSet, HashSet};

/// Linear-interpolation percentile over a sorted sample (the numpy default).
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = p / 100.0 * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

/// Community-size quantiles of a partition, one value per requested quantile.
pub fn size_quantiles(partition: &Partition, quantiles: &[f64]) -> Vec<f64> {
    let mut sizes: Vec<f64> = partition.sizes().iter().map(|&s| s as f64).collect();
    sizes.sort_by(|a, b| a.total_cmp(b));
    quantiles.iter().map(|&q| percentile(&sizes, q)).collect()
}

/// Size-quantile summary for one time window.
#[derive(Debug, Clone)]
pub struct WindowSummary {
    pub window: String,
    pub community_count: usize,
    pub large_count: usize,
    pub quantile_sizes: Vec<f64>,
}

/// Migration between one consecutive window pair.
///
/// Rows are the earlier window's communities sorted by descending size,
/// columns the later window's; cell (i, j) is the fraction of row community
/// i's members found in column community j.
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub matrix: Array2<f64>,
    /// Node loss within the reporting scope (large + sink-aggregate), percent
    pub lost_pct_filtered: f64,
    /// Node loss over all original communities, percent
    pub lost_pct_global: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FlowReport {
    pub summaries: Vec<WindowSummary>,
    pub transitions: Vec<Transition>,
}

/// Tracks community migration across a chronological sequence of partitions.
#[derive(Debug, Clone)]
pub struct FlowTracker {
    /// Percentile separating "large" communities from the sink
    pub percentile: f64,

    /// Size quantiles reported per window
    pub quantiles: Vec<f64>,

    /// Union all sink communities into one trailing synthetic community
    pub aggregate_sink: bool,
}

impl FlowTracker {
    pub fn new(percentile: f64, quantiles: Vec<f64>, aggregate_sink: bool) -> Self {
        Self {
            percentile,
            quantiles,
            aggregate_sink,
        }
    }

    /// Split a window's communities into large (size at or above the
    /// percentile threshold) and sink (the rest), preserving order.
    fn split(&self, partition: &Partition) -> (Vec<Vec<String>>, Vec<Vec<String>>) {
        let mut sizes: Vec<f64> = partition.sizes().iter().map(|&s| s as f64).collect();
        sizes.sort_by(|a, b| a.total_cmp(b));
        let threshold = percentile(&sizes, self.percentile);

        let mut large = Vec::new();
        let mut sink = Vec::new();
        for community in &partition.communities {
            if community.len() as f64 >= threshold {
                large.push(community.clone());
            } else {
                sink.push(community.clone());
            }
        }
        (large, sink)
    }

    /// The communities that take part in migration analysis for a window:
    /// the large ones, plus one sink-aggregate when enabled.
    pub fn flow_communities(&self, partition: &Partition) -> Vec<Vec<String>> {
        let (mut large, sink) = self.split(partition);
        if self.aggregate_sink && !sink.is_empty() {
            let union: BTreeSet<String> = sink.into_iter().flatten().collect();
            large.push(union.into_iter().collect());
        }
        large
    }

    /// Compute size summaries and consecutive-window migrations for a
    /// chronological sequence of (window key, partition) pairs.
    pub fn track(&self, windows: &[(String, Partition)]) -> FlowReport {
        let flow_lists: Vec<Vec<Vec<String>>> = windows
            .iter()
            .map(|(_, partition)| self.flow_communities(partition))
            .collect();

        let summaries = windows
            .iter()
            .zip(&flow_lists)
            .map(|((window, partition), flow)| WindowSummary {
                window: window.clone(),
                community_count: partition.len(),
                large_count: flow.len(),
                quantile_sizes: size_quantiles(partition, &self.quantiles),
            })
            .collect();

        let mut transitions = Vec::new();
        for i in 0..windows.len().saturating_sub(1) {
            let (from, before_partition) = &windows[i];
            let (to, during_partition) = &windows[i + 1];
            log::info!("Analyzing migration from {} to {}", from, to);

            let before = sort_by_size(&flow_lists[i]);
            let during = sort_by_size(&flow_lists[i + 1]);

            let mut matrix = Array2::zeros((before.len(), during.len()));
            for (r, b) in before.iter().enumerate() {
                for (c, d) in during.iter().enumerate() {
                    matrix[(r, c)] = overlap_fraction(b, d);
                }
            }

            let lost_pct_filtered = lost_percentage(&flow_lists[i], &flow_lists[i + 1]);
            let lost_pct_global = lost_percentage(
                &before_partition.communities,
                &during_partition.communities,
            );
            log::info!(
                "Lost nodes {} -> {}: {:.2}% (filtered) / {:.2}% (global)",
                from,
                to,
                lost_pct_filtered,
                lost_pct_global
            );

            transitions.push(Transition {
                from: from.clone(),
                to: to.clone(),
                matrix,
                lost_pct_filtered,
                lost_pct_global,
            });
        }

        FlowReport {
            summaries,
            transitions,
        }
    }
}

/// Descending size, stable so the original index breaks ties.
fn sort_by_size(communities: &[Vec<String>]) -> Vec<HashSet<&str>> {
    let mut indexed: Vec<&Vec<String>> = communities.iter().collect();
    indexed.sort_by(|a, b| b.len().cmp(&a.len()));
    indexed
        .into_iter()
        .map(|c| c.iter().map(String::as_str).collect())
        .collect()
}

/// |before ∩ during| / |before|, the fraction of the earlier community that
/// reappears in the later one.
fn overlap_fraction(before: &HashSet<&str>, during: &HashSet<&str>) -> f64 {
    if before.is_empty() {
        return 0.0;
    }
    let inter = before.iter().filter(|n| during.contains(**n)).count();
    inter as f64 / before.len() as f64
}

/// Percentage of nodes present in the earlier community list but absent from
/// the later one.
fn lost_percentage(before: &[Vec<String>], during: &[Vec<String>]) -> f64 {
    let before_union: HashSet<&str> = before.iter().flatten().map(String::as_str).collect();
    if before_union.is_empty() {
        return 0.0;
    }
    let during_union: HashSet<&str> = during.iter().flatten().map(String::as_str).collect();
    let lost = before_union
        .iter()
        .filter(|n| !during_union.contains(**n))
        .count();
    lost as f64 / before_union.len() as f64 * 100.0
}
