//! Information-theoretic partition agreement scores
//!
//! NMI uses the arithmetic normalization 2*I(U;V) / (H(U) + H(V)); AMI
//! additionally corrects for chance agreement with the hypergeometric
//! expected mutual information (Vinh et al. 2010).

use crate::cluster::Partition;
use crate::graph::WeightedGraph;
use statrs::function::gamma::ln_gamma;
use std::collections::HashMap;

/// Contingency counts plus row and column totals for two label sequences.
struct Contingency {
    joint: HashMap<(usize, usize), usize>,
    row_counts: HashMap<usize, usize>,
    col_counts: HashMap<usize, usize>,
    n: usize,
}

impl Contingency {
    fn build(a: &[usize], b: &[usize]) -> Self {
        let mut joint: HashMap<(usize, usize), usize> = HashMap::new();
        let mut row_counts: HashMap<usize, usize> = HashMap::new();
        let mut col_counts: HashMap<usize, usize> = HashMap::new();
        for (&x, &y) in a.iter().zip(b.iter()) {
            *joint.entry((x, y)).or_insert(0) += 1;
            *row_counts.entry(x).or_insert(0) += 1;
            *col_counts.entry(y).or_insert(0) += 1;
        }
        Self {
            joint,
            row_counts,
            col_counts,
            n: a.len(),
        }
    }

    fn row_entropy(&self) -> f64 {
        entropy(self.row_counts.values(), self.n)
    }

    fn col_entropy(&self) -> f64 {
        entropy(self.col_counts.values(), self.n)
    }

    fn mutual_information(&self) -> f64 {
        let n_f = self.n as f64;
        let mut mi = 0.0;
        for (&(x, y), &count) in &self.joint {
            let p_joint = count as f64 / n_f;
            let p_x = self.row_counts[&x] as f64 / n_f;
            let p_y = self.col_counts[&y] as f64 / n_f;
            if p_joint > 0.0 {
                mi += p_joint * (p_joint / (p_x * p_y)).ln();
            }
        }
        mi
    }
}

fn entropy<'a>(counts: impl Iterator<Item = &'a usize>, n: usize) -> f64 {
    let n_f = n as f64;
    counts
        .map(|&c| {
            let p = c as f64 / n_f;
            if p > 0.0 {
                -p * p.ln()
            } else {
                0.0
            }
        })
        .sum()
}

fn ln_factorial(x: usize) -> f64 {
    ln_gamma(x as f64 + 1.0)
}

/// Expected mutual information of two random labelings with the given row
/// and column totals, under the hypergeometric model.
fn expected_mutual_information(c: &Contingency) -> f64 {
    let n = c.n;
    let n_f = n as f64;
    let mut emi = 0.0;
    for &a in c.row_counts.values() {
        for &b in c.col_counts.values() {
            let start = 1.max((a + b).saturating_sub(n));
            let end = a.min(b);
            for nij in start..=end {
                let nij_f = nij as f64;
                let term = (n_f * nij_f / (a as f64 * b as f64)).ln();
                let ln_prob = ln_factorial(a) + ln_factorial(b) + ln_factorial(n - a)
                    + ln_factorial(n - b)
                    - ln_factorial(n)
                    - ln_factorial(nij)
                    - ln_factorial(a - nij)
                    - ln_factorial(b - nij)
                    - ln_factorial(n + nij - a - b);
                emi += (nij_f / n_f) * term * ln_prob.exp();
            }
        }
    }
    emi
}

/// Normalized Mutual Information between two label assignments over the same
/// items. Symmetric, in [0, 1]; two constant labelings agree perfectly.
pub fn nmi(a: &[usize], b: &[usize]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let c = Contingency::build(a, b);
    let denom = c.row_entropy() + c.col_entropy();
    if denom <= 0.0 {
        // Both labelings are constant
        return 1.0;
    }
    (2.0 * c.mutual_information() / denom).clamp(0.0, 1.0)
}

/// Adjusted Mutual Information: mutual information corrected for chance,
/// normalized by the arithmetic mean of the entropies. Symmetric; 1.0 for
/// identical labelings, ~0.0 for independent ones.
pub fn ami(a: &[usize], b: &[usize]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let c = Contingency::build(a, b);
    if c.row_counts.len() == 1 && c.col_counts.len() == 1 {
        return 1.0;
    }

    let h_a = c.row_entropy();
    let h_b = c.col_entropy();
    let mi = c.mutual_information();
    let emi = expected_mutual_information(&c);

    let mean_h = 0.5 * (h_a + h_b);
    let mut denominator = mean_h - emi;
    // Avoid dividing by ~0 when entropies collapse onto the expectation
    if denominator < 0.0 {
        denominator = denominator.min(-f64::EPSILON);
    } else {
        denominator = denominator.max(f64::EPSILON);
    }
    (mi - emi) / denominator
}

/// How well a partition fits its graph, independent of any other partition.
#[derive(Debug, Clone)]
pub struct PartitionQuality {
    /// Weighted modularity
    pub modularity: f64,
    /// Fraction of edges falling inside a community
    pub coverage: f64,
    /// Fraction of correctly classified node pairs (intra edges plus inter
    /// non-edges over all pairs)
    pub performance: f64,
    /// Mean of the full community-pair conductance matrix, diagonal included
    pub mean_conductance: f64,
}

/// Score a partition against the graph it was detected on.
///
/// Modularity and conductance are weighted; coverage and performance count
/// edges. Zero-volume communities (isolated nodes) contribute 0 conductance
/// instead of dividing by zero.
pub fn partition_quality(graph: &WeightedGraph, partition: &Partition) -> PartitionQuality {
    let k = partition.len();
    let m = graph.total_weight();
    let n = graph.node_count();
    if k == 0 || m <= 0.0 {
        return PartitionQuality {
            modularity: 0.0,
            coverage: 0.0,
            performance: 0.0,
            mean_conductance: 0.0,
        };
    }

    let labels = partition.label_map();
    let comm_of: Vec<Option<usize>> = (0..n as u32)
        .map(|idx| labels.get(graph.node_id(idx)).copied())
        .collect();

    let mut volume = vec![0.0f64; k];
    let mut sizes = vec![0usize; k];
    for (idx, comm) in comm_of.iter().enumerate() {
        if let Some(c) = *comm {
            volume[c] += graph.weighted_degree(idx as u32);
            sizes[c] += 1;
        }
    }

    let mut intra_weight = vec![0.0f64; k];
    let mut cut = vec![vec![0.0f64; k]; k];
    let mut intra_edges = 0usize;
    for (u, v, w) in graph.edges() {
        match (comm_of[u as usize], comm_of[v as usize]) {
            (Some(cu), Some(cv)) if cu == cv => {
                intra_weight[cu] += w;
                cut[cu][cu] += w;
                intra_edges += 1;
            }
            (Some(cu), Some(cv)) => {
                cut[cu][cv] += w;
                cut[cv][cu] += w;
            }
            _ => {}
        }
    }

    let modularity = (0..k)
        .map(|c| intra_weight[c] / m - (volume[c] / (2.0 * m)).powi(2))
        .sum();

    let edge_total = graph.edge_count();
    let coverage = if edge_total > 0 {
        intra_edges as f64 / edge_total as f64
    } else {
        0.0
    };

    let pairs = n * (n - 1) / 2;
    let intra_pairs: usize = sizes.iter().map(|&s| s * s.saturating_sub(1) / 2).sum();
    let inter_non_edges = (pairs - intra_pairs) - (edge_total - intra_edges);
    let performance = if pairs > 0 {
        (intra_edges + inter_non_edges) as f64 / pairs as f64
    } else {
        0.0
    };

    let mut conductance_sum = 0.0;
    for i in 0..k {
        for j in 0..k {
            let denom = volume[i].min(volume[j]);
            if denom > 0.0 {
                conductance_sum += cut[i][j] / denom;
            }
        }
    }
    let mean_conductance = conductance_sum / (k * k) as f64;

    PartitionQuality {
        modularity,
        coverage,
        performance,
        mean_conductance,
    }
}
