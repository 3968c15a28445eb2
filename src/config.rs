//! Configuration management for the co-authorship network analyzer

/// Disparity filter significance level.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Flat cutoff on per-endpoint normalized edge weight.
pub const DEFAULT_WEIGHT_CUTOFF: f64 = 0.05;

/// Louvain seed used for the single labeling run.
pub const DEFAULT_SEED: u64 = 42;

/// Number of re-detection runs for stability scoring.
pub const DEFAULT_STABILITY_RUNS: usize = 10;

/// Communities smaller than this are dropped before stability comparison;
/// the default excludes singletons.
pub const DEFAULT_MIN_COMMUNITY_SIZE: usize = 2;

/// Percentile separating "large" communities from the sink.
pub const DEFAULT_FLOW_PERCENTILE: f64 = 99.0;

/// Community-size quantiles reported per time window.
pub const DEFAULT_QUANTILES: [f64; 8] = [25.0, 50.0, 60.0, 70.0, 80.0, 90.0, 95.0, 99.0];

/// Default configuration for the analysis pipeline
#[derive(Debug, Clone)]
pub struct Config {
    /// Disparity filter significance level
    pub alpha: f64,

    /// Normalized-weight cutoff applied after the disparity test
    pub weight_cutoff: f64,

    /// Seed for the labeling community-detection run
    pub seed: u64,

    /// Number of stability runs
    pub stability_runs: usize,

    /// Minimum community size kept for stability comparison
    pub min_community_size: usize,

    /// Percentile threshold for flow tracking
    pub flow_percentile: f64,

    /// Size quantiles reported per window
    pub quantiles: Vec<f64>,

    /// Whether input edge lists carry a header row
    pub has_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            weight_cutoff: DEFAULT_WEIGHT_CUTOFF,
            seed: DEFAULT_SEED,
            stability_runs: DEFAULT_STABILITY_RUNS,
            min_community_size: DEFAULT_MIN_COMMUNITY_SIZE,
            flow_percentile: DEFAULT_FLOW_PERCENTILE,
            quantiles: DEFAULT_QUANTILES.to_vec(),
            has_header: true,
        }
    }
}
