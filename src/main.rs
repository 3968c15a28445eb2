use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use coauthorship_network_analyzer::backbone;
use coauthorship_network_analyzer::cluster::detection::CommunityDetector;
use coauthorship_network_analyzer::cluster::metrics;
use coauthorship_network_analyzer::cluster::stability::StabilityEvaluator;
use coauthorship_network_analyzer::config;
use coauthorship_network_analyzer::data::{edgelist, topics};
use coauthorship_network_analyzer::flow::FlowTracker;
use coauthorship_network_analyzer::graph::algorithms;
use coauthorship_network_analyzer::stats;
use coauthorship_network_analyzer::storage;

#[derive(Parser, Debug)]
#[clap(
    name = "coauthorship-network-analyzer",
    about = "Backbone extraction, community detection, stability scoring and flow tracking for co-authorship networks"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Number of worker threads (0 = use all available cores)
    #[clap(long, default_value = "0", global = true)]
    threads: usize,

    /// Verbose logging
    #[clap(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract disparity-filter backbones from weighted edge lists
    Backbone {
        /// Directory of per-window weighted edge lists
        #[clap(long)]
        input_dir: PathBuf,

        /// Directory receiving backbone edge lists
        #[clap(long)]
        output_dir: PathBuf,

        /// Disparity significance level
        #[clap(long, default_value_t = config::DEFAULT_ALPHA)]
        alpha: f64,

        /// Flat normalized-weight cutoff
        #[clap(long, default_value_t = config::DEFAULT_WEIGHT_CUTOFF)]
        weight_cutoff: f64,

        /// Input files carry no header row
        #[clap(long)]
        no_header: bool,
    },

    /// Structural statistics for each graph and its largest component
    Stats {
        #[clap(long)]
        input_dir: PathBuf,

        /// Statistics table for the full graphs
        #[clap(long)]
        stats_file: PathBuf,

        /// Statistics table for the largest connected components
        #[clap(long)]
        largest_cc_stats_file: PathBuf,

        #[clap(long)]
        no_header: bool,
    },

    /// Single seeded community-detection run per graph, for labeling
    Communities {
        #[clap(long)]
        input_dir: PathBuf,

        #[clap(long)]
        output_dir: PathBuf,

        /// Append-only table of partition-quality scores
        #[clap(long, default_value = "communities_statistics.csv")]
        stats_file: PathBuf,

        #[clap(long, default_value_t = config::DEFAULT_SEED)]
        seed: u64,

        #[clap(long)]
        no_header: bool,
    },

    /// Multi-run stability evaluation per graph
    Stability {
        #[clap(long)]
        input_dir: PathBuf,

        /// Directory receiving the per-graph multi-run partition files
        #[clap(long)]
        output_dir: PathBuf,

        /// Append-only stability statistics table
        #[clap(long)]
        stats_file: PathBuf,

        #[clap(long, default_value_t = config::DEFAULT_STABILITY_RUNS)]
        runs: usize,

        /// Drop communities below this size before comparison
        #[clap(long, default_value_t = config::DEFAULT_MIN_COMMUNITY_SIZE)]
        min_size: usize,

        #[clap(long, default_value_t = config::DEFAULT_SEED)]
        seed: u64,

        #[clap(long)]
        no_header: bool,
    },

    /// Track community migration across chronologically ordered partitions
    Flow {
        /// Directory of partition JSON files, sorted name = chronological order
        #[clap(long)]
        partitions_dir: PathBuf,

        /// Output JSON report
        #[clap(long)]
        report: PathBuf,

        /// Output CSV of per-window size quantiles
        #[clap(long)]
        quantile_table: PathBuf,

        #[clap(long, default_value_t = config::DEFAULT_FLOW_PERCENTILE)]
        percentile: f64,

        /// Comma-separated size quantiles to report
        #[clap(long, default_value = "25,50,60,70,80,90,95,99")]
        quantiles: String,

        /// Do not aggregate sink communities into a trailing bucket
        #[clap(long)]
        no_sink: bool,
    },

    /// Per-community topic distributions for one window
    Topics {
        /// Partition JSON for the window
        #[clap(long)]
        partition: PathBuf,

        /// Four-column edge list carrying work identifiers
        #[clap(long)]
        graph: PathBuf,

        /// Work metadata CSV with `;`-separated topic labels
        #[clap(long)]
        metadata: PathBuf,

        #[clap(long)]
        output: PathBuf,

        /// Restrict to communities at or above this size percentile
        #[clap(long)]
        percentile: Option<f64>,

        #[clap(long)]
        no_header: bool,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let num_threads = if args.threads > 0 {
        args.threads
    } else {
        num_cpus::get()
    };
    log::info!("Using {} worker threads", num_threads);
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;

    match args.command {
        Command::Backbone {
            input_dir,
            output_dir,
            alpha,
            weight_cutoff,
            no_header,
        } => run_backbone(&input_dir, &output_dir, alpha, weight_cutoff, !no_header),
        Command::Stats {
            input_dir,
            stats_file,
            largest_cc_stats_file,
            no_header,
        } => run_stats(&input_dir, &stats_file, &largest_cc_stats_file, !no_header),
        Command::Communities {
            input_dir,
            output_dir,
            stats_file,
            seed,
            no_header,
        } => run_communities(&input_dir, &output_dir, &stats_file, seed, !no_header),
        Command::Stability {
            input_dir,
            output_dir,
            stats_file,
            runs,
            min_size,
            seed,
            no_header,
        } => run_stability(
            &input_dir,
            &output_dir,
            &stats_file,
            runs,
            min_size,
            seed,
            !no_header,
        ),
        Command::Flow {
            partitions_dir,
            report,
            quantile_table,
            percentile,
            quantiles,
            no_sink,
        } => run_flow(
            &partitions_dir,
            &report,
            &quantile_table,
            percentile,
            &quantiles,
            !no_sink,
        ),
        Command::Topics {
            partition,
            graph,
            metadata,
            output,
            percentile,
            no_header,
        } => run_topics(&partition, &graph, &metadata, &output, percentile, !no_header),
    }
}

/// CSV files of a directory, sorted by name so yearly windows come out in
/// chronological order.
fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading input directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == "csv").unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading partitions directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Strip the stage prefixes a graph file accumulates along the pipeline.
fn dataset_name(stem: &str) -> String {
    stem.trim_start_matches("backbone_")
        .trim_start_matches("weighted_")
        .trim_end_matches("_multiple_communities")
        .trim_end_matches("_communities")
        .to_string()
}

fn run_backbone(
    input_dir: &Path,
    output_dir: &Path,
    alpha: f64,
    weight_cutoff: f64,
    has_header: bool,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    let files = csv_files(input_dir)?;
    log::info!("Extracting backbones for {} graphs", files.len());

    // Windows are independent units of work
    files.par_iter().try_for_each(|path| -> Result<()> {
        let output = output_dir.join(format!("backbone_{}.csv", file_stem(path)));
        backbone::extract_backbone_file(path, &output, alpha, weight_cutoff, has_header)
    })
}

fn run_stats(
    input_dir: &Path,
    stats_file: &Path,
    largest_cc_stats_file: &Path,
    has_header: bool,
) -> Result<()> {
    for path in csv_files(input_dir)? {
        let name = file_stem(&path);
        let full_done = stats::table_has_row(stats_file, &name)?;
        let cc_done = stats::table_has_row(largest_cc_stats_file, &name)?;
        if full_done && cc_done {
            log::info!("Statistics already computed for {}", name);
            continue;
        }

        let graph = edgelist::load_weighted_graph(&path, has_header)?;
        if !full_done {
            let row = stats::compute_structural_stats(&graph, &name);
            stats::append_stats_row(stats_file, &row)?;
        }
        if !cc_done {
            log::info!("Computing statistics for the largest connected component of {}", name);
            let largest = algorithms::largest_connected_component(&graph);
            let row = stats::compute_structural_stats(&largest, &name);
            stats::append_stats_row(largest_cc_stats_file, &row)?;
        }
    }
    Ok(())
}

fn run_communities(
    input_dir: &Path,
    output_dir: &Path,
    stats_file: &Path,
    seed: u64,
    has_header: bool,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    let detector = CommunityDetector::new();

    // Sequential: quality rows append to a shared table
    for path in csv_files(input_dir)? {
        let stem = file_stem(&path);
        let dataset = dataset_name(&stem);
        let output = output_dir.join(format!("{}_communities.json", stem));
        let row_done = stats::table_has_row(stats_file, &dataset)?;
        if output.exists() && row_done {
            log::info!("Communities already extracted for {}", path.display());
            continue;
        }

        let graph = edgelist::load_weighted_graph(&path, has_header)?;
        let partition = if output.exists() {
            storage::load_partition(&output)?
        } else {
            let partition = detector.detect(&graph, seed);
            log::info!("Found {} communities in {}", partition.len(), path.display());
            storage::save_partition(&output, &partition)?;
            partition
        };

        if !row_done {
            let quality = metrics::partition_quality(&graph, &partition);
            log::info!(
                "{}: modularity {:.4}, coverage {:.4}, performance {:.4}, conductance {:.4}",
                dataset,
                quality.modularity,
                quality.coverage,
                quality.performance,
                quality.mean_conductance
            );
            storage::append_quality_row(stats_file, &dataset, &quality)?;
        }
    }
    Ok(())
}

fn run_stability(
    input_dir: &Path,
    output_dir: &Path,
    stats_file: &Path,
    runs: usize,
    min_size: usize,
    seed: u64,
    has_header: bool,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;
    let evaluator = StabilityEvaluator::new(runs, min_size, seed);

    for path in csv_files(input_dir)? {
        let stem = file_stem(&path);
        let dataset = dataset_name(&stem);
        let partitions_out = output_dir.join(format!("{}_multiple_communities.json", stem));

        if stats_file.exists() && stats::table_has_row(stats_file, &dataset)? {
            log::info!("Stability already evaluated for {}", dataset);
            continue;
        }

        // Reuse previously persisted runs so an interrupted batch resumes
        // without re-detection
        let partitions = if partitions_out.exists() {
            log::info!("Loading existing runs for {}", dataset);
            storage::load_partition_runs(&partitions_out)?
        } else {
            let graph = edgelist::load_weighted_graph(&path, has_header)?;
            let partitions = evaluator.detect_runs(&graph);
            storage::save_partition_runs(&partitions_out, &partitions)?;
            partitions
        };

        let report = evaluator.evaluate(&partitions);
        match (report.mean_nmi(), report.mean_ami()) {
            (Some(mean_nmi), Some(mean_ami)) => {
                log::info!(
                    "{}: mean NMI {:.4}, mean AMI {:.4} over {} pairs",
                    dataset,
                    mean_nmi,
                    mean_ami,
                    report.nmi_values.len()
                );
                storage::append_stability_row(stats_file, &dataset, mean_nmi, mean_ami)?;
            }
            _ => log::warn!("No pairwise scores for {} ({} runs)", dataset, runs),
        }
    }
    Ok(())
}

fn run_flow(
    partitions_dir: &Path,
    report_path: &Path,
    quantile_table: &Path,
    percentile: f64,
    quantiles: &str,
    aggregate_sink: bool,
) -> Result<()> {
    let quantiles: Vec<f64> = quantiles
        .split(',')
        .map(|q| q.trim().parse::<f64>().with_context(|| format!("bad quantile {:?}", q)))
        .collect::<Result<_>>()?;

    let mut windows = Vec::new();
    for path in json_files(partitions_dir)? {
        let window = dataset_name(&file_stem(&path));
        let partition = storage::load_partition(&path)?;
        log::info!("{}: {} communities", window, partition.len());
        windows.push((window, partition));
    }
    if windows.is_empty() {
        log::warn!("No partition files found in {}", partitions_dir.display());
        return Ok(());
    }

    let tracker = FlowTracker::new(percentile, quantiles.clone(), aggregate_sink);
    let report = tracker.track(&windows);
    storage::save_quantile_table(quantile_table, &report, &quantiles)?;
    storage::save_flow_report(report_path, &report)
}

fn run_topics(
    partition_path: &Path,
    graph_path: &Path,
    metadata_path: &Path,
    output: &Path,
    percentile: Option<f64>,
    has_header: bool,
) -> Result<()> {
    let partition = storage::load_partition(partition_path)?;
    let communities = match percentile {
        Some(p) => FlowTracker::new(p, Vec::new(), false).flow_communities(&partition),
        None => partition.communities.clone(),
    };
    log::info!("Labeling {} communities with topics", communities.len());

    let pair_works = edgelist::load_pair_works(graph_path, has_header)?;
    let work_topics = topics::load_work_topics(metadata_path, has_header)?;
    let distributions =
        topics::community_topic_distributions(&communities, &pair_works, &work_topics);
    storage::save_topic_distributions(output, &distributions)
}
