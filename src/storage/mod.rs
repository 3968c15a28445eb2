//! Results persistence module
//!
//! Partitions are stored as JSON arrays of node-identifier arrays so any
//! tooling can consume them; reports use the same plain-JSON approach.

use crate::cluster::metrics::PartitionQuality;
use crate::cluster::{MultiRunPartitionSet, Partition};
use crate::data::topics::TopicDistributions;
use crate::flow::FlowReport;
use crate::Result;
use anyhow::Context;
use log;
use serde_json::{json, to_string_pretty};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub fn save_partition(path: &Path, partition: &Partition) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("creating partition file {}", path.display()))?;
    file.write_all(to_string_pretty(partition)?.as_bytes())?;
    log::info!(
        "Saved {} communities to {}",
        partition.len(),
        path.display()
    );
    Ok(())
}

/// One partition per run, in run order.
pub fn save_partition_runs(path: &Path, runs: &MultiRunPartitionSet) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("creating partition file {}", path.display()))?;
    file.write_all(to_string_pretty(runs)?.as_bytes())?;
    log::info!("Saved {} partition runs to {}", runs.len(), path.display());
    Ok(())
}

pub fn load_partition_runs(path: &Path) -> Result<MultiRunPartitionSet> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading partition file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("parsing multi-run partition file {}", path.display()))
}

/// Load a partition, accepting either a single partition or a multi-run
/// file, in which case the first run is the labeling partition.
pub fn load_partition(path: &Path) -> Result<Partition> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading partition file {}", path.display()))?;
    if let Ok(partition) = serde_json::from_str::<Partition>(&text) {
        return Ok(partition);
    }
    let runs: MultiRunPartitionSet = serde_json::from_str(&text)
        .with_context(|| format!("parsing partition file {}", path.display()))?;
    runs.into_iter()
        .next()
        .ok_or_else(|| crate::anyhow!("no partitions in {}", path.display()))
}

/// Migration matrices plus lost-node percentages and per-window summaries.
pub fn save_flow_report(path: &Path, report: &FlowReport) -> Result<()> {
    let windows: Vec<_> = report
        .summaries
        .iter()
        .map(|s| {
            json!({
                "window": s.window,
                "community_count": s.community_count,
                "large_count": s.large_count,
                "quantile_sizes": s.quantile_sizes,
            })
        })
        .collect();

    let transitions: Vec<_> = report
        .transitions
        .iter()
        .map(|t| {
            let rows: Vec<Vec<f64>> = t.matrix.rows().into_iter().map(|r| r.to_vec()).collect();
            json!({
                "from": t.from,
                "to": t.to,
                "matrix": rows,
                "lost_pct_filtered": t.lost_pct_filtered,
                "lost_pct_global": t.lost_pct_global,
            })
        })
        .collect();

    let mut file = File::create(path)
        .with_context(|| format!("creating flow report {}", path.display()))?;
    file.write_all(
        to_string_pretty(&json!({
            "windows": windows,
            "transitions": transitions,
        }))?
        .as_bytes(),
    )?;
    log::info!("Saved flow report to {}", path.display());
    Ok(())
}

/// Community-size quantile table, one row per window.
pub fn save_quantile_table(path: &Path, report: &FlowReport, quantiles: &[f64]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating quantile table {}", path.display()))?;
    let mut header = vec!["window".to_string()];
    header.extend(quantiles.iter().map(|q| q.to_string()));
    writer.write_record(&header)?;
    for summary in &report.summaries {
        let mut row = vec![summary.window.clone()];
        row.extend(summary.quantile_sizes.iter().map(|v| v.to_string()));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Append one dataset's stability means, creating the table with a header
/// only on first use.
pub fn append_stability_row(
    path: &Path,
    dataset: &str,
    mean_nmi: f64,
    mean_ami: f64,
) -> Result<()> {
    let write_header = !path.exists();
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening stability table {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    if write_header {
        writer.write_record(["dataset", "nmi", "adjusted_nmi"])?;
    }
    writer.write_record([dataset, &mean_nmi.to_string(), &mean_ami.to_string()])?;
    writer.flush()?;
    Ok(())
}

/// Append one dataset's partition-quality scores, creating the table with a
/// header only on first use.
pub fn append_quality_row(path: &Path, dataset: &str, quality: &PartitionQuality) -> Result<()> {
    let write_header = !path.exists();
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening community statistics table {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    if write_header {
        writer.write_record(["dataset", "modularity", "coverage", "performance", "conductance"])?;
    }
    writer.write_record([
        dataset,
        &quality.modularity.to_string(),
        &quality.coverage.to_string(),
        &quality.performance.to_string(),
        &quality.mean_conductance.to_string(),
    ])?;
    writer.flush()?;
    Ok(())
}

pub fn save_topic_distributions(path: &Path, distributions: &TopicDistributions) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("creating topic distribution file {}", path.display()))?;
    file.write_all(to_string_pretty(distributions)?.as_bytes())?;
    log::info!(
        "Saved topic distributions for {} communities to {}",
        distributions.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowTracker;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("{}_{}", std::process::id(), name))
    }

    fn partition(groups: &[&[&str]]) -> Partition {
        Partition::new(
            groups
                .iter()
                .map(|g| g.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn partition_round_trip() {
        let path = temp_path("partition.json");
        let p = partition(&[&["a", "b"], &["c"]]);
        save_partition(&path, &p).unwrap();
        assert_eq!(load_partition(&path).unwrap(), p);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn multi_run_file_yields_first_run() {
        let path = temp_path("runs.json");
        let runs = vec![partition(&[&["a", "b"]]), partition(&[&["a"], &["b"]])];
        save_partition_runs(&path, &runs).unwrap();
        assert_eq!(load_partition(&path).unwrap(), runs[0]);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn stability_table_appends_after_header() {
        let path = temp_path("stability.csv");
        let _ = std::fs::remove_file(&path);
        append_stability_row(&path, "2010", 0.9, 0.85).unwrap();
        append_stability_row(&path, "2011", 0.8, 0.75).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("dataset,nmi,adjusted_nmi"));
        assert_eq!(text.lines().count(), 3);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn quality_table_appends_after_header() {
        let path = temp_path("communities_stats.csv");
        let _ = std::fs::remove_file(&path);
        let quality = PartitionQuality {
            modularity: 0.5,
            coverage: 1.0,
            performance: 1.0,
            mean_conductance: 0.25,
        };
        append_quality_row(&path, "2010", &quality).unwrap();
        append_quality_row(&path, "2011", &quality).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("dataset,modularity,coverage,performance,conductance"));
        assert_eq!(text.lines().count(), 3);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn flow_report_serializes_matrix_rows() {
        let path = temp_path("flow.json");
        let tracker = FlowTracker::new(0.0, vec![50.0], false);
        let windows = vec![
            ("w1".to_string(), partition(&[&["a", "b"]])),
            ("w2".to_string(), partition(&[&["a", "b"]])),
        ];
        let report = tracker.track(&windows);
        save_flow_report(&path, &report).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["transitions"][0]["matrix"][0][0], 1.0);
        assert_eq!(value["windows"][0]["window"], "w1");
        std::fs::remove_file(path).unwrap();
    }
}
