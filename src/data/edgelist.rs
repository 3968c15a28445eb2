//! Streaming edge-list parsing
//!
//! Rows are `source,target,weight[,work_id]`. Records stream straight into
//! the graph so peak memory stays bounded on networks with millions of
//! edges; no intermediate table is materialized.

use crate::error::AnalysisError;
use crate::graph::WeightedGraph;
use crate::Result;
use anyhow::Context;
use log;
use std::collections::HashMap;
use std::path::Path;

fn record_line(record: &csv::StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_weight(record: &csv::StringRecord, field: usize) -> Result<f64> {
    let raw = record.get(field).unwrap_or("").trim();
    raw.parse::<f64>().map_err(|_| {
        AnalysisError::BadWeight {
            line: record_line(record),
            value: raw.to_string(),
        }
        .into()
    })
}

fn check_columns(record: &csv::StringRecord, expected: usize) -> Result<()> {
    if record.len() < expected {
        return Err(AnalysisError::ColumnCount {
            line: record_line(record),
            found: record.len(),
            expected,
        }
        .into());
    }
    Ok(())
}

/// Build a [`WeightedGraph`] from a CSV edge list.
///
/// Parse failures are fatal for the graph: a partially built network would
/// silently corrupt every downstream statistic.
pub fn load_weighted_graph(path: &Path, has_header: bool) -> Result<WeightedGraph> {
    log::info!("Loading edge list: {}", path.display());
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening edge list {}", path.display()))?;

    let mut graph = WeightedGraph::new();
    for record in reader.records() {
        let record = record?;
        check_columns(&record, 3)?;
        let source = record.get(0).unwrap_or("").trim();
        let target = record.get(1).unwrap_or("").trim();
        if source.is_empty() || target.is_empty() {
            return Err(AnalysisError::MalformedEdge {
                line: record_line(&record),
                reason: "empty node identifier".to_string(),
            }
            .into());
        }
        let weight = parse_weight(&record, 2)?;
        graph.add_edge(source, target, weight);
    }

    log::info!(
        "Graph has {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

/// Write a graph back out as `source,target,weight` with a header row. The
/// input file is never mutated; backbones always land in a new file.
pub fn write_edge_list(path: &Path, graph: &WeightedGraph) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating edge list {}", path.display()))?;
    writer.write_record(["source", "target", "weight"])?;
    for (u, v, w) in graph.edges() {
        writer.write_record([graph.node_id(u), graph.node_id(v), &w.to_string()])?;
    }
    writer.flush()?;
    log::info!("Wrote {} edges to {}", graph.edge_count(), path.display());
    Ok(())
}

/// Author-pair to work-identifier lookup from a four-column edge list.
///
/// The pair key is order-normalized so either author order in the input
/// resolves to the same work.
pub fn load_pair_works(path: &Path, has_header: bool) -> Result<HashMap<(String, String), String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening edge list {}", path.display()))?;

    let mut works = HashMap::new();
    for record in reader.records() {
        let record = record?;
        check_columns(&record, 4)?;
        let source = record.get(0).unwrap_or("").trim();
        let target = record.get(1).unwrap_or("").trim();
        let work_id = record.get(3).unwrap_or("").trim();
        let key = if source < target {
            (source.to_string(), target.to_string())
        } else {
            (target.to_string(), source.to_string())
        };
        works.insert(key, work_id.to_string());
    }
    Ok(works)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}_{}", std::process::id(), name));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_headered_edge_list() {
        let path = write_temp("edges.csv", "source,target,weight\na,b,2\nb,c,3\na,b,1\n");
        let g = load_weighted_graph(&path, true).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
        let (a, b) = (g.index("a").unwrap(), g.index("b").unwrap());
        assert_eq!(g.edge_weight(a, b), Some(3.0));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn headerless_mode_keeps_first_row() {
        let path = write_temp("noheader.csv", "a,b,1\n");
        let g = load_weighted_graph(&path, false).unwrap();
        assert_eq!(g.edge_count(), 1);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn non_numeric_weight_is_fatal() {
        let path = write_temp("badweight.csv", "a,b,heavy\n");
        let err = load_weighted_graph(&path, false).unwrap_err();
        assert!(err.to_string().contains("heavy"));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn short_row_is_fatal() {
        let path = write_temp("short.csv", "a,b,1\nc,d\n");
        assert!(load_weighted_graph(&path, false).is_err());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn round_trip_preserves_edges() {
        let mut g = WeightedGraph::new();
        g.add_edge("a", "b", 10.0);
        g.add_edge("b", "c", 1.0);
        let path = std::env::temp_dir().join(format!("{}_roundtrip.csv", std::process::id()));
        write_edge_list(&path, &g).unwrap();
        let back = load_weighted_graph(&path, true).unwrap();
        assert_eq!(back.edge_count(), 2);
        let (a, b) = (back.index("a").unwrap(), back.index("b").unwrap());
        assert_eq!(back.edge_weight(a, b), Some(10.0));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn pair_works_normalizes_author_order() {
        let path = write_temp("works.csv", "source,target,weight,work\nb,a,1,W1\nc,d,1,W2\n");
        let works = load_pair_works(&path, true).unwrap();
        assert_eq!(works[&("a".to_string(), "b".to_string())], "W1");
        assert_eq!(works[&("c".to_string(), "d".to_string())], "W2");
        std::fs::remove_file(path).unwrap();
    }
}
