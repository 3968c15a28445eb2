//! Join community membership with per-work topic metadata
//!
//! Thin collaborator around the core: the pipeline only consumes the
//! precomputed topic labels attached to each work, no semantics involved.

use crate::Result;
use anyhow::Context;
use log;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Per-community topic histogram keyed by community index.
pub type TopicDistributions = BTreeMap<usize, BTreeMap<String, u64>>;

/// Stream the metadata CSV into a work-id -> topic-labels lookup.
///
/// Expected columns: `work_id, title, year, topics` with topics joined by
/// `;`. Rows without a topics column are skipped, they simply contribute no
/// labels.
pub fn load_work_topics(path: &Path, has_header: bool) -> Result<HashMap<String, Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening metadata file {}", path.display()))?;

    let mut topics = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let work_id = match record.get(0) {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => continue,
        };
        let labels: Vec<String> = record
            .get(3)
            .unwrap_or("")
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if !labels.is_empty() {
            topics.insert(work_id, labels);
        }
    }
    log::info!("Loaded topics for {} works from {}", topics.len(), path.display());
    Ok(topics)
}

/// Works whose author pair lies entirely inside the community.
pub fn works_for_community(
    community: &[String],
    pair_works: &HashMap<(String, String), String>,
) -> HashSet<String> {
    let mut works = HashSet::new();
    for (i, a) in community.iter().enumerate() {
        for b in &community[i + 1..] {
            let key = if a < b {
                (a.clone(), b.clone())
            } else {
                (b.clone(), a.clone())
            };
            if let Some(work) = pair_works.get(&key) {
                works.insert(work.clone());
            }
        }
    }
    works
}

/// Topic histogram for every community in the list.
pub fn community_topic_distributions(
    communities: &[Vec<String>],
    pair_works: &HashMap<(String, String), String>,
    work_topics: &HashMap<String, Vec<String>>,
) -> TopicDistributions {
    let mut distributions = TopicDistributions::new();
    for (community_id, community) in communities.iter().enumerate() {
        let mut counts: BTreeMap<String, u64> = BTreeMap::new();
        for work in works_for_community(community, pair_works) {
            if let Some(labels) = work_topics.get(&work) {
                for label in labels {
                    *counts.entry(label.clone()).or_insert(0) += 1;
                }
            }
        }
        distributions.insert(community_id, counts);
    }
    distributions
}
