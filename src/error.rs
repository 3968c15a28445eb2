//! Error types for parsing and pipeline failures

use thiserror::Error;

/// Errors raised while building graphs or joining metadata.
///
/// Parse failures are fatal for the graph being built: a partially loaded
/// edge list would silently corrupt every downstream statistic.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("malformed edge record at line {line}: {reason}")]
    MalformedEdge { line: u64, reason: String },

    #[error("edge record at line {line} has {found} columns, expected at least {expected}")]
    ColumnCount {
        line: u64,
        found: usize,
        expected: usize,
    },

    #[error("non-numeric edge weight {value:?} at line {line}")]
    BadWeight { line: u64, value: String },
}
