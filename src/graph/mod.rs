//! Graph representation and algorithms module

pub mod weighted;
pub mod algorithms;

pub use weighted::WeightedGraph;
