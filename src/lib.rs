//! Core library functions for the co-authorship network analyzer

pub mod config;
pub mod error;
pub mod data;
pub mod graph;
pub mod backbone;
pub mod cluster;
pub mod flow;
pub mod stats;
pub mod storage;

pub use anyhow::{Result, anyhow};
