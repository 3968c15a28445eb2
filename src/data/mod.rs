//! Input parsing and metadata joins

pub mod edgelist;
pub mod topics;
