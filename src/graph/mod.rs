//! The memory graph: typed nodes and weighted edges over SQLite.

pub mod decay;
pub mod infer;
pub mod patterns;
pub mod query;
pub mod service;
pub mod stats;
pub mod store;
pub mod types;
