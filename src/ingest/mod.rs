//! Ingestion: turning external repository activity into memories.

pub mod source;
pub mod sync;
