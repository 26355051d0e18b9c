//! Developer memory graph engine.
//!
//! Mnemograph turns discrete development events — commits pulled from a code
//! host, decisions and insights declared by a user or agent — into a
//! persistent, weighted, typed graph of memories. New nodes are linked to
//! related existing nodes at creation time, importance fades as entries age,
//! and the graph is served back as filtered, clustered views and derived
//! insight strings.
//!
//! | Node kind | Typical origin |
//! |-----------|----------------|
//! | `code_event` | ingested commits |
//! | `decision` | repository creation, user-declared choices |
//! | `concept`, `task`, `mistake`, `insight` | manual or agent authored |
//!
//! # Architecture
//!
//! - **Storage**: SQLite via rusqlite, two tables (`memory_nodes`,
//!   `memory_edges`) with score-range and enum invariants enforced both at
//!   insert time and by CHECK constraints
//! - **Inference**: Jaccard word-overlap over title+summary plus temporal
//!   and same-repository rules, run synchronously on node creation
//! - **Decay**: single-shot multiplicative attenuation of aging nodes and
//!   edges, invoked at the end of each ingestion sync
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, and migrations
//! - [`graph`] — Core graph engine: store, inference, decay, query, patterns
//! - [`ingest`] — Commit-source boundary and the background sync adapter

pub mod config;
pub mod db;
pub mod graph;
pub mod ingest;
