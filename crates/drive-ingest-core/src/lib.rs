//! # drive-ingest core
//!
//! The chunking-and-incremental-sync engine behind `drive-ingest`:
//! token windowing, change detection, the manifest model, deterministic
//! upsert records, and the embedder / vector index traits the pipeline
//! talks to.
//!
//! This crate performs no network or filesystem I/O. Concrete sources,
//! embedders and index clients live in the `drive-ingest` app crate.

pub mod change;
pub mod embedding;
pub mod error;
pub mod fingerprint;
pub mod manifest;
pub mod models;
pub mod record;
pub mod store;
pub mod window;

pub use error::{IngestError, Service};
