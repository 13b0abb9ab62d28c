//! # drive-ingest
//!
//! Incremental document ingestion from Google Drive (or a local folder)
//! into a Pinecone vector index.
//!
//! Files are listed recursively, compared against a durable manifest of
//! fingerprints, and only new or modified files are fetched, converted to
//! text, windowed into overlapping token chunks, embedded, and upserted.
//! Record ids derive from the file id and chunk offsets, so re-ingesting a
//! file overwrites its previous vectors.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ FileSource  │──▶│ Change       │──▶│ Window+Embed │──▶│ Pinecone │
//! │ Drive / FS  │   │ (manifest)   │   │ (batched)    │   │ upsert   │
//! └─────────────┘   └──────────────┘   └──────────────┘   └──────────┘
//!                          ▲                                    │
//!                          └──────── record per file ◀──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ingest check                       # verify secrets, source, index
//! ingest run --dry-run               # list, classify and window only
//! ingest run                         # incremental ingest
//! ingest run --full                  # reprocess everything
//! ingest query "fall protection" --top-k 5
//! ingest status
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration, env overrides, validation |
//! | [`traits`] | [`FileSource`](traits::FileSource) trait |
//! | [`connector_drive`] | Google Drive source |
//! | [`connector_fs`] | Local folder source |
//! | [`extract`] | PDF / OOXML / CSV / legacy text extraction |
//! | [`embedding`] | OpenAI and Ollama embedders |
//! | [`index_pinecone`] | Pinecone vector index client |
//! | [`http`] | Shared HTTP retry/backoff |
//! | [`manifest_store`] | JSON manifest persistence |
//! | [`ingest`] | Pipeline orchestrator |
//! | [`query`] | Semantic query and chat context |
//! | [`status`] | Manifest and index summary |
//! | [`check`] | Configuration health check |
//! | [`progress`] | Progress reporting on stderr |
//! | [`logging`] | `tracing` subscriber setup |
//!
//! Pure logic (windowing, fingerprints, change detection, record building)
//! lives in the `drive-ingest-core` crate.

pub mod check;
pub mod config;
pub mod connector_drive;
pub mod connector_fs;
pub mod embedding;
pub mod extract;
pub mod http;
pub mod index_pinecone;
pub mod ingest;
pub mod logging;
pub mod manifest_store;
pub mod progress;
pub mod query;
pub mod status;
pub mod traits;
