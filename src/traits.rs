//! The file-source seam of the pipeline.
//!
//! A [`FileSource`] discovers ingestible files and turns a discovered file
//! into plain text. The pipeline never knows whether it is talking to Google
//! Drive, a local folder, or a test double.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │          FileSource          │
//! │  ┌─────────┐  ┌────────────┐ │
//! │  │  Drive  │  │ Filesystem │ │
//! │  └─────────┘  └────────────┘ │
//! └──────────────┬───────────────┘
//!                ▼
//!        Pipeline::run() → embed → upsert
//! ```
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use drive_ingest::traits::FileSource;
//! use drive_ingest_core::models::SourceFile;
//! use drive_ingest_core::IngestError;
//!
//! pub struct Empty;
//!
//! #[async_trait]
//! impl FileSource for Empty {
//!     fn name(&self) -> &str { "empty" }
//!
//!     async fn list_files(&self) -> Result<Vec<SourceFile>, IngestError> {
//!         Ok(vec![])
//!     }
//!
//!     async fn fetch_text(&self, file: &SourceFile) -> Result<String, IngestError> {
//!         Err(IngestError::extraction(&file.name, "nothing here"))
//!     }
//! }
//! ```

use async_trait::async_trait;

use drive_ingest_core::models::SourceFile;
use drive_ingest_core::IngestError;

#[async_trait]
pub trait FileSource: Send + Sync {
    /// Short label used in logs and progress output (e.g. `"drive"`).
    fn name(&self) -> &str;

    /// Recursively list every supported file under the configured root.
    ///
    /// Files of unsupported or excluded types are already filtered out.
    /// A failure here aborts the run.
    async fn list_files(&self) -> Result<Vec<SourceFile>, IngestError>;

    /// Download or export `file` and extract its text.
    ///
    /// May return an empty string; the caller treats that as a skip.
    async fn fetch_text(&self, file: &SourceFile) -> Result<String, IngestError>;
}
