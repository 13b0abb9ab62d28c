//! Error taxonomy shared by every stage of the pipeline.
//!
//! Only [`IngestError::Configuration`] and [`IngestError::Manifest`] are
//! fatal for a run. Everything else is scoped to a single file: the
//! orchestrator logs it, counts the file as failed, and moves on.

use std::fmt;

use thiserror::Error;

/// The external service an I/O failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Listing,
    Fetch,
    Embedding,
    Upsert,
    Query,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Service::Listing => "listing",
            Service::Fetch => "fetch",
            Service::Embedding => "embedding",
            Service::Upsert => "upsert",
            Service::Query => "query",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing or invalid configuration. Aborts the run before any file is touched.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A single external call failed (network, rate limit, timeout, bad status).
    #[error("{service} call failed: {message}")]
    TransientService { service: Service, message: String },

    /// Text could not be obtained from a file's bytes.
    #[error("could not extract text from '{file}': {reason}")]
    Extraction { file: String, reason: String },

    /// The embedding service returned vectors of an unexpected length.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The manifest could not be read or written.
    #[error("manifest error: {0}")]
    Manifest(String),
}

impl IngestError {
    pub fn config(message: impl Into<String>) -> Self {
        IngestError::Configuration(message.into())
    }

    pub fn transient(service: Service, message: impl fmt::Display) -> Self {
        IngestError::TransientService {
            service,
            message: message.to_string(),
        }
    }

    pub fn extraction(file: impl Into<String>, reason: impl fmt::Display) -> Self {
        IngestError::Extraction {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IngestError::Configuration(_) | IngestError::Manifest(_)
        )
    }
}
