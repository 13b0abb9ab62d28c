//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the only surface the pipeline and the
//! query command use to reach the index, enabling pluggable backends
//! (Pinecone over HTTP, in-memory for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::IngestError;
use crate::models::UpsertRecord;

/// A scored match returned by [`VectorIndex::query`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    pub metadata: Map<String, Value>,
}

impl QueryMatch {
    /// String metadata field, if present.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

/// Exact-match metadata filter (`key == value` for every pair).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataFilter {
    pub equals: BTreeMap<String, String>,
}

impl MetadataFilter {
    pub fn is_empty(&self) -> bool {
        self.equals.is_empty()
    }

    /// Whether `metadata` satisfies every condition.
    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        self.equals.iter().all(|(k, v)| match (metadata.get(k), typed_value(k, v)) {
            (Some(Value::String(s)), _) => s == v,
            (Some(Value::Number(n)), Value::Number(want)) => *n == want,
            (Some(other), _) => other.to_string() == *v,
            (None, _) => false,
        })
    }

    /// Filter in Pinecone's query syntax: `{"key": {"$eq": value}, ...}`.
    /// Values for the integer metadata fields are sent as JSON numbers.
    pub fn to_pinecone(&self) -> Value {
        let mut out = Map::new();
        for (k, v) in &self.equals {
            let mut cond = Map::new();
            cond.insert("$eq".to_string(), typed_value(k, v));
            out.insert(k.clone(), Value::Object(cond));
        }
        Value::Object(out)
    }
}

/// Record metadata fields stored as integers.
const NUMERIC_KEYS: &[&str] = &["start_token", "end_token"];

fn typed_value(key: &str, raw: &str) -> Value {
    if NUMERIC_KEYS.contains(&key) {
        if let Ok(n) = raw.parse::<u64>() {
            return Value::from(n);
        }
    }
    Value::String(raw.to_string())
}

/// Abstract vector index.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert or overwrite records by id |
/// | [`query`](VectorIndex::query) | Top-k nearest neighbours with metadata |
/// | [`dimension`](VectorIndex::dimension) | Vector length the index was created with, if known |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite records within `namespace`. Upserting the same
    /// id twice leaves exactly one record.
    async fn upsert(&self, records: &[UpsertRecord], namespace: &str) -> Result<(), IngestError>;

    /// Nearest neighbours of `vector`, best first.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>, IngestError>;

    async fn dimension(&self) -> Result<Option<usize>, IngestError> {
        Ok(None)
    }
}
