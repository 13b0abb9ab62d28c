//! In-memory [`VectorIndex`] for tests and dry experiments.
//!
//! Records live in a `BTreeMap` per namespace behind a `std::sync::RwLock`.
//! Query is brute-force cosine similarity over every stored vector.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::embedding::cosine_similarity;
use crate::error::IngestError;
use crate::models::UpsertRecord;

use super::{MetadataFilter, QueryMatch, VectorIndex};

type Namespaces = BTreeMap<String, BTreeMap<String, UpsertRecord>>;

#[derive(Default)]
pub struct InMemoryIndex {
    namespaces: RwLock<Namespaces>,
    dimension: Option<usize>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// An index that reports `dimension` from [`VectorIndex::dimension`].
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            namespaces: RwLock::default(),
            dimension: Some(dimension),
        }
    }

    pub fn len(&self, namespace: &str) -> usize {
        self.read().get(namespace).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.read().values().all(BTreeMap::is_empty)
    }

    /// Record ids in `namespace`, sorted.
    pub fn ids(&self, namespace: &str) -> Vec<String> {
        self.read()
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, namespace: &str, id: &str) -> Option<UpsertRecord> {
        self.read().get(namespace).and_then(|ns| ns.get(id).cloned())
    }

    // A panic while holding the lock cannot leave a record half-written.
    fn read(&self) -> RwLockReadGuard<'_, Namespaces> {
        self.namespaces.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Namespaces> {
        self.namespaces.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn metadata_map(record: &UpsertRecord) -> Map<String, Value> {
    match serde_json::to_value(&record.metadata) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(&self, records: &[UpsertRecord], namespace: &str) -> Result<(), IngestError> {
        let mut namespaces = self.write();
        let ns = namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            ns.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>, IngestError> {
        let namespaces = self.read();
        let Some(ns) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let mut matches: Vec<QueryMatch> = ns
            .values()
            .map(|r| (r, metadata_map(r)))
            .filter(|(_, meta)| filter.map_or(true, |f| f.matches(meta)))
            .map(|(r, metadata)| QueryMatch {
                id: r.id.clone(),
                score: cosine_similarity(vector, &r.values),
                metadata,
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn dimension(&self) -> Result<Option<usize>, IngestError> {
        Ok(self.dimension)
    }
}
