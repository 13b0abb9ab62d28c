//! Persistent record of what has been ingested.
//!
//! The manifest maps source file ids to the fingerprint and chunk count of
//! the revision last ingested. It is what makes re-runs incremental: a file
//! whose current fingerprint matches its entry is skipped entirely.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "processed_files": {
//!     "1AbC": { "name": "Fall Protection.pdf", "hash": "9f2c...", "chunks": 4,
//!               "processed_at": "2024-05-01T10:00:00+00:00" }
//!   },
//!   "last_run": "2024-05-01T10:00:03+00:00",
//!   "total_files": 1,
//!   "total_chunks": 4
//! }
//! ```
//!
//! Older manifests were a flat `{ file_id: { name, modifiedTime, processedAt } }`
//! map. [`Manifest::from_json`] accepts both; legacy entries carry no
//! fingerprint and are therefore reprocessed once. Legacy values without a
//! `name` are ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::IngestError;
use crate::fingerprint::Fingerprint;

/// Top-level keys that only appear in the current layout.
const CURRENT_KEYS: [&str; 4] = ["processed_files", "last_run", "total_files", "total_chunks"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "hash", default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    #[serde(rename = "chunks", default)]
    pub chunk_count: usize,
    #[serde(alias = "processedAt", default)]
    pub processed_at: String,
    #[serde(alias = "modifiedTime", default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub processed_files: BTreeMap<String, ManifestEntry>,
    #[serde(default)]
    pub last_run: Option<String>,
    #[serde(default)]
    pub total_files: usize,
    #[serde(default)]
    pub total_chunks: usize,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a manifest document, migrating the legacy flat layout.
    pub fn from_json(value: Value) -> Result<Self, IngestError> {
        let Value::Object(map) = value else {
            return Err(IngestError::Manifest(
                "manifest root must be a JSON object".to_string(),
            ));
        };

        let current = CURRENT_KEYS.iter().any(|k| map.contains_key(*k));
        if map.is_empty() || current {
            return serde_json::from_value(Value::Object(map))
                .map_err(|e| IngestError::Manifest(format!("invalid manifest: {}", e)));
        }

        let mut manifest = Manifest::new();
        for (id, raw) in map {
            if raw.get("name").is_none() {
                continue;
            }
            let entry: ManifestEntry = serde_json::from_value(raw).map_err(|e| {
                IngestError::Manifest(format!("invalid legacy entry '{}': {}", id, e))
            })?;
            manifest.processed_files.insert(id, entry);
        }
        manifest.total_files = manifest.processed_files.len();
        manifest.total_chunks = manifest.chunk_sum();
        Ok(manifest)
    }

    pub fn get(&self, file_id: &str) -> Option<&ManifestEntry> {
        self.processed_files.get(file_id)
    }

    /// Insert or replace the entry for `file_id`.
    pub fn record(&mut self, file_id: impl Into<String>, entry: ManifestEntry) {
        self.processed_files.insert(file_id.into(), entry);
    }

    /// Recompute `total_files` and `total_chunks` from the entries.
    ///
    /// `total_chunks` is the sum over all entries, so it stays meaningful
    /// across incremental runs that only touch a few files.
    pub fn refresh_totals(&mut self) {
        self.total_files = self.processed_files.len();
        self.total_chunks = self.chunk_sum();
    }

    /// Refresh the totals and stamp the completed run.
    pub fn finalize_run(&mut self, now: &str) {
        self.refresh_totals();
        self.last_run = Some(now.to_string());
    }

    pub fn len(&self) -> usize {
        self.processed_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed_files.is_empty()
    }

    fn chunk_sum(&self) -> usize {
        self.processed_files.values().map(|e| e.chunk_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(name: &str, hash: &str, chunks: usize) -> ManifestEntry {
        ManifestEntry {
            name: name.to_string(),
            fingerprint: Some(Fingerprint::from(hash.to_string())),
            chunk_count: chunks,
            processed_at: "2024-05-01T10:00:00+00:00".to_string(),
            modified_at: None,
        }
    }

    #[test]
    fn test_current_shape_roundtrip() {
        let mut m = Manifest::new();
        m.record("a", entry("a.pdf", "h1", 3));
        m.finalize_run("2024-05-01T10:00:03+00:00");

        let value = serde_json::to_value(&m).unwrap();
        assert_eq!(value["processed_files"]["a"]["hash"], "h1");
        assert_eq!(value["processed_files"]["a"]["chunks"], 3);
        assert!(value["processed_files"]["a"].get("modified_at").is_none());

        let back = Manifest::from_json(value).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn test_legacy_flat_map_migrates() {
        let legacy = json!({
            "1AbC": {
                "name": "Ladder Safety.docx",
                "modifiedTime": "2023-11-02T09:00:00.000Z",
                "processedAt": "2023-11-03T12:00:00"
            }
        });
        let m = Manifest::from_json(legacy).unwrap();
        let e = m.get("1AbC").unwrap();
        assert_eq!(e.name, "Ladder Safety.docx");
        assert_eq!(e.fingerprint, None);
        assert_eq!(e.chunk_count, 0);
        assert_eq!(e.modified_at.as_deref(), Some("2023-11-02T09:00:00.000Z"));
        assert_eq!(e.processed_at, "2023-11-03T12:00:00");
        assert_eq!(m.total_files, 1);
    }

    #[test]
    fn test_empty_object_is_empty_manifest() {
        let m = Manifest::from_json(json!({})).unwrap();
        assert!(m.is_empty());
        assert_eq!(m.last_run, None);
    }

    #[test]
    fn test_non_object_is_manifest_error() {
        let err = Manifest::from_json(json!([1, 2])).unwrap_err();
        assert!(matches!(err, IngestError::Manifest(_)));
        assert!(Manifest::from_json(json!({"processed_files": 5})).is_err());
        assert!(Manifest::from_json(json!({"a": {"name": 3}})).is_err());
    }

    #[test]
    fn test_legacy_ignores_values_without_name() {
        let m = Manifest::from_json(json!({"x": 5, "y": {"other": 1}})).unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn test_totals_sum_all_entries() {
        let mut m = Manifest::new();
        m.record("a", entry("a", "h1", 3));
        m.record("b", entry("b", "h2", 4));
        m.finalize_run("t1");
        m.record("a", entry("a", "h3", 5));
        m.finalize_run("t2");
        assert_eq!(m.total_files, 2);
        assert_eq!(m.total_chunks, 9);
        assert_eq!(m.last_run.as_deref(), Some("t2"));
    }

    #[test]
    fn test_refresh_totals_keeps_last_run() {
        let mut m = Manifest::new();
        m.record("a", entry("a", "h1", 3));
        m.finalize_run("t1");
        m.record("b", entry("b", "h2", 4));
        m.refresh_totals();
        assert_eq!(m.total_files, 2);
        assert_eq!(m.total_chunks, 7);
        assert_eq!(m.last_run.as_deref(), Some("t1"));
    }
}
