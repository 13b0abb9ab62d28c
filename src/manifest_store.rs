//! Durable manifest storage.
//!
//! [`JsonFileManifestStore`] keeps the manifest as a pretty-printed JSON
//! file. A missing file is an empty manifest; an unreadable or corrupt one
//! is an error so a bad file is never silently replaced. Saves write a
//! sibling `*.tmp` file and rename it over the target.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use drive_ingest_core::manifest::Manifest;
use drive_ingest_core::IngestError;

#[async_trait]
pub trait ManifestStore: Send + Sync {
    async fn load(&self) -> Result<Manifest, IngestError>;
    async fn save(&self, manifest: &Manifest) -> Result<(), IngestError>;
}

pub struct JsonFileManifestStore {
    path: PathBuf,
}

impl JsonFileManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn manifest_err(action: &str, path: &Path, e: impl std::fmt::Display) -> IngestError {
    IngestError::Manifest(format!("failed to {} {}: {}", action, path.display(), e))
}

#[async_trait]
impl ManifestStore for JsonFileManifestStore {
    async fn load(&self) -> Result<Manifest, IngestError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Manifest::new()),
            Err(e) => return Err(manifest_err("read", &self.path, e)),
        };
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| manifest_err("parse", &self.path, e))?;
        Manifest::from_json(value)
    }

    async fn save(&self, manifest: &Manifest) -> Result<(), IngestError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| manifest_err("create directory for", &self.path, e))?;
        }
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| manifest_err("serialize", &self.path, e))?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| manifest_err("write", &tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| manifest_err("replace", &self.path, e))?;
        Ok(())
    }
}
