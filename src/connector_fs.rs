//! Local filesystem connector.
//!
//! Treats a directory tree like a Drive folder: file ids are paths relative
//! to the root, `modified_at` is the file's mtime in RFC 3339, and the type
//! comes from the extension. Useful for dry runs and for ingesting exports.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use drive_ingest_core::models::{ContentType, SourceFile};
use drive_ingest_core::{IngestError, Service};

use crate::config::SourceConfig;
use crate::extract::{self, LegacyConverters};
use crate::traits::FileSource;

pub struct FilesystemSource {
    root: PathBuf,
    include_types: Vec<ContentType>,
    exclude: GlobSet,
    converters: Option<LegacyConverters>,
}

impl FilesystemSource {
    pub fn new(config: &SourceConfig) -> Result<Self, IngestError> {
        let root = config
            .root
            .clone()
            .ok_or_else(|| IngestError::config("source.root is required for filesystem"))?;

        let mut excludes = vec!["**/.git/**".to_string()];
        excludes.extend(config.exclude_globs.iter().cloned());

        Ok(Self {
            root,
            include_types: config.include_types.clone(),
            exclude: build_globset(&excludes)?,
            converters: None,
        })
    }

    pub fn with_legacy_converters(mut self, converters: Option<LegacyConverters>) -> Self {
        self.converters = converters;
        self
    }

    fn scan(&self) -> anyhow::Result<Vec<SourceFile>> {
        if !self.root.is_dir() {
            anyhow::bail!("filesystem root does not exist: {}", self.root.display());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            let rel_str = relative.to_string_lossy().replace('\\', "/");

            if self.exclude.is_match(&rel_str) {
                continue;
            }
            let Some(content_type) = path
                .extension()
                .and_then(|e| e.to_str())
                .and_then(ContentType::from_extension)
            else {
                continue;
            };
            if !self.include_types.contains(&content_type) {
                continue;
            }

            files.push(to_source_file(path, &rel_str, content_type)?);
        }

        // Sort for deterministic ordering
        files.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(files)
    }
}

fn to_source_file(path: &Path, relative: &str, content_type: ContentType) -> anyhow::Result<SourceFile> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;
    let modified_at = metadata.modified().ok().map(|t| {
        DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Millis, true)
    });

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let folder_path = Path::new(relative)
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();

    Ok(SourceFile {
        id: relative.to_string(),
        name,
        content_type,
        modified_at,
        size_bytes: Some(metadata.len()),
        folder_path,
    })
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet, IngestError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| IngestError::config(format!("invalid glob '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| IngestError::config(format!("invalid glob set: {}", e)))
}

#[async_trait]
impl FileSource for FilesystemSource {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn list_files(&self) -> Result<Vec<SourceFile>, IngestError> {
        self.scan()
            .map_err(|e| IngestError::transient(Service::Listing, format!("{:#}", e)))
    }

    async fn fetch_text(&self, file: &SourceFile) -> Result<String, IngestError> {
        let path = self.root.join(&file.id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| IngestError::transient(Service::Fetch, format!("{}: {}", path.display(), e)))?;
        extract::extract_file(bytes, file, self.converters.as_ref()).await
    }
}
