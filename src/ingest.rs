//! Ingestion pipeline orchestration.
//!
//! Coordinates the full run: list → classify against the manifest →
//! fetch/extract → window → embed → upsert → record. Re-runs are
//! incremental: files whose fingerprint matches their manifest entry are
//! never fetched.
//!
//! # Run lifecycle
//!
//! ```text
//! INIT ──▶ LIST_FILES ──▶ FILTER_CHANGED ──▶ [PROCESS_FILE]* ──▶ PERSIST_MANIFEST ──▶ DONE
//!                                                  │
//!               FETCH ─▶ WINDOW ─▶ EMBED (batched) ─▶ UPSERT (batched) ─▶ RECORD
//! ```
//!
//! Per-file failures are isolated: the file is counted as failed, its
//! manifest entry is left as it was, and the next run retries it. Only
//! configuration problems, a failed listing, and manifest I/O abort a run.
//!
//! With `pipeline.file_concurrency > 1` several files are in flight at once,
//! but batches within a file stay sequential and only the driver loop
//! touches the manifest.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use drive_ingest_core::change::{classify, ChangeKind};
use drive_ingest_core::embedding::{validate_batch, Embedder};
use drive_ingest_core::fingerprint;
use drive_ingest_core::manifest::ManifestEntry;
use drive_ingest_core::models::{Chunk, SourceFile, UpsertRecord};
use drive_ingest_core::record;
use drive_ingest_core::store::VectorIndex;
use drive_ingest_core::window::Chunker;
use drive_ingest_core::IngestError;

use crate::config::{Config, SourceKind};
use crate::connector_drive::{DriveAuth, DriveSource};
use crate::connector_fs::FilesystemSource;
use crate::embedding::create_embedder;
use crate::extract::LegacyConverters;
use crate::index_pinecone::PineconeIndex;
use crate::manifest_store::{JsonFileManifestStore, ManifestStore};
use crate::progress::{NoProgress, ProgressEvent, ProgressMode, ProgressReporter};
use crate::traits::FileSource;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Process every listed file, ignoring the manifest.
    pub full: bool,
    /// Fetch and window only; no embedding, no upserts, manifest untouched.
    pub dry_run: bool,
    /// Process at most this many changed files.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub file_concurrency: usize,
    pub max_file_bytes: u64,
    pub save_each_file: bool,
    /// Chunks embedded and upserted per round trip.
    pub batch_size: usize,
    pub namespace: String,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            file_concurrency: config.pipeline.file_concurrency.max(1),
            max_file_bytes: config.pipeline.max_file_bytes,
            save_each_file: config.manifest.save_each_file,
            batch_size: config.embedding.batch_size.max(1),
            namespace: config.index.namespace.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    TooLarge { size: u64, limit: u64 },
    EmptyText,
    NoChunks,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TooLarge { size, limit } => {
                write!(f, "file too large ({} bytes, limit {})", size, limit)
            }
            SkipReason::EmptyText => f.write_str("no text extracted"),
            SkipReason::NoChunks => f.write_str("no chunks produced"),
        }
    }
}

/// Result of processing one changed file.
#[derive(Debug)]
pub enum FileOutcome {
    Processed { chunks: usize, vectors: usize },
    Skipped(SkipReason),
    Failed(IngestError),
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file_id: String,
    pub name: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub source: String,
    pub dry_run: bool,
    pub listed: usize,
    pub new: usize,
    pub modified: usize,
    pub unchanged: usize,
    /// Changed files left for a later run because of `--limit`.
    pub deferred: usize,
    pub processed: usize,
    pub skipped: Vec<FileReport>,
    pub failed: Vec<FileReport>,
    pub total_chunks: usize,
    pub total_vectors: usize,
    /// Per-file chunk counts (dry runs only).
    pub planned: Vec<FileReport>,
}

impl RunSummary {
    pub fn print(&self) {
        if self.dry_run {
            println!("ingest {} (dry-run)", self.source);
        } else {
            println!("ingest {}", self.source);
        }
        println!("  listed: {} files", self.listed);
        println!("  new: {}", self.new);
        println!("  modified: {}", self.modified);
        println!("  unchanged: {}", self.unchanged);
        if self.deferred > 0 {
            println!("  deferred (limit): {}", self.deferred);
        }
        for p in &self.planned {
            println!("    {}  {}", p.name, p.detail);
        }
        println!("  processed: {}", self.processed);
        println!("  skipped: {}", self.skipped.len());
        for s in &self.skipped {
            println!("    {}  {}", s.name, s.detail);
        }
        println!("  failed: {}", self.failed.len());
        for f in &self.failed {
            println!("    {}  {}", f.name, f.detail);
        }
        println!("  chunks: {}", self.total_chunks);
        if !self.dry_run {
            println!("  vectors upserted: {}", self.total_vectors);
        }
        if self.failed.is_empty() {
            println!("ok");
        } else {
            println!("completed with {} failed file(s)", self.failed.len());
        }
    }
}

/// Where vectors go: the embedder and the index.
#[derive(Clone)]
pub struct Targets {
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
}

pub struct Pipeline {
    source: Arc<dyn FileSource>,
    manifest_store: Arc<dyn ManifestStore>,
    chunker: Chunker,
    settings: PipelineSettings,
    targets: Option<Targets>,
    progress: Box<dyn ProgressReporter>,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn FileSource>,
        manifest_store: Arc<dyn ManifestStore>,
        chunker: Chunker,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            source,
            manifest_store,
            chunker,
            settings,
            targets: None,
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_targets(mut self, targets: Targets) -> Self {
        self.targets = Some(targets);
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self, options: RunOptions) -> Result<RunSummary, IngestError> {
        // INIT
        let mut manifest = self.manifest_store.load().await?;
        if !options.dry_run {
            self.check_dimensions().await?;
        }

        // LIST_FILES
        self.progress.report(ProgressEvent::Listing {
            source: self.source.name().to_string(),
        });
        let files = self.source.list_files().await?;
        tracing::info!(source = self.source.name(), files = files.len(), "listed files");

        // FILTER_CHANGED
        let classification = classify(files, &manifest.processed_files, options.full);
        let mut summary = RunSummary {
            source: self.source.name().to_string(),
            dry_run: options.dry_run,
            listed: classification.to_process.len() + classification.unchanged,
            new: classification.new_count,
            modified: classification.modified_count,
            unchanged: classification.unchanged,
            ..RunSummary::default()
        };
        let mut to_process = classification.to_process;
        if let Some(limit) = options.limit {
            if to_process.len() > limit {
                summary.deferred = to_process.len() - limit;
                to_process.truncate(limit);
            }
        }

        // PROCESS_FILE*
        let total = to_process.len() as u64;
        let this = self;
        let mut outcomes = stream::iter(to_process.into_iter().map(|(file, kind)| async move {
            let outcome = this.process_file(&file, kind, options.dry_run).await;
            (file, outcome)
        }))
        .buffer_unordered(self.settings.file_concurrency);

        let mut done = 0u64;
        while let Some((file, outcome)) = outcomes.next().await {
            done += 1;
            self.progress.report(ProgressEvent::Processing {
                source: self.source.name().to_string(),
                n: done,
                total,
                file: file.name.clone(),
            });

            match outcome {
                FileOutcome::Processed { chunks, vectors } => {
                    summary.processed += 1;
                    summary.total_chunks += chunks;
                    summary.total_vectors += vectors;
                    if options.dry_run {
                        summary.planned.push(report(&file, format!("{} chunks", chunks)));
                        continue;
                    }
                    manifest.record(file.id.clone(), manifest_entry(&file, chunks));
                    manifest.refresh_totals();
                    if self.settings.save_each_file {
                        self.manifest_store.save(&manifest).await?;
                    }
                }
                FileOutcome::Skipped(reason) => {
                    tracing::warn!(file = %file.name, %reason, "skipped");
                    summary.skipped.push(report(&file, reason.to_string()));
                }
                FileOutcome::Failed(error) if error.is_fatal() => {
                    tracing::error!(file = %file.name, %error, "aborting run");
                    if !options.dry_run {
                        manifest.refresh_totals();
                        self.manifest_store.save(&manifest).await?;
                    }
                    return Err(error);
                }
                FileOutcome::Failed(error) => {
                    tracing::error!(file = %file.name, %error, "failed");
                    summary.failed.push(report(&file, error.to_string()));
                }
            }
        }
        drop(outcomes);

        // PERSIST_MANIFEST
        if !options.dry_run {
            manifest.finalize_run(&now());
            self.manifest_store.save(&manifest).await?;
        }

        Ok(summary)
    }

    async fn check_dimensions(&self) -> Result<(), IngestError> {
        let targets = self
            .targets
            .as_ref()
            .ok_or_else(|| IngestError::config("no embedder or index configured"))?;
        let expected = targets.embedder.dims();
        if let Some(actual) = targets.index.dimension().await? {
            if actual != expected {
                return Err(IngestError::config(format!(
                    "index dimension {} does not match embedding.dims {} ({})",
                    actual,
                    expected,
                    targets.embedder.model_name()
                )));
            }
        }
        Ok(())
    }

    async fn process_file(&self, file: &SourceFile, kind: ChangeKind, dry_run: bool) -> FileOutcome {
        if let Some(size) = file.size_bytes {
            if size > self.settings.max_file_bytes {
                return FileOutcome::Skipped(SkipReason::TooLarge {
                    size,
                    limit: self.settings.max_file_bytes,
                });
            }
        }

        tracing::debug!(file = %file.name, ?kind, "fetching");
        let text = match self.source.fetch_text(file).await {
            Ok(text) => text,
            Err(e) => return FileOutcome::Failed(e),
        };
        if text.trim().is_empty() {
            return FileOutcome::Skipped(SkipReason::EmptyText);
        }

        let chunks = self.chunker.chunk(&file.id, &text);
        if chunks.is_empty() {
            return FileOutcome::Skipped(SkipReason::NoChunks);
        }
        if dry_run {
            return FileOutcome::Processed {
                chunks: chunks.len(),
                vectors: 0,
            };
        }

        match self.embed_and_upsert(file, &chunks).await {
            Ok(vectors) => {
                tracing::info!(file = %file.name, chunks = chunks.len(), vectors, "processed");
                FileOutcome::Processed {
                    chunks: chunks.len(),
                    vectors,
                }
            }
            Err(e) => FileOutcome::Failed(e),
        }
    }

    async fn embed_and_upsert(&self, file: &SourceFile, chunks: &[Chunk]) -> Result<usize, IngestError> {
        let targets = self
            .targets
            .as_ref()
            .ok_or_else(|| IngestError::config("no embedder or index configured"))?;
        let scheme = self.chunker.id_scheme();
        let mut written = 0;

        for batch in chunks.chunks(self.settings.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = targets.embedder.embed(&texts).await?;
            validate_batch(&vectors, texts.len(), targets.embedder.dims())?;

            let records: Vec<UpsertRecord> = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, values)| record::build(scheme, chunk, file, values))
                .collect();
            targets.index.upsert(&records, &self.settings.namespace).await?;
            written += records.len();
        }

        Ok(written)
    }
}

fn report(file: &SourceFile, detail: String) -> FileReport {
    FileReport {
        file_id: file.id.clone(),
        name: file.name.clone(),
        detail,
    }
}

fn manifest_entry(file: &SourceFile, chunks: usize) -> ManifestEntry {
    ManifestEntry {
        name: file.name.clone(),
        fingerprint: fingerprint::of_file(file),
        chunk_count: chunks,
        processed_at: now(),
        modified_at: file.modified_at.clone(),
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Build the configured file source, reading its credentials.
pub fn build_source(config: &Config) -> Result<Arc<dyn FileSource>, IngestError> {
    let converters = LegacyConverters::from_config(&config.extract);
    match config.source.kind {
        SourceKind::Drive => Ok(Arc::new(
            DriveSource::new(&config.source, DriveAuth::from_env()?)?
                .with_legacy_converters(converters),
        )),
        SourceKind::Filesystem => Ok(Arc::new(
            FilesystemSource::new(&config.source)?.with_legacy_converters(converters),
        )),
    }
}

/// Connect the embedder and the index, reading their credentials.
pub async fn build_targets(config: &Config) -> Result<Targets, IngestError> {
    let embedder = create_embedder(&config.embedding)?;
    let index = PineconeIndex::connect(&config.index).await?;
    Ok(Targets {
        embedder,
        index: Arc::new(index),
    })
}

/// Entry point for `ingest run`.
pub async fn run_ingest(
    config: &Config,
    options: RunOptions,
    progress: ProgressMode,
) -> anyhow::Result<RunSummary> {
    let source = build_source(config)?;
    let chunker = config.chunking.chunker()?;
    let store = Arc::new(JsonFileManifestStore::new(&config.manifest.path));

    let mut pipeline = Pipeline::new(source, store, chunker, PipelineSettings::from_config(config))
        .with_progress(progress.reporter());
    if !options.dry_run {
        pipeline = pipeline.with_targets(build_targets(config).await?);
    }

    let summary = pipeline.run(options).await?;
    summary.print();
    Ok(summary)
}
