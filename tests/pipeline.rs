//! End-to-end pipeline runs against in-process fakes: a scripted file
//! source, a deterministic embedder, and the in-memory vector index.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use drive_ingest::ingest::{Pipeline, PipelineSettings, RunOptions, Targets};
use drive_ingest::manifest_store::{JsonFileManifestStore, ManifestStore};
use drive_ingest::query::{parse_filters, search};
use drive_ingest::traits::FileSource;
use drive_ingest_core::embedding::Embedder;
use drive_ingest_core::fingerprint;
use drive_ingest_core::manifest::Manifest;
use drive_ingest_core::models::{ContentType, SourceFile, UpsertRecord};
use drive_ingest_core::store::memory::InMemoryIndex;
use drive_ingest_core::store::{MetadataFilter, QueryMatch, VectorIndex};
use drive_ingest_core::window::{Chunker, Tokenizer, WindowParams};
use drive_ingest_core::{IngestError, Service};

const NS: &str = "test";
const DIMS: usize = 4;

// ============ Fakes ============

#[derive(Default)]
struct ScriptedSource {
    files: Mutex<Vec<SourceFile>>,
    texts: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    list_fails: AtomicBool,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    fn put(&self, id: &str, modified: &str, text: &str) {
        let file = source_file(id, modified, text.len() as u64);
        let mut files = self.files.lock().unwrap();
        files.retain(|f| f.id != id);
        files.push(file);
        files.sort_by(|a, b| a.id.cmp(&b.id));
        self.texts.lock().unwrap().insert(id.to_string(), text.to_string());
    }

    fn file(&self, id: &str) -> SourceFile {
        self.files
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .unwrap()
    }

    fn fail_fetch(&self, id: &str, fail: bool) {
        let mut failing = self.failing.lock().unwrap();
        if fail {
            failing.insert(id.to_string());
        } else {
            failing.remove(id);
        }
    }
}

#[async_trait]
impl FileSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn list_files(&self) -> Result<Vec<SourceFile>, IngestError> {
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(IngestError::transient(Service::Listing, "HTTP 503"));
        }
        Ok(self.files.lock().unwrap().clone())
    }

    async fn fetch_text(&self, file: &SourceFile) -> Result<String, IngestError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&file.id) {
            return Err(IngestError::transient(Service::Fetch, "HTTP 500"));
        }
        Ok(self
            .texts
            .lock()
            .unwrap()
            .get(&file.id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Vector of `DIMS` values derived from the text; `BADDIM` in the text
/// yields one value too many.
struct FakeEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake"
    }

    fn dims(&self) -> usize {
        DIMS
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![t.len() as f32, 1.0, t.split_whitespace().count() as f32, 0.5];
                if t.contains("BADDIM") {
                    v.push(0.0);
                }
                v
            })
            .collect())
    }
}

/// Counts upserts; when `fail_on_call` is N > 0, the Nth upsert fails.
struct CountingIndex {
    inner: InMemoryIndex,
    upserts: AtomicUsize,
    fail_on_call: AtomicUsize,
}

#[async_trait]
impl VectorIndex for CountingIndex {
    async fn upsert(&self, records: &[UpsertRecord], namespace: &str) -> Result<(), IngestError> {
        let call = self.upserts.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on_call.load(Ordering::SeqCst) {
            return Err(IngestError::transient(Service::Upsert, "HTTP 503"));
        }
        self.inner.upsert(records, namespace).await
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: &str,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryMatch>, IngestError> {
        self.inner.query(vector, top_k, namespace, filter).await
    }

    async fn dimension(&self) -> Result<Option<usize>, IngestError> {
        self.inner.dimension().await
    }
}

fn source_file(id: &str, modified: &str, size: u64) -> SourceFile {
    SourceFile {
        id: id.to_string(),
        name: format!("{}.txt", id),
        content_type: ContentType::PlainText,
        modified_at: Some(modified.to_string()),
        size_bytes: Some(size),
        folder_path: "Safety".to_string(),
    }
}

fn words(prefix: &str, n: usize) -> String {
    (0..n)
        .map(|i| format!("{}{}", prefix, i))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Delegates to the JSON store and records the totals of every save.
struct RecordingStore {
    inner: JsonFileManifestStore,
    saves: Mutex<Vec<(usize, usize, Option<String>)>>,
}

#[async_trait]
impl ManifestStore for RecordingStore {
    async fn load(&self) -> Result<Manifest, IngestError> {
        self.inner.load().await
    }

    async fn save(&self, manifest: &Manifest) -> Result<(), IngestError> {
        self.saves.lock().unwrap().push((
            manifest.total_files,
            manifest.total_chunks,
            manifest.last_run.clone(),
        ));
        self.inner.save(manifest).await
    }
}

// ============ Harness ============

struct Harness {
    _tmp: TempDir,
    manifest_path: PathBuf,
    source: Arc<ScriptedSource>,
    embedder: Arc<FakeEmbedder>,
    index: Arc<CountingIndex>,
}

impl Harness {
    fn new() -> Self {
        Self::with_index(InMemoryIndex::with_dimension(DIMS))
    }

    fn with_index(index: InMemoryIndex) -> Self {
        let tmp = TempDir::new().unwrap();
        let manifest_path = tmp.path().join("data/processed_files.json");
        Self {
            _tmp: tmp,
            manifest_path,
            source: Arc::new(ScriptedSource::default()),
            embedder: Arc::new(FakeEmbedder {
                calls: AtomicUsize::new(0),
            }),
            index: Arc::new(CountingIndex {
                inner: index,
                upserts: AtomicUsize::new(0),
                fail_on_call: AtomicUsize::new(0),
            }),
        }
    }

    fn settings(&self, concurrency: usize) -> PipelineSettings {
        PipelineSettings {
            file_concurrency: concurrency,
            max_file_bytes: 10_000,
            save_each_file: true,
            batch_size: 2,
            namespace: NS.to_string(),
        }
    }

    fn pipeline_with(&self, settings: PipelineSettings) -> Pipeline {
        self.pipeline_with_store(
            Arc::new(JsonFileManifestStore::new(&self.manifest_path)),
            settings,
        )
    }

    fn pipeline_with_store(
        &self,
        store: Arc<dyn ManifestStore>,
        settings: PipelineSettings,
    ) -> Pipeline {
        let chunker = Chunker::Windowed {
            tokenizer: Tokenizer::Words,
            params: WindowParams::new(10, 2).unwrap(),
        };
        Pipeline::new(self.source.clone(), store, chunker, settings)
        .with_targets(Targets {
            embedder: self.embedder.clone(),
            index: self.index.clone(),
        })
    }

    fn pipeline(&self) -> Pipeline {
        self.pipeline_with(self.settings(1))
    }

    async fn manifest(&self) -> Manifest {
        JsonFileManifestStore::new(&self.manifest_path)
            .load()
            .await
            .unwrap()
    }

    fn reset_counters(&self) {
        self.source.fetches.store(0, Ordering::SeqCst);
        self.embedder.calls.store(0, Ordering::SeqCst);
        self.index.upserts.store(0, Ordering::SeqCst);
    }

    fn counters(&self) -> (usize, usize, usize) {
        (
            self.source.fetches.load(Ordering::SeqCst),
            self.embedder.calls.load(Ordering::SeqCst),
            self.index.upserts.load(Ordering::SeqCst),
        )
    }
}

// ============ Tests ============

#[tokio::test]
async fn first_run_processes_everything_and_records_manifest() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 15));
    h.source.put("b", "2024-01-02T00:00:00Z", &words("b", 5));

    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.listed, 2);
    assert_eq!(summary.new, 2);
    assert_eq!(summary.processed, 2);
    assert!(summary.failed.is_empty());
    // a: [0,10) [8,15); b: [0,5)
    assert_eq!(summary.total_chunks, 3);
    assert_eq!(summary.total_vectors, 3);

    assert_eq!(h.index.inner.ids(NS), vec!["a_0_10", "a_8_15", "b_0_5"]);
    let record = h.index.inner.get(NS, "a_8_15").unwrap();
    assert_eq!(record.metadata.file_name, "a.txt");
    assert_eq!(record.metadata.start_token, 8);
    assert_eq!(record.metadata.text, "a8 a9 a10 a11 a12 a13 a14");

    let manifest = h.manifest().await;
    assert_eq!(manifest.total_files, 2);
    assert_eq!(manifest.total_chunks, 3);
    assert!(manifest.last_run.is_some());
    let entry = manifest.get("a").unwrap();
    assert_eq!(entry.chunk_count, 2);
    assert_eq!(entry.fingerprint, fingerprint::of_file(&h.source.file("a")));
}

#[tokio::test]
async fn unchanged_rerun_makes_no_calls() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 15));
    h.source.put("b", "2024-01-02T00:00:00Z", &words("b", 5));
    h.source.put("c", "2024-01-03T00:00:00Z", &words("c", 25));
    h.pipeline().run(RunOptions::default()).await.unwrap();

    h.reset_counters();
    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.unchanged, 3);
    assert_eq!(summary.processed, 0);
    assert_eq!(h.counters(), (0, 0, 0));
}

#[tokio::test]
async fn full_run_ignores_manifest() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 15));
    h.pipeline().run(RunOptions::default()).await.unwrap();

    h.reset_counters();
    let summary = h
        .pipeline()
        .run(RunOptions {
            full: true,
            ..RunOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(h.source.fetches.load(Ordering::SeqCst), 1);
    assert_eq!(h.index.inner.len(NS), 2);
}

#[tokio::test]
async fn modified_file_overwrites_same_ids() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", &words("old", 15));
    h.source.put("b", "2024-01-01T00:00:00Z", &words("b", 5));
    h.pipeline().run(RunOptions::default()).await.unwrap();
    let before = h.index.inner.ids(NS);

    h.source.put("a", "2024-02-01T00:00:00Z", &words("new", 15));
    h.reset_counters();
    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.modified, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(h.source.fetches.load(Ordering::SeqCst), 1);

    assert_eq!(h.index.inner.ids(NS), before);
    let record = h.index.inner.get(NS, "a_0_10").unwrap();
    assert!(record.metadata.text.starts_with("new0 new1"));
    assert_eq!(record.metadata.modified_time, "2024-02-01T00:00:00Z");

    let manifest = h.manifest().await;
    assert_eq!(
        manifest.get("a").unwrap().fingerprint,
        fingerprint::of_file(&h.source.file("a"))
    );
}

#[tokio::test]
async fn failing_file_is_isolated_and_retried() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 15));
    h.source.put("b", "2024-01-01T00:00:00Z", &words("b", 15));
    h.source.put("c", "2024-01-01T00:00:00Z", &words("c", 15));
    h.source.fail_fetch("b", true);

    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].file_id, "b");
    assert!(summary.failed[0].detail.contains("HTTP 500"));

    let manifest = h.manifest().await;
    assert!(manifest.get("a").is_some());
    assert!(manifest.get("b").is_none());
    assert!(manifest.get("c").is_some());
    assert!(h.index.inner.get(NS, "b_0_10").is_none());

    h.source.fail_fetch("b", false);
    h.reset_counters();
    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.new, 1);
    assert_eq!(summary.unchanged, 2);
    assert_eq!(summary.processed, 1);
    assert_eq!(h.source.fetches.load(Ordering::SeqCst), 1);
    assert!(h.manifest().await.get("b").is_some());
}

#[tokio::test]
async fn wrong_vector_length_fails_only_that_file() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", "contains BADDIM marker");
    h.source.put("b", "2024-01-01T00:00:00Z", &words("b", 5));

    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].detail.contains("dimension mismatch"));
    assert!(h.manifest().await.get("a").is_none());
}

#[tokio::test]
async fn later_batch_failure_leaves_file_unrecorded() {
    let h = Harness::new();
    // 50 words, windows of 10 with overlap 2: six chunks, three batches of two.
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 50));
    h.index.fail_on_call.store(2, Ordering::SeqCst);

    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].detail.contains("HTTP 503"));
    assert_eq!(h.index.upserts.load(Ordering::SeqCst), 2);
    // The first batch landed before the failure.
    assert_eq!(h.index.inner.ids(NS), vec!["a_0_10", "a_8_18"]);
    assert!(h.manifest().await.get("a").is_none());

    h.index.fail_on_call.store(0, Ordering::SeqCst);
    h.reset_counters();
    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.new, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(h.index.upserts.load(Ordering::SeqCst), 3);
    assert_eq!(
        h.index.inner.ids(NS),
        vec!["a_0_10", "a_16_26", "a_24_34", "a_32_42", "a_40_50", "a_8_18"]
    );
    assert_eq!(h.manifest().await.get("a").unwrap().chunk_count, 6);
}

#[tokio::test]
async fn per_file_saves_carry_current_totals() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 15));
    h.source.put("b", "2024-01-01T00:00:00Z", &words("b", 5));
    let store = Arc::new(RecordingStore {
        inner: JsonFileManifestStore::new(&h.manifest_path),
        saves: Mutex::new(Vec::new()),
    });

    h.pipeline_with_store(store.clone(), h.settings(1))
        .run(RunOptions::default())
        .await
        .unwrap();
    let saves = store.saves.lock().unwrap().clone();
    assert_eq!(saves.len(), 3);
    assert_eq!(saves[0], (1, 2, None));
    assert_eq!(saves[1], (2, 3, None));
    assert_eq!((saves[2].0, saves[2].1), (2, 3));
    assert!(saves[2].2.is_some());
}

#[tokio::test]
async fn empty_text_is_skipped_without_embedding() {
    let h = Harness::new();
    h.source.put("blank", "2024-01-01T00:00:00Z", "  \n\t ");

    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(h.counters(), (1, 0, 0));
    assert!(h.manifest().await.get("blank").is_none());
}

#[tokio::test]
async fn oversize_file_is_skipped_without_fetch() {
    let h = Harness::new();
    h.source.put("big", "2024-01-01T00:00:00Z", &words("x", 3000));
    h.source.put("small", "2024-01-01T00:00:00Z", &words("y", 5));

    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped.len(), 1);
    assert!(summary.skipped[0].detail.contains("too large"));
    assert_eq!(h.source.fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn limit_defers_remaining_files() {
    let h = Harness::new();
    for id in ["a", "b", "c"] {
        h.source.put(id, "2024-01-01T00:00:00Z", &words(id, 5));
    }

    let opts = RunOptions {
        limit: Some(2),
        ..RunOptions::default()
    };
    let summary = h.pipeline().run(opts).await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.deferred, 1);
    assert_eq!(h.manifest().await.len(), 2);

    let summary = h.pipeline().run(opts).await.unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.unchanged, 2);
    assert_eq!(h.manifest().await.len(), 3);
}

#[tokio::test]
async fn dry_run_windows_but_writes_nothing() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 15));
    h.source.put("b", "2024-01-01T00:00:00Z", &words("b", 5));

    let summary = h
        .pipeline()
        .run(RunOptions {
            dry_run: true,
            ..RunOptions::default()
        })
        .await
        .unwrap();
    assert!(summary.dry_run);
    assert_eq!(summary.total_chunks, 3);
    assert_eq!(summary.total_vectors, 0);
    assert_eq!(summary.planned.len(), 2);
    assert_eq!(h.counters(), (2, 0, 0));
    assert!(h.index.inner.is_empty());
    assert!(!h.manifest_path.exists());
}

#[tokio::test]
async fn dry_run_needs_no_targets() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 15));
    let pipeline = Pipeline::new(
        h.source.clone(),
        Arc::new(JsonFileManifestStore::new(&h.manifest_path)),
        Chunker::Single { max_chars: 20 },
        h.settings(1),
    );

    let summary = pipeline
        .run(RunOptions {
            dry_run: true,
            ..RunOptions::default()
        })
        .await
        .unwrap();
    assert_eq!(summary.total_chunks, 1);

    let err = pipeline.run(RunOptions::default()).await.unwrap_err();
    assert!(err.is_fatal());
}

#[tokio::test]
async fn dimension_mismatch_is_fatal_before_any_fetch() {
    let h = Harness::with_index(InMemoryIndex::with_dimension(DIMS * 2));
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 15));

    let err = h.pipeline().run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, IngestError::Configuration(_)));
    assert_eq!(h.counters(), (0, 0, 0));
    assert!(!h.manifest_path.exists());
}

#[tokio::test]
async fn listing_failure_is_fatal_and_leaves_manifest() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 15));
    h.pipeline().run(RunOptions::default()).await.unwrap();
    let before = std::fs::read_to_string(&h.manifest_path).unwrap();

    h.source.list_fails.store(true, Ordering::SeqCst);
    let err = h.pipeline().run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(
        err,
        IngestError::TransientService {
            service: Service::Listing,
            ..
        }
    ));
    assert_eq!(std::fs::read_to_string(&h.manifest_path).unwrap(), before);
}

#[tokio::test]
async fn legacy_manifest_is_migrated() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 15));
    h.source.put("b", "2024-02-01T00:00:00Z", &words("b", 5));
    std::fs::create_dir_all(h.manifest_path.parent().unwrap()).unwrap();
    std::fs::write(
        &h.manifest_path,
        r#"{
            "a": {"name": "a.txt", "modifiedTime": "2024-01-01T00:00:00Z", "processedAt": "2023-12-01T00:00:00"},
            "b": {"name": "b.txt", "modifiedTime": "2024-01-01T00:00:00Z", "processedAt": "2023-12-01T00:00:00"}
        }"#,
    )
    .unwrap();

    // a kept its modified time, b moved on since the legacy run.
    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.modified, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(h.source.fetches.load(Ordering::SeqCst), 1);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&h.manifest_path).unwrap()).unwrap();
    assert!(raw["processed_files"]["a"].get("hash").is_none());
    assert!(raw["processed_files"]["b"]["hash"].is_string());
    assert_eq!(raw["total_files"], 2);

    h.reset_counters();
    let summary = h.pipeline().run(RunOptions::default()).await.unwrap();
    assert_eq!(summary.unchanged, 2);
    assert_eq!(h.counters(), (0, 0, 0));
}

#[tokio::test]
async fn concurrent_run_matches_sequential() {
    let seq = Harness::new();
    let par = Harness::new();
    for h in [&seq, &par] {
        for i in 0..8 {
            let id = format!("f{}", i);
            h.source
                .put(&id, "2024-03-01T00:00:00Z", &words(&id, 5 + i * 4));
        }
        h.source.fail_fetch("f3", true);
    }

    let s1 = seq.pipeline_with(seq.settings(1)).run(RunOptions::default()).await.unwrap();
    let s2 = par.pipeline_with(par.settings(4)).run(RunOptions::default()).await.unwrap();
    assert_eq!(s1.processed, s2.processed);
    assert_eq!(s1.total_chunks, s2.total_chunks);
    assert_eq!(s1.failed.len(), s2.failed.len());

    let strip = |m: Manifest| {
        m.processed_files
            .into_iter()
            .map(|(id, e)| (id, e.name, e.fingerprint, e.chunk_count))
            .collect::<Vec<_>>()
    };
    assert_eq!(strip(seq.manifest().await), strip(par.manifest().await));
    assert_eq!(seq.index.inner.ids(NS), par.index.inner.ids(NS));
}

#[tokio::test]
async fn query_after_ingest_honours_filter() {
    let h = Harness::new();
    h.source.put("a", "2024-01-01T00:00:00Z", &words("a", 15));
    h.source.put("b", "2024-01-01T00:00:00Z", &words("b", 5));
    h.pipeline().run(RunOptions::default()).await.unwrap();

    let all = search(
        h.embedder.as_ref(),
        h.index.as_ref(),
        NS,
        "a0 a1",
        10,
        &MetadataFilter::default(),
    )
    .await
    .unwrap();
    assert_eq!(all.len(), 3);

    let filter = parse_filters(&["file_id=b".to_string()]).unwrap();
    let only_b = search(h.embedder.as_ref(), h.index.as_ref(), NS, "a0 a1", 10, &filter)
        .await
        .unwrap();
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].field("file_name"), Some("b.txt"));

    let none = search(h.embedder.as_ref(), h.index.as_ref(), NS, "   ", 10, &filter)
        .await
        .unwrap();
    assert!(none.is_empty());
}
