//! Configuration parsing and validation.
//!
//! drive-ingest is configured via a TOML file (default:
//! `config/ingest.toml`). Every section except `[source]` is optional and
//! falls back to the defaults below.
//!
//! # Example
//!
//! ```toml
//! [source]
//! kind = "drive"
//! folder_id = "1AbCdEf"
//! include_types = ["google-doc", "pdf", "docx", "pptx"]
//!
//! [chunking]
//! tokenizer = "cl100k_base"
//! window_tokens = 700
//! overlap_tokens = 150
//!
//! [embedding]
//! provider = "openai"
//! model = "text-embedding-3-small"
//! dims = 1536
//!
//! [index]
//! name = "safety-docs"
//! namespace = "site"
//!
//! [manifest]
//! path = "./data/processed_files.json"
//! ```
//!
//! # Environment
//!
//! `GDRIVE_FOLDER_ID`, `NAMESPACE`, `PINECONE_INDEX` and `PINECONE_HOST`
//! override the matching file values. Credentials never live in the file;
//! they are read from the environment when the component that needs them
//! is constructed (see [`require_env`]).

use serde::Deserialize;
use std::path::{Path, PathBuf};

use drive_ingest_core::models::ContentType;
use drive_ingest_core::window::{Chunker, Tokenizer, WindowParams};
use drive_ingest_core::IngestError;

pub const DEFAULT_DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/embeddings";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/embed";

const KNOWN_TOKENIZERS: [&str; 5] = ["cl100k_base", "o200k_base", "p50k_base", "words", "chars"];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub manifest: ManifestConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Drive,
    Filesystem,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Root Drive folder (kind = "drive").
    #[serde(default)]
    pub folder_id: Option<String>,
    /// Local root directory (kind = "filesystem").
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_include_types")]
    pub include_types: Vec<ContentType>,
    /// Glob patterns matched against paths relative to the root.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_drive_api")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_include_types() -> Vec<ContentType> {
    ContentType::ALL.to_vec()
}
fn default_drive_api() -> String {
    DEFAULT_DRIVE_API.to_string()
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMode {
    #[default]
    Windowed,
    Single,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default)]
    pub mode: ChunkMode,
    #[serde(default = "default_tokenizer")]
    pub tokenizer: String,
    #[serde(default = "default_window_tokens")]
    pub window_tokens: usize,
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
    #[serde(default = "default_single_chunk_chars")]
    pub single_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            mode: ChunkMode::Windowed,
            tokenizer: default_tokenizer(),
            window_tokens: default_window_tokens(),
            overlap_tokens: default_overlap_tokens(),
            single_chunk_chars: default_single_chunk_chars(),
        }
    }
}

fn default_tokenizer() -> String {
    "cl100k_base".to_string()
}
fn default_window_tokens() -> usize {
    700
}
fn default_overlap_tokens() -> usize {
    150
}
fn default_single_chunk_chars() -> usize {
    800
}

impl ChunkingConfig {
    /// Build the chunker this section describes. Loads BPE ranks, so call
    /// once per run.
    pub fn chunker(&self) -> Result<Chunker, IngestError> {
        match self.mode {
            ChunkMode::Windowed => Ok(Chunker::Windowed {
                tokenizer: Tokenizer::from_name(&self.tokenizer)?,
                params: WindowParams::new(self.window_tokens, self.overlap_tokens)?,
            }),
            ChunkMode::Single => Ok(Chunker::Single {
                max_chars: self.single_chunk_chars,
            }),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    OpenAi,
    Ollama,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Endpoint override; defaults depend on the provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::OpenAi,
            model: default_model(),
            dims: default_dims(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            url: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn endpoint(&self) -> &str {
        match (&self.url, self.provider) {
            (Some(url), _) => url,
            (None, EmbeddingProviderKind::OpenAi) => DEFAULT_OPENAI_URL,
            (None, EmbeddingProviderKind::Ollama) => DEFAULT_OLLAMA_URL,
        }
    }
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_dims() -> usize {
    1536
}
fn default_batch_size() -> usize {
    100
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Index name; used to resolve `host` when it is not given.
    #[serde(default)]
    pub name: Option<String>,
    /// Data-plane host, e.g. `https://safety-docs-abc123.svc.us-east-1.pinecone.io`.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: None,
            host: None,
            namespace: default_namespace(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_namespace() -> String {
    "site".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ManifestConfig {
    #[serde(default = "default_manifest_path")]
    pub path: PathBuf,
    /// Persist after every successfully processed file, not only at the end.
    #[serde(default = "default_true")]
    pub save_each_file: bool,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            path: default_manifest_path(),
            save_each_file: true,
        }
    }
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("./data/processed_files.json")
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_file_concurrency")]
    pub file_concurrency: usize,
    /// Files reported larger than this are skipped without downloading.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            file_concurrency: default_file_concurrency(),
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

fn default_file_concurrency() -> usize {
    1
}
fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    /// Run external converters for `.doc` and `.ppt` before falling back to
    /// the printable-run scrape.
    #[serde(default)]
    pub legacy_converters: bool,
    #[serde(default = "default_antiword_path")]
    pub antiword_path: String,
    #[serde(default = "default_soffice_path")]
    pub soffice_path: String,
    #[serde(default = "default_converter_timeout_secs")]
    pub converter_timeout_secs: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            legacy_converters: false,
            antiword_path: default_antiword_path(),
            soffice_path: default_soffice_path(),
            converter_timeout_secs: default_converter_timeout_secs(),
        }
    }
}

fn default_antiword_path() -> String {
    "antiword".to_string()
}
fn default_soffice_path() -> String {
    "soffice".to_string()
}
fn default_converter_timeout_secs() -> u64 {
    60
}

/// Read, override from the process environment, and validate.
pub fn load_config(path: &Path) -> Result<Config, IngestError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        IngestError::config(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config, IngestError> {
    toml::from_str(content)
        .map_err(|e| IngestError::config(format!("failed to parse config file: {}", e)))
}

/// Apply the documented environment overrides. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(folder) = get("GDRIVE_FOLDER_ID") {
        config.source.folder_id = Some(folder);
    }
    if let Some(ns) = get("NAMESPACE") {
        config.index.namespace = ns;
    }
    if let Some(name) = get("PINECONE_INDEX") {
        config.index.name = Some(name);
    }
    if let Some(host) = get("PINECONE_HOST") {
        config.index.host = Some(host);
    }
}

pub fn validate(config: &Config) -> Result<(), IngestError> {
    match config.source.kind {
        SourceKind::Drive => {
            if config.source.folder_id.as_deref().map_or(true, str::is_empty) {
                return Err(IngestError::config(
                    "source.folder_id (or GDRIVE_FOLDER_ID) is required when source.kind = \"drive\"",
                ));
            }
        }
        SourceKind::Filesystem => {
            if config.source.root.is_none() {
                return Err(IngestError::config(
                    "source.root is required when source.kind = \"filesystem\"",
                ));
            }
        }
    }
    if config.source.include_types.is_empty() {
        return Err(IngestError::config("source.include_types must not be empty"));
    }

    let chunking = &config.chunking;
    match chunking.mode {
        ChunkMode::Windowed => {
            WindowParams::new(chunking.window_tokens, chunking.overlap_tokens)?;
            if !KNOWN_TOKENIZERS.contains(&chunking.tokenizer.as_str()) {
                return Err(IngestError::config(format!(
                    "unknown tokenizer '{}'. Must be one of: {}",
                    chunking.tokenizer,
                    KNOWN_TOKENIZERS.join(", ")
                )));
            }
        }
        ChunkMode::Single => {
            if chunking.single_chunk_chars == 0 {
                return Err(IngestError::config("chunking.single_chunk_chars must be > 0"));
            }
        }
    }

    if config.embedding.model.trim().is_empty() {
        return Err(IngestError::config("embedding.model must not be empty"));
    }
    if config.embedding.dims == 0 {
        return Err(IngestError::config("embedding.dims must be > 0"));
    }
    if config.embedding.batch_size == 0 {
        return Err(IngestError::config("embedding.batch_size must be > 0"));
    }
    if config.index.batch_size == 0 {
        return Err(IngestError::config("index.batch_size must be > 0"));
    }
    if config.pipeline.file_concurrency == 0 {
        return Err(IngestError::config("pipeline.file_concurrency must be >= 1"));
    }
    if config.extract.legacy_converters && config.extract.converter_timeout_secs == 0 {
        return Err(IngestError::config("extract.converter_timeout_secs must be > 0"));
    }

    Ok(())
}

/// Read a required secret from the environment.
pub fn require_env(key: &str) -> Result<String, IngestError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| IngestError::config(format!("{} environment variable not set", key)))
}
