//! Embedding providers.
//!
//! Concrete [`Embedder`] implementations:
//! - **[`OpenAiEmbedder`]**: calls the OpenAI embeddings API with batching and retry.
//! - **[`OllamaEmbedder`]**: calls a local Ollama server's `/api/embed`.
//!
//! Both split their input into `embedding.batch_size` requests, validate
//! that every batch returns one vector per text with the configured
//! dimension, and return vectors in input order.
//!
//! # Provider Selection
//!
//! Use [`create_embedder`] to instantiate the configured provider:
//!
//! ```rust,no_run
//! # use drive_ingest::config::EmbeddingConfig;
//! # use drive_ingest::embedding::create_embedder;
//! let config = EmbeddingConfig::default(); // provider = "openai"
//! let embedder = create_embedder(&config).unwrap(); // needs OPENAI_API_KEY
//! assert_eq!(embedder.model_name(), "text-embedding-3-small");
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use drive_ingest_core::embedding::{validate_batch, Embedder};
use drive_ingest_core::{IngestError, Service};

use crate::config::{require_env, EmbeddingConfig, EmbeddingProviderKind};
use crate::http;

// ============ OpenAI ============

/// Embedder using the OpenAI API (`POST /v1/embeddings`).
///
/// Requires the `OPENAI_API_KEY` environment variable to be set.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OpenAiEmbedder {
    /// # Errors
    ///
    /// Returns a configuration error if `OPENAI_API_KEY` is not in the
    /// environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, IngestError> {
        let api_key = require_env("OPENAI_API_KEY")?;
        Ok(Self {
            client: http::build_client(config.timeout_secs)?,
            url: config.endpoint().to_string(),
            api_key,
            model: config.model.clone(),
            dims: config.dims,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        let body = json!({
            "model": self.model,
            "input": texts,
        });
        let response = http::send_with_retry(Service::Embedding, self.max_retries, || {
            self.client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;
        let parsed: OpenAiResponse = http::json_body(Service::Embedding, response).await?;
        Ok(parsed.into_ordered())
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiResponse {
    /// Vectors sorted by their `index` field, i.e. in input order.
    fn into_ordered(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|d| d.index);
        self.data.into_iter().map(|d| d.embedding).collect()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.embed_batch(batch).await?;
            validate_batch(&vectors, batch.len(), self.dims)?;
            out.extend(vectors);
        }
        Ok(out)
    }
}

// ============ Ollama ============

/// Embedder backed by a local Ollama server.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dims: usize,
    batch_size: usize,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, IngestError> {
        Ok(Self {
            client: http::build_client(config.timeout_secs)?,
            url: config.endpoint().to_string(),
            model: config.model.clone(),
            dims: config.dims,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, IngestError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let body = json!({ "model": self.model, "input": batch });
            let response = http::send_with_retry(Service::Embedding, self.max_retries, || {
                self.client.post(&self.url).json(&body)
            })
            .await?;
            let parsed: OllamaResponse = http::json_body(Service::Embedding, response).await?;
            validate_batch(&parsed.embeddings, batch.len(), self.dims)?;
            out.extend(parsed.embeddings);
        }
        Ok(out)
    }
}

/// Create the configured [`Embedder`].
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"openai"` | [`OpenAiEmbedder`] |
/// | `"ollama"` | [`OllamaEmbedder`] |
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, IngestError> {
    match config.provider {
        EmbeddingProviderKind::OpenAi => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        EmbeddingProviderKind::Ollama => Ok(Arc::new(OllamaEmbedder::new(config)?)),
    }
}

/// Embed a single query text.
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, IngestError> {
    embedder
        .embed(&[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| IngestError::transient(Service::Embedding, "empty embedding response"))
}
