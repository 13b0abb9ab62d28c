//! Pinecone vector index client.
//!
//! Talks to the index's data plane over REST:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | upsert | `POST {host}/vectors/upsert` |
//! | query | `POST {host}/query` |
//! | stats / dimension | `POST {host}/describe_index_stats` |
//!
//! If `index.host` is not configured, it is resolved once from
//! `index.name` via the control plane (`GET https://api.pinecone.io/indexes/{name}`).
//!
//! Requires the `PINECONE_API_KEY` environment variable.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use drive_ingest_core::models::UpsertRecord;
use drive_ingest_core::store::{MetadataFilter, QueryMatch, VectorIndex};
use drive_ingest_core::{IngestError, Service};

use crate::config::{require_env, IndexConfig};
use crate::http;

const CONTROL_PLANE: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub dimension: Option<usize>,
    #[serde(default)]
    pub total_vector_count: u64,
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    #[serde(default)]
    pub vector_count: u64,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RawMatch>,
}

#[derive(Debug, Deserialize)]
struct RawMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
}

pub struct PineconeIndex {
    client: reqwest::Client,
    host: String,
    api_key: String,
    batch_size: usize,
    max_retries: u32,
}

impl PineconeIndex {
    /// Connect to the configured index, resolving its host if needed.
    pub async fn connect(config: &IndexConfig) -> Result<Self, IngestError> {
        let api_key = require_env("PINECONE_API_KEY")?;
        let client = http::build_client(config.timeout_secs)?;

        let host = match (&config.host, &config.name) {
            (Some(host), _) => host.clone(),
            (None, Some(name)) => {
                resolve_host(&client, &api_key, name, config.max_retries).await?
            }
            (None, None) => {
                return Err(IngestError::config(
                    "index.host or index.name (or PINECONE_HOST / PINECONE_INDEX) is required",
                ))
            }
        };

        Ok(Self {
            client,
            host: normalize_host(&host),
            api_key,
            batch_size: config.batch_size,
            max_retries: config.max_retries,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    async fn post(&self, service: Service, path: &str, body: &Value) -> Result<reqwest::Response, IngestError> {
        let url = format!("{}{}", self.host, path);
        http::send_with_retry(service, self.max_retries, || {
            self.client
                .post(&url)
                .header("Api-Key", &self.api_key)
                .header("X-Pinecone-API-Version", API_VERSION)
                .json(body)
        })
        .await
    }

    pub async fn stats(&self) -> Result<IndexStats, IngestError> {
        let response = self
            .post(Service::Query, "/describe_index_stats", &json!({}))
            .await?;
        http::json_body(Service::Query, response).await
    }
}

async fn resolve_host(
    client: &reqwest::Client,
    api_key: &str,
    name: &str,
    max_retries: u32,
) -> Result<String, IngestError> {
    let url = format!("{}/indexes/{}", CONTROL_PLANE, name);
    let response = http::send_with_retry(Service::Query, max_retries, || {
        client
            .get(&url)
            .header("Api-Key", api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    })
    .await
    .map_err(|e| IngestError::config(format!("could not resolve index '{}': {}", name, e)))?;
    let desc: IndexDescription = http::json_body(Service::Query, response).await?;
    tracing::debug!(index = name, host = %desc.host, "resolved index host");
    Ok(desc.host)
}

/// Hosts from the control plane come without a scheme.
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

fn upsert_body(records: &[UpsertRecord], namespace: &str) -> Value {
    json!({
        "vectors": records,
        "namespace": namespace,
    })
}

fn query_body(
    vector: &[f32],
    top_k: usize,
    namespace: &str,
    filter: Option<&MetadataFilter>,
) -> Value {
    let mut body = json!({
        "vector": vector,
        "topK": top_k,
        "namespace": namespace,
        "includeMetadata": true,
        "includeValues": false,
    });
    if let Some(f) = filter.filter(|f| !f.is_empty()) {
        body["filter"] = f.to_pinecone();
    }
    body
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(&self, records: &[UpsertRecord], namespace: &str) -> Result<(), IngestError> {
        for batch in records.chunks(self.batch_size) {
            self.post(Service::Upsert, "/vectors/upsert", &upsert_body(batch, namespace))
                .await?;
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
        let response = self
            .post(Service::Query, "/query", &query_body(vector, top_k, namespace, filter))
            .await?;
        let parsed: QueryResponse = http::json_body(Service::Query, response).await?;
        Ok(parsed
            .matches
            .into_iter()
            .map(|m| QueryMatch {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect())
    }

    async fn dimension(&self) -> Result<Option<usize>, IngestError> {
        Ok(self.stats().await?.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drive_ingest_core::models::RecordMetadata;

    #[test]
    fn upsert_body_shape() {
        let record = UpsertRecord {
            id: "f_0_700".to_string(),
            values: vec![0.25, 0.5],
            metadata: RecordMetadata {
                text: "t".to_string(),
                file_id: "f".to_string(),
                file_name: "n".to_string(),
                folder_path: "a/b".to_string(),
                content_type: "pdf".to_string(),
                mime_type: "application/pdf".to_string(),
                modified_time: "2024-01-01".to_string(),
                start_token: 0,
                end_token: 700,
            },
        };
        let body = upsert_body(&[record], "site");
        assert_eq!(body["namespace"], "site");
        assert_eq!(body["vectors"][0]["id"], "f_0_700");
        assert_eq!(body["vectors"][0]["values"][1], 0.5);
        assert_eq!(body["vectors"][0]["metadata"]["end_token"], 700);
    }

    #[test]
    fn query_body_includes_filter_only_when_set() {
        let body = query_body(&[1.0], 5, "site", None);
        assert_eq!(body["topK"], 5);
        assert_eq!(body["includeMetadata"], true);
        assert!(body.get("filter").is_none());

        let mut filter = MetadataFilter::default();
        filter.equals.insert("file_id".into(), "abc".into());
        let body = query_body(&[1.0], 5, "site", Some(&filter));
        assert_eq!(body["filter"]["file_id"]["$eq"], "abc");
    }

    #[test]
    fn parses_query_and_stats_responses() {
        let raw = r#"{"matches": [{"id": "a_0_700", "score": 0.91, "metadata": {"file_name": "Ladders"}},
                                  {"id": "b_single", "score": 0.5}], "namespace": "site"}"#;
        let parsed: QueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.matches.len(), 2);
        assert!(parsed.matches[1].metadata.is_none());

        let raw = r#"{"namespaces": {"site": {"vectorCount": 42}}, "dimension": 1536,
                      "indexFullness": 0.0, "totalVectorCount": 42}"#;
        let stats: IndexStats = serde_json::from_str(raw).unwrap();
        assert_eq!(stats.dimension, Some(1536));
        assert_eq!(stats.namespaces["site"].vector_count, 42);
    }

    #[test]
    fn host_gets_scheme() {
        assert_eq!(normalize_host("docs-abc.svc.pinecone.io"), "https://docs-abc.svc.pinecone.io");
        assert_eq!(normalize_host("http://localhost:5081/"), "http://localhost:5081");
    }
}
