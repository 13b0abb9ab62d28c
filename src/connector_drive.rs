//! Google Drive connector.
//!
//! Walks a Drive folder tree through the Drive v3 REST API and downloads
//! or exports each supported file for extraction.
//!
//! # Configuration
//!
//! ```toml
//! [source]
//! kind = "drive"
//! folder_id = "1AbCdEf"
//! include_types = ["google-doc", "pdf", "docx"]
//! exclude_globs = ["Archive/**"]
//! ```
//!
//! # Environment Variables
//!
//! One of:
//! - `GDRIVE_ACCESS_TOKEN`: OAuth access token, sent as a bearer token
//! - `GDRIVE_API_KEY`: API key, for folders shared publicly
//!
//! # Listing
//!
//! Each folder is listed with `q='<id>' in parents and trashed=false`,
//! following `nextPageToken` until exhausted. Subfolders are visited
//! depth-first; a folder reachable by two paths (shortcuts, multiple
//! parents) is listed once.
//!
//! # Fetching
//!
//! Native Workspace files are exported (`text/plain`, or `text/csv` for
//! sheets). Everything else is downloaded with `alt=media` and handed to
//! [`extract`](crate::extract).

use std::collections::HashSet;

use async_trait::async_trait;
use globset::GlobSet;
use serde::Deserialize;

use drive_ingest_core::models::{ContentType, SourceFile, MIME_GOOGLE_FOLDER};
use drive_ingest_core::{IngestError, Service};

use crate::config::{require_env, SourceConfig};
use crate::connector_fs::build_globset;
use crate::extract::{self, LegacyConverters};
use crate::http;
use crate::traits::FileSource;

const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, modifiedTime, size)";
const PAGE_SIZE: &str = "1000";

#[derive(Debug, Clone)]
pub enum DriveAuth {
    Bearer(String),
    ApiKey(String),
}

impl DriveAuth {
    /// Credentials from `GDRIVE_ACCESS_TOKEN`, falling back to `GDRIVE_API_KEY`.
    pub fn from_env() -> Result<Self, IngestError> {
        if let Ok(token) = require_env("GDRIVE_ACCESS_TOKEN") {
            return Ok(DriveAuth::Bearer(token));
        }
        require_env("GDRIVE_API_KEY")
            .map(DriveAuth::ApiKey)
            .map_err(|_| {
                IngestError::config("GDRIVE_ACCESS_TOKEN or GDRIVE_API_KEY environment variable not set")
            })
    }

    fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            DriveAuth::Bearer(token) => req.bearer_auth(token),
            DriveAuth::ApiKey(key) => req.query(&[("key", key)]),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListPage {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
    #[serde(default)]
    modified_time: Option<String>,
    /// Drive reports sizes as decimal strings; absent for native files.
    #[serde(default)]
    size: Option<String>,
}

/// Files and subfolders found on one listing page.
#[derive(Debug, Default)]
struct PageContents {
    files: Vec<SourceFile>,
    folders: Vec<(String, String)>,
}

pub struct DriveSource {
    client: reqwest::Client,
    api_base: String,
    folder_id: String,
    auth: DriveAuth,
    include_types: Vec<ContentType>,
    exclude: GlobSet,
    max_retries: u32,
    converters: Option<LegacyConverters>,
}

impl DriveSource {
    pub fn new(config: &SourceConfig, auth: DriveAuth) -> Result<Self, IngestError> {
        let folder_id = config
            .folder_id
            .clone()
            .ok_or_else(|| IngestError::config("source.folder_id is required for Drive"))?;
        Ok(Self {
            client: http::build_client(config.timeout_secs)?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            folder_id,
            auth,
            include_types: config.include_types.clone(),
            exclude: build_globset(&config.exclude_globs)?,
            max_retries: 3,
            converters: None,
        })
    }

    pub fn with_legacy_converters(mut self, converters: Option<LegacyConverters>) -> Self {
        self.converters = converters;
        self
    }

    async fn list_page(
        &self,
        folder_id: &str,
        page_token: Option<&str>,
    ) -> Result<FileListPage, IngestError> {
        let url = format!("{}/files", self.api_base);
        let q = format!(
            "'{}' in parents and trashed=false",
            folder_id.replace('\'', "\\'")
        );
        let response = http::send_with_retry(Service::Listing, self.max_retries, || {
            let mut req = self.client.get(&url).query(&[
                ("q", q.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ]);
            if let Some(token) = page_token {
                req = req.query(&[("pageToken", token)]);
            }
            self.auth.apply(req)
        })
        .await?;
        http::json_body(Service::Listing, response).await
    }

    fn sort_page(&self, page: Vec<DriveFile>, folder_path: &str) -> PageContents {
        let mut out = PageContents::default();
        for f in page {
            let path = join_path(folder_path, &f.name);
            if f.mime_type == MIME_GOOGLE_FOLDER {
                out.folders.push((f.id, path));
                continue;
            }
            let Some(content_type) = ContentType::from_mime(&f.mime_type) else {
                tracing::debug!(file = %path, mime = %f.mime_type, "unsupported type, skipping");
                continue;
            };
            if !self.include_types.contains(&content_type) || self.exclude.is_match(&path) {
                continue;
            }
            out.files.push(SourceFile {
                id: f.id,
                name: f.name,
                content_type,
                modified_at: f.modified_time,
                size_bytes: f.size.and_then(|s| s.parse().ok()),
                folder_path: folder_path.to_string(),
            });
        }
        out
    }

    async fn download(&self, file: &SourceFile) -> Result<Vec<u8>, IngestError> {
        let response = match file.content_type.export_mime() {
            Some(export) => {
                let url = format!("{}/files/{}/export", self.api_base, file.id);
                http::send_with_retry(Service::Fetch, self.max_retries, || {
                    self.auth
                        .apply(self.client.get(&url).query(&[("mimeType", export)]))
                })
                .await?
            }
            None => {
                let url = format!("{}/files/{}", self.api_base, file.id);
                http::send_with_retry(Service::Fetch, self.max_retries, || {
                    self.auth.apply(
                        self.client
                            .get(&url)
                            .query(&[("alt", "media"), ("supportsAllDrives", "true")]),
                    )
                })
                .await?
            }
        };
        let bytes = response
            .bytes()
            .await
            .map_err(|e| IngestError::transient(Service::Fetch, e))?;
        Ok(bytes.to_vec())
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

#[async_trait]
impl FileSource for DriveSource {
    fn name(&self) -> &str {
        "drive"
    }

    async fn list_files(&self) -> Result<Vec<SourceFile>, IngestError> {
        let mut files = Vec::new();
        let mut visited = HashSet::new();
        let mut seen_files = HashSet::new();
        let mut stack = vec![(self.folder_id.clone(), String::new())];

        while let Some((folder_id, folder_path)) = stack.pop() {
            if !visited.insert(folder_id.clone()) {
                continue;
            }
            tracing::debug!(folder = %folder_path, "listing folder");

            let mut page_token: Option<String> = None;
            loop {
                let page = self.list_page(&folder_id, page_token.as_deref()).await?;
                let contents = self.sort_page(page.files, &folder_path);
                files.extend(first_listings(&mut seen_files, contents.files));
                // Reverse so the stack visits subfolders in listing order.
                stack.extend(contents.folders.into_iter().rev());
                match page.next_page_token {
                    Some(token) if !token.is_empty() => page_token = Some(token),
                    _ => break,
                }
            }
        }

        Ok(files)
    }

    async fn fetch_text(&self, file: &SourceFile) -> Result<String, IngestError> {
        let bytes = self.download(file).await?;
        extract::extract_file(bytes, file, self.converters.as_ref()).await
    }
}

/// Drops files already listed under another parent folder; the first
/// folder path wins.
fn first_listings(seen: &mut HashSet<String>, files: Vec<SourceFile>) -> Vec<SourceFile> {
    files
        .into_iter()
        .filter(|f| seen.insert(f.id.clone()))
        .collect()
}
