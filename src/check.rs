//! Configuration and connectivity health check (`ingest check`).
//!
//! Verifies, in order, that secrets are present, that the source can be
//! listed, and that the index is reachable with a dimension matching the
//! configured embedding model. Nothing is embedded or written.

use anyhow::{bail, Result};

use drive_ingest_core::store::VectorIndex;

use crate::config::{require_env, Config, EmbeddingProviderKind, SourceKind};
use crate::connector_drive::DriveAuth;
use crate::index_pinecone::PineconeIndex;
use crate::ingest::build_source;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRow {
    pub name: &'static str,
    pub ok: bool,
    pub detail: String,
}

impl CheckRow {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            ok: true,
            detail: detail.into(),
        }
    }

    fn fail(name: &'static str, detail: impl std::fmt::Display) -> Self {
        Self {
            name,
            ok: false,
            detail: detail.to_string(),
        }
    }
}

/// Secret checks only; never touches the network.
pub fn check_secrets(config: &Config) -> Vec<CheckRow> {
    let mut rows = Vec::new();

    rows.push(match config.source.kind {
        SourceKind::Drive => match DriveAuth::from_env() {
            Ok(DriveAuth::Bearer(_)) => CheckRow::pass("drive auth", "GDRIVE_ACCESS_TOKEN"),
            Ok(DriveAuth::ApiKey(_)) => CheckRow::pass("drive auth", "GDRIVE_API_KEY"),
            Err(e) => CheckRow::fail("drive auth", e),
        },
        SourceKind::Filesystem => CheckRow::pass("source auth", "not required"),
    });

    rows.push(match config.embedding.provider {
        EmbeddingProviderKind::OpenAi => match require_env("OPENAI_API_KEY") {
            Ok(_) => CheckRow::pass("embedding key", "OPENAI_API_KEY"),
            Err(e) => CheckRow::fail("embedding key", e),
        },
        EmbeddingProviderKind::Ollama => CheckRow::pass("embedding key", "not required"),
    });

    rows.push(match require_env("PINECONE_API_KEY") {
        Ok(_) => CheckRow::pass("index key", "PINECONE_API_KEY"),
        Err(e) => CheckRow::fail("index key", e),
    });

    rows
}

async fn check_source(config: &Config) -> CheckRow {
    let source = match build_source(config) {
        Ok(s) => s,
        Err(e) => return CheckRow::fail("source", e),
    };
    match source.list_files().await {
        Ok(files) => CheckRow::pass(
            "source",
            format!("{} lists {} supported files", source.name(), files.len()),
        ),
        Err(e) => CheckRow::fail("source", e),
    }
}

async fn check_index(config: &Config) -> CheckRow {
    let index = match PineconeIndex::connect(&config.index).await {
        Ok(i) => i,
        Err(e) => return CheckRow::fail("index", e),
    };
    match index.dimension().await {
        Ok(Some(d)) if d != config.embedding.dims => CheckRow::fail(
            "index",
            format!(
                "dimension {} does not match embedding.dims {}",
                d, config.embedding.dims
            ),
        ),
        Ok(Some(d)) => CheckRow::pass("index", format!("{} (dimension {})", index.host(), d)),
        Ok(None) => CheckRow::pass("index", format!("{} (dimension unknown)", index.host())),
        Err(e) => CheckRow::fail("index", e),
    }
}

pub async fn run_check(config: &Config) -> Result<()> {
    let mut rows = vec![CheckRow::pass("config", "valid")];
    rows.extend(check_secrets(config));

    let source_auth_ok = rows.iter().take(2).all(|r| r.ok);
    if source_auth_ok {
        rows.push(check_source(config).await);
    }
    if rows.iter().any(|r| r.name == "index key" && r.ok) {
        rows.push(check_index(config).await);
    }

    println!("{:<16} {:<6} DETAIL", "CHECK", "STATUS");
    for row in &rows {
        println!(
            "{:<16} {:<6} {}",
            row.name,
            if row.ok { "OK" } else { "FAIL" },
            row.detail
        );
    }

    let failed = rows.iter().filter(|r| !r.ok).count();
    if failed > 0 {
        bail!("{} check(s) failed", failed);
    }
    Ok(())
}
