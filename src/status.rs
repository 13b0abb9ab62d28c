//! Manifest and index overview.
//!
//! Provides a quick summary of what has been ingested: files and chunks
//! recorded in the manifest, when the last run finished, how many entries
//! still lack a fingerprint (legacy manifests), and, when index credentials
//! are available, the vector count of the configured namespace. Used by
//! `ingest status`.

use anyhow::Result;
use chrono::{DateTime, Utc};

use drive_ingest_core::manifest::Manifest;

use crate::config::Config;
use crate::index_pinecone::PineconeIndex;
use crate::manifest_store::{JsonFileManifestStore, ManifestStore};

/// Run the status command: load the manifest and print a summary.
pub async fn run_status(config: &Config) -> Result<()> {
    let store = JsonFileManifestStore::new(&config.manifest.path);
    let manifest = store.load().await?;
    let size = std::fs::metadata(store.path()).map(|m| m.len()).ok();

    println!("drive-ingest status");
    println!("===================");
    println!();
    println!("  Manifest:    {}", store.path().display());
    match size {
        Some(bytes) => println!("  Size:        {}", format_bytes(bytes)),
        None => println!("  Size:        (not created yet)"),
    }
    print_manifest(&manifest);

    println!();
    if std::env::var("PINECONE_API_KEY").map_or(true, |v| v.is_empty()) {
        println!("  Index:       (PINECONE_API_KEY not set)");
    } else {
        match PineconeIndex::connect(&config.index).await {
            Ok(index) => match index.stats().await {
                Ok(stats) => {
                    let in_ns = stats
                        .namespaces
                        .get(&config.index.namespace)
                        .map(|n| n.vector_count)
                        .unwrap_or(0);
                    println!("  Index:       {}", index.host());
                    if let Some(d) = stats.dimension {
                        println!("  Dimension:   {}", d);
                    }
                    println!(
                        "  Vectors:     {} in '{}' ({} total)",
                        in_ns, config.index.namespace, stats.total_vector_count
                    );
                }
                Err(e) => println!("  Index:       unavailable ({})", e),
            },
            Err(e) => println!("  Index:       unavailable ({})", e),
        }
    }
    println!();
    Ok(())
}

fn print_manifest(manifest: &Manifest) {
    let legacy = manifest
        .processed_files
        .values()
        .filter(|e| e.fingerprint.is_none())
        .count();
    let last_run = manifest
        .last_run
        .as_deref()
        .map(format_ts_relative)
        .unwrap_or_else(|| "never".to_string());

    println!("  Last run:    {}", last_run);
    println!();
    println!("  Files:       {}", manifest.len());
    println!("  Chunks:      {}", manifest.total_chunks);
    if legacy > 0 {
        println!("  Unfingerprinted: {} (matched by modified time)", legacy);
    }

    let mut recent: Vec<_> = manifest.processed_files.values().collect();
    recent.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
    if !recent.is_empty() {
        println!();
        println!("  Recently processed:");
        println!("  {:<48} {:>6}   {}", "FILE", "CHUNKS", "PROCESSED");
        println!("  {}", "-".repeat(76));
        for e in recent.iter().take(10) {
            println!(
                "  {:<48} {:>6}   {}",
                truncate_name(&e.name, 48),
                e.chunk_count,
                format_ts_relative(&e.processed_at)
            );
        }
    }
}

fn truncate_name(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let head: String = name.chars().take(width - 3).collect();
        format!("{}...", head)
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format an RFC 3339 timestamp relative to now (e.g. "3 hours ago").
/// Unparseable input is shown as-is.
fn format_ts_relative(ts: &str) -> String {
    match DateTime::parse_from_rfc3339(ts) {
        Ok(dt) => relative_to(dt.with_timezone(&Utc), Utc::now()),
        Err(_) if ts.is_empty() => "unknown".to_string(),
        Err(_) => ts.to_string(),
    }
}

fn relative_to(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = (now - then).num_seconds();
    if delta < 0 {
        return then.format("%Y-%m-%d %H:%M").to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        then.format("%Y-%m-%d %H:%M").to_string()
    }
}
