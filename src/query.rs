//! Semantic query over the ingested index.
//!
//! `ingest query "<text>"` embeds the text with the configured embedder,
//! asks the index for the nearest chunks in the configured namespace, and
//! prints them best first. With `--context-chars N` it instead assembles a
//! chat context block from the matched chunk texts, bounded to `N`
//! characters.

use anyhow::Result;
use serde::Serialize;

use drive_ingest_core::embedding::Embedder;
use drive_ingest_core::store::{MetadataFilter, QueryMatch, VectorIndex};
use drive_ingest_core::IngestError;

use crate::config::Config;
use crate::embedding::embed_query;
use crate::ingest::build_targets;

/// Partial results shorter than this are not worth appending.
const MIN_PARTIAL_CHARS: usize = 100;

#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub text: String,
    pub top_k: usize,
    pub filters: Vec<String>,
    pub context_chars: Option<usize>,
}

/// Parse repeated `key=value` arguments into an equality filter.
pub fn parse_filters(args: &[String]) -> Result<MetadataFilter, IngestError> {
    let mut filter = MetadataFilter::default();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .filter(|(k, _)| !k.trim().is_empty())
            .ok_or_else(|| {
                IngestError::config(format!("invalid filter '{}': expected key=value", arg))
            })?;
        filter
            .equals
            .insert(key.trim().to_string(), value.trim().to_string());
    }
    Ok(filter)
}

/// Embed `text` and return the `top_k` nearest chunks.
pub async fn search(
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    namespace: &str,
    text: &str,
    top_k: usize,
    filter: &MetadataFilter,
) -> Result<Vec<QueryMatch>, IngestError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let vector = embed_query(embedder, text).await?;
    let filter = (!filter.is_empty()).then_some(filter);
    index.query(&vector, top_k, namespace, filter).await
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextSource {
    pub file: String,
    pub folder: String,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatContext {
    pub context: String,
    pub sources: Vec<ContextSource>,
    /// Characters of whole results included.
    pub context_length: usize,
}

/// Assemble a context block of at most `max_chars` characters of chunk text.
///
/// Results are taken in the given order while they fit whole. The first
/// one that does not fit is truncated and suffixed with `...`, but only if
/// more than 100 characters of budget remain; assembly stops there.
pub fn chat_context(matches: &[QueryMatch], max_chars: usize) -> ChatContext {
    let mut parts: Vec<String> = Vec::new();
    let mut sources = Vec::new();
    let mut used = 0usize;

    for m in matches {
        let text = m.field("text").unwrap_or_default();
        let len = text.chars().count();
        if used + len <= max_chars {
            parts.push(text.to_string());
            sources.push(source_of(m));
            used += len;
            continue;
        }

        let remaining = max_chars - used;
        if remaining > MIN_PARTIAL_CHARS {
            let partial: String = text.chars().take(remaining).collect();
            parts.push(format!("{}...", partial));
            sources.push(source_of(m));
        }
        break;
    }

    ChatContext {
        context: parts.join("\n\n"),
        sources,
        context_length: used,
    }
}

fn source_of(m: &QueryMatch) -> ContextSource {
    ContextSource {
        file: m.field("file_name").unwrap_or("Unknown").to_string(),
        folder: m.field("folder_path").unwrap_or_default().to_string(),
        score: m.score,
    }
}

fn snippet(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() > max_chars {
        format!("{}...", flat.chars().take(max_chars).collect::<String>())
    } else {
        flat.to_string()
    }
}

/// Entry point for `ingest query`.
pub async fn run_query(config: &Config, args: QueryArgs) -> Result<()> {
    let filter = parse_filters(&args.filters)?;
    let targets = build_targets(config).await?;
    let matches = search(
        targets.embedder.as_ref(),
        targets.index.as_ref(),
        &config.index.namespace,
        &args.text,
        args.top_k,
        &filter,
    )
    .await?;

    if matches.is_empty() {
        println!("No results.");
        return Ok(());
    }

    if let Some(max_chars) = args.context_chars {
        let ctx = chat_context(&matches, max_chars);
        println!("{}", ctx.context);
        println!();
        println!("sources ({}):", ctx.sources.len());
        for (i, s) in ctx.sources.iter().enumerate() {
            println!("  {}. [{:.3}] {} ({})", i + 1, s.score, s.file, s.folder);
        }
        return Ok(());
    }

    for (i, m) in matches.iter().enumerate() {
        println!(
            "{}. [{:.3}] {}",
            i + 1,
            m.score,
            m.field("file_name").unwrap_or("(unknown)")
        );
        if let Some(folder) = m.field("folder_path").filter(|f| !f.is_empty()) {
            println!("    folder: {}", folder);
        }
        println!(
            "    excerpt: \"{}\"",
            snippet(m.field("text").unwrap_or_default(), 200)
        );
        println!("    id: {}", m.id);
        println!();
    }
    Ok(())
}
