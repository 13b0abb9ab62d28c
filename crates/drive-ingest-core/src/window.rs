//! Overlapping token-window chunker.
//!
//! Splits extracted document text into [`Chunk`]s covering fixed-size
//! windows of tokens. Consecutive windows share `overlap` tokens so that
//! context spanning a boundary is embedded at least once in full.
//!
//! # Algorithm
//!
//! 1. Tokenize the text into atomic units (BPE tokens, words, or chars).
//! 2. Starting at offset 0, emit `[start, min(start + window, total))`.
//! 3. Advance `start` to `end - overlap`.
//! 4. Stop once a window ends at `total`.
//! 5. Trim each window's decoded text; drop windows that are empty.
//!
//! Offsets are token offsets, so a chunk's `(start_offset, end_offset)`
//! pair is stable for a given text and tokenizer and can be used to
//! derive idempotent record ids.
//!
//! # Example
//!
//! ```rust
//! use drive_ingest_core::window::{window, Tokenizer, WindowParams};
//!
//! let params = WindowParams::new(4, 1).unwrap();
//! let chunks = window("a b c d e f g", &Tokenizer::Words, params, "file-1");
//! let ranges: Vec<_> = chunks.iter().map(|c| (c.start_offset, c.end_offset)).collect();
//! assert_eq!(ranges, vec![(0, 4), (3, 7)]);
//! ```

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use crate::error::IngestError;
use crate::models::Chunk;
use crate::record::IdScheme;

/// Suffix appended to text cut short in single-chunk mode.
const TRUNCATION_MARKER: &str = "...";

/// How many tokens may be shaved off either edge of a BPE window when its
/// bytes do not form valid UTF-8 (a multi-byte char cut by the window).
const MAX_EDGE_TRIM: usize = 3;

/// Validated windowing parameters: `window_size > overlap >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    window_size: usize,
    overlap: usize,
}

impl WindowParams {
    pub fn new(window_size: usize, overlap: usize) -> Result<Self, IngestError> {
        if window_size == 0 {
            return Err(IngestError::config("chunking.window_tokens must be > 0"));
        }
        if overlap >= window_size {
            return Err(IngestError::config(format!(
                "chunking.overlap_tokens ({}) must be smaller than chunking.window_tokens ({})",
                overlap, window_size
            )));
        }
        Ok(Self {
            window_size,
            overlap,
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

/// The unit of granularity used to measure windows.
#[derive(Clone)]
pub enum Tokenizer {
    /// Unicode scalar values.
    Chars,
    /// Whitespace-delimited words. Decoded windows keep the original
    /// whitespace between the words they span.
    Words,
    /// Byte-pair encoding as used by the OpenAI embedding models.
    Bpe { name: String, bpe: Arc<CoreBPE> },
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tokenizer({})", self.name())
    }
}

impl Tokenizer {
    /// Resolve a tokenizer by its configuration name.
    pub fn from_name(name: &str) -> Result<Self, IngestError> {
        let bpe = match name {
            "chars" => return Ok(Tokenizer::Chars),
            "words" => return Ok(Tokenizer::Words),
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            other => {
                return Err(IngestError::config(format!(
                    "unknown tokenizer '{}'. Must be cl100k_base, o200k_base, p50k_base, words, or chars",
                    other
                )))
            }
        };
        let bpe = bpe.map_err(|e| {
            IngestError::config(format!("failed to load tokenizer '{}': {}", name, e))
        })?;
        Ok(Tokenizer::Bpe {
            name: name.to_string(),
            bpe: Arc::new(bpe),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Tokenizer::Chars => "chars",
            Tokenizer::Words => "words",
            Tokenizer::Bpe { name, .. } => name,
        }
    }

    /// Number of tokens `text` encodes to.
    pub fn count(&self, text: &str) -> usize {
        match self {
            Tokenizer::Chars => text.chars().count(),
            Tokenizer::Words => text.split_whitespace().count(),
            Tokenizer::Bpe { bpe, .. } => bpe.encode_with_special_tokens(text).len(),
        }
    }
}

/// Offsets of the windows over `total` tokens.
///
/// Never returns two ranges with the same start, so the loop terminates
/// even if the parameters were constructed in an unexpected way.
pub fn window_ranges(total: usize, params: WindowParams) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    if total == 0 {
        return ranges;
    }
    let mut start = 0;
    loop {
        let end = total.min(start + params.window_size);
        ranges.push(start..end);
        if end == total {
            break;
        }
        let next = end - params.overlap;
        if next <= start {
            break;
        }
        start = next;
    }
    ranges
}

/// Split `text` into overlapping chunks.
///
/// Empty or whitespace-only input yields no chunks. Text shorter than one
/// window yields a single chunk.
pub fn window(
    text: &str,
    tokenizer: &Tokenizer,
    params: WindowParams,
    source_file_id: &str,
) -> Vec<Chunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    match tokenizer {
        Tokenizer::Chars => {
            let spans: Vec<Range<usize>> = text
                .char_indices()
                .map(|(i, c)| i..i + c.len_utf8())
                .collect();
            collect_chunks(spans.len(), params, source_file_id, |r| {
                slice_spans(text, &spans, r).to_string()
            })
        }
        Tokenizer::Words => {
            let spans = word_spans(text);
            collect_chunks(spans.len(), params, source_file_id, |r| {
                slice_spans(text, &spans, r).to_string()
            })
        }
        Tokenizer::Bpe { bpe, .. } => {
            let tokens = bpe.encode_with_special_tokens(text);
            collect_chunks(tokens.len(), params, source_file_id, |r| {
                let window = &tokens[r];
                for lead in 0..=MAX_EDGE_TRIM.min(window.len()) {
                    for trail in 0..=MAX_EDGE_TRIM.min(window.len() - lead) {
                        let inner = &window[lead..window.len() - trail];
                        if let Ok(decoded) = bpe.decode(inner.to_vec()) {
                            return decoded;
                        }
                    }
                }
                window
                    .iter()
                    .filter_map(|t| bpe.decode(vec![*t]).ok())
                    .collect()
            })
        }
    }
}

fn collect_chunks<F>(
    total: usize,
    params: WindowParams,
    source_file_id: &str,
    decode: F,
) -> Vec<Chunk>
where
    F: Fn(Range<usize>) -> String,
{
    window_ranges(total, params)
        .into_iter()
        .filter_map(|range| {
            let decoded = decode(range.clone());
            let trimmed = decoded.trim();
            if trimmed.is_empty() {
                return None;
            }
            Some(Chunk {
                text: trimmed.to_string(),
                start_offset: range.start,
                end_offset: range.end,
                source_file_id: source_file_id.to_string(),
            })
        })
        .collect()
}

fn slice_spans<'a>(text: &'a str, spans: &[Range<usize>], r: Range<usize>) -> &'a str {
    &text[spans[r.start].start..spans[r.end - 1].end]
}

/// Byte ranges of the whitespace-delimited words of `text`.
fn word_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut current: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), current) {
            (false, None) => current = Some(i),
            (true, Some(start)) => {
                spans.push(start..i);
                current = None;
            }
            _ => {}
        }
    }
    if let Some(start) = current {
        spans.push(start..text.len());
    }
    spans
}

/// Legacy one-chunk-per-file mode: the first `max_chars` characters of the
/// trimmed text, marked with `...` when cut. Offsets are in characters.
pub fn first_chunk(text: &str, max_chars: usize, source_file_id: &str) -> Option<Chunk> {
    let trimmed = text.trim();
    if trimmed.is_empty() || max_chars == 0 {
        return None;
    }
    let total = trimmed.chars().count();
    let (body, end) = match trimmed.char_indices().nth(max_chars) {
        Some((cut, _)) => (
            format!("{}{}", trimmed[..cut].trim_end(), TRUNCATION_MARKER),
            max_chars,
        ),
        None => (trimmed.to_string(), total),
    };
    Some(Chunk {
        text: body,
        start_offset: 0,
        end_offset: end,
        source_file_id: source_file_id.to_string(),
    })
}

/// Chunking strategy selected by configuration.
#[derive(Debug, Clone)]
pub enum Chunker {
    /// Full overlapping windowing (the default).
    Windowed {
        tokenizer: Tokenizer,
        params: WindowParams,
    },
    /// One truncated chunk per file.
    Single { max_chars: usize },
}

impl Chunker {
    pub fn chunk(&self, source_file_id: &str, text: &str) -> Vec<Chunk> {
        match self {
            Chunker::Windowed { tokenizer, params } => {
                window(text, tokenizer, *params, source_file_id)
            }
            Chunker::Single { max_chars } => first_chunk(text, *max_chars, source_file_id)
                .into_iter()
                .collect(),
        }
    }

    /// Record id scheme matching this chunking mode.
    pub fn id_scheme(&self) -> IdScheme {
        match self {
            Chunker::Windowed { .. } => IdScheme::Offsets,
            Chunker::Single { .. } => IdScheme::SinglePerFile,
        }
    }
}
