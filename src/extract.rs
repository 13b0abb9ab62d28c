//! Text extraction for downloaded documents.
//!
//! Sources supply bytes plus a [`ContentType`]; this module returns plain
//! UTF-8 text. Extraction never panics: malformed input is an
//! [`ExtractError`], which the pipeline turns into a per-file failure.
//!
//! | Content type | Method |
//! |---|---|
//! | pdf | `pdf-extract` |
//! | docx | `word/document.xml` `<w:t>` runs, one line per paragraph |
//! | pptx | `ppt/slides/slideN.xml` `<a:t>` runs, `Slide N: ` prefixed |
//! | google-sheet | CSV rows rendered as `a \| b \| c` |
//! | google-doc, google-slides, plain-text | lossy UTF-8 |
//! | doc-legacy, ppt-legacy | `antiword` / `soffice` when enabled, else a printable-run scrape |
//!
//! The legacy converters are external programs run through
//! [`LegacyConverters`]; any failure there falls back to the scrape.

use std::io::Read;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

use drive_ingest_core::models::{ContentType, SourceFile};
use drive_ingest_core::IngestError;

use crate::config::ExtractConfig;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Shortest printable run kept by the legacy binary scrape.
const MIN_RUN_CHARS: usize = 15;
/// Letters a kept run must contain.
const MIN_RUN_LETTERS: usize = 5;
/// Scraped output at or below this length is treated as noise.
const MIN_SCRAPED_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
    #[error("CSV extraction failed: {0}")]
    Csv(String),
    #[error("converter failed: {0}")]
    Converter(String),
}

/// Extract a fetched file's text, trying the legacy converters first when
/// configured. Parsing runs on the blocking pool.
pub async fn extract_file(
    bytes: Vec<u8>,
    file: &SourceFile,
    converters: Option<&LegacyConverters>,
) -> Result<String, IngestError> {
    if let Some(converters) = converters {
        if let Some(text) = converters.convert(&bytes, file.content_type).await {
            return Ok(text);
        }
    }
    let content_type = file.content_type;
    tokio::task::spawn_blocking(move || extract_text(&bytes, content_type))
        .await
        .map_err(|e| IngestError::extraction(&file.name, e))?
        .map_err(|e| IngestError::extraction(&file.name, e))
}

/// Extract plain text from `bytes` of the given type.
pub fn extract_text(bytes: &[u8], content_type: ContentType) -> Result<String, ExtractError> {
    let text = match content_type {
        ContentType::Pdf => extract_pdf(bytes)?,
        ContentType::Docx => extract_docx(bytes)?,
        ContentType::Pptx => extract_pptx(bytes)?,
        ContentType::GoogleSheet => csv_to_text(bytes)?,
        ContentType::GoogleDoc | ContentType::GoogleSlides | ContentType::PlainText => {
            String::from_utf8_lossy(bytes).into_owned()
        }
        ContentType::DocLegacy | ContentType::PptLegacy => scrape_printable_runs(bytes),
    };
    Ok(text.trim().to_string())
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn open_archive(bytes: &[u8]) -> Result<Archive<'_>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut Archive<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    let paragraphs = collect_text_runs(&xml, b"p")?;
    Ok(paragraphs.join("\n"))
}

fn extract_pptx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .filter_map(|n| {
            n.trim_start_matches("ppt/slides/slide")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .ok()
                .map(|num| (num, n.to_string()))
        })
        .collect();
    slides.sort();

    let mut lines = Vec::new();
    for (num, name) in slides {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        for shape_text in collect_text_runs(&xml, b"sp")? {
            lines.push(format!("Slide {}: {}", num, shape_text));
        }
    }
    Ok(lines.join("\n"))
}

/// Concatenate every `<*:t>` text run, grouped by the enclosing `group`
/// element (`w:p` paragraphs, `p:sp` shapes). Empty groups are dropped.
fn collect_text_runs(xml: &[u8], group: &[u8]) -> Result<Vec<String>, ExtractError> {
    use quick_xml::events::Event;

    let mut groups = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                if name.as_ref() == b"t" {
                    in_text = false;
                } else if name.as_ref() == b"p" && group != b"p" {
                    if !current.is_empty() {
                        current.push('\n');
                    }
                } else if name.as_ref() == group {
                    let trimmed = current.trim();
                    if !trimmed.is_empty() {
                        groups.push(trimmed.to_string());
                    }
                    current.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    let trailing = current.trim();
    if !trailing.is_empty() {
        groups.push(trailing.to_string());
    }
    Ok(groups)
}

/// Render CSV as one line per row with non-empty cells joined by ` | `.
pub fn csv_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractError::Csv(e.to_string()))?;
        let cells: Vec<&str> = record
            .iter()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();
        if !cells.is_empty() {
            lines.push(cells.join(" | "));
        }
    }
    Ok(lines.join("\n"))
}

/// External programs for the binary Office formats: `antiword` prints a
/// `.doc` to stdout, `soffice --headless --convert-to txt` writes a `.txt`
/// next to the `.ppt` copy.
#[derive(Debug, Clone)]
pub struct LegacyConverters {
    antiword: String,
    soffice: String,
    timeout: Duration,
}

impl LegacyConverters {
    /// `None` unless `[extract] legacy_converters` is enabled.
    pub fn from_config(config: &ExtractConfig) -> Option<Self> {
        config.legacy_converters.then(|| Self {
            antiword: config.antiword_path.clone(),
            soffice: config.soffice_path.clone(),
            timeout: Duration::from_secs(config.converter_timeout_secs),
        })
    }

    /// Converted text, or `None` when the type has no converter or the
    /// conversion fails, times out, or yields nothing.
    pub async fn convert(&self, bytes: &[u8], content_type: ContentType) -> Option<String> {
        let program = match content_type {
            ContentType::DocLegacy => &self.antiword,
            ContentType::PptLegacy => &self.soffice,
            _ => return None,
        };
        match self.run(bytes, content_type).await {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                tracing::debug!(%program, "converter produced no text, scraping instead");
                None
            }
            Err(error) => {
                tracing::warn!(%program, %error, "converter failed, scraping instead");
                None
            }
        }
    }

    async fn run(&self, bytes: &[u8], content_type: ContentType) -> Result<String, ExtractError> {
        let io_err = |e: std::io::Error| ExtractError::Converter(e.to_string());
        let dir = tempfile::tempdir().map_err(io_err)?;
        let ppt = content_type == ContentType::PptLegacy;
        let input = dir.path().join(if ppt { "input.ppt" } else { "input.doc" });
        tokio::fs::write(&input, bytes).await.map_err(io_err)?;

        let mut command = self.command(ppt, &input, dir.path());
        command.kill_on_drop(true);
        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                ExtractError::Converter(format!("timed out after {}s", self.timeout.as_secs()))
            })?
            .map_err(io_err)?;
        if !output.status.success() {
            return Err(ExtractError::Converter(format!("exited with {}", output.status)));
        }

        if ppt {
            let converted = tokio::fs::read(dir.path().join("input.txt"))
                .await
                .map_err(io_err)?;
            Ok(String::from_utf8_lossy(&converted).into_owned())
        } else {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
    }

    fn command(&self, ppt: bool, input: &Path, outdir: &Path) -> Command {
        if ppt {
            let mut command = Command::new(&self.soffice);
            command
                .args(["--headless", "--convert-to", "txt", "--outdir"])
                .arg(outdir)
                .arg(input);
            command
        } else {
            let mut command = Command::new(&self.antiword);
            command.arg(input);
            command
        }
    }
}

/// Best-effort text from legacy binary Office files.
///
/// Keeps runs of more than 15 printable ASCII characters that contain more
/// than 5 letters, dropping runs already contained (case-insensitively) in
/// an earlier run. Returns an empty string unless the result exceeds 100
/// characters.
pub fn scrape_printable_runs(bytes: &[u8]) -> String {
    let mut kept: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    for run in bytes.split(|b| !(0x20..=0x7e).contains(b)) {
        if run.len() < MIN_RUN_CHARS {
            continue;
        }
        // Printable ASCII is valid UTF-8.
        let text = String::from_utf8_lossy(run);
        let text = text.trim();
        if text.len() <= MIN_RUN_CHARS {
            continue;
        }
        let letters = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
        if letters <= MIN_RUN_LETTERS {
            continue;
        }
        let lower = text.to_ascii_lowercase();
        if seen.iter().any(|s| s.contains(&lower)) {
            continue;
        }
        seen.push(lower);
        kept.push(text.to_string());
    }

    let joined = kept.join(" ");
    if joined.len() > MIN_SCRAPED_CHARS {
        joined
    } else {
        String::new()
    }
}
