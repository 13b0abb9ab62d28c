//! Core data models used throughout drive-ingest.
//!
//! These types represent the files, chunks, and upsert records that flow
//! through the ingestion pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

pub const MIME_GOOGLE_DOC: &str = "application/vnd.google-apps.document";
pub const MIME_GOOGLE_SLIDES: &str = "application/vnd.google-apps.presentation";
pub const MIME_GOOGLE_SHEET: &str = "application/vnd.google-apps.spreadsheet";
pub const MIME_GOOGLE_FOLDER: &str = "application/vnd.google-apps.folder";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_PPT: &str = "application/vnd.ms-powerpoint";
pub const MIME_TEXT: &str = "text/plain";

/// Normalized type tag of an ingestible file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    GoogleDoc,
    GoogleSlides,
    GoogleSheet,
    Pdf,
    Docx,
    Pptx,
    DocLegacy,
    PptLegacy,
    PlainText,
}

impl ContentType {
    pub const ALL: [ContentType; 9] = [
        ContentType::GoogleDoc,
        ContentType::GoogleSlides,
        ContentType::GoogleSheet,
        ContentType::Pdf,
        ContentType::Docx,
        ContentType::Pptx,
        ContentType::DocLegacy,
        ContentType::PptLegacy,
        ContentType::PlainText,
    ];

    /// Map a source MIME type to a content type. Unsupported types return `None`.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            MIME_GOOGLE_DOC => Some(ContentType::GoogleDoc),
            MIME_GOOGLE_SLIDES => Some(ContentType::GoogleSlides),
            MIME_GOOGLE_SHEET => Some(ContentType::GoogleSheet),
            MIME_PDF => Some(ContentType::Pdf),
            MIME_DOCX => Some(ContentType::Docx),
            MIME_PPTX => Some(ContentType::Pptx),
            MIME_DOC => Some(ContentType::DocLegacy),
            MIME_PPT => Some(ContentType::PptLegacy),
            MIME_TEXT => Some(ContentType::PlainText),
            _ => None,
        }
    }

    /// Map a local file extension (without the dot, any case) to a content type.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(ContentType::Pdf),
            "docx" => Some(ContentType::Docx),
            "pptx" => Some(ContentType::Pptx),
            "doc" => Some(ContentType::DocLegacy),
            "ppt" => Some(ContentType::PptLegacy),
            "txt" | "md" => Some(ContentType::PlainText),
            "csv" => Some(ContentType::GoogleSheet),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ContentType::GoogleDoc => MIME_GOOGLE_DOC,
            ContentType::GoogleSlides => MIME_GOOGLE_SLIDES,
            ContentType::GoogleSheet => MIME_GOOGLE_SHEET,
            ContentType::Pdf => MIME_PDF,
            ContentType::Docx => MIME_DOCX,
            ContentType::Pptx => MIME_PPTX,
            ContentType::DocLegacy => MIME_DOC,
            ContentType::PptLegacy => MIME_PPT,
            ContentType::PlainText => MIME_TEXT,
        }
    }

    /// Export format for native Google Workspace files; `None` for files
    /// that are downloaded as raw bytes.
    pub fn export_mime(&self) -> Option<&'static str> {
        match self {
            ContentType::GoogleDoc | ContentType::GoogleSlides => Some("text/plain"),
            ContentType::GoogleSheet => Some("text/csv"),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::GoogleDoc => "google-doc",
            ContentType::GoogleSlides => "google-slides",
            ContentType::GoogleSheet => "google-sheet",
            ContentType::Pdf => "pdf",
            ContentType::Docx => "docx",
            ContentType::Pptx => "pptx",
            ContentType::DocLegacy => "doc-legacy",
            ContentType::PptLegacy => "ppt-legacy",
            ContentType::PlainText => "plain-text",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .iter()
            .copied()
            .find(|ct| ct.as_str() == s)
            .ok_or_else(|| {
                IngestError::config(format!(
                    "unknown content type '{}'. Expected one of: {}",
                    s,
                    ContentType::ALL.map(|ct| ct.as_str()).join(", ")
                ))
            })
    }
}

/// A unit of ingestible content as reported by a file source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub id: String,
    pub name: String,
    pub content_type: ContentType,
    /// Last modification timestamp, verbatim from the source.
    pub modified_at: Option<String>,
    pub size_bytes: Option<u64>,
    /// Human-readable ancestry, informational only.
    pub folder_path: String,
}

/// A window over the token sequence of a file's extracted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub source_file_id: String,
}

/// Provenance carried with every vector in the index.
///
/// Field order is fixed so identical inputs serialize to identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub text: String,
    pub file_id: String,
    pub file_name: String,
    pub folder_path: String,
    pub content_type: String,
    pub mime_type: String,
    pub modified_time: String,
    pub start_token: usize,
    pub end_token: usize,
}

/// A single addressable vector-index entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_roundtrip_for_all_types() {
        for ct in ContentType::ALL {
            assert_eq!(ContentType::from_mime(ct.mime()), Some(ct));
            assert_eq!(ct.as_str().parse::<ContentType>().unwrap(), ct);
        }
    }

    #[test]
    fn test_folder_mime_is_not_content() {
        assert_eq!(ContentType::from_mime(MIME_GOOGLE_FOLDER), None);
        assert_eq!(ContentType::from_mime("image/png"), None);
    }

    #[test]
    fn test_extension_mapping() {
        assert_eq!(ContentType::from_extension("PDF"), Some(ContentType::Pdf));
        assert_eq!(ContentType::from_extension("md"), Some(ContentType::PlainText));
        assert_eq!(ContentType::from_extension("ppt"), Some(ContentType::PptLegacy));
        assert_eq!(ContentType::from_extension("exe"), None);
    }

    #[test]
    fn test_unknown_type_is_config_error() {
        let err = "spreadsheet".parse::<ContentType>().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("google-sheet"));
    }

    #[test]
    fn test_export_only_for_workspace_types() {
        assert_eq!(ContentType::GoogleSheet.export_mime(), Some("text/csv"));
        assert_eq!(ContentType::GoogleDoc.export_mime(), Some("text/plain"));
        assert_eq!(ContentType::Pdf.export_mime(), None);
    }
}
