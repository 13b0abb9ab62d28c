//! Deterministic upsert records.
//!
//! Record ids depend only on the source file id and chunk offsets, so
//! re-ingesting a modified file overwrites its previous vectors in place
//! instead of duplicating them.

use crate::models::{Chunk, RecordMetadata, SourceFile, UpsertRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    /// `{file_id}_{start}_{end}`, one record per window.
    Offsets,
    /// `{file_id}_single`, one record per file.
    SinglePerFile,
}

impl IdScheme {
    pub fn record_id(&self, chunk: &Chunk) -> String {
        match self {
            IdScheme::Offsets => format!(
                "{}_{}_{}",
                chunk.source_file_id, chunk.start_offset, chunk.end_offset
            ),
            IdScheme::SinglePerFile => format!("{}_single", chunk.source_file_id),
        }
    }
}

/// Metadata describing `chunk` of `file`. A missing modification time is
/// stored as an empty string.
pub fn metadata(chunk: &Chunk, file: &SourceFile) -> RecordMetadata {
    RecordMetadata {
        text: chunk.text.clone(),
        file_id: file.id.clone(),
        file_name: file.name.clone(),
        folder_path: file.folder_path.clone(),
        content_type: file.content_type.as_str().to_string(),
        mime_type: file.content_type.mime().to_string(),
        modified_time: file.modified_at.clone().unwrap_or_default(),
        start_token: chunk.start_offset,
        end_token: chunk.end_offset,
    }
}

pub fn build(scheme: IdScheme, chunk: &Chunk, file: &SourceFile, values: Vec<f32>) -> UpsertRecord {
    UpsertRecord {
        id: scheme.record_id(chunk),
        values,
        metadata: metadata(chunk, file),
    }
}
