//! Change detection: which listed files need (re)processing.

use std::collections::BTreeMap;

use crate::fingerprint;
use crate::manifest::ManifestEntry;
use crate::models::SourceFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Not present in the manifest.
    New,
    /// Present, but the fingerprint differs or cannot be computed. Entries
    /// without a stored fingerprint fall back to comparing modified times.
    Modified,
    Unchanged,
}

/// Classify one file against its manifest entry, if any.
pub fn change_kind(file: &SourceFile, entry: Option<&ManifestEntry>) -> ChangeKind {
    let Some(entry) = entry else {
        return ChangeKind::New;
    };
    match (fingerprint::of_file(file), entry.fingerprint.as_ref()) {
        (Some(current), Some(stored)) if &current == stored => ChangeKind::Unchanged,
        (_, None) if entry.modified_at.is_some() && entry.modified_at == file.modified_at => {
            ChangeKind::Unchanged
        }
        _ => ChangeKind::Modified,
    }
}

#[derive(Debug, Default)]
pub struct Classification {
    /// New and modified files, in listing order.
    pub to_process: Vec<(SourceFile, ChangeKind)>,
    pub unchanged: usize,
    pub new_count: usize,
    pub modified_count: usize,
}

/// Partition a listing into files to process and files to skip.
///
/// With `force` every file is processed regardless of its entry.
pub fn classify(
    files: Vec<SourceFile>,
    entries: &BTreeMap<String, ManifestEntry>,
    force: bool,
) -> Classification {
    let mut out = Classification::default();
    for file in files {
        let kind = change_kind(&file, entries.get(&file.id));
        match kind {
            ChangeKind::Unchanged if !force => {
                out.unchanged += 1;
                continue;
            }
            ChangeKind::New => out.new_count += 1,
            _ => out.modified_count += 1,
        }
        out.to_process.push((file, kind));
    }
    out
}
