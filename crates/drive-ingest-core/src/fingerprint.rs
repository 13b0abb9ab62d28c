//! Cheap change fingerprints derived from source metadata.
//!
//! A fingerprint never looks at file content: it hashes the modification
//! timestamp and size the source reports, so an unchanged file can be
//! skipped without downloading it.

use std::fmt;

use serde::{Deserialize, Serialize};
use md5::{Digest, Md5};

use crate::models::SourceFile;

/// Hex digest identifying one revision of a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Fingerprint(s)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// MD5 hex of `"{modified_at}_{size}"`, with an unknown size taken as 0.
///
/// The digest matches the `hash` values in manifests written by earlier
/// ingestion runs, so those entries keep classifying as unchanged.
///
/// Returns `None` when the source reports no modification time; such a
/// file can never be proven unchanged.
pub fn fingerprint(modified_at: Option<&str>, size_bytes: Option<u64>) -> Option<Fingerprint> {
    let modified = modified_at?;
    let input = format!("{}_{}", modified, size_bytes.unwrap_or(0));
    Some(Fingerprint(hex::encode(Md5::digest(input.as_bytes()))))
}

/// Fingerprint of a listed file.
pub fn of_file(file: &SourceFile) -> Option<Fingerprint> {
    fingerprint(file.modified_at.as_deref(), file.size_bytes)
}
