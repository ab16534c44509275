//! Duplicate-upload detection by archive checksum.
//!
//! Identity of a bundle is its checksum, never its file name. A match
//! against an already published version is a hard stop for the caller:
//! uploading would create a new version with identical code.

use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;

/// A published version, as listed by the management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    #[serde(rename = "version")]
    pub identifier: String,
    pub checksum: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

/// Outcome of [`check_duplicate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateCheckResult {
    /// No published version has this checksum.
    Clear,
    /// First published version with the same checksum.
    Duplicate(VersionRecord),
}

impl DuplicateCheckResult {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Compare a freshly built bundle against published versions.
pub fn check_duplicate(bundle: &Bundle, existing: &[VersionRecord]) -> DuplicateCheckResult {
    check_checksum(&bundle.checksum, existing)
}

/// Linear scan; reports the first match.
///
/// Checksums are assumed unique per upload on the server side. If the list
/// holds several matches, only the first is reported.
pub fn check_checksum(checksum: &str, existing: &[VersionRecord]) -> DuplicateCheckResult {
    let wanted = checksum.trim();
    existing
        .iter()
        .find(|v| v.checksum.trim().eq_ignore_ascii_case(wanted))
        .map_or(DuplicateCheckResult::Clear, |v| {
            tracing::debug!(version = %v.identifier, checksum = %wanted, "duplicate bundle checksum");
            DuplicateCheckResult::Duplicate(v.clone())
        })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VersionListing {
    Wrapped { versions: Vec<VersionRecord> },
    Bare(Vec<VersionRecord>),
}

/// Parse a version listing: either a bare array or `{"versions": [...]}`.
pub fn parse_version_list(json: &[u8]) -> Result<Vec<VersionRecord>, serde_json::Error> {
    Ok(match serde_json::from_slice(json)? {
        VersionListing::Wrapped { versions } => versions,
        VersionListing::Bare(versions) => versions,
    })
}
