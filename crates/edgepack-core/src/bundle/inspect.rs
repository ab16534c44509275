//! Read-only listing of an existing bundle archive.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::tar_read;
use crate::error::{BuildError, BuildResult, ValidationError};
use crate::manifest::{self, Manifest};

const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;

/// One archive member as seen by [`inspect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub path: String,
    pub size: u64,
    pub is_file: bool,
}

/// Members of an archive plus its root manifest, if any.
#[derive(Debug, Clone)]
pub struct BundleListing {
    pub members: Vec<MemberInfo>,
    /// Outcome of validating the root manifest member; `None` if absent.
    pub manifest: Option<Result<Manifest, ValidationError>>,
}

/// List members of `archive` and validate its root `manifest_file` member.
pub fn inspect(archive: &Path, manifest_file: &str) -> BuildResult<BundleListing> {
    let file = File::open(archive).map_err(|_| BuildError::ArchiveNotFound {
        path: archive.to_path_buf(),
    })?;
    let (mut tar, _) = tar_read::open_gz_archive(BufReader::new(file));

    let mut members = Vec::new();
    let mut manifest = None;
    let entries = tar.entries().map_err(|e| BuildError::io(archive, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| BuildError::io(archive, e))?;
        let name = tar_read::member_name(&entry.path().map_err(|e| BuildError::io(archive, e))?);
        let is_file = entry.header().entry_type().is_file();

        if is_file && name == manifest_file && manifest.is_none() {
            let bytes = tar_read::read_bounded(&mut entry, MAX_MANIFEST_BYTES)
                .map_err(|e| BuildError::io(archive, e))?;
            manifest = Some(match bytes {
                Some(bytes) => manifest::validate(&bytes),
                None => Err(ValidationError::NotJson {
                    reason: format!("manifest exceeds {} bytes", MAX_MANIFEST_BYTES),
                }),
            });
        }

        members.push(MemberInfo {
            path: name,
            size: entry.size(),
            is_file,
        });
    }

    Ok(BundleListing { members, manifest })
}
