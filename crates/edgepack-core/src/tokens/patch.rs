//! Token injection into an existing bundle archive or a plain directory.
//!
//! # Archive mode
//!
//! The archive is streamed entry by entry into a new archive in a temp file
//! next to it. Every entry except the token file is copied verbatim (header,
//! PAX extensions, payload). The token file is the only entry buffered: it is
//! parsed, merged and re-serialized. If the archive has no token file, one is
//! appended. The temp file replaces the original only after the new archive
//! is complete, so any failure leaves the original untouched.
//!
//! # Directory mode
//!
//! The token file under the directory is read (or started empty), merged and
//! atomically rewritten. No other file is touched.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::store::{TokenRecord, TokenRecordStore};
use crate::bundle::{tar_read, tar_write};
use crate::config::PackConfig;
use crate::error::{ParseError, PatchError, PatchResult};

/// What to patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchTarget {
    /// Existing gzip'd tar archive, replaced in place.
    Archive(PathBuf),
    /// Directory holding the token file directly.
    Directory(PathBuf),
}

impl PatchTarget {
    /// Directory mode for an existing directory, archive mode otherwise.
    pub fn detect(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::Directory(path)
        } else {
            Self::Archive(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Archive(p) | Self::Directory(p) => p,
        }
    }
}

/// Whether the token file existed before the patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenEntryChange {
    Updated,
    Created,
}

/// Result of a successful patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Archive or token file that was replaced.
    pub path: PathBuf,
    pub change: TokenEntryChange,
    /// Entries passed through unchanged (archive mode only).
    pub entries_copied: usize,
    /// Namespaces now bound to the record.
    pub namespaces: Vec<String>,
}

/// Injects token records according to a [`PackConfig`].
#[derive(Debug, Clone)]
pub struct TokenPatcher {
    token_file: String,
    max_token_file_bytes: u64,
    compression_level: u32,
}

impl TokenPatcher {
    pub fn new(config: &PackConfig) -> Self {
        Self {
            token_file: config.token_file.clone(),
            max_token_file_bytes: config.max_token_file_bytes,
            compression_level: config.compression_level,
        }
    }

    pub fn with_token_file(mut self, name: impl Into<String>) -> Self {
        self.token_file = name.into();
        self
    }

    pub fn token_file(&self) -> &str {
        &self.token_file
    }

    /// Merge `record` under `namespaces` into the token file of `target`.
    pub fn patch<S: AsRef<str>>(
        &self,
        target: &PatchTarget,
        namespaces: &[S],
        record: &TokenRecord,
        overwrite: bool,
    ) -> PatchResult<PatchOutcome> {
        match target {
            PatchTarget::Archive(path) => self.patch_archive(path, namespaces, record, overwrite),
            PatchTarget::Directory(dir) => self.patch_directory(dir, namespaces, record, overwrite),
        }
    }

    fn patch_archive<S: AsRef<str>>(
        &self,
        path: &Path,
        namespaces: &[S],
        record: &TokenRecord,
        overwrite: bool,
    ) -> PatchResult<PatchOutcome> {
        let source = File::open(path).map_err(|e| PatchError::unreadable(path, e))?;
        let permissions = source
            .metadata()
            .map_err(|e| PatchError::unreadable(path, e))?
            .permissions();

        let mut tmp = tempfile::Builder::new()
            .prefix(".edgepack-")
            .suffix(".tmp")
            .tempfile_in(parent_dir(path))
            .map_err(|e| PatchError::unwritable(path, e))?;

        let (change, entries_copied) =
            self.rewrite_archive(path, source, tmp.as_file_mut(), namespaces, record, overwrite)?;

        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| PatchError::unwritable(path, e))?;
        tmp.persist(path)
            .map_err(|e| PatchError::unwritable(path, e.error))?;

        info!(
            path = %path.display(),
            token_file = %self.token_file,
            entries_copied,
            ?change,
            "token archive patched"
        );

        Ok(PatchOutcome {
            path: path.to_path_buf(),
            change,
            entries_copied,
            namespaces: owned(namespaces),
        })
    }

    /// Stream `source` into `dest`, rewriting the token entry.
    fn rewrite_archive<S: AsRef<str>>(
        &self,
        path: &Path,
        source: File,
        dest: &mut File,
        namespaces: &[S],
        record: &TokenRecord,
        overwrite: bool,
    ) -> PatchResult<(TokenEntryChange, usize)> {
        let (mut archive, source_failed) = tar_read::open_gz_archive(BufReader::new(source));
        let mut out = tar_write::create_deterministic_tar(BufWriter::new(dest), self.compression_level);

        // Errors while copying may come from either side; the source reader
        // flags its own failures.
        let classify = |e: io::Error| {
            if source_failed.get() {
                PatchError::unreadable(path, e)
            } else {
                PatchError::unwritable(path, e)
            }
        };

        let mut change = TokenEntryChange::Created;
        let mut copied = 0_usize;

        let entries = archive
            .entries()
            .map_err(|e| PatchError::unreadable(path, e))?;
        for entry in entries {
            let mut entry = entry.map_err(|e| PatchError::unreadable(path, e))?;
            let name = tar_read::member_name(
                &entry
                    .path()
                    .map_err(|e| PatchError::unreadable(path, e))?,
            );

            if name == self.token_file && entry.header().entry_type().is_file() {
                if entry.size() > self.max_token_file_bytes {
                    return Err(self.too_large());
                }
                let bytes = tar_read::read_bounded(&mut entry, self.max_token_file_bytes)
                    .map_err(|e| PatchError::unreadable(path, e))?
                    .ok_or_else(|| self.too_large())?;
                let store = self.merged_store(Some(bytes), namespaces, record, overwrite)?;
                tar_write::write_entry(&mut out, &name, store.serialize().as_bytes())
                    .map_err(|e| PatchError::unwritable(path, e))?;
                debug!(entry = %name, "rewrote token entry");
                change = TokenEntryChange::Updated;
            } else {
                tar_write::copy_entry(&mut out, &mut entry).map_err(classify)?;
                debug!(entry = %name, "copied entry");
                copied += 1;
            }
        }

        if change == TokenEntryChange::Created {
            warn!(
                path = %path.display(),
                token_file = %self.token_file,
                "archive has no token file; appending a new one"
            );
            let store = self.merged_store(None, namespaces, record, overwrite)?;
            tar_write::write_entry(&mut out, &self.token_file, store.serialize().as_bytes())
                .map_err(|e| PatchError::unwritable(path, e))?;
        }

        let finish = || -> io::Result<()> {
            let encoder = out.into_inner()?;
            let mut writer = encoder.finish()?;
            writer.flush()?;
            writer.get_ref().sync_all()
        };
        finish().map_err(|e| PatchError::unwritable(path, e))?;

        Ok((change, copied))
    }

    fn patch_directory<S: AsRef<str>>(
        &self,
        dir: &Path,
        namespaces: &[S],
        record: &TokenRecord,
        overwrite: bool,
    ) -> PatchResult<PatchOutcome> {
        if !dir.is_dir() {
            return Err(PatchError::unreadable(
                dir,
                io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            ));
        }
        let target = dir.join(&self.token_file);

        let (existing, change) = match File::open(&target) {
            Ok(file) => {
                let bytes = tar_read::read_bounded(file, self.max_token_file_bytes)
                    .map_err(|e| PatchError::unreadable(&target, e))?
                    .ok_or_else(|| self.too_large())?;
                (Some(bytes), TokenEntryChange::Updated)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => (None, TokenEntryChange::Created),
            Err(e) => return Err(PatchError::unreadable(&target, e)),
        };

        let store = self.merged_store(existing, namespaces, record, overwrite)?;
        write_atomic(&target, store.serialize().as_bytes())
            .map_err(|e| PatchError::unwritable(&target, e))?;

        info!(path = %target.display(), ?change, "token file written");

        Ok(PatchOutcome {
            path: target,
            change,
            entries_copied: 0,
            namespaces: owned(namespaces),
        })
    }

    fn merged_store<S: AsRef<str>>(
        &self,
        existing: Option<Vec<u8>>,
        namespaces: &[S],
        record: &TokenRecord,
        overwrite: bool,
    ) -> PatchResult<TokenRecordStore> {
        let mut store = match existing {
            Some(bytes) => {
                let text = String::from_utf8(bytes).map_err(|e| ParseError::MalformedBody {
                    reason: e.to_string(),
                })?;
                TokenRecordStore::parse(&text)?
            }
            None => TokenRecordStore::new(),
        };
        store.merge(namespaces, record, overwrite)?;
        Ok(store)
    }

    fn too_large(&self) -> PatchError {
        PatchError::TokenFileTooLarge {
            entry: self.token_file.clone(),
            limit: self.max_token_file_bytes,
        }
    }
}

/// Patch `target` with default limits, naming the token file explicitly.
pub fn patch<S: AsRef<str>>(
    target: &PatchTarget,
    target_file_name: &str,
    namespaces: &[S],
    record: &TokenRecord,
    overwrite: bool,
) -> PatchResult<PatchOutcome> {
    TokenPatcher::new(&PackConfig::default())
        .with_token_file(target_file_name)
        .patch(target, namespaces, record, overwrite)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn owned<S: AsRef<str>>(namespaces: &[S]) -> Vec<String> {
    let mut out: Vec<String> = namespaces.iter().map(|s| s.as_ref().to_string()).collect();
    out.sort();
    out.dedup();
    out
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".edgepack-")
        .suffix(".tmp")
        .tempfile_in(parent_dir(path))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MergeError;

    fn record() -> TokenRecord {
        TokenRecord::new("t1", "r1")
    }

    #[test]
    fn detect_picks_mode_by_path_kind() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(PatchTarget::detect(dir.path()), PatchTarget::Directory(_)));
        assert!(matches!(
            PatchTarget::detect(dir.path().join("bundle.tgz")),
            PatchTarget::Archive(_)
        ));
    }

    #[test]
    fn directory_mode_creates_then_updates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.js"), "keep me").unwrap();
        let target = PatchTarget::Directory(dir.path().to_path_buf());

        let first = patch(&target, "edgekv_tokens.js", &["ns1"], &record(), false).unwrap();
        assert_eq!(first.change, TokenEntryChange::Created);

        let second = patch(
            &target,
            "edgekv_tokens.js",
            &["ns2"],
            &TokenRecord::new("t2", "r2"),
            false,
        )
        .unwrap();
        assert_eq!(second.change, TokenEntryChange::Updated);

        let text = std::fs::read_to_string(dir.path().join("edgekv_tokens.js")).unwrap();
        let store = TokenRecordStore::parse(&text).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("ns1"), Some(&record()));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("main.js")).unwrap(),
            "keep me"
        );
    }

    #[test]
    fn directory_mode_conflict_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let target = PatchTarget::Directory(dir.path().to_path_buf());
        patch(&target, "edgekv_tokens.js", &["ns1"], &record(), false).unwrap();
        let before = std::fs::read(dir.path().join("edgekv_tokens.js")).unwrap();

        let err = patch(
            &target,
            "edgekv_tokens.js",
            &["ns1"],
            &TokenRecord::new("t1", "other"),
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PatchError::Merge(MergeError::ReferenceMismatch { .. })
        ));
        assert_eq!(
            std::fs::read(dir.path().join("edgekv_tokens.js")).unwrap(),
            before
        );
    }

    #[test]
    fn directory_mode_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("edgekv_tokens.js"), "{}").unwrap();
        let err = patch(
            &PatchTarget::Directory(dir.path().to_path_buf()),
            "edgekv_tokens.js",
            &["ns1"],
            &record(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, PatchError::Parse(ParseError::MissingDeclaration)));
    }

    #[test]
    fn missing_archive_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = patch(
            &PatchTarget::Archive(dir.path().join("missing.tgz")),
            "edgekv_tokens.js",
            &["ns1"],
            &record(),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, PatchError::SourceUnreadable { .. }));
    }

    #[test]
    fn oversized_token_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("edgekv_tokens.js"), "x".repeat(64)).unwrap();
        let patcher = TokenPatcher::new(&PackConfig {
            max_token_file_bytes: 16,
            ..PackConfig::default()
        });
        let err = patcher
            .patch(
                &PatchTarget::Directory(dir.path().to_path_buf()),
                &["ns1"],
                &record(),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, PatchError::TokenFileTooLarge { limit: 16, .. }));
    }
}
