//! Bundle builder: working directory in, deterministic tar.gz out.
//!
//! # Layout
//!
//! Every regular file under the working directory becomes one archive member
//! keyed by its `/`-separated path relative to that directory. The manifest
//! and entry point therefore sit at the archive root, where the platform
//! looks for them.
//!
//! # Determinism Guarantees
//!
//! Archives are byte-for-byte reproducible for identical member contents:
//! - Members are written in byte order of their relative paths
//! - Headers carry mode 0644, uid/gid 0, mtime 0 and no owner names
//! - The gzip header carries mtime 0 and an "unknown" OS byte
//!
//! Nothing about the host (absolute paths, owners, timestamps) reaches the
//! archive, so the checksum is a stable identity across machines.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{naming, tar_write};
use crate::checksum;
use crate::config::PackConfig;
use crate::error::{BuildError, BuildResult};
use crate::manifest::{self, Manifest};

/// A bundle archive on disk and its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    /// Location of the archive.
    pub path: PathBuf,
    /// Lower-case hex SHA-256 of the archive bytes.
    pub checksum: String,
    /// Member paths in archive order. Empty for prebuilt archives.
    pub member_files: Vec<String>,
    /// Validated manifest. `None` for prebuilt archives.
    pub manifest: Option<Manifest>,
}

/// Builds bundles according to a [`PackConfig`].
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    config: PackConfig,
}

struct Member {
    name: String,
    path: PathBuf,
}

impl BundleBuilder {
    pub fn new(config: PackConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PackConfig {
        &self.config
    }

    /// Build a bundle from `working_dir`.
    ///
    /// # Process
    ///
    /// 1. Check manifest and entry point exist at the directory root
    /// 2. Validate the manifest
    /// 3. Enumerate members (sorted)
    /// 4. Write the archive to a temp file in the output directory
    /// 5. Compute the checksum, then rename into place
    ///
    /// A failure at any step leaves no archive behind.
    pub fn build(&self, working_dir: &Path) -> BuildResult<Bundle> {
        let cfg = &self.config;
        let missing: Vec<String> = [&cfg.entry_file, &cfg.manifest_file]
            .into_iter()
            .filter(|name| !is_regular_file(&working_dir.join(name)))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingRequiredFile {
                dir: working_dir.to_path_buf(),
                files: missing,
            });
        }

        let manifest_path = working_dir.join(&cfg.manifest_file);
        let manifest_bytes =
            fs::read(&manifest_path).map_err(|e| BuildError::io(&manifest_path, e))?;
        let manifest = manifest::validate(&manifest_bytes)?;

        fs::create_dir_all(&cfg.output_dir).map_err(|e| BuildError::io(&cfg.output_dir, e))?;
        let members = self.collect_members(working_dir)?;

        let file_name = naming::bundle_file_name(
            &cfg.bundle_prefix,
            &manifest.version,
            naming::now_millis(),
            &cfg.archive_ext,
        );
        let final_path = cfg.output_dir.join(file_name);

        let mut tmp = tempfile::Builder::new()
            .prefix(".edgepack-")
            .suffix(".tmp")
            .tempfile_in(&cfg.output_dir)
            .map_err(|e| BuildError::io(&cfg.output_dir, e))?;

        self.write_archive(tmp.as_file_mut(), &members)
            .map_err(|e| BuildError::io(tmp.path(), e))?;

        let checksum = checksum::digest(tmp.path()).map_err(|e| BuildError::io(tmp.path(), e))?;

        tmp.persist(&final_path)
            .map_err(|e| BuildError::io(&final_path, e.error))?;

        info!(
            path = %final_path.display(),
            checksum = %checksum,
            members = members.len(),
            "bundle built"
        );

        Ok(Bundle {
            path: final_path,
            checksum,
            member_files: members.into_iter().map(|m| m.name).collect(),
            manifest: Some(manifest),
        })
    }

    /// Identity of a prebuilt archive. Contents are not inspected.
    pub fn validate_existing(&self, archive: &Path) -> BuildResult<Bundle> {
        validate_existing(archive)
    }

    fn write_archive(&self, file: &mut File, members: &[Member]) -> std::io::Result<()> {
        let mut tar =
            tar_write::create_deterministic_tar(BufWriter::new(file), self.config.compression_level);

        for member in members {
            let source = File::open(&member.path)?;
            let size = source.metadata()?.len();
            tar_write::write_entry_from(&mut tar, &member.name, size, source)?;
            debug!(member = %member.name, bytes = size, "added bundle member");
        }

        let encoder = tar.into_inner()?;
        let mut writer = encoder.finish()?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    /// All regular files under `root`, sorted by member name.
    fn collect_members(&self, root: &Path) -> BuildResult<Vec<Member>> {
        let root_canon = fs::canonicalize(root).map_err(|e| BuildError::io(root, e))?;
        let output_canon = fs::canonicalize(&self.config.output_dir)
            .map_err(|e| BuildError::io(&self.config.output_dir, e))?;
        let output_is_root = output_canon == root_canon;

        let mut members = Vec::new();
        let mut pending = vec![(root.to_path_buf(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let entries = fs::read_dir(&dir).map_err(|e| BuildError::io(&dir, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| BuildError::io(&dir, e))?;
                let path = entry.path();
                let file_type = entry.file_type().map_err(|e| BuildError::io(&path, e))?;
                let name = entry
                    .file_name()
                    .into_string()
                    .map_err(|raw| BuildError::InvalidMemberPath {
                        path: format!("{}{}", prefix, raw.to_string_lossy()),
                    })?;
                let rel = format!("{}{}", prefix, name);

                if file_type.is_dir() {
                    let canon = fs::canonicalize(&path).map_err(|e| BuildError::io(&path, e))?;
                    if canon == output_canon {
                        debug!(dir = %rel, "skipping output directory");
                        continue;
                    }
                    pending.push((path, format!("{}/", rel)));
                } else if file_type.is_file() {
                    if output_is_root
                        && prefix.is_empty()
                        && naming::is_bundle_file_name(
                            &name,
                            &self.config.bundle_prefix,
                            &self.config.archive_ext,
                        )
                    {
                        debug!(file = %rel, "skipping previously built bundle");
                        continue;
                    }
                    members.push(Member { name: rel, path });
                } else {
                    debug!(file = %rel, "skipping non-regular file");
                }
            }
        }

        members.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        Ok(members)
    }
}

/// Regular file without following symlinks; the member walk skips links, so
/// a linked entry point would never reach the archive root.
fn is_regular_file(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_file())
}

/// Identity (path, checksum) of a prebuilt archive.
///
/// Manifest contents are not re-validated here; that happens server-side
/// for uploads of prebuilt archives.
pub fn validate_existing(archive: &Path) -> BuildResult<Bundle> {
    let not_found = || BuildError::ArchiveNotFound {
        path: archive.to_path_buf(),
    };
    if !archive.is_file() {
        return Err(not_found());
    }
    let file = File::open(archive).map_err(|_| not_found())?;
    let checksum = checksum::sha256_hex_reader(file).map_err(|e| BuildError::io(archive, e))?;

    Ok(Bundle {
        path: archive.to_path_buf(),
        checksum,
        member_files: Vec::new(),
        manifest: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_for(out: &Path) -> BundleBuilder {
        BundleBuilder::new(PackConfig::default().with_output_dir(out))
    }

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn reports_all_missing_required_files() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let err = builder_for(out.path()).build(work.path()).unwrap_err();
        match err {
            BuildError::MissingRequiredFile { files, .. } => {
                assert_eq!(files, vec!["main.js".to_string(), "bundle.json".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn required_files_must_be_at_root() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(work.path(), "bundle.json", r#"{"edgeworker-version":"1.0"}"#);
        write(work.path(), "src/main.js", "export function onClientRequest() {}");
        let err = builder_for(out.path()).build(work.path()).unwrap_err();
        assert!(matches!(err, BuildError::MissingRequiredFile { ref files, .. } if files == &["main.js"]));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_required_file_is_missing() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(work.path(), "bundle.json", r#"{"edgeworker-version":"1.0"}"#);
        write(work.path(), "src/main.js", "export function onClientRequest() {}");
        std::os::unix::fs::symlink("src/main.js", work.path().join("main.js")).unwrap();

        let err = builder_for(out.path()).build(work.path()).unwrap_err();
        assert!(
            matches!(err, BuildError::MissingRequiredFile { ref files, .. } if files == &["main.js"]),
            "{err}"
        );
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn invalid_manifest_writes_nothing() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(work.path(), "main.js", "");
        write(work.path(), "bundle.json", r#"{"edgeworker-version":"1..0"}"#);
        let err = builder_for(out.path()).build(work.path()).unwrap_err();
        assert!(matches!(err, BuildError::InvalidManifest(_)));
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn members_are_sorted_and_relative() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(work.path(), "main.js", "m");
        write(work.path(), "bundle.json", r#"{"edgeworker-version":"1.0"}"#);
        write(work.path(), "lib/z.js", "z");
        write(work.path(), "lib/a.js", "a");

        let bundle = builder_for(out.path()).build(work.path()).unwrap();
        assert_eq!(
            bundle.member_files,
            vec!["bundle.json", "lib/a.js", "lib/z.js", "main.js"]
        );
        let name = bundle.path.file_name().unwrap().to_str().unwrap();
        assert!(naming::is_bundle_file_name(name, "ew", "tgz"), "{name}");
        assert!(name.starts_with("ew_1.0_"));
        assert_eq!(bundle.checksum, checksum::digest(&bundle.path).unwrap());
    }

    #[test]
    fn output_dir_inside_working_dir_is_excluded() {
        let work = tempfile::tempdir().unwrap();
        write(work.path(), "main.js", "m");
        write(work.path(), "bundle.json", r#"{"edgeworker-version":"1.0"}"#);
        let builder = builder_for(&work.path().join("dist"));

        let first = builder.build(work.path()).unwrap();
        let second = builder.build(work.path()).unwrap();
        assert_eq!(second.member_files, vec!["bundle.json", "main.js"]);
        assert_eq!(first.checksum, second.checksum);
    }

    #[test]
    fn output_dir_equal_to_working_dir_skips_old_bundles() {
        let work = tempfile::tempdir().unwrap();
        write(work.path(), "main.js", "m");
        write(work.path(), "bundle.json", r#"{"edgeworker-version":"1.0"}"#);
        let builder = builder_for(work.path());

        let first = builder.build(work.path()).unwrap();
        let second = builder.build(work.path()).unwrap();
        assert_eq!(second.member_files, vec!["bundle.json", "main.js"]);
        assert_eq!(first.checksum, second.checksum);
    }

    #[test]
    fn validate_existing_requires_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.tgz");
        assert!(matches!(
            validate_existing(&missing),
            Err(BuildError::ArchiveNotFound { .. })
        ));
        assert!(matches!(
            validate_existing(dir.path()),
            Err(BuildError::ArchiveNotFound { .. })
        ));

        let present = dir.path().join("prebuilt.tgz");
        fs::write(&present, b"not even gzip").unwrap();
        let bundle = validate_existing(&present).unwrap();
        assert_eq!(bundle.checksum, checksum::sha256_hex_bytes(b"not even gzip"));
        assert!(bundle.member_files.is_empty());
        assert!(bundle.manifest.is_none());
    }
}
