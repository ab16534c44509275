//! File naming for produced bundles.
//!
//! ```text
//! {prefix}_{manifest_version}_{epoch_millis}.{ext}     e.g. ew_1.0.2_1760000000000.tgz
//! ```
//!
//! The timestamp keeps repeated builds from colliding on disk. It never
//! takes part in bundle identity, which is the archive checksum.

use chrono::Utc;

pub fn bundle_file_name(prefix: &str, version: &str, epoch_millis: i64, ext: &str) -> String {
    format!("{}_{}_{}.{}", prefix, version, epoch_millis, ext)
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Whether `name` looks like a bundle produced with this prefix and extension.
pub fn is_bundle_file_name(name: &str, prefix: &str, ext: &str) -> bool {
    let Some(rest) = name
        .strip_prefix(prefix)
        .and_then(|r| r.strip_prefix('_'))
        .and_then(|r| r.strip_suffix(ext))
        .and_then(|r| r.strip_suffix('.'))
    else {
        return false;
    };
    match rest.rsplit_once('_') {
        Some((version, millis)) => {
            !version.is_empty() && !millis.is_empty() && millis.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}
