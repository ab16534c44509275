//! Process exit codes. These are part of the CLI contract.
//!
//! The engine errors carry matching `exit_code()` helpers, so a command can
//! return `err.exit_code()` directly.

pub const SUCCESS: i32 = 0;
pub const IO_ERROR: i32 = 1; // Read/write failure while producing output
pub const CONFIG_ERROR: i32 = 2; // Missing input, bad config file or arguments
pub const INVALID_INPUT: i32 = 3; // Manifest or token file rejected
pub const TOKEN_CONFLICT: i32 = 4; // Namespace already bound differently
pub const DUPLICATE: i32 = 5; // Checksum matches a published version

#[cfg(test)]
mod tests {
    use super::*;
    use edgepack_core::error::{BuildError, MergeError, ParseError, PatchError, ValidationError};
    use std::path::PathBuf;

    #[test]
    fn engine_errors_map_onto_cli_codes() {
        let io = || std::io::Error::other("disk full");

        assert_eq!(
            BuildError::ArchiveNotFound {
                path: PathBuf::from("x.tgz")
            }
            .exit_code(),
            CONFIG_ERROR
        );
        assert_eq!(
            BuildError::InvalidManifest(ValidationError::MissingField {
                field: "edgeworker-version"
            })
            .exit_code(),
            INVALID_INPUT
        );
        assert_eq!(
            PatchError::Parse(ParseError::MissingExport).exit_code(),
            INVALID_INPUT
        );
        assert_eq!(
            PatchError::Merge(MergeError::NoNamespaces).exit_code(),
            TOKEN_CONFLICT
        );
        assert_eq!(
            PatchError::DestinationUnwritable {
                path: PathBuf::from("x.tgz"),
                source: io(),
            }
            .exit_code(),
            IO_ERROR
        );
        assert_ne!(SUCCESS, DUPLICATE);
    }
}
