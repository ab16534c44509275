//! Error types for bundle packaging and token injection.
//!
//! Every variant names the offending field, namespace, file or path so the
//! calling layer can render a message without losing detail.

use std::path::PathBuf;

/// Manifest schema violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Input is not a JSON object.
    #[error("manifest is not a JSON object: {reason}")]
    NotJson { reason: String },

    /// A required field is absent.
    #[error("manifest is missing required field '{field}'")]
    MissingField { field: &'static str },

    /// A field is present but malformed.
    #[error("manifest field '{field}' is malformed: {reason}")]
    BadFormat { field: &'static str, reason: String },
}

impl ValidationError {
    /// Manifest field the error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::NotJson { .. } => None,
            Self::MissingField { field } | Self::BadFormat { field, .. } => Some(field),
        }
    }
}

/// Failures while building or locating a bundle archive.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Manifest or entry point missing from the working directory root.
    #[error("missing required file(s) in {}: {}", .dir.display(), .files.join(", "))]
    MissingRequiredFile { dir: PathBuf, files: Vec<String> },

    /// Manifest failed validation; no archive was written.
    #[error("invalid manifest: {0}")]
    InvalidManifest(#[from] ValidationError),

    /// Prebuilt archive does not resolve to a readable file.
    #[error("bundle archive not found: {}", .path.display())]
    ArchiveNotFound { path: PathBuf },

    /// A working-directory file cannot be stored as a portable member.
    #[error("invalid member path: {path}")]
    InvalidMemberPath { path: String },

    /// Filesystem failure while reading members or writing the archive.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Suggested exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingRequiredFile { .. } | Self::ArchiveNotFound { .. } => 2,
            Self::InvalidManifest(_) | Self::InvalidMemberPath { .. } => 3,
            Self::Io { .. } => 1,
        }
    }
}

/// Token-record file does not have the expected wrapper or body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("token file is missing its leading declaration")]
    MissingDeclaration,

    #[error("token file is missing its trailing export")]
    MissingExport,

    #[error("token file body is malformed: {reason}")]
    MalformedBody { reason: String },
}

/// Conflicts while merging a token record into a store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Nothing to merge into.
    #[error("no namespaces given for token merge")]
    NoNamespaces,

    /// Namespace already belongs to a differently named token.
    #[error("namespace '{namespace}' is already bound to token '{existing_name}'")]
    NameConflict {
        namespace: String,
        existing_name: String,
    },

    /// Same token with the same reference is already present.
    #[error("namespace '{namespace}' already holds this token; nothing to change")]
    NoChangeNeeded { namespace: String },

    /// Same token with a different reference; overwrite not requested.
    #[error(
        "namespace '{namespace}' holds this token with reference '{existing_reference}'; \
         pass overwrite to replace it"
    )]
    ReferenceMismatch {
        namespace: String,
        existing_reference: String,
    },
}

impl MergeError {
    /// Namespace the conflict was detected on.
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::NoNamespaces => None,
            Self::NameConflict { namespace, .. }
            | Self::NoChangeNeeded { namespace }
            | Self::ReferenceMismatch { namespace, .. } => Some(namespace),
        }
    }
}

/// Failures while patching an archive or directory with token data.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// Archive or token file cannot be opened or read.
    #[error("cannot read {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    /// Token entry exceeds the buffering limit.
    #[error("token entry '{entry}' exceeds limit of {limit} bytes")]
    TokenFileTooLarge { entry: String, limit: u64 },

    /// Output cannot be written; the original is left intact.
    #[error("cannot write {}: {source}", .path.display())]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatchError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unwritable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DestinationUnwritable {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the token store already held the requested record.
    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::Merge(MergeError::NoChangeNeeded { .. }))
    }

    /// Suggested exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SourceUnreadable { .. } => 2,
            Self::Parse(_) | Self::TokenFileTooLarge { .. } => 3,
            Self::Merge(_) => 4,
            Self::DestinationUnwritable { .. } => 1,
        }
    }
}

/// Config file could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {reason}", .path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type for patch operations.
pub type PatchResult<T> = Result<T, PatchError>;
