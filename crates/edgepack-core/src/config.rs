//! Engine configuration.
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `EDGEPACK_MANIFEST_FILE` | Manifest file name at bundle root (default: `bundle.json`) |
//! | `EDGEPACK_ENTRY_FILE` | Entry point at bundle root (default: `main.js`) |
//! | `EDGEPACK_TOKEN_FILE` | Token-record file name (default: `edgekv_tokens.js`) |
//! | `EDGEPACK_BUNDLE_PREFIX` | Prefix of produced archive names (default: `ew`) |
//! | `EDGEPACK_OUTPUT_DIR` | Directory receiving built bundles |
//! | `EDGEPACK_MAX_TOKEN_FILE_BYTES` | Buffering cap for the token-record entry |

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use serde::Deserialize;

const DEFAULT_MAX_TOKEN_FILE_BYTES: u64 = 1024 * 1024;

/// Knobs for building and patching bundles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackConfig {
    pub manifest_file: String,
    pub entry_file: String,
    pub token_file: String,
    pub bundle_prefix: String,
    pub archive_ext: String,
    pub output_dir: PathBuf,
    pub max_token_file_bytes: u64,
    /// gzip level, 0..=9.
    pub compression_level: u32,
}

fn default_output_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("edgepack")
        .join("bundles")
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            manifest_file: "bundle.json".into(),
            entry_file: "main.js".into(),
            token_file: "edgekv_tokens.js".into(),
            bundle_prefix: "ew".into(),
            archive_ext: "tgz".into(),
            output_dir: default_output_dir(),
            max_token_file_bytes: DEFAULT_MAX_TOKEN_FILE_BYTES,
            compression_level: 9,
        }
    }
}

/// Partial overrides for `PackConfig`, read from a config file.
/// Unknown keys cause deserialization to fail.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackConfigOverrides {
    pub manifest_file: Option<String>,
    pub entry_file: Option<String>,
    pub token_file: Option<String>,
    pub bundle_prefix: Option<String>,
    pub archive_ext: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub max_token_file_bytes: Option<u64>,
    pub compression_level: Option<u32>,
}

impl PackConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            manifest_file: std::env::var("EDGEPACK_MANIFEST_FILE").unwrap_or(base.manifest_file),
            entry_file: std::env::var("EDGEPACK_ENTRY_FILE").unwrap_or(base.entry_file),
            token_file: std::env::var("EDGEPACK_TOKEN_FILE").unwrap_or(base.token_file),
            bundle_prefix: std::env::var("EDGEPACK_BUNDLE_PREFIX").unwrap_or(base.bundle_prefix),
            archive_ext: base.archive_ext,
            output_dir: std::env::var_os("EDGEPACK_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(base.output_dir),
            max_token_file_bytes: std::env::var("EDGEPACK_MAX_TOKEN_FILE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.max_token_file_bytes),
            compression_level: base.compression_level,
        }
    }

    /// Apply overrides onto this config. Only `Some` values override.
    pub fn apply(self, overrides: PackConfigOverrides) -> Self {
        Self {
            manifest_file: overrides.manifest_file.unwrap_or(self.manifest_file),
            entry_file: overrides.entry_file.unwrap_or(self.entry_file),
            token_file: overrides.token_file.unwrap_or(self.token_file),
            bundle_prefix: overrides.bundle_prefix.unwrap_or(self.bundle_prefix),
            archive_ext: overrides.archive_ext.unwrap_or(self.archive_ext),
            output_dir: overrides.output_dir.unwrap_or(self.output_dir),
            max_token_file_bytes: overrides
                .max_token_file_bytes
                .unwrap_or(self.max_token_file_bytes),
            compression_level: overrides
                .compression_level
                .unwrap_or(self.compression_level)
                .min(9),
        }
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Read overrides from a YAML or JSON file (chosen by extension).
    pub fn load_overrides(path: &Path) -> Result<PackConfigOverrides, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })
    }
}
