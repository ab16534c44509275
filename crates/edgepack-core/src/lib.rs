//! Bundle packaging and token-injection engine for edge code bundles.
//!
//! - Build a deterministic tar.gz bundle from a working directory
//! - Validate the bundle manifest
//! - Detect duplicate uploads by archive checksum
//! - Inject or update access-token records inside an existing bundle
//!
//! Transport, credentials and presentation belong to the caller; every
//! operation here is synchronous local file I/O.
//!
//! # Quick Start
//!
//! ```no_run
//! use edgepack_core::{check_duplicate, BundleBuilder, DuplicateCheckResult, PackConfig};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let bundle = BundleBuilder::new(PackConfig::from_env()).build(Path::new("."))?;
//! match check_duplicate(&bundle, &[]) {
//!     DuplicateCheckResult::Clear => println!("ready to upload {}", bundle.path.display()),
//!     DuplicateCheckResult::Duplicate(v) => println!("same code as version {}", v.identifier),
//! }
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod checksum;
pub mod config;
pub mod dedup;
pub mod error;
pub mod manifest;
pub mod tokens;

// Convenience re-exports
pub use bundle::{validate_existing, Bundle, BundleBuilder};
pub use config::{PackConfig, PackConfigOverrides};
pub use dedup::{check_duplicate, DuplicateCheckResult, VersionRecord};
pub use error::{BuildError, ConfigError, MergeError, ParseError, PatchError, ValidationError};
pub use manifest::Manifest;
pub use tokens::{PatchOutcome, PatchTarget, TokenPatcher, TokenRecord, TokenRecordStore};
