//! Edge bundle format and utilities.
//!
//! A bundle is a deterministic tar.gz archive whose root holds:
//! - the manifest (`bundle.json` by default)
//! - the entry point (`main.js` by default)
//! - any auxiliary files from the working directory, keyed by relative path
//!
//! # Modules
//!
//! - [`build`]: Create bundles with `BundleBuilder`
//! - [`inspect`]: List members of an existing bundle
//! - [`naming`]: File names of produced bundles
//!
//! # Example
//!
//! ```no_run
//! use edgepack_core::bundle::BundleBuilder;
//! use edgepack_core::PackConfig;
//! use std::path::Path;
//!
//! let builder = BundleBuilder::new(PackConfig::from_env());
//! let bundle = builder.build(Path::new("./my-edgeworker")).unwrap();
//! println!("{} {}", bundle.path.display(), bundle.checksum);
//! ```

pub mod build;
pub mod inspect;
pub mod naming;
pub(crate) mod tar_read;
pub(crate) mod tar_write;

// Re-exports for convenience
pub use build::{validate_existing, Bundle, BundleBuilder};
pub use inspect::{inspect, BundleListing, MemberInfo};
