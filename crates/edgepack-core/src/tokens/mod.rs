//! Access-token records and their injection into bundles.
//!
//! - [`store`]: namespace → record mapping with its text format
//! - [`patch`]: rewrite an archive or directory with merged token data

pub mod patch;
pub mod store;

pub use patch::{patch, PatchOutcome, PatchTarget, TokenEntryChange, TokenPatcher};
pub use store::{TokenRecord, TokenRecordStore};
