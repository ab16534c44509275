//! Content digest of complete bundle archives.
//!
//! The digest is lower-case hex SHA-256 over the file bytes, with no
//! algorithm prefix, so it compares directly with published checksums.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Hash everything `reader` yields, in fixed-size chunks.
pub fn sha256_hex_reader<R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

pub fn sha256_hex_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Digest of the file at `path`. Path and mtime never influence the result.
pub fn digest(path: &Path) -> std::io::Result<String> {
    let file = File::open(path)?;
    sha256_hex_reader(file)
}
