//! BLAKE3 content fingerprints.

use anyhow::{Context, Result};
use blake3::Hasher;
use serde::Serialize;
use std::path::Path;

/// Hex BLAKE3 digest of raw bytes.
#[must_use]
pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

/// Hex BLAKE3 digest of a file's bytes. Independent of mtime.
pub fn fingerprint_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(fingerprint_bytes(&bytes))
}

/// Hex BLAKE3 digest of the JCS (RFC 8785) encoding of `value`.
///
/// Key order and whitespace never change the result.
pub fn canonical_fingerprint<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_value(value).context("Failed to serialize value for hashing")?;
    let canonical =
        serde_json_canonicalizer::to_vec(&json).context("Failed to canonicalize JSON")?;
    Ok(fingerprint_bytes(&canonical))
}
