//! Hash helpers for tests.
//!
//! Exposes deterministic SHA-256 encoding so integration tests can assert
//! content-addressed paths without duplicating hashing logic.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest for `data` and return it as a lowercase hex
/// string.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let mut key = String::with_capacity(digest.len() * 2);
    for byte in digest {
        use std::fmt::Write;
        let _ = write!(&mut key, "{byte:02x}");
    }
    key
}
