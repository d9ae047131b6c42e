//! Migration script checksum.
//!
//! The value is persisted in the history table, so the algorithm must never
//! change: the first four bytes of the SHA-256 digest, big-endian, as `i32`.

use sha2::{Digest, Sha256};

/// Compute the 32-bit checksum of a (placeholder-substituted) script.
pub fn compute_checksum(script: &str) -> i32 {
    let mut hasher = Sha256::new();
    hasher.update(script.as_bytes());
    let digest = hasher.finalize();
    i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}
