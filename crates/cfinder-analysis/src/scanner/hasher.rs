//! Content hashing via xxh3.

use xxhash_rust::xxh3::xxh3_64;

/// Compute the xxh3 64-bit hash of file content.
#[inline]
pub fn hash_content(content: &[u8]) -> u64 {
    xxh3_64(content)
}

/// Fixed-width hex rendering used in reports and cache logs.
pub fn hash_hex(hash: u64) -> String {
    format!("{hash:016x}")
}
