//! Content hashing for storage keys.

use blake3::Hasher as Blake3Hasher;

/// Generates content hashes of payloads.
pub struct Hasher;

impl Hasher {
    /// BLAKE3 hash of a byte slice as a 64-char hex string.
    pub fn content_hash(data: &[u8]) -> String {
        let mut hasher = Blake3Hasher::new();
        hasher.update(data);
        hasher.finalize().to_hex().to_string()
    }

    /// Shortened hash used in object keys.
    pub fn short_hash(data: &[u8]) -> String {
        let mut hash = Self::content_hash(data);
        hash.truncate(16);
        hash
    }
}
