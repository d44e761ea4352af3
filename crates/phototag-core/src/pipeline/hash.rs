//! BLAKE3 content hashing for exact-duplicate identification.

/// Hash an in-memory buffer that has already been read for decoding.
pub fn content_hash_from_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
