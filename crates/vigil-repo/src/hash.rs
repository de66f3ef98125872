//! Content and signature hashing

/// Hex digest of raw file content, used for hash-based skip
pub fn hash_content(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}

/// Trim and collapse whitespace runs to a single space
pub fn normalize_signature(signature: &str) -> String {
    signature.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Hash of the normalized signature; reformatting alone never changes it
pub fn signature_hash(signature: &str) -> String {
    hash_content(normalize_signature(signature).as_bytes())
}
