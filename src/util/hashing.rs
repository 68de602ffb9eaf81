use sha2::{Digest, Sha256};

/// Lower-case hex SHA-256 of the UTF-8 bytes of `text`
///
/// Used as the cache key and as the identity of a text for unique-text rate
/// limiting.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// SHA-256 over `parts` joined by `:`, as raw digest bytes
pub fn digest_parts(parts: &[&str]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b":");
        }
        hasher.update(part.as_bytes());
    }
    hasher.finalize().into()
}
