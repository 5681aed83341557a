use sha2::{Digest, Sha256};

pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Lowercase hex (64 chars).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hex digest identifying a source document in reports and cache keys.
pub fn content_digest(data: &[u8]) -> String {
    to_hex(&sha256_bytes(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_known_vector() {
        assert_eq!(
            content_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_is_hex_of_bytes() {
        assert_eq!(content_digest(b"6a Male 10 20"), to_hex(&sha256_bytes(b"6a Male 10 20")));
        assert_ne!(content_digest(b"6a"), content_digest(b"6b"));
        assert_eq!(content_digest(b"x").len(), 64);
    }
}
