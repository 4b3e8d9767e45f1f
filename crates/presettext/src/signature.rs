//! Short integrity suffix for stored preset text. The suffix is the first
//! three hex characters of the SHA-256 digest of everything before the final
//! `@`, which is enough to catch truncated or hand-edited values but is not a
//! tamper-proof seal.
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest.
pub const SIGNATURE_LEN: usize = 3;

/// Separates the signed text from its signature.
pub const SIGNATURE_DELIMITER: char = '@';

pub fn sign(text: &str) -> String {
    let mut hex = format!("{:x}", Sha256::digest(text.as_bytes()));
    hex.truncate(SIGNATURE_LEN);
    hex
}

/// Returns `text@signature`.
pub fn append(text: &str) -> String {
    format!("{text}{SIGNATURE_DELIMITER}{}", sign(text))
}

/// Splits `text` at its last `@` into the signed body and the declared signature.
pub fn split(text: &str) -> Option<(&str, &str)> {
    text.rsplit_once(SIGNATURE_DELIMITER)
}

/// Checks `signature` against the digest of `body`.
pub fn matches(body: &str, signature: &str) -> bool {
    signature.len() == SIGNATURE_LEN && sign(body) == signature
}

/// True when `text` ends in a signature that matches the text before it.
pub fn is_valid(text: &str) -> bool {
    split(text).is_some_and(|(body, signature)| matches(body, signature))
}
