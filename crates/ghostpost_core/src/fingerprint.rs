//! Content fingerprints.
//!
//! A fingerprint is the lowercase hex SHA-256 of raw bytes. Document
//! bodies are fingerprinted before any rewriting or rendering; asset
//! files are fingerprinted to key the upload cache.

use sha2::{Digest, Sha256};

/// Returns the hex SHA-256 digest of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Returns true if `stored` is the fingerprint of `body`.
pub fn is_current(stored: Option<&str>, body: &[u8]) -> bool {
    stored.is_some_and(|digest| digest == fingerprint(body))
}
