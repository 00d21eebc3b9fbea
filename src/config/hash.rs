//! Payload fingerprints for plans and reports.
//!
//! Plans show a fingerprint of each payload they would write instead of the
//! payload itself, so secret values never reach the terminal or a log.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{ClusterError, Result};

/// Hasher for computing payload fingerprints.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadHasher;

impl PayloadHasher {
    /// Creates a new payload hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the hex-encoded SHA-256 of raw bytes.
    #[must_use]
    pub fn hash_bytes(&self, bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Computes the fingerprint of a payload.
    ///
    /// The payload is hashed through its JSON form. JSON objects keep their
    /// keys sorted, so equal payloads always share a fingerprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn fingerprint<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String> {
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| ClusterError::serialization(format!("Failed to encode payload: {e}")))?;
        Ok(self.hash_bytes(&bytes))
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_deterministic() {
        let hasher = PayloadHasher::new();
        let payload = json!({"id": "/web", "cpus": 0.5});

        let hash1 = hasher.fingerprint(&payload).expect("hash");
        let hash2 = hasher.fingerprint(&payload).expect("hash");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_key_order_does_not_matter() {
        let hasher = PayloadHasher::new();
        let a: serde_json::Value =
            serde_json::from_str(r#"{"a": 1, "b": 2}"#).expect("json");
        let b: serde_json::Value =
            serde_json::from_str(r#"{"b": 2, "a": 1}"#).expect("json");

        assert_eq!(
            hasher.fingerprint(&a).expect("hash"),
            hasher.fingerprint(&b).expect("hash")
        );
    }

    #[test]
    fn test_different_payloads_different_hash() {
        let hasher = PayloadHasher::new();

        assert_ne!(
            hasher.fingerprint(&json!({"v": 1})).expect("hash"),
            hasher.fingerprint(&json!({"v": 2})).expect("hash")
        );
    }

    #[test]
    fn test_short_hash() {
        let hasher = PayloadHasher::new();
        let full_hash = "abcdef1234567890abcdef1234567890";
        let short = hasher.short_hash(full_hash);

        assert_eq!(short, "abcdef12");
        assert_eq!(short.len(), 8);
    }
}
