//! API key model for authentication.
//!
//! Callers of the management API authenticate with a bearer key. Keys are
//! stored as SHA-256 hashes; the key's id doubles as the owner of the
//! transactions and saved payment methods it creates.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Represents an API key record from the `api_keys` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    pub id: Uuid,

    /// SHA-256 hash of the raw key (64 hex characters)
    pub key_hash: String,

    pub business_name: String,
    pub created_at: DateTime<Utc>,

    /// Inactive keys are rejected during authentication
    pub is_active: bool,
}

impl ApiKey {
    /// Hash a raw bearer key the way it is stored.
    pub fn hash_key(raw_key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw_key.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_hex_sha256() {
        let hash = ApiKey::hash_key("test-key");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, ApiKey::hash_key("test-key"));
        assert_ne!(hash, ApiKey::hash_key("other-key"));
    }
}
