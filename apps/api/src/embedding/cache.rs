//! Optional embedding cache keyed by a content fingerprint.
//!
//! The pipeline is correct with the cache fully absent: a miss or a cache
//! error means recompute. Cache failures are logged and never fail the
//! request.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::embedding::EmbeddingVector;

/// Fingerprint of a text fragment under a given provider identity. Vectors
/// from different providers or models never share a key.
pub fn fingerprint(provider_id: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(provider_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    format!("emb:{:x}", hasher.finalize())
}

#[async_trait]
pub trait EmbeddingCache: Send + Sync {
    /// Returns the cached vector for `key`, or None on miss or cache error.
    async fn get(&self, key: &str) -> Option<EmbeddingVector>;

    /// Stores a vector. Errors are swallowed after logging.
    async fn put(&self, key: &str, vector: &EmbeddingVector);
}

/// Redis-backed cache. Entries expire so stale provider output ages out.
pub struct RedisEmbeddingCache {
    client: redis::Client,
    ttl_seconds: u64,
}

impl RedisEmbeddingCache {
    pub fn new(client: redis::Client, ttl_seconds: u64) -> Self {
        Self {
            client,
            ttl_seconds,
        }
    }
}

#[async_trait]
impl EmbeddingCache for RedisEmbeddingCache {
    async fn get(&self, key: &str) -> Option<EmbeddingVector> {
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!("embedding cache unavailable: {e}");
                return None;
            }
        };
        let raw: Option<String> = match redis::cmd("GET").arg(key).query_async(&mut conn).await {
            Ok(v) => v,
            Err(e) => {
                warn!("embedding cache read failed: {e}");
                return None;
            }
        };
        raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(vector) => Some(vector),
            Err(e) => {
                warn!("discarding undecodable cache entry {key}: {e}");
                None
            }
        })
    }

    async fn put(&self, key: &str, vector: &EmbeddingVector) {
        let json = match serde_json::to_string(vector) {
            Ok(j) => j,
            Err(e) => {
                warn!("failed to encode vector for cache: {e}");
                return;
            }
        };
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!("embedding cache unavailable: {e}");
                return;
            }
        };
        let result: Result<(), redis::RedisError> = redis::cmd("SET")
            .arg(key)
            .arg(json)
            .arg("EX")
            .arg(self.ttl_seconds)
            .query_async(&mut conn)
            .await;
        if let Err(e) = result {
            warn!("embedding cache write failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint("openai:small", "built REST APIs in Go");
        let b = fingerprint("openai:small", "built REST APIs in Go");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_varies_by_text() {
        let a = fingerprint("openai:small", "resume text");
        let b = fingerprint("openai:small", "job description text");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_varies_by_provider() {
        let a = fingerprint("openai:small", "same text");
        let b = fingerprint("cohere:v3", "same text");
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_is_prefixed_hex() {
        let key = fingerprint("p", "t");
        assert!(key.starts_with("emb:"));
        // sha256 hex digest
        assert_eq!(key.len(), 4 + 64);
    }
}
