//! Embedding Client Adapter — the single point of entry for all embedding
//! provider calls.
//!
//! ARCHITECTURAL RULE: no other module may talk to an embedding endpoint
//! directly. The similarity engine and scorers only ever see
//! `EmbeddingVector`s produced here.
//!
//! The provider is pluggable behind `EmbeddingProvider` (carried in
//! `AppState` as `Arc<dyn EmbeddingProvider>`), so swapping endpoints never
//! touches the similarity engine or the scorers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod cache;
pub mod http_provider;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-transient provider rejection (bad credentials, malformed input).
    /// Never retried.
    #[error("provider rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("provider failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("provider returned a {got}-dimensional vector, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("provider returned {got} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    /// Vectors from different providers (or models) must never be compared.
    #[error("cannot compare vectors from '{left}' and '{right}'")]
    ProviderMismatch { left: String, right: String },
}

/// A fixed-length vector tagged with the identity of the provider that
/// produced it. Vectors are only comparable when both the dimension and the
/// provider identity agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingVector {
    pub provider: String,
    pub values: Vec<f32>,
}

impl EmbeddingVector {
    pub fn new(provider: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            provider: provider.into(),
            values,
        }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Checks that `other` can be compared against `self`.
    pub fn check_comparable(&self, other: &EmbeddingVector) -> Result<(), EmbeddingError> {
        if self.provider != other.provider {
            return Err(EmbeddingError::ProviderMismatch {
                left: self.provider.clone(),
                right: other.provider.clone(),
            });
        }
        if self.dimension() != other.dimension() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension(),
                got: other.dimension(),
            });
        }
        Ok(())
    }
}

/// The embedding provider trait. One vector per input fragment, in input
/// order. Implementations own their retry policy and concurrency limits.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identity stamped onto every vector (endpoint + model).
    fn id(&self) -> &str;

    /// Dimensionality every returned vector must have.
    fn dimension(&self) -> usize;

    async fn embed_batch(&self, fragments: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparable_same_provider_same_dim() {
        let a = EmbeddingVector::new("openai:test", vec![1.0, 0.0]);
        let b = EmbeddingVector::new("openai:test", vec![0.0, 1.0]);
        assert!(a.check_comparable(&b).is_ok());
    }

    #[test]
    fn test_provider_mismatch_rejected() {
        let a = EmbeddingVector::new("openai:small", vec![1.0, 0.0]);
        let b = EmbeddingVector::new("cohere:v3", vec![0.0, 1.0]);
        let err = a.check_comparable(&b).unwrap_err();
        assert!(matches!(err, EmbeddingError::ProviderMismatch { .. }));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let a = EmbeddingVector::new("openai:test", vec![1.0, 0.0]);
        let b = EmbeddingVector::new("openai:test", vec![0.0, 1.0, 0.5]);
        let err = a.check_comparable(&b).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 2,
                got: 3
            }
        ));
    }
}
