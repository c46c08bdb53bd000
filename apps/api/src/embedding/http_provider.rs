//! HTTP embedding provider for OpenAI-compatible `/embeddings` endpoints.
//!
//! Retries transient failures (429, 5xx, transport timeouts) with
//! exponential backoff; credential and input errors surface immediately.
//! A semaphore caps concurrent calls per provider so batch match requests
//! cannot stampede the endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::embedding::{EmbeddingError, EmbeddingProvider, EmbeddingVector};

const MAX_RETRIES: u32 = 3;

pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    id: String,
    dimension: usize,
    batch_size: usize,
    permits: Semaphore,
}

impl HttpEmbeddingProvider {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        dimension: usize,
        batch_size: usize,
        max_concurrency: usize,
        call_timeout: Duration,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing embedding API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        anyhow::ensure!(dimension > 0, "embedding dimension must be positive");
        anyhow::ensure!(batch_size > 0, "embedding batch size must be positive");

        let client = Client::builder().timeout(call_timeout).build()?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        let id = format!("{}#{}", base_url.trim_end_matches('/'), model);

        Ok(Self {
            client,
            endpoint,
            api_key,
            model,
            id,
            dimension,
            batch_size,
            permits: Semaphore::new(max_concurrency.max(1)),
        })
    }

    /// One provider round-trip for a single chunk, with retry on transient
    /// failures. 429 and 5xx retry; any other non-2xx surfaces immediately.
    async fn call_chunk(&self, chunk: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        let request_body = EmbeddingRequest {
            model: &self.model,
            input: chunk,
        };

        let mut last_error: Option<EmbeddingError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                warn!(
                    "embedding call attempt {} failed, retrying after {}ms",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    if is_retryable_transport(&e) {
                        last_error = Some(EmbeddingError::Transport(e));
                        continue;
                    }
                    return Err(EmbeddingError::Transport(e));
                }
            };

            let status = response.status();

            if should_retry(status) {
                let body = response.text().await.unwrap_or_default();
                warn!("embedding endpoint returned {status}: {body}");
                last_error = Some(EmbeddingError::Rejected {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(EmbeddingError::Rejected {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let mut parsed: EmbeddingResponse =
                response.json().await.map_err(EmbeddingError::Transport)?;
            parsed.data.sort_by_key(|entry| entry.index);

            if parsed.data.len() != chunk.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: chunk.len(),
                    got: parsed.data.len(),
                });
            }

            let mut vectors = Vec::with_capacity(parsed.data.len());
            for entry in parsed.data {
                // Never correct a dimension mismatch silently.
                if entry.embedding.len() != self.dimension {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: self.dimension,
                        got: entry.embedding.len(),
                    });
                }
                vectors.push(EmbeddingVector::new(self.id.clone(), entry.embedding));
            }

            debug!("embedded {} fragments via {}", vectors.len(), self.id);
            return Ok(vectors);
        }

        Err(EmbeddingError::RetriesExhausted {
            attempts: MAX_RETRIES,
            last: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, fragments: &[String]) -> Result<Vec<EmbeddingVector>, EmbeddingError> {
        if fragments.is_empty() {
            return Ok(Vec::new());
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .expect("embedding semaphore closed");

        let mut vectors = Vec::with_capacity(fragments.len());
        for chunk in fragments.chunks(self.batch_size) {
            vectors.extend(self.call_chunk(chunk).await?);
        }
        Ok(vectors)
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Exponential backoff: 1s, 2s, 4s.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(1000 * (1 << (attempt - 1)))
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
