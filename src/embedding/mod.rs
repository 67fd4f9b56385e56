//! Query embedding capability
//!
//! Vector stores need an embedding of the query before similarity search.
//! Embedding model internals are out of scope; the production implementation
//! delegates to Ollama's `/api/embeddings` endpoint.

use crate::errors::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Embedding capability for query text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

/// Ollama-backed embedding provider
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PipelineError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingsRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                PipelineError::GenerationApiError(format!("Failed to send request: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(PipelineError::GenerationApiError(format!(
                "Embeddings API error: {}",
                response.status()
            )));
        }

        let body: EmbeddingsResponse = response.json().await.map_err(|e| {
            PipelineError::GenerationApiError(format!("Failed to parse response: {}", e))
        })?;

        Ok(body.embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_creation() {
        let embedder = OllamaEmbedder::new("http://127.0.0.1:11434", "nomic-embed-text");
        assert!(embedder.is_ok());
        assert_eq!(embedder.unwrap().model(), "nomic-embed-text");
    }
}
