//! Text generation capability
//!
//! Stages call `TextGenerator::complete` with a fully rendered prompt and get
//! back plain text. The production implementation talks to Ollama's
//! `/api/generate` endpoint; tests substitute fakes at this seam.

use crate::errors::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request timeout for generation calls
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Provider-agnostic generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce a completion for the given prompt text
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama-backed text generator
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
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

    /// Check if the backend is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
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
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::GenerationApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            PipelineError::GenerationApiError(format!("Failed to parse response: {}", e))
        })?;

        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_creation() {
        let generator = OllamaGenerator::new("http://127.0.0.1:11434", "qwen2.5:7b-instruct");
        assert!(generator.is_ok());
        assert_eq!(generator.unwrap().model(), "qwen2.5:7b-instruct");
    }

    #[tokio::test]
    #[ignore] // Requires Ollama running
    async fn test_complete_integration() {
        let generator =
            OllamaGenerator::new("http://127.0.0.1:11434", "qwen2.5:7b-instruct").unwrap();
        let output = generator.complete("Say hello.").await;
        assert!(output.is_ok());
    }
}
