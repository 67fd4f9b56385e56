//! Cross-encoder reranking of retrieved candidates
//!
//! The reranker scores every (query, content) pair with a cross-encoder
//! service, sorts descending, and keeps the top `top_k_final`. Scoring
//! failure falls back to truncating the original candidate list: reranking
//! degrades, it never empties the pipeline.

use crate::errors::{PipelineError, Result};
use crate::retrieval::Document;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Batched cross-encoder relevance scoring capability
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Score each content against the query; returns one score per content
    /// in input order
    async fn score(&self, query: &str, contents: &[String]) -> Result<Vec<f32>>;
}

/// Outcome of one rerank call
#[derive(Debug, Clone)]
pub struct RerankOutcome {
    pub documents: Vec<Document>,
    /// True when scoring failed and the truncation fallback was used
    pub fallback: bool,
}

/// Reranker with a fixed truncation bound
pub struct Reranker {
    scorer: Arc<dyn RelevanceScorer>,
    top_k_final: usize,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn RelevanceScorer>, top_k_final: usize) -> Self {
        Self {
            scorer,
            top_k_final,
        }
    }

    /// Rerank documents, keeping at most `top_k_final`
    ///
    /// Empty input returns empty without invoking the scorer. Ties preserve
    /// original relative order (stable sort).
    pub async fn rerank(&self, query: &str, docs: Vec<Document>) -> RerankOutcome {
        if docs.is_empty() {
            return RerankOutcome {
                documents: docs,
                fallback: false,
            };
        }

        let contents: Vec<String> = docs.iter().map(|d| d.content.clone()).collect();

        let scores = match self.scorer.score(query, &contents).await {
            Ok(scores) if scores.len() == docs.len() => scores,
            Ok(scores) => {
                eprintln!(
                    "[rerank] scorer returned {} scores for {} documents, falling back",
                    scores.len(),
                    docs.len()
                );
                return self.truncate_fallback(docs);
            }
            Err(e) => {
                eprintln!("[rerank] scoring failed: {}", e);
                return self.truncate_fallback(docs);
            }
        };

        let mut ranked: Vec<(Document, f32)> = docs.into_iter().zip(scores).collect();
        // Stable sort keeps original order among equal scores
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(self.top_k_final);

        RerankOutcome {
            documents: ranked.into_iter().map(|(doc, _)| doc).collect(),
            fallback: false,
        }
    }

    fn truncate_fallback(&self, mut docs: Vec<Document>) -> RerankOutcome {
        docs.truncate(self.top_k_final);
        RerankOutcome {
            documents: docs,
            fallback: true,
        }
    }

    pub fn top_k_final(&self) -> usize {
        self.top_k_final
    }
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    texts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RerankEntry {
    index: usize,
    score: f32,
}

/// HTTP client for a cross-encoder rerank service
#[derive(Debug, Clone)]
pub struct HttpRerankClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl HttpRerankClient {
    pub fn new(endpoint: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PipelineError::HttpError)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl RelevanceScorer for HttpRerankClient {
    async fn score(&self, query: &str, contents: &[String]) -> Result<Vec<f32>> {
        let url = format!("{}/rerank", self.endpoint);

        let request = RerankRequest {
            model: &self.model,
            query,
            texts: contents,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Generic(format!("Rerank request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Generic(format!(
                "Rerank API error: {}",
                response.status()
            )));
        }

        let entries: Vec<RerankEntry> = response
            .json()
            .await
            .map_err(|e| PipelineError::Generic(format!("Failed to parse rerank response: {}", e)))?;

        // The service returns entries sorted by score; restore input order
        let mut scores = vec![0.0f32; contents.len()];
        for entry in entries {
            if entry.index < scores.len() {
                scores[entry.index] = entry.score;
            }
        }

        Ok(scores)
    }
}
