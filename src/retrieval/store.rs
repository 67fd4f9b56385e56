//! Qdrant-backed document store
use crate::embedding::EmbeddingProvider;
use crate::errors::{PipelineError, Result};
use crate::retrieval::Document;
use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{with_payload_selector::SelectorOptions, SearchPoints, WithPayloadSelector},
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Similarity-search capability over one document collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Identifier used in diagnostics
    fn name(&self) -> &str;

    /// Return up to `k` documents most similar to the query
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>>;
}

/// Document store over a Qdrant collection
///
/// Points carry their passage text under the `document` payload key; every
/// other payload entry becomes document metadata.
pub struct QdrantDocumentStore {
    client: QdrantClient,
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl QdrantDocumentStore {
    pub fn new(
        url: &str,
        collection: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .map_err(|e| PipelineError::StoreError(format!("Failed to create Qdrant client: {}", e)))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            embedder,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl DocumentStore for QdrantDocumentStore {
    fn name(&self) -> &str {
        &self.collection
    }

    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        let query_embedding = self.embedder.embed(query).await?;

        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: query_embedding,
                limit: k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .map_err(|e| PipelineError::StoreError(format!("Failed to search points: {}", e)))?;

        let documents = search_result
            .result
            .into_iter()
            .map(|point| {
                let payload = point.payload;
                let content = payload
                    .get("document")
                    .and_then(qdrant_value_to_string)
                    .unwrap_or_default();

                let mut metadata = HashMap::new();
                for (key, value) in payload {
                    if key != "document" {
                        if let Some(json_val) = qdrant_to_json_value(&value) {
                            metadata.insert(key, json_val);
                        }
                    }
                }

                Document { content, metadata }
            })
            .collect();

        Ok(documents)
    }
}

fn qdrant_to_json_value(value: &qdrant_client::qdrant::Value) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| {
        use qdrant_client::qdrant::value::Kind;
        match kind {
            Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
            Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
            Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
            Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
            _ => None,
        }
    })
}

fn qdrant_value_to_string(value: &qdrant_client::qdrant::Value) -> Option<String> {
    value.kind.as_ref().and_then(|kind| {
        use qdrant_client::qdrant::value::Kind;
        match kind {
            Kind::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::OllamaEmbedder;

    #[tokio::test]
    #[ignore] // Requires Qdrant and Ollama running
    async fn test_similarity_search_integration() {
        let embedder =
            Arc::new(OllamaEmbedder::new("http://127.0.0.1:11434", "nomic-embed-text").unwrap());
        let store =
            QdrantDocumentStore::new("http://127.0.0.1:6334", "docs_primary", embedder).unwrap();

        let docs = store.similarity_search("matrix inversion", 5).await;
        assert!(docs.is_ok());
    }
}
