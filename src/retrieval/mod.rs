//! Document retrieval across multiple stores
//!
//! The retriever fans one query out to every configured store, merges the
//! candidate lists, and deduplicates by exact content. Retrieval is
//! best-effort: a store that errors contributes nothing, and total failure
//! yields an empty candidate list rather than an error.

pub mod store;

pub use store::{DocumentStore, QdrantDocumentStore};

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// A retrieved text passage with its source metadata
///
/// Immutable once retrieved. Identity for deduplication is the content text;
/// two documents with equal content are the same document regardless of
/// which store or metadata they carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: HashMap<String, JsonValue>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_source(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), JsonValue::String(source.into()));
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Source identifier from metadata, if present
    pub fn source(&self) -> Option<&str> {
        self.metadata.get("source").and_then(|v| v.as_str())
    }
}

/// Multi-store retriever
pub struct Retriever {
    stores: Vec<Arc<dyn DocumentStore>>,
    top_k_retrieval: usize,
}

impl Retriever {
    pub fn new(stores: Vec<Arc<dyn DocumentStore>>, top_k_retrieval: usize) -> Self {
        Self {
            stores,
            top_k_retrieval,
        }
    }

    /// Retrieve and deduplicate candidate documents for a query
    ///
    /// Merge order is first-store-first. Duplicate content keeps the position
    /// of its first occurrence but the metadata of the last occurrence,
    /// matching map insertion semantics.
    pub async fn retrieve(&self, query: &str) -> Vec<Document> {
        let mut merged: Vec<Document> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for store in &self.stores {
            let docs = match store.similarity_search(query, self.top_k_retrieval).await {
                Ok(docs) => docs,
                Err(e) => {
                    eprintln!("[retrieval] store '{}' failed: {}", store.name(), e);
                    continue;
                }
            };

            for doc in docs {
                match index.get(&doc.content) {
                    Some(&pos) => {
                        // Last duplicate wins metadata, first keeps position
                        merged[pos] = doc;
                    }
                    None => {
                        index.insert(doc.content.clone(), merged.len());
                        merged.push(doc);
                    }
                }
            }
        }

        merged
    }

    /// Number of configured stores
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    pub fn top_k_retrieval(&self) -> usize {
        self.top_k_retrieval
    }
}

/// In-memory document store for tests and fixtures
pub struct StaticStore {
    name: String,
    documents: Vec<Document>,
}

impl StaticStore {
    pub fn new(name: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            name: name.into(),
            documents,
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for StaticStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn similarity_search(&self, _query: &str, k: usize) -> Result<Vec<Document>> {
        Ok(self.documents.iter().take(k).cloned().collect())
    }
}
