use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Top-level pipeline configuration
///
/// The core never reads the process environment; callers load this once at
/// startup (from file or defaults) and pass it into `PipelineContext`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub rerank: RerankConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub websearch: WebSearchConfig,
    #[serde(default)]
    pub citation: CitationConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Location of one vector store collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Qdrant endpoint URL
    pub url: String,
    /// Collection name within the store
    pub collection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Document stores queried for every request
    pub stores: Vec<StoreConfig>,
    /// Embedding model identifier used to embed the query
    pub embedding_model: String,
    /// Candidates requested from each store
    pub top_k_retrieval: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            stores: vec![
                StoreConfig {
                    url: "http://127.0.0.1:6334".to_string(),
                    collection: "docs_primary".to_string(),
                },
                StoreConfig {
                    url: "http://127.0.0.1:6334".to_string(),
                    collection: "docs_secondary".to_string(),
                },
            ],
            embedding_model: "nomic-embed-text".to_string(),
            top_k_retrieval: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankConfig {
    /// Cross-encoder rerank service endpoint
    pub endpoint: String,
    /// Reranker model identifier
    pub model: String,
    /// Documents kept after reranking
    pub top_k_final: usize,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080".to_string(),
            model: "bge-reranker-base".to_string(),
            top_k_final: 5,
        }
    }
}

/// Per-document label policy for assembled context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLabel {
    /// "Source Document N:" ordinals
    Ordinal,
    /// "Source: <metadata source path>" headers
    SourcePath,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// How each document is labelled in the context block
    pub label: SourceLabel,
}

impl Default for ContextConfig {
    fn default() -> Self {
        // SourcePath keeps filenames in generated text for citation resolution
        Self {
            label: SourceLabel::SourcePath,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Model for the root-cause and solution stages
    pub analysis_model: String,
    /// Model for web-search reasoning and summarization
    pub web_model: String,
    /// Model for final report synthesis
    pub synthesis_model: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            analysis_model: "qwen2.5:7b-instruct".to_string(),
            web_model: "qwen2.5:7b-instruct".to_string(),
            synthesis_model: "qwen2.5:7b-instruct".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    /// Search API endpoint
    pub endpoint: String,
    /// Results requested per search call
    pub max_results: usize,
    /// Cap on reasoning-loop iterations
    pub max_iterations: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8888/search".to_string(),
            max_results: 4,
            max_iterations: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationConfig {
    /// Directory holding reference files with "Source:" headers
    pub docs_dir: PathBuf,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("knowledge-docs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Safety backstop against accidental cycles
    pub max_steps: usize,
    /// Whether a successful synthesis clears an earlier non-fatal error
    pub clear_error_on_synthesis: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_steps: 15,
            clear_error_on_synthesis: false,
        }
    }
}

impl RagConfig {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = RagConfig::default();
            config.save()?;
            return Ok(config);
        }

        let contents =
            fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: RagConfig =
            toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, toml_string).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;

        Ok(home.join(".ragpipe").join("config.toml"))
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        RagConfig {
            retrieval: RetrievalConfig::default(),
            rerank: RerankConfig::default(),
            context: ContextConfig::default(),
            generation: GenerationConfig::default(),
            websearch: WebSearchConfig::default(),
            citation: CitationConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.retrieval.top_k_retrieval, 20);
        assert_eq!(config.rerank.top_k_final, 5);
        assert_eq!(config.pipeline.max_steps, 15);
        assert_eq!(config.retrieval.stores.len(), 2);
        assert!(!config.pipeline.clear_error_on_synthesis);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = RagConfig::default();
        config.rerank.top_k_final = 3;
        config.context.label = SourceLabel::Ordinal;

        let toml_string = toml::to_string(&config).unwrap();
        let deserialized: RagConfig = toml::from_str(&toml_string).unwrap();

        assert_eq!(deserialized.rerank.top_k_final, 3);
        assert_eq!(deserialized.context.label, SourceLabel::Ordinal);
    }

    #[test]
    fn test_partial_config_parses() {
        // Missing sections fall back to defaults
        let config: RagConfig = toml::from_str("[rerank]\nendpoint = \"http://r:1\"\nmodel = \"m\"\ntop_k_final = 2\n").unwrap();
        assert_eq!(config.rerank.top_k_final, 2);
        assert_eq!(config.retrieval.top_k_retrieval, 20);
    }
}
