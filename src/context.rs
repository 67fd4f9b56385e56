//! Context assembly for generation prompts
//!
//! Formats the ranked documents (and optional prior conversation turns) into
//! the single text block handed to a generation stage.

use crate::config::{ContextConfig, SourceLabel};
use crate::retrieval::Document;

/// Sentinel emitted when retrieval found nothing usable
pub const NO_DOCUMENTS_SENTINEL: &str = "No relevant documents found in the knowledge base.";

/// Context assembler
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            config: ContextConfig::default(),
        }
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Assemble documents and optional history into one context block
    ///
    /// Empty docs yield the sentinel. History, when present, is prepended and
    /// separated from the document context by a blank line. The result is
    /// trimmed of leading and trailing whitespace.
    pub fn assemble(&self, docs: &[Document], history: Option<&str>) -> String {
        let doc_context = if docs.is_empty() {
            NO_DOCUMENTS_SENTINEL.to_string()
        } else {
            docs.iter()
                .enumerate()
                .map(|(i, doc)| self.format_document(i + 1, doc))
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let full = match history {
            Some(history) if !history.trim().is_empty() => {
                format!("{}\n\n{}", history, doc_context)
            }
            _ => doc_context,
        };

        full.trim().to_string()
    }

    fn format_document(&self, index: usize, doc: &Document) -> String {
        match self.config.label {
            SourceLabel::Ordinal => {
                format!("Source Document {}:\n{}", index, doc.content)
            }
            SourceLabel::SourcePath => {
                let source = doc.source().unwrap_or("unknown");
                format!("Source: {}\n{}", source, doc.content)
            }
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordinal_builder() -> ContextBuilder {
        ContextBuilder::with_config(ContextConfig {
            label: SourceLabel::Ordinal,
        })
    }

    #[test]
    fn test_empty_docs_emit_sentinel() {
        let builder = ordinal_builder();
        let context = builder.assemble(&[], None);
        assert_eq!(context, NO_DOCUMENTS_SENTINEL);
        assert!(!context.contains("Source Document"));
    }

    #[test]
    fn test_empty_docs_with_history_keep_sentinel() {
        let builder = ordinal_builder();
        let context = builder.assemble(&[], Some("Q: earlier\nA: answer"));
        assert!(context.contains(NO_DOCUMENTS_SENTINEL));
        assert!(context.contains("Q: earlier"));
        assert!(!context.contains("Source Document"));
    }

    #[test]
    fn test_ordinal_labels() {
        let builder = ordinal_builder();
        let docs = vec![Document::new("first passage"), Document::new("second passage")];

        let context = builder.assemble(&docs, None);
        assert_eq!(
            context,
            "Source Document 1:\nfirst passage\n\nSource Document 2:\nsecond passage"
        );
    }

    #[test]
    fn test_source_path_labels() {
        let builder = ContextBuilder::new();
        let docs = vec![
            Document::with_source("passage", "interp1.md"),
            Document::new("unattributed"),
        ];

        let context = builder.assemble(&docs, None);
        assert!(context.contains("Source: interp1.md\npassage"));
        assert!(context.contains("Source: unknown\nunattributed"));
    }

    #[test]
    fn test_history_prepended_and_trimmed() {
        let builder = ordinal_builder();
        let docs = vec![Document::new("doc body")];

        let context = builder.assemble(&docs, Some("Q: old\nA: reply"));
        assert!(context.starts_with("Q: old"));
        assert!(context.contains("\n\nSource Document 1:"));
        assert_eq!(context, context.trim());
    }

    #[test]
    fn test_blank_history_ignored() {
        let builder = ordinal_builder();
        let docs = vec![Document::new("doc body")];

        let context = builder.assemble(&docs, Some("   "));
        assert!(context.starts_with("Source Document 1:"));
    }
}
