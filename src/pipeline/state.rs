//! Shared state threaded through every pipeline stage
//!
//! One `PipelineState` exists per request. Stages never mutate it directly;
//! they return a `StageUpdate` that the orchestrator merges, which is the
//! single place the first-error-wins rule is enforced.

use crate::retrieval::Document;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mutable record shared across the stages of one request
///
/// Each output field is owned by exactly one producing stage and stays `None`
/// if that stage fails. `query`, `run_id` and `history` are set at entry and
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub run_id: Uuid,
    pub query: String,
    /// Formatted prior conversation block, owned by the session layer
    pub history: Option<String>,
    /// Produced by retrieval, consumed by reranking
    pub candidate_documents: Vec<Document>,
    /// Produced by reranking, consumed by context assembly
    pub ranked_documents: Vec<Document>,
    /// Produced by context assembly, consumed by the generation stages
    pub context: String,
    pub root_cause: Option<String>,
    pub solution: Option<String>,
    pub web_summary: Option<String>,
    pub final_report: Option<String>,
    /// First non-recoverable error encountered so far
    pub error: Option<String>,
}

impl PipelineState {
    pub fn new(query: &str, history: Option<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            query: query.to_string(),
            history,
            candidate_documents: Vec::new(),
            ranked_documents: Vec::new(),
            context: String::new(),
            root_cause: None,
            solution: None,
            web_summary: None,
            final_report: None,
            error: None,
        }
    }

    /// Record an error only if none was recorded earlier
    pub fn record_error(&mut self, message: impl Into<String>) {
        if self.error.is_none() {
            self.error = Some(message.into());
        }
    }

    /// Merge a stage's partial update into the state
    pub fn apply(&mut self, update: StageUpdate) {
        if let Some(docs) = update.candidate_documents {
            self.candidate_documents = docs;
        }
        if let Some(docs) = update.ranked_documents {
            self.ranked_documents = docs;
        }
        if let Some(context) = update.context {
            self.context = context;
        }
        if let Some(text) = update.root_cause {
            self.root_cause = Some(text);
        }
        if let Some(text) = update.solution {
            self.solution = Some(text);
        }
        if let Some(text) = update.web_summary {
            self.web_summary = Some(text);
        }
        if let Some(text) = update.final_report {
            self.final_report = Some(text);
        }
        if update.clear_error {
            self.error = None;
        }
        if let Some(message) = update.error {
            self.record_error(message);
        }
    }
}

/// Partial update produced by one stage
///
/// `None` means the stage does not touch that field.
#[derive(Debug, Clone, Default)]
pub struct StageUpdate {
    pub candidate_documents: Option<Vec<Document>>,
    pub ranked_documents: Option<Vec<Document>>,
    pub context: Option<String>,
    pub root_cause: Option<String>,
    pub solution: Option<String>,
    pub web_summary: Option<String>,
    pub final_report: Option<String>,
    pub error: Option<String>,
    /// Set by synthesis when configured to clear earlier non-fatal errors
    pub clear_error: bool,
}

impl StageUpdate {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state() {
        let state = PipelineState::new("why does interp1 fail?", None);
        assert_eq!(state.query, "why does interp1 fail?");
        assert!(state.candidate_documents.is_empty());
        assert!(state.root_cause.is_none());
        assert!(state.error.is_none());
    }

    #[test]
    fn test_first_error_wins() {
        let mut state = PipelineState::new("q", None);
        state.record_error("first failure");
        state.record_error("second failure");
        assert_eq!(state.error.as_deref(), Some("first failure"));

        // Same rule through apply()
        state.apply(StageUpdate::error("third failure"));
        assert_eq!(state.error.as_deref(), Some("first failure"));
    }

    #[test]
    fn test_apply_merges_only_set_fields() {
        let mut state = PipelineState::new("q", None);
        state.apply(StageUpdate {
            root_cause: Some("because of X".to_string()),
            ..Default::default()
        });
        state.apply(StageUpdate {
            solution: Some("do Y".to_string()),
            ..Default::default()
        });

        assert_eq!(state.root_cause.as_deref(), Some("because of X"));
        assert_eq!(state.solution.as_deref(), Some("do Y"));
        assert!(state.final_report.is_none());
    }

    #[test]
    fn test_clear_error_then_no_resurrection() {
        let mut state = PipelineState::new("q", None);
        state.record_error("early failure");

        state.apply(StageUpdate {
            final_report: Some("report".to_string()),
            clear_error: true,
            ..Default::default()
        });
        assert!(state.error.is_none());
    }
}
