//! Conversation history owned by the session layer
//!
//! The pipeline never mutates history; it receives the formatted block as
//! read-only input to context assembly. The store enforces the
//! one-user-turn-before / one-assistant-turn-after discipline per request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// One completed question/answer exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered conversation history for one session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
    /// Question awaiting its answer, if a request is in flight
    pending_question: Option<String>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the user turn before pipeline execution
    pub fn begin_turn(&mut self, question: &str) {
        self.pending_question = Some(question.to_string());
    }

    /// Record the assistant turn after pipeline execution
    pub fn complete_turn(&mut self, answer: &str) {
        if let Some(question) = self.pending_question.take() {
            self.turns.push(ConversationTurn {
                question,
                answer: answer.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Format completed turns as a text block for context assembly
    ///
    /// Each turn renders as "Q: ...\nA: ..." with blank lines between turns.
    /// A pending question is excluded; the pipeline sees history up to the
    /// previous completed turn.
    pub fn format_block(&self) -> Option<String> {
        if self.turns.is_empty() {
            return None;
        }

        let block = self
            .turns
            .iter()
            .map(|t| format!("Q: {}\nA: {}", t.question, t.answer))
            .collect::<Vec<_>>()
            .join("\n\n");

        Some(block)
    }
}

/// In-memory session store keyed by session id
///
/// Different sessions are independent; concurrent requests within one session
/// have undefined ordering and are out of scope.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, ConversationHistory>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the history for a session (empty if unknown)
    pub fn history(&self, session_id: &str) -> ConversationHistory {
        let sessions = self.sessions.lock().expect("session store poisoned");
        sessions.get(session_id).cloned().unwrap_or_default()
    }

    /// Append the user turn, returning the history block formatted up to the
    /// previous completed turn
    pub fn begin_turn(&self, session_id: &str, question: &str) -> Option<String> {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        let history = sessions.entry(session_id.to_string()).or_default();
        let block = history.format_block();
        history.begin_turn(question);
        block
    }

    /// Append the assistant turn completing the exchange
    pub fn complete_turn(&self, session_id: &str, answer: &str) {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        if let Some(history) = sessions.get_mut(session_id) {
            history.complete_turn(answer);
        }
    }

    /// Overwrite the history for a session
    pub fn set_history(&self, session_id: &str, history: ConversationHistory) {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        sessions.insert(session_id.to_string(), history);
    }

    /// Delete a session, returning whether it existed
    pub fn delete(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        sessions.remove(session_id).is_some()
    }
}
