//! Error types for the ragpipe report pipeline
//!
//! Stage failures are normally captured into `PipelineState.error` rather
//! than raised; these variants cover the places where code does return `Err`
//! (client construction, template misuse, the orchestrator step bound).

use thiserror::Error;

/// Main error type for the pipeline and its collaborator clients
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required shared resource failed to construct at startup
    #[error("Initialization failure: {0}")]
    InitializationFailure(String),

    /// A stage's external call failed
    #[error("Stage '{stage}' failed: {message}")]
    StageFailure { stage: String, message: String },

    /// Orchestrator exceeded its configured step bound
    #[error("Pipeline exceeded maximum of {max} steps")]
    RecursionLimit { max: usize },

    /// A prompt template was rendered without a required variable
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Document store errors
    #[error("Document store error: {0}")]
    StoreError(String),

    /// Generation backend errors
    #[error("Generation API error: {0}")]
    GenerationApiError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic errors with context
    #[error("Pipeline error: {0}")]
    Generic(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Convert anyhow errors to PipelineError
impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        PipelineError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::StageFailure {
            stage: "root_cause".to_string(),
            message: "model unreachable".to_string(),
        };
        assert!(err.to_string().contains("root_cause"));
        assert!(err.to_string().contains("model unreachable"));
    }

    #[test]
    fn test_recursion_limit_display() {
        let err = PipelineError::RecursionLimit { max: 15 };
        assert!(err.to_string().contains("15"));
    }
}
