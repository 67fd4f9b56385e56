//! Orchestration of the report pipeline
pub mod orchestrator;
pub mod stages;
pub mod state;

pub use orchestrator::{Pipeline, PipelineContext, PipelineOutcome};
pub use stages::Stage;
pub use state::{PipelineState, StageUpdate};
