//! ragpipe - Multi-stage RAG report pipeline
//!
//! Turns a technical question into a structured Markdown report by running a
//! fixed sequence of stages over a shared per-request state: multi-store
//! retrieval, cross-encoder reranking, context assembly, staged generation
//! (root cause, knowledge-base solution, web research), final synthesis and
//! citation resolution.
//!
//! # Architecture
//!
//! - Stages communicate only through `PipelineState`; each output field is
//!   owned by exactly one stage
//! - The first recorded error wins; later stages still run so the report can
//!   surface partial results
//! - External capabilities (generation, embedding, scoring, search, source
//!   lookup) sit behind traits so tests substitute fakes

pub mod errors;
pub mod config;
pub mod telemetry;

pub mod llm;
pub mod embedding;
pub mod retrieval;
pub mod reranking;
pub mod context;
pub mod generation;
pub mod citation;
pub mod websearch;
pub mod history;
pub mod pipeline;

// Re-export commonly used types
pub use config::RagConfig;
pub use errors::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineContext, PipelineOutcome, PipelineState};
pub use retrieval::Document;
