//! The fixed stage sequence
//!
//! Stages communicate only through `PipelineState`; each consumes the current
//! state and returns a partial update. A stage whose hard dependency failed
//! to initialize at startup records an error and produces null output
//! without attempting its work.

use crate::generation::{
    or_placeholder, GenerationStage, TemplateVars, PLACEHOLDER_ROOT_CAUSE, PLACEHOLDER_SOLUTION,
    PLACEHOLDER_WEB, ROOT_CAUSE_PROMPT, SOLUTION_PROMPT, SYNTHESIS_PROMPT,
};
use crate::pipeline::orchestrator::PipelineContext;
use crate::pipeline::state::{PipelineState, StageUpdate};
use crate::telemetry::PipelineEvent;
use async_trait::async_trait;
use std::time::Instant;

/// One unit of pipeline work
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Consume the current state, produce a partial update
    ///
    /// Stages must not return errors; failures are captured in the update.
    async fn run(&self, ctx: &PipelineContext, state: &PipelineState) -> StageUpdate;
}

/// Queries every document store and merges candidates
pub struct RetrieveStage;

#[async_trait]
impl Stage for RetrieveStage {
    fn name(&self) -> &'static str {
        "retrieve"
    }

    async fn run(&self, ctx: &PipelineContext, state: &PipelineState) -> StageUpdate {
        let documents = ctx.retriever.retrieve(&state.query).await;

        if let Some(telemetry) = &ctx.telemetry {
            telemetry.record(PipelineEvent::RetrievalCompleted {
                run_id: state.run_id,
                unique: documents.len(),
                timestamp: Instant::now(),
            });
        }

        StageUpdate {
            candidate_documents: Some(documents),
            ..Default::default()
        }
    }
}

/// Scores candidates and keeps the top few
pub struct RerankStage;

#[async_trait]
impl Stage for RerankStage {
    fn name(&self) -> &'static str {
        "rerank"
    }

    async fn run(&self, ctx: &PipelineContext, state: &PipelineState) -> StageUpdate {
        let input = state.candidate_documents.len();
        let outcome = ctx
            .reranker
            .rerank(&state.query, state.candidate_documents.clone())
            .await;

        if let Some(telemetry) = &ctx.telemetry {
            telemetry.record(PipelineEvent::RerankCompleted {
                run_id: state.run_id,
                input,
                kept: outcome.documents.len(),
                fallback: outcome.fallback,
                timestamp: Instant::now(),
            });
        }

        StageUpdate {
            ranked_documents: Some(outcome.documents),
            ..Default::default()
        }
    }
}

/// Formats ranked documents and history into the context block
pub struct AssembleContextStage;

#[async_trait]
impl Stage for AssembleContextStage {
    fn name(&self) -> &'static str {
        "assemble_context"
    }

    async fn run(&self, ctx: &PipelineContext, state: &PipelineState) -> StageUpdate {
        let context = ctx
            .context_builder
            .assemble(&state.ranked_documents, state.history.as_deref());

        StageUpdate {
            context: Some(context),
            ..Default::default()
        }
    }
}

/// Explains the underlying issue from the knowledge base
pub struct RootCauseStage;

#[async_trait]
impl Stage for RootCauseStage {
    fn name(&self) -> &'static str {
        "root_cause"
    }

    async fn run(&self, ctx: &PipelineContext, state: &PipelineState) -> StageUpdate {
        let Some(generator) = &ctx.analysis_generator else {
            return StageUpdate::error("RAG components failed to initialize.");
        };

        let stage = GenerationStage::new(ROOT_CAUSE_PROMPT);
        let mut vars = TemplateVars::new();
        vars.bind("context", state.context.clone())
            .bind("question", state.query.clone());

        match stage.generate(generator.as_ref(), &vars).await {
            Ok(analysis) => StageUpdate {
                root_cause: Some(analysis),
                ..Default::default()
            },
            Err(e) => StageUpdate::error(format!("Error during root cause analysis: {}", e)),
        }
    }
}

/// Finds a concrete answer from the knowledge base
pub struct SolutionStage;

#[async_trait]
impl Stage for SolutionStage {
    fn name(&self) -> &'static str {
        "solution"
    }

    async fn run(&self, ctx: &PipelineContext, state: &PipelineState) -> StageUpdate {
        let Some(generator) = &ctx.analysis_generator else {
            return StageUpdate::error("RAG components failed to initialize.");
        };

        let stage = GenerationStage::new(SOLUTION_PROMPT);
        let mut vars = TemplateVars::new();
        vars.bind("context", state.context.clone())
            .bind("question", state.query.clone());

        match stage.generate(generator.as_ref(), &vars).await {
            Ok(solution) => StageUpdate {
                solution: Some(solution),
                ..Default::default()
            },
            Err(e) => StageUpdate::error(format!("Error during solution finding: {}", e)),
        }
    }
}

/// Researches the query online through the reasoning-loop agent
pub struct WebSearchStage;

#[async_trait]
impl Stage for WebSearchStage {
    fn name(&self) -> &'static str {
        "web_search"
    }

    async fn run(&self, ctx: &PipelineContext, state: &PipelineState) -> StageUpdate {
        let Some(agent) = &ctx.web_agent else {
            return StageUpdate::error("Web search components failed to initialize.");
        };

        let mut steps = Vec::new();
        let result = agent.research_with_steps(&state.query, &mut steps).await;

        if let Some(telemetry) = &ctx.telemetry {
            for step in &steps {
                telemetry.record(PipelineEvent::AgentIteration {
                    run_id: state.run_id,
                    iteration: step.iteration,
                    searched: step.searched,
                    timestamp: Instant::now(),
                });
            }
        }

        match result {
            Ok(summary) => StageUpdate {
                web_summary: Some(summary),
                ..Default::default()
            },
            Err(e) => StageUpdate::error(format!("Error during web search: {}", e)),
        }
    }
}

/// Merges stage outputs into the final Markdown report
pub struct SynthesizeStage;

#[async_trait]
impl Stage for SynthesizeStage {
    fn name(&self) -> &'static str {
        "synthesize"
    }

    async fn run(&self, ctx: &PipelineContext, state: &PipelineState) -> StageUpdate {
        let Some(generator) = &ctx.synthesis_generator else {
            return StageUpdate::error("Synthesizer LLM is not available.");
        };

        let stage = GenerationStage::new(SYNTHESIS_PROMPT);
        let mut vars = TemplateVars::new();
        vars.bind("query", state.query.clone())
            .bind(
                "root_cause",
                or_placeholder(state.root_cause.as_deref(), PLACEHOLDER_ROOT_CAUSE),
            )
            .bind(
                "solution",
                or_placeholder(state.solution.as_deref(), PLACEHOLDER_SOLUTION),
            )
            .bind(
                "web_findings",
                or_placeholder(state.web_summary.as_deref(), PLACEHOLDER_WEB),
            );

        match stage.generate(generator.as_ref(), &vars).await {
            Ok(report) => StageUpdate {
                final_report: Some(report),
                clear_error: ctx.config.pipeline.clear_error_on_synthesis,
                ..Default::default()
            },
            Err(e) => StageUpdate::error(format!("Error during final synthesis: {}", e)),
        }
    }
}
