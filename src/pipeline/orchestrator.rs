//! Pipeline orchestration
//!
//! The orchestrator owns the fixed stage sequence. Per request it threads one
//! `PipelineState` through the stages, merges each `StageUpdate` (where
//! first-error-wins is enforced), applies citation resolution to the final
//! report, and emits telemetry. A hard step bound guards against accidental
//! cycles if the sequence is ever misconfigured.

use crate::citation::{CitationResolver, FileSourceLookup};
use crate::config::RagConfig;
use crate::context::ContextBuilder;
use crate::errors::{PipelineError, Result};
use crate::llm::{OllamaGenerator, TextGenerator};
use crate::pipeline::stages::{
    AssembleContextStage, RerankStage, RetrieveStage, RootCauseStage, SolutionStage, Stage,
    SynthesizeStage, WebSearchStage,
};
use crate::pipeline::state::PipelineState;
use crate::reranking::{HttpRerankClient, RelevanceScorer, Reranker};
use crate::retrieval::{DocumentStore, QdrantDocumentStore, Retriever};
use crate::telemetry::{PipelineEvent, PipelineTelemetry};
use crate::websearch::{HttpSearchTool, WebSearchAgent};
use crate::embedding::OllamaEmbedder;
use std::sync::Arc;
use std::time::Instant;

/// Shared resources the stages draw on
///
/// Hard dependencies that failed to construct at startup are `None`; the
/// stages that need them record an error instead of running. Fields are
/// public so tests can assemble a context from fakes.
pub struct PipelineContext {
    pub retriever: Retriever,
    pub reranker: Reranker,
    pub context_builder: ContextBuilder,
    pub analysis_generator: Option<Arc<dyn TextGenerator>>,
    pub synthesis_generator: Option<Arc<dyn TextGenerator>>,
    pub web_agent: Option<WebSearchAgent>,
    pub resolver: CitationResolver,
    pub telemetry: Option<PipelineTelemetry>,
    pub config: RagConfig,
}

/// Scorer standing in when the rerank client could not be built
///
/// Always errors, which routes every rerank call through the truncation
/// fallback.
struct UnavailableScorer;

#[async_trait::async_trait]
impl RelevanceScorer for UnavailableScorer {
    async fn score(&self, _query: &str, _contents: &[String]) -> Result<Vec<f32>> {
        Err(PipelineError::InitializationFailure(
            "rerank client unavailable".to_string(),
        ))
    }
}

impl PipelineContext {
    /// Build the context from configuration
    ///
    /// Never fails: a collaborator that cannot be constructed degrades the
    /// pipeline (missing store, rerank fallback, stage error) instead of
    /// aborting startup.
    pub fn from_config(config: RagConfig) -> Self {
        let mut stores: Vec<Arc<dyn DocumentStore>> = Vec::new();
        match OllamaEmbedder::new(
            &config.generation.base_url,
            &config.retrieval.embedding_model,
        ) {
            Ok(embedder) => {
                let embedder: Arc<dyn crate::embedding::EmbeddingProvider> = Arc::new(embedder);
                for store in &config.retrieval.stores {
                    match QdrantDocumentStore::new(&store.url, &store.collection, embedder.clone())
                    {
                        Ok(s) => stores.push(Arc::new(s)),
                        Err(e) => {
                            eprintln!("[init] store '{}' unavailable: {}", store.collection, e)
                        }
                    }
                }
            }
            Err(e) => eprintln!("[init] embedder unavailable: {}", e),
        }
        let retriever = Retriever::new(stores, config.retrieval.top_k_retrieval);

        let scorer: Arc<dyn RelevanceScorer> =
            match HttpRerankClient::new(&config.rerank.endpoint, &config.rerank.model) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    eprintln!("[init] rerank client unavailable: {}", e);
                    Arc::new(UnavailableScorer)
                }
            };
        let reranker = Reranker::new(scorer, config.rerank.top_k_final);

        let context_builder = ContextBuilder::with_config(config.context.clone());

        let analysis_generator = build_generator(
            &config.generation.base_url,
            &config.generation.analysis_model,
        );
        let synthesis_generator = build_generator(
            &config.generation.base_url,
            &config.generation.synthesis_model,
        );

        let web_agent = match (
            build_generator(&config.generation.base_url, &config.generation.web_model),
            HttpSearchTool::new(&config.websearch.endpoint, config.websearch.max_results),
        ) {
            (Some(generator), Ok(tool)) => Some(WebSearchAgent::new(
                generator,
                Arc::new(tool),
                config.websearch.max_iterations,
            )),
            (_, Err(e)) => {
                eprintln!("[init] search tool unavailable: {}", e);
                None
            }
            (None, _) => None,
        };

        let resolver = CitationResolver::new(
            &config.citation.docs_dir,
            Arc::new(FileSourceLookup::new(config.citation.docs_dir.clone())),
        );

        Self {
            retriever,
            reranker,
            context_builder,
            analysis_generator,
            synthesis_generator,
            web_agent,
            resolver,
            telemetry: Some(PipelineTelemetry::new()),
            config,
        }
    }
}

fn build_generator(base_url: &str, model: &str) -> Option<Arc<dyn TextGenerator>> {
    match OllamaGenerator::new(base_url, model) {
        Ok(generator) => Some(Arc::new(generator)),
        Err(e) => {
            eprintln!("[init] generator '{}' unavailable: {}", model, e);
            None
        }
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub query: String,
    /// Final report with citations resolved, when synthesis produced one
    pub report: Option<String>,
    /// First error recorded during the run, if any
    pub error: Option<String>,
    /// Complete terminal state for callers that need intermediate outputs
    pub state: PipelineState,
}

/// The orchestrator: a fixed stage sequence with a step bound
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    max_steps: usize,
}

impl Pipeline {
    /// The standard report sequence
    pub fn standard(max_steps: usize) -> Self {
        Self {
            stages: vec![
                Box::new(RetrieveStage),
                Box::new(RerankStage),
                Box::new(AssembleContextStage),
                Box::new(RootCauseStage),
                Box::new(SolutionStage),
                Box::new(WebSearchStage),
                Box::new(SynthesizeStage),
            ],
            max_steps,
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order and resolve citations in the final report
    ///
    /// Stage failures are absorbed into the state; the only `Err` this
    /// returns is the step bound being exceeded.
    pub async fn run(
        &self,
        ctx: &PipelineContext,
        query: &str,
        history: Option<String>,
    ) -> Result<PipelineOutcome> {
        let mut state = PipelineState::new(query, history);
        let run_started = Instant::now();

        if let Some(telemetry) = &ctx.telemetry {
            telemetry.record(PipelineEvent::RunStarted {
                run_id: state.run_id,
                timestamp: run_started,
            });
        }

        for (step, stage) in self.stages.iter().enumerate() {
            if step >= self.max_steps {
                return Err(PipelineError::RecursionLimit {
                    max: self.max_steps,
                });
            }

            let stage_started = Instant::now();
            if let Some(telemetry) = &ctx.telemetry {
                telemetry.record(PipelineEvent::StageStarted {
                    run_id: state.run_id,
                    stage: stage.name().to_string(),
                    timestamp: stage_started,
                });
            }

            let update = stage.run(ctx, &state).await;
            let success = update.error.is_none();
            state.apply(update);

            if let Some(telemetry) = &ctx.telemetry {
                telemetry.record(PipelineEvent::StageCompleted {
                    run_id: state.run_id,
                    stage: stage.name().to_string(),
                    duration_ms: stage_started.elapsed().as_millis() as u64,
                    success,
                    timestamp: Instant::now(),
                });
            }
        }

        if let Some(report) = state.final_report.take() {
            state.final_report = Some(ctx.resolver.resolve(&report));
        }

        if let Some(telemetry) = &ctx.telemetry {
            telemetry.record(PipelineEvent::RunCompleted {
                run_id: state.run_id,
                duration_ms: run_started.elapsed().as_millis() as u64,
                had_error: state.error.is_some(),
                timestamp: Instant::now(),
            });
        }

        Ok(PipelineOutcome {
            query: state.query.clone(),
            report: state.final_report.clone(),
            error: state.error.clone(),
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::SourceLookup;
    use crate::pipeline::state::StageUpdate;
    use async_trait::async_trait;

    struct EmptyLookup;

    impl SourceLookup for EmptyLookup {
        fn source_for(&self, _token: &str) -> Option<String> {
            None
        }
    }

    struct NamedStage {
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl Stage for NamedStage {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self, _ctx: &PipelineContext, _state: &PipelineState) -> StageUpdate {
            if self.fail {
                StageUpdate::error(format!("{} failed", self.name))
            } else {
                StageUpdate::default()
            }
        }
    }

    fn bare_context() -> PipelineContext {
        let config = RagConfig::default();
        PipelineContext {
            retriever: Retriever::new(Vec::new(), config.retrieval.top_k_retrieval),
            reranker: Reranker::new(Arc::new(UnavailableScorer), config.rerank.top_k_final),
            context_builder: ContextBuilder::with_config(config.context.clone()),
            analysis_generator: None,
            synthesis_generator: None,
            web_agent: None,
            resolver: CitationResolver::new(&config.citation.docs_dir, Arc::new(EmptyLookup)),
            telemetry: Some(PipelineTelemetry::new()),
            config,
        }
    }

    #[test]
    fn test_standard_sequence_order() {
        let pipeline = Pipeline::standard(15);
        assert_eq!(
            pipeline.stage_names(),
            vec![
                "retrieve",
                "rerank",
                "assemble_context",
                "root_cause",
                "solution",
                "web_search",
                "synthesize"
            ]
        );
    }

    #[tokio::test]
    async fn test_step_bound_exceeded() {
        let pipeline = Pipeline::standard(3);
        let ctx = bare_context();

        let result = pipeline.run(&ctx, "q", None).await;
        assert!(matches!(
            result,
            Err(PipelineError::RecursionLimit { max: 3 })
        ));
    }

    #[tokio::test]
    async fn test_failing_stage_does_not_abort_the_run() {
        let pipeline = Pipeline {
            stages: vec![
                Box::new(NamedStage {
                    name: "first",
                    fail: true,
                }),
                Box::new(NamedStage {
                    name: "second",
                    fail: false,
                }),
            ],
            max_steps: 15,
        };
        let ctx = bare_context();

        let outcome = pipeline.run(&ctx, "q", None).await.unwrap();
        assert_eq!(outcome.error.as_deref(), Some("first failed"));

        let telemetry = ctx.telemetry.as_ref().unwrap();
        let stats = telemetry.stats();
        assert_eq!(stats.stages_executed, 2);
        assert_eq!(stats.stages_failed, 1);
        assert_eq!(stats.runs_with_error, 1);
    }

    #[tokio::test]
    async fn test_missing_generators_record_initialization_errors() {
        // No generators configured: generation stages degrade to errors but
        // the run still completes end to end.
        let pipeline = Pipeline::standard(15);
        let ctx = bare_context();

        let outcome = pipeline.run(&ctx, "why is X failing?", None).await.unwrap();
        assert_eq!(
            outcome.error.as_deref(),
            Some("RAG components failed to initialize.")
        );
        assert!(outcome.report.is_none());
        // First-error-wins: the later synthesizer failure is not recorded
        assert!(outcome.state.root_cause.is_none());
        assert!(outcome.state.final_report.is_none());
    }
}
