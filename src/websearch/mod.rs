//! Web research via a bounded tool-using reasoning loop
//!
//! An LLM agent may invoke the search tool zero or more times and must
//! terminate with a final natural-language summary. The loop is an explicit
//! state machine with an iteration cap; only the final text is exposed to the
//! rest of the pipeline.

use crate::errors::{PipelineError, Result};
use crate::generation::{TemplateVars, WEB_AGENT_PROMPT};
use crate::llm::TextGenerator;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fallback when the loop ends without a final model message
pub const NO_FINAL_ANSWER: &str = "Agent did not produce a final answer.";

/// One web search result surfaced to the reasoning loop
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

/// Web search capability
#[async_trait]
pub trait SearchTool: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Reasoning-loop phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    /// Model is deciding between searching and answering
    Reasoning,
    /// Model requested a search
    ToolCall,
    /// Search results were appended to the trace
    ToolResult,
    /// Final answer produced (terminal)
    Done,
}

/// Entry in the agent's interaction trace
#[derive(Debug, Clone)]
enum TraceEntry {
    Model(String),
    Tool(String),
}

/// Iteration report for telemetry
#[derive(Debug, Clone)]
pub struct AgentStep {
    pub iteration: usize,
    pub searched: bool,
}

/// Bounded web research agent
pub struct WebSearchAgent {
    generator: Arc<dyn TextGenerator>,
    tool: Arc<dyn SearchTool>,
    max_iterations: usize,
}

impl WebSearchAgent {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        tool: Arc<dyn SearchTool>,
        max_iterations: usize,
    ) -> Self {
        Self {
            generator,
            tool,
            max_iterations,
        }
    }

    /// Run the reasoning loop and return the final summary text
    ///
    /// Terminates when the model answers without a search directive or when
    /// the iteration cap is reached. With no model-authored message in the
    /// trace, returns the fixed fallback string rather than failing.
    pub async fn research(&self, query: &str) -> Result<String> {
        self.research_with_steps(query, &mut Vec::new()).await
    }

    /// As `research`, recording per-iteration steps for the caller
    pub async fn research_with_steps(
        &self,
        query: &str,
        steps: &mut Vec<AgentStep>,
    ) -> Result<String> {
        let mut trace: Vec<TraceEntry> = Vec::new();
        let mut phase = AgentPhase::Reasoning;
        let mut final_answer: Option<String> = None;
        let mut iteration = 0;

        while phase != AgentPhase::Done && iteration < self.max_iterations {
            let mut vars = TemplateVars::new();
            vars.bind("question", query)
                .bind("transcript", format_trace(&trace));
            let prompt = WEB_AGENT_PROMPT.render(&vars)?;

            let reply = self.generator.complete(&prompt).await?;
            trace.push(TraceEntry::Model(reply.clone()));

            phase = match parse_search_directive(&reply) {
                Some(search_query) => {
                    steps.push(AgentStep {
                        iteration,
                        searched: true,
                    });

                    let observation = match self.tool.search(&search_query).await {
                        Ok(hits) => format_hits(&search_query, &hits),
                        Err(e) => format!("Search for \"{}\" failed: {}", search_query, e),
                    };
                    trace.push(TraceEntry::Tool(observation));
                    AgentPhase::ToolResult
                }
                None => {
                    steps.push(AgentStep {
                        iteration,
                        searched: false,
                    });
                    final_answer = Some(reply);
                    AgentPhase::Done
                }
            };
            iteration += 1;
        }

        if let Some(answer) = final_answer {
            return Ok(answer);
        }

        // Iteration cap reached: surface the last model-authored message
        let last_model = trace.iter().rev().find_map(|entry| match entry {
            TraceEntry::Model(text) => Some(text.clone()),
            TraceEntry::Tool(_) => None,
        });

        Ok(last_model.unwrap_or_else(|| NO_FINAL_ANSWER.to_string()))
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }
}

fn format_trace(trace: &[TraceEntry]) -> String {
    if trace.is_empty() {
        return "(no research yet)".to_string();
    }

    trace
        .iter()
        .map(|entry| match entry {
            TraceEntry::Model(text) => format!("Assistant:\n{}", text),
            TraceEntry::Tool(text) => format!("Search results:\n{}", text),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_hits(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No results found for \"{}\".", query);
    }

    let lines: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("{}. {}: {} ({})", i + 1, hit.title, hit.snippet, hit.url))
        .collect();

    format!("Results for \"{}\":\n{}", query, lines.join("\n"))
}

/// Extract a `SEARCH: <query>` directive from a model reply
fn parse_search_directive(reply: &str) -> Option<String> {
    let first_line = reply.lines().find(|line| !line.trim().is_empty())?;
    let query = first_line.trim().strip_prefix("SEARCH:")?.trim();
    if query.is_empty() {
        None
    } else {
        Some(query.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

/// HTTP client for a JSON web-search API
#[derive(Debug, Clone)]
pub struct HttpSearchTool {
    client: Client,
    endpoint: String,
    max_results: usize,
}

impl HttpSearchTool {
    pub fn new(endpoint: &str, max_results: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(PipelineError::HttpError)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            max_results,
        })
    }
}

#[async_trait]
impl SearchTool for HttpSearchTool {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| PipelineError::Generic(format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Generic(format!(
                "Search API error: {}",
                response.status()
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Generic(format!("Failed to parse search response: {}", e)))?;

        Ok(body.results.into_iter().take(self.max_results).collect())
    }
}
