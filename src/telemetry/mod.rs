//! Telemetry for pipeline runs
//!
//! Collects per-run events and aggregate stats for terminal display or
//! export. One collector may be shared across concurrent runs.

use std::sync::{Arc, Mutex};
use std::time::Instant;
use uuid::Uuid;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    RunStarted {
        run_id: Uuid,
        timestamp: Instant,
    },
    StageStarted {
        run_id: Uuid,
        stage: String,
        timestamp: Instant,
    },
    StageCompleted {
        run_id: Uuid,
        stage: String,
        duration_ms: u64,
        success: bool,
        timestamp: Instant,
    },
    RetrievalCompleted {
        run_id: Uuid,
        unique: usize,
        timestamp: Instant,
    },
    RerankCompleted {
        run_id: Uuid,
        input: usize,
        kept: usize,
        fallback: bool,
        timestamp: Instant,
    },
    AgentIteration {
        run_id: Uuid,
        iteration: usize,
        searched: bool,
        timestamp: Instant,
    },
    RunCompleted {
        run_id: Uuid,
        duration_ms: u64,
        had_error: bool,
        timestamp: Instant,
    },
}

/// Aggregate statistics across runs
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    pub runs_started: usize,
    pub runs_completed: usize,
    pub runs_with_error: usize,
    pub stages_executed: usize,
    pub stages_failed: usize,
    pub documents_retrieved: usize,
    pub rerank_fallbacks: usize,
    pub agent_iterations: usize,
}

/// Telemetry collector
#[derive(Clone)]
pub struct PipelineTelemetry {
    events: Arc<Mutex<Vec<PipelineEvent>>>,
    stats: Arc<Mutex<PipelineStats>>,
}

impl PipelineTelemetry {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(PipelineStats::default())),
        }
    }

    /// Record an event and update aggregate stats
    pub fn record(&self, event: PipelineEvent) {
        {
            let mut stats = self.stats.lock().expect("telemetry stats poisoned");
            match &event {
                PipelineEvent::RunStarted { .. } => stats.runs_started += 1,
                PipelineEvent::StageCompleted { success, .. } => {
                    stats.stages_executed += 1;
                    if !success {
                        stats.stages_failed += 1;
                    }
                }
                PipelineEvent::RetrievalCompleted { unique, .. } => {
                    stats.documents_retrieved += unique;
                }
                PipelineEvent::RerankCompleted { fallback, .. } => {
                    if *fallback {
                        stats.rerank_fallbacks += 1;
                    }
                }
                PipelineEvent::AgentIteration { .. } => stats.agent_iterations += 1,
                PipelineEvent::RunCompleted { had_error, .. } => {
                    stats.runs_completed += 1;
                    if *had_error {
                        stats.runs_with_error += 1;
                    }
                }
                PipelineEvent::StageStarted { .. } => {}
            }
        }

        let mut events = self.events.lock().expect("telemetry events poisoned");
        events.push(event);
    }

    /// Snapshot of aggregate stats
    pub fn stats(&self) -> PipelineStats {
        self.stats.lock().expect("telemetry stats poisoned").clone()
    }

    /// Snapshot of collected events
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events
            .lock()
            .expect("telemetry events poisoned")
            .clone()
    }

    /// Drop all collected events and reset stats
    pub fn clear(&self) {
        self.events
            .lock()
            .expect("telemetry events poisoned")
            .clear();
        *self.stats.lock().expect("telemetry stats poisoned") = PipelineStats::default();
    }
}

impl Default for PipelineTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulation() {
        let telemetry = PipelineTelemetry::new();
        let run_id = Uuid::new_v4();
        let now = Instant::now();

        telemetry.record(PipelineEvent::RunStarted {
            run_id,
            timestamp: now,
        });
        telemetry.record(PipelineEvent::StageCompleted {
            run_id,
            stage: "root_cause".to_string(),
            duration_ms: 12,
            success: true,
            timestamp: now,
        });
        telemetry.record(PipelineEvent::StageCompleted {
            run_id,
            stage: "solution".to_string(),
            duration_ms: 8,
            success: false,
            timestamp: now,
        });
        telemetry.record(PipelineEvent::RunCompleted {
            run_id,
            duration_ms: 40,
            had_error: true,
            timestamp: now,
        });

        let stats = telemetry.stats();
        assert_eq!(stats.runs_started, 1);
        assert_eq!(stats.stages_executed, 2);
        assert_eq!(stats.stages_failed, 1);
        assert_eq!(stats.runs_with_error, 1);
        assert_eq!(telemetry.events().len(), 4);
    }

    #[test]
    fn test_clear() {
        let telemetry = PipelineTelemetry::new();
        telemetry.record(PipelineEvent::RunStarted {
            run_id: Uuid::new_v4(),
            timestamp: Instant::now(),
        });
        telemetry.clear();
        assert!(telemetry.events().is_empty());
        assert_eq!(telemetry.stats().runs_started, 0);
    }
}
