//! Per-request pipeline state tracking

use crate::errors::Result;
use crate::metrics::{record_pipeline, record_stage};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Stages of the search and RAG pipelines.
///
/// Search runs expand → search → build → generate → reconcile; RAG runs
/// embed → retrieve → rerank → build → generate → reconcile. Both move
/// strictly forward and end in `Done` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    ExpandingQuery,
    Searching,
    Embedding,
    Retrieving,
    Reranking,
    BuildingContext,
    GeneratingAnswer,
    Reconciling,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::ExpandingQuery => "expanding_query",
            PipelineStage::Searching => "searching",
            PipelineStage::Embedding => "embedding",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Reranking => "reranking",
            PipelineStage::BuildingContext => "building_context",
            PipelineStage::GeneratingAnswer => "generating_answer",
            PipelineStage::Reconciling => "reconciling",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    /// Forward moves only; `Failed` is reachable from any live stage
    pub fn can_transition_to(&self, next: PipelineStage) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == PipelineStage::Failed || next > *self
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pipeline execution: current stage, stage timings and run id
#[derive(Debug)]
pub struct PipelineRun {
    pipeline: &'static str,
    run_id: Uuid,
    stage: PipelineStage,
    failed_at: Option<PipelineStage>,
    started: Instant,
    timings: Vec<(PipelineStage, Duration)>,
}

impl PipelineRun {
    pub fn start(pipeline: &'static str) -> Self {
        Self {
            pipeline,
            run_id: Uuid::new_v4(),
            stage: PipelineStage::Idle,
            failed_at: None,
            started: Instant::now(),
            timings: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Stage that was active when the run failed
    pub fn failed_at(&self) -> Option<PipelineStage> {
        self.failed_at
    }

    pub fn timings(&self) -> &[(PipelineStage, Duration)] {
        &self.timings
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn enter(&mut self, next: PipelineStage) {
        debug_assert!(
            self.stage.can_transition_to(next),
            "invalid transition {} -> {}",
            self.stage,
            next
        );
        self.stage = next;
    }

    fn complete(&mut self, stage: PipelineStage, elapsed: Duration) {
        record_stage(self.pipeline, stage.as_str(), elapsed.as_secs_f64());
        tracing::info!(
            pipeline = self.pipeline,
            run_id = %self.run_id,
            stage = %stage,
            latency_ms = elapsed.as_millis() as u64,
            "Stage completed"
        );
        self.timings.push((stage, elapsed));
    }

    fn fail(&mut self, error: &dyn fmt::Display) {
        let stage = self.stage;
        self.failed_at = Some(stage);
        self.stage = PipelineStage::Failed;
        record_pipeline(self.pipeline, self.elapsed().as_secs_f64(), false);
        tracing::error!(
            pipeline = self.pipeline,
            run_id = %self.run_id,
            stage = %stage,
            error = %error,
            "Pipeline failed"
        );
    }

    /// Run a fallible stage; an error moves the run to `Failed`
    pub async fn run<T, F>(&mut self, stage: PipelineStage, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.enter(stage);
        let start = Instant::now();

        match fut.await {
            Ok(value) => {
                self.complete(stage, start.elapsed());
                Ok(value)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Run a pure stage
    pub fn run_pure<T>(&mut self, stage: PipelineStage, f: impl FnOnce() -> T) -> T {
        self.enter(stage);
        let start = Instant::now();
        let value = f();
        self.complete(stage, start.elapsed());
        value
    }

    /// Mark the run done and record its total latency
    pub fn finish(&mut self) -> Duration {
        self.enter(PipelineStage::Done);
        let elapsed = self.elapsed();
        record_pipeline(self.pipeline, elapsed.as_secs_f64(), true);
        tracing::info!(
            pipeline = self.pipeline,
            run_id = %self.run_id,
            latency_ms = elapsed.as_millis() as u64,
            "Pipeline completed"
        );
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[test]
    fn test_transitions() {
        use PipelineStage::*;

        assert!(Idle.can_transition_to(ExpandingQuery));
        assert!(Idle.can_transition_to(Embedding));
        assert!(Searching.can_transition_to(BuildingContext));
        assert!(Reranking.can_transition_to(Failed));
        assert!(Reconciling.can_transition_to(Done));

        assert!(!BuildingContext.can_transition_to(Searching));
        assert!(!Done.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Done));
    }

    #[tokio::test]
    async fn test_run_records_timings() {
        let mut run = PipelineRun::start("search");

        let terms = run
            .run(PipelineStage::ExpandingQuery, async { Ok::<_, AppError>(2) })
            .await
            .unwrap();
        let context = run.run_pure(PipelineStage::BuildingContext, || "ctx".to_string());
        run.finish();

        assert_eq!(terms, 2);
        assert_eq!(context, "ctx");
        assert_eq!(run.stage(), PipelineStage::Done);
        assert_eq!(run.timings().len(), 2);
        assert_eq!(run.timings()[0].0, PipelineStage::ExpandingQuery);
    }

    #[tokio::test]
    async fn test_failure_marks_stage() {
        let mut run = PipelineRun::start("rag");

        let result: Result<()> = run
            .run(PipelineStage::Embedding, async {
                Err(AppError::UpstreamTimeout {
                    service: "embedding".into(),
                    timeout_ms: 15_000,
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(run.stage(), PipelineStage::Failed);
        assert_eq!(run.failed_at(), Some(PipelineStage::Embedding));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::GeneratingAnswer.to_string(), "generating_answer");
        assert_eq!(
            serde_json::to_value(PipelineStage::BuildingContext).unwrap(),
            "building_context"
        );
    }
}
