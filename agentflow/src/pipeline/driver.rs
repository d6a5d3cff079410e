//! The sequential driver.

use super::{PipelineBuilder, PipelineFailure, PipelineOutput, PipelineRun};
use crate::cancellation::CancellationToken;
use crate::core::{RunStatus, StageName, StageResult, Task};
use crate::errors::{GenerationError, StageError};
use crate::events::RunObserver;
use crate::observability::SpanTimer;
use crate::stages::{Stage, StageContext};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Instrument};

/// Runs research, writer and reviewer in strict order.
///
/// The driver owns the [`PipelineRun`] and is the only place its status
/// changes. It never retries and stops at the first failure.
pub struct Pipeline {
    pub(super) research: Arc<dyn Stage>,
    pub(super) writer: Arc<dyn Stage>,
    pub(super) reviewer: Arc<dyn Stage>,
    pub(super) observer: Arc<dyn RunObserver>,
    pub(super) stage_timeout: Option<Duration>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("research", &self.research)
            .field("writer", &self.writer)
            .field("reviewer", &self.reviewer)
            .field("stage_timeout", &self.stage_timeout)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The per-stage timeout.
    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout
    }

    fn stage(&self, name: StageName) -> &Arc<dyn Stage> {
        match name {
            StageName::Research => &self.research,
            StageName::Writer => &self.writer,
            StageName::Reviewer => &self.reviewer,
        }
    }

    /// Runs the pipeline to completion.
    pub async fn run(&self, task: Task) -> Result<PipelineOutput, PipelineFailure> {
        self.run_with_cancellation(task, &CancellationToken::new())
            .await
    }

    /// Runs the pipeline, failing the stage in progress if `token` is
    /// cancelled.
    pub async fn run_with_cancellation(
        &self,
        task: Task,
        token: &CancellationToken,
    ) -> Result<PipelineOutput, PipelineFailure> {
        let mut run = PipelineRun::new(Arc::new(task));
        let span = tracing::info_span!("pipeline_run", run_id = %run.id());

        async {
            info!(task = %run.task().description, "Pipeline run started");
            self.observer.on_run_started(run.task());
            for name in StageName::ALL {
                self.advance(&mut run, name.running_status(), name);

                let started_at = Utc::now();
                let outcome = self.execute_stage(&run, name, token).await;
                match outcome {
                    Ok(result) => {
                        self.observer.on_stage_result(&result);
                        run.push_result(result);
                    }
                    Err(error) => return Err(self.fail(run, name, started_at, error)),
                }
            }

            self.advance(&mut run, RunStatus::Complete, StageName::Reviewer);
            info!(duration_ms = run.duration_ms(), "Pipeline run complete");
            Ok(PipelineOutput::new(run))
        }
        .instrument(span)
        .await
    }

    async fn execute_stage(
        &self,
        run: &PipelineRun,
        name: StageName,
        token: &CancellationToken,
    ) -> Result<StageResult, StageError> {
        let stage = self.stage(name);
        if stage.name() != name {
            return Err(StageError::precondition(
                name,
                format!("stage slot holds a {} stage", stage.name()),
            ));
        }

        let mut ctx = StageContext::new(run.task());
        if let Some(previous) = run.last_result() {
            ctx = ctx.with_previous(previous);
        }

        let cancelled = || {
            StageError::cancelled(
                name,
                token.reason().unwrap_or_else(|| "cancelled".to_string()),
            )
        };
        if token.is_cancelled() {
            return Err(cancelled());
        }

        let timer = SpanTimer::start(name.to_string());
        let work = async {
            match self.stage_timeout {
                Some(limit) => tokio::time::timeout(limit, stage.execute(&ctx))
                    .await
                    .unwrap_or_else(|_| {
                        Err(StageError::generation(
                            name,
                            GenerationError::Timeout {
                                seconds: limit.as_secs_f64(),
                            },
                        ))
                    }),
                None => stage.execute(&ctx).await,
            }
        };

        let outcome = tokio::select! {
            biased;
            () = token.cancelled() => Err(cancelled()),
            outcome = work => outcome,
        };
        info!(stage = %name, duration_ms = timer.elapsed_ms(), ok = outcome.is_ok(), "Stage finished");
        outcome
    }

    /// Applies a transition and notifies the observer. Rejected transitions
    /// are logged; the status is left unchanged.
    fn advance(&self, run: &mut PipelineRun, next: RunStatus, stage: StageName) {
        match run.transition(next) {
            Ok(()) => self.observer.on_status(stage, run.status()),
            Err(e) => error!(error = %e, "Rejected run transition"),
        }
    }

    fn fail(
        &self,
        mut run: PipelineRun,
        stage: StageName,
        started_at: DateTime<Utc>,
        error: StageError,
    ) -> PipelineFailure {
        warn!(stage = %stage, kind = %error.kind(), error = %error, "Stage failed");

        let failed = StageResult::failed(stage, started_at, error.to_string());
        self.observer.on_stage_result(&failed);
        run.push_result(failed);

        self.advance(
            &mut run,
            RunStatus::Failed {
                stage,
                kind: error.kind(),
                message: error.to_string(),
            },
            stage,
        );
        PipelineFailure { stage, error, run }
    }
}
