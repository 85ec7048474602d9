// src/engine/executor.rs

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::errors::{PipelineError, Result};
use crate::job::ReconstructionJob;
use crate::types::RunOutcome;

use super::core::{CoreCommand, PipelineCore};
use super::{PipelineEvent, StopFlag};

/// Capacity of the event channel; five progress events plus bookkeeping.
const EVENT_CAPACITY: usize = 32;

/// Runs a job's five stages strictly in order and reports progress.
///
/// This is the IO shell around [`PipelineCore`]:
/// - consults the [`StopFlag`] before every stage,
/// - runs the stage through the job,
/// - sends [`PipelineEvent`]s to the view,
/// - catches domain errors ([`PipelineError::Stage`]), logs them and ends the
///   run; any other error is returned and the completion signal is **not**
///   sent.
pub struct JobExecutor {
    events: mpsc::Sender<PipelineEvent>,
    stop: StopFlag,
}

impl JobExecutor {
    pub fn new(events: mpsc::Sender<PipelineEvent>, stop: StopFlag) -> Self {
        Self { events, stop }
    }

    pub fn stop_flag(&self) -> &StopFlag {
        &self.stop
    }

    pub async fn run(&self, job: &mut ReconstructionJob) -> Result<RunOutcome> {
        let mut core = PipelineCore::new();
        info!(root = %job.working_directory().display(), "pipeline run started");

        loop {
            match core.next_command(self.stop.is_set()) {
                CoreCommand::RunStage(stage) => {
                    info!(stage = %stage, "{}", stage.label());
                    self.emit(PipelineEvent::StageStarted { stage }).await;

                    match job.run_stage(stage).await {
                        Ok(()) => {
                            let event = core.stage_succeeded(stage);
                            self.emit(event).await;
                        }
                        Err(PipelineError::Stage(err)) => {
                            error!(stage = %stage, kind = err.kind(), "{err}");
                            core.stage_failed(stage, self.stop.is_set());
                        }
                        Err(other) => return Err(other),
                    }
                }
                CoreCommand::Finish(outcome) => {
                    info!(?outcome, completed = core.completed().len(), "pipeline run ended");
                    self.emit(PipelineEvent::Completed).await;
                    return Ok(outcome);
                }
            }
        }
    }

    async fn emit(&self, event: PipelineEvent) {
        if self.events.send(event).await.is_err() {
            debug!("event receiver dropped; continuing without a view");
        }
    }
}

/// A run executing on a background task.
pub struct PipelineHandle {
    events: mpsc::Receiver<PipelineEvent>,
    stop: StopFlag,
    join: JoinHandle<Result<RunOutcome>>,
}

impl PipelineHandle {
    /// Next notification from the run; `None` once the run is over and all
    /// events were drained.
    pub async fn next_event(&mut self) -> Option<PipelineEvent> {
        self.events.recv().await
    }

    /// Ask the run to stop before its next stage.
    ///
    /// This does not interrupt an external tool that is already running;
    /// pair it with the process reaper for a hard stop.
    pub fn request_stop(&self) {
        self.stop.set();
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Wait for the background task and return how the run ended.
    pub async fn wait(self) -> Result<RunOutcome> {
        match self.join.await {
            Ok(result) => result,
            Err(join_err) => Err(PipelineError::Other(anyhow::anyhow!(
                "pipeline task aborted: {join_err}"
            ))),
        }
    }
}

/// Start `job` on a background Tokio task.
///
/// Only one run should target a given working directory at a time.
pub fn start(mut job: ReconstructionJob) -> PipelineHandle {
    let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
    let stop = StopFlag::new();
    let executor = JobExecutor::new(tx, stop.clone());

    let join = tokio::spawn(async move { executor.run(&mut job).await });

    PipelineHandle {
        events: rx,
        stop,
        join,
    }
}
