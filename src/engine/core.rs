// src/engine/core.rs

//! Pure stage-sequencing state machine.
//!
//! [`PipelineCore`] decides what the executor does next given the stop flag
//! and the outcome of the previous stage. It has no channels, no Tokio types
//! and performs no IO, so the sequencing rules are unit tested directly.

use crate::engine::PipelineEvent;
use crate::types::{RunOutcome, Stage};

/// What the IO shell should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreCommand {
    /// Run this stage now.
    RunStage(Stage),
    /// End the run with this outcome and emit the completion signal.
    Finish(RunOutcome),
}

#[derive(Debug, Clone)]
pub struct PipelineCore {
    next: Option<Stage>,
    outcome: Option<RunOutcome>,
    completed: Vec<Stage>,
}

impl Default for PipelineCore {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineCore {
    pub fn new() -> Self {
        Self {
            next: Stage::ALL.first().copied(),
            outcome: None,
            completed: Vec::new(),
        }
    }

    /// Stages that finished successfully, in order.
    pub fn completed(&self) -> &[Stage] {
        &self.completed
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        self.outcome
    }

    /// Decide the next step.
    ///
    /// The stop flag is only consulted here, i.e. between stages; a stage
    /// already running is never interrupted by it. Once an outcome has been
    /// decided it is sticky. With no stage left the run is finished, even if
    /// a stop arrived while the last stage ran.
    pub fn next_command(&mut self, stop_requested: bool) -> CoreCommand {
        if let Some(outcome) = self.outcome {
            return CoreCommand::Finish(outcome);
        }

        let outcome = match self.next {
            None => RunOutcome::Finished,
            Some(_) if stop_requested => RunOutcome::Stopped,
            Some(stage) => return CoreCommand::RunStage(stage),
        };

        self.outcome = Some(outcome);
        CoreCommand::Finish(outcome)
    }

    /// Record that `stage` completed and return its progress notification.
    pub fn stage_succeeded(&mut self, stage: Stage) -> PipelineEvent {
        debug_assert_eq!(self.next, Some(stage), "stages must complete in order");
        self.completed.push(stage);
        self.next = stage.next();
        PipelineEvent::Progress {
            stage,
            label: stage.label(),
        }
    }

    /// Record that `stage` raised a domain error; no later stage runs.
    ///
    /// A failure observed after a stop request (typically the reaper killing
    /// the tool) counts as a stop.
    pub fn stage_failed(&mut self, stage: Stage, stop_requested: bool) {
        debug_assert_eq!(self.next, Some(stage));
        self.next = None;
        self.outcome = Some(if stop_requested {
            RunOutcome::Stopped
        } else {
            RunOutcome::Failed
        });
    }
}
