// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the pure stage-sequencing core ([`core`])
//! - the async executor that drives a [`ReconstructionJob`] on a background
//!   task and reports back over a channel ([`executor`])
//!
//! Communication with the view is one-way: the background run sends
//! [`PipelineEvent`]s; the view can only set the [`StopFlag`].
//!
//! [`ReconstructionJob`]: crate::job::ReconstructionJob

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::types::Stage;

/// Notifications flowing from the background run to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// A stage is about to run.
    StageStarted { stage: Stage },
    /// A stage completed; `label` reads like `"3/5 Generating masks ..."`.
    Progress { stage: Stage, label: String },
    /// The run is over (finished, stopped, or failed). Sent exactly once.
    Completed,
}

/// Cooperative stop request, checked between stages only.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub mod core;
pub mod executor;

pub use core::{CoreCommand, PipelineCore};
pub use executor::{start, JobExecutor, PipelineHandle};
