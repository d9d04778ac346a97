// src/engine/mod.rs

//! Orchestration engine.
//!
//! The pure sweep state machine lives in [`crate::dag::Scheduler`]; the async
//! shell that drives it wave by wave is [`runtime`]. [`report`] aggregates
//! what happened into a [`BuildReport`].

use crate::dag::TaskResult;

/// Finalized outcome of one scheduled task.
#[derive(Debug)]
pub enum TaskOutcome {
    /// Cache hit: outputs exist and signatures match. No result is recorded.
    UpToDate,
    /// Builder ran and produced every declared output.
    Built(TaskResult),
    /// Builder ran and failed. `fatal` aborts the whole run.
    Failed { result: TaskResult, fatal: bool },
    /// Never started because the run was aborted before a worker picked it up.
    NotStarted,
}

impl TaskOutcome {
    /// Task result, if the task was actually attempted.
    pub fn into_result(self) -> Option<TaskResult> {
        match self {
            TaskOutcome::Built(result) | TaskOutcome::Failed { result, .. } => Some(result),
            TaskOutcome::UpToDate | TaskOutcome::NotStarted => None,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, TaskOutcome::Failed { fatal: true, .. })
    }
}

pub mod report;
pub mod runtime;

pub use report::BuildReport;
pub use runtime::Runtime;
