// src/dag/task_info.rs

//! Task bookkeeping inside the scheduler.

use crate::dag::task::{Task, TaskId};

/// Per-invocation state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// Waiting for at least one input produced by another task.
    Pending,
    /// Handed to the executor in the current wave.
    Running,
    /// Outputs exist and their signatures match; the builder was not run.
    UpToDate,
    /// Builder ran and produced every declared output.
    Built,
    /// Builder ran and failed (recoverably or fatally).
    Failed,
    /// An input comes from a task that failed in this run; never attempted.
    Blocked,
    /// Never started because the run was aborted.
    NotStarted,
}

impl TaskRunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskRunState::Pending | TaskRunState::Running)
    }
}

#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: TaskId,
    pub task: Task,
    pub run_state: TaskRunState,
}

impl TaskInfo {
    pub fn new(id: TaskId, task: Task) -> Self {
        Self {
            id,
            task,
            run_state: TaskRunState::Pending,
        }
    }
}

/// A task the scheduler wants executed in the current wave.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub task: Task,
    /// Wave (sweep) number, starting at 1.
    pub wave: u64,
}
