// src/dag/scheduler_step.rs

//! Result type of a single scheduler sweep.

use crate::dag::task::TaskId;
use crate::dag::task_info::ScheduledTask;

/// What one sweep over the not-yet-completed tasks decided.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    pub wave: u64,
    /// Tasks whose dependencies are all available; run them now.
    pub ready: Vec<ScheduledTask>,
    /// Tasks that can never run this invocation because an upstream task
    /// failed.
    pub newly_blocked: Vec<TaskId>,
    /// Tasks still waiting on outputs of unfinished tasks.
    pub postponed: usize,
}

impl SchedulerStep {
    /// Whether the sweep changed any task's state.
    pub fn made_progress(&self) -> bool {
        !self.ready.is_empty() || !self.newly_blocked.is_empty()
    }
}
