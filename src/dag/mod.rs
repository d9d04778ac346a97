// src/dag/mod.rs

//! Task model and scheduling.
//!
//! - [`task`] holds task specs, tasks and per-task results.
//! - [`conflict`] rejects output collisions before anything runs.
//! - [`scheduler`] contains the sweep state machine that decides which tasks
//!   are ready, blocked or postponed.
//! - [`task_info`] provides per-task bookkeeping and scheduled task types.
//! - [`scheduler_step`] defines the result type of one sweep.

pub mod conflict;
pub mod scheduler;
pub mod scheduler_step;
pub mod task;
pub mod task_info;

pub use conflict::{representative_input, validate_build_resource_mapping};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task::{Task, TaskId, TaskResult, TaskSpec};
pub use task_info::{ScheduledTask, TaskRunState};
