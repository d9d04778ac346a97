// src/exec/mod.rs

//! Task execution layer.
//!
//! - [`task_runner`] runs one task: signature check, builder invocation and
//!   signature bookkeeping.
//! - [`backend`] provides the `ExecutorBackend` trait and the concurrent
//!   `LocalExecutor` used in production.

pub mod backend;
pub mod task_runner;

pub use backend::{ExecutorBackend, LocalExecutor};
pub use task_runner::{run_task, run_task_guarded};
