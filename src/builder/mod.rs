// src/builder/mod.rs

//! Builder plugin contract.
//!
//! - [`Builder`] is the trait every asset builder implements.
//! - [`registry`] maps input extensions to builders.
//! - [`context`] is the orchestrating context handed to builders; it is the
//!   task factory and collects tasks registered while a build is running.

use std::fmt::Debug;

use crate::dag::task::{Task, TaskSpec};
use crate::errors::{BuildFault, CompileError};
use crate::fs::Resource;

pub mod context;
pub mod registry;

pub use context::BuildContext;
pub use registry::BuilderRegistry;

/// Capability descriptor of a builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderParams {
    /// Stable builder identity; part of every task signature.
    pub name: &'static str,
    /// Input extensions including the dot, e.g. `".collection"`.
    pub in_exts: &'static [&'static str],
    /// Output extension including the dot.
    pub out_ext: &'static str,
    /// Creation-order priority; lower values create their tasks first.
    pub create_order: i32,
}

/// A pluggable translator from an input resource to a task, plus the logic
/// that produces the task's outputs.
///
/// One builder instance is shared by every task it creates and may be invoked
/// concurrently, so implementations must not keep mutable per-build state.
pub trait Builder: Send + Sync + Debug {
    fn params(&self) -> BuilderParams;

    /// Declare inputs, outputs and parameters for `input`.
    fn create(&self, ctx: &BuildContext, input: Resource) -> Result<TaskSpec, CompileError>;

    /// Produce the declared outputs of `task`.
    fn build(&self, ctx: &BuildContext, task: &Task) -> Result<(), BuildFault>;
}
