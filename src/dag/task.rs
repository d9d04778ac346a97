// src/dag/task.rs

//! Task definitions and per-task results.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::builder::Builder;
use crate::fs::Resource;

/// Index of a task inside one scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a builder's task factory produces: declared inputs, outputs and
/// builder-specific parameters.
///
/// Parameters are an ordered map so they hash deterministically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSpec {
    pub inputs: Vec<Resource>,
    pub outputs: Vec<Resource>,
    pub params: BTreeMap<String, String>,
}

impl TaskSpec {
    /// Spec whose first input is `input`.
    pub fn new(input: Resource) -> Self {
        Self {
            inputs: vec![input],
            outputs: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_input(mut self, input: Resource) -> Self {
        if !self.inputs.contains(&input) {
            self.inputs.push(input);
        }
        self
    }

    pub fn with_output(mut self, output: Resource) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A unit of build work: a [`TaskSpec`] bound to the builder that made it.
#[derive(Clone)]
pub struct Task {
    spec: TaskSpec,
    builder: Arc<dyn Builder>,
}

impl Task {
    pub fn new(spec: TaskSpec, builder: Arc<dyn Builder>) -> Self {
        Self { spec, builder }
    }

    pub fn inputs(&self) -> &[Resource] {
        &self.spec.inputs
    }

    pub fn outputs(&self) -> &[Resource] {
        &self.spec.outputs
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.spec.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.spec.params.get(key).map(String::as_str)
    }

    pub fn builder(&self) -> &Arc<dyn Builder> {
        &self.builder
    }

    pub fn builder_name(&self) -> &'static str {
        self.builder.params().name
    }

    /// First declared input; used to name the task in logs and reports.
    pub fn primary_input(&self) -> Option<&Resource> {
        self.spec.inputs.first()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("builder", &self.builder_name())
            .field("inputs", &self.spec.inputs)
            .field("outputs", &self.spec.outputs)
            .field("params", &self.spec.params)
            .finish()
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primary_input() {
            Some(input) => write!(f, "{} ({})", input, self.builder_name()),
            None => write!(f, "<no input> ({})", self.builder_name()),
        }
    }
}

/// Result of a task that was actually attempted.
///
/// Cache hits and tasks that never started produce no `TaskResult`.
#[derive(Debug)]
pub struct TaskResult {
    pub task: Task,
    pub ok: bool,
    pub message: Option<String>,
    pub line: Option<u32>,
    /// Underlying fault for unexpected (fatal) failures.
    pub fault: Option<anyhow::Error>,
}

impl TaskResult {
    pub fn success(task: Task) -> Self {
        Self {
            task,
            ok: true,
            message: None,
            line: None,
            fault: None,
        }
    }

    pub fn failure(task: Task, message: impl Into<String>) -> Self {
        Self {
            task,
            ok: false,
            message: Some(message.into()),
            line: None,
            fault: None,
        }
    }
}
