// src/errors.rs

//! Crate-wide error types.
//!
//! Two families live here:
//! - task-level faults ([`CompileError`], [`BuildFault`]) returned by builders,
//! - orchestration errors ([`BuildError`]) that stop a build before or
//!   between waves.

use std::fmt;

use thiserror::Error;

use crate::fs::Resource;

/// Structured, recoverable fault on malformed input.
///
/// Raised by a builder's task factory or build step. The scheduler records it,
/// invalidates the task's outputs and keeps draining independent tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub resource: Option<Resource>,
    pub line: Option<u32>,
    pub message: String,
}

impl CompileError {
    pub fn new(resource: &Resource, message: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.clone()),
            line: None,
            message: message.into(),
        }
    }

    pub fn at_line(resource: &Resource, line: u32, message: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.clone()),
            line: Some(line),
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.resource, self.line) {
            (Some(res), Some(line)) => write!(f, "{}:{}: {}", res, line, self.message),
            (Some(res), None) => write!(f, "{}: {}", res, self.message),
            (None, _) => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CompileError {}

/// Outcome of a failed builder invocation.
///
/// `Compile` is recoverable; anything else is `Fatal` and aborts the run.
#[derive(Error, Debug)]
pub enum BuildFault {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl From<std::io::Error> for BuildFault {
    fn from(err: std::io::Error) -> Self {
        BuildFault::Fatal(anyhow::Error::from(err))
    }
}

/// Errors that stop a build as a whole.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(
        "Conflicting input resources generated by the following files: {inputs:?} <-> {other_inputs:?}, generating output resource '{output}'"
    )]
    Conflict {
        /// Best guess at the input the user should look at.
        resource: Resource,
        output: String,
        inputs: Vec<String>,
        other_inputs: Vec<String>,
    },

    #[error(
        "build stalled: {} task(s) wait for outputs that are never produced (dependency cycle near '{cycle_hint}')",
        pending.len()
    )]
    Stalled {
        pending: Vec<String>,
        cycle_hint: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
