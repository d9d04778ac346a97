// src/engine/report.rs

use std::fmt;

use crate::dag::TaskResult;
use crate::engine::TaskOutcome;
use crate::errors::BuildError;

/// Aggregated outcome of one build invocation.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Results of every task that was attempted, wave by wave and in task-id
    /// order within a wave.
    pub results: Vec<TaskResult>,
    /// Cache hits.
    pub up_to_date: usize,
    pub built: usize,
    pub failed: usize,
    /// Tasks skipped because an upstream task failed.
    pub blocked: usize,
    /// Tasks left unstarted by an abort.
    pub not_started: usize,
    /// A fatal fault stopped the run.
    pub aborted: bool,
    /// Per-URL library fetch failures (`resolve` command).
    pub library_errors: Vec<String>,
    /// Orchestration error that ended the run after some waves had already
    /// run (a stall, or a conflict among dynamically registered tasks).
    pub fault: Option<BuildError>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a finalized task outcome into the report.
    pub fn record(&mut self, outcome: TaskOutcome) {
        match &outcome {
            TaskOutcome::UpToDate => self.up_to_date += 1,
            TaskOutcome::NotStarted => self.not_started += 1,
            TaskOutcome::Built(_) => self.built += 1,
            TaskOutcome::Failed { fatal, .. } => {
                self.failed += 1;
                self.aborted |= *fatal;
            }
        }
        self.results.extend(outcome.into_result());
    }

    /// Merge the report of a later command into this one.
    pub fn merge(&mut self, other: BuildReport) {
        self.results.extend(other.results);
        self.up_to_date += other.up_to_date;
        self.built += other.built;
        self.failed += other.failed;
        self.blocked += other.blocked;
        self.not_started += other.not_started;
        self.aborted |= other.aborted;
        self.library_errors.extend(other.library_errors);
        if self.fault.is_none() {
            self.fault = other.fault;
        }
    }

    pub fn is_success(&self) -> bool {
        !self.aborted
            && self.fault.is_none()
            && self.failed == 0
            && self.blocked == 0
            && self.library_errors.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.iter().filter(|r| !r.ok)
    }

    /// Number of builder invocations.
    pub fn executed(&self) -> usize {
        self.results.len()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in self.failures() {
            let input = result
                .task
                .primary_input()
                .map(|r| r.path().to_string())
                .unwrap_or_default();
            let message = result.message.as_deref().unwrap_or("failed");
            match result.line {
                Some(line) => writeln!(f, "error: {}:{}: {}", input, line, message)?,
                None => writeln!(f, "error: {}: {}", input, message)?,
            }
        }
        for err in &self.library_errors {
            writeln!(f, "error: {}", err)?;
        }
        if let Some(fault) = &self.fault {
            writeln!(f, "error: {}", fault)?;
        }
        write!(
            f,
            "{} built, {} up to date, {} failed, {} blocked",
            self.built, self.up_to_date, self.failed, self.blocked
        )?;
        if self.aborted {
            write!(f, " (aborted, {} not started)", self.not_started)?;
        }
        Ok(())
    }
}
