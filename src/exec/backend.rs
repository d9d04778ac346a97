// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime hands each wave of ready tasks to an `ExecutorBackend` and
//! gets one finalized outcome per task back. [`LocalExecutor`] runs builders
//! on the tokio blocking pool; tests can substitute a backend that records
//! waves or fabricates outcomes.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::builder::BuildContext;
use crate::dag::{ScheduledTask, TaskId};
use crate::engine::TaskOutcome;
use crate::errors::Result;
use crate::signature::SignatureStore;

use super::task_runner::run_task_guarded;

/// Trait abstracting how a wave of scheduled tasks is executed.
pub trait ExecutorBackend: Send {
    /// Execute `tasks` and return one outcome per task, ordered by task id.
    ///
    /// After a fatal outcome, tasks that have not started yet must be
    /// reported as [`TaskOutcome::NotStarted`].
    fn run_wave(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<(TaskId, TaskOutcome)>>> + Send + '_>>;
}

/// Runs builders on the blocking pool with at most `jobs` in flight.
///
/// Permits are taken in task order, so `jobs = 1` executes a wave strictly
/// sequentially in stable order.
#[derive(Debug)]
pub struct LocalExecutor {
    ctx: Arc<BuildContext>,
    store: Arc<SignatureStore>,
    jobs: usize,
}

impl LocalExecutor {
    pub fn new(ctx: Arc<BuildContext>, store: Arc<SignatureStore>, jobs: usize) -> Self {
        Self {
            ctx,
            store,
            jobs: jobs.max(1),
        }
    }
}

impl ExecutorBackend for LocalExecutor {
    fn run_wave(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<(TaskId, TaskOutcome)>>> + Send + '_>> {
        Box::pin(async move {
            let semaphore = Arc::new(Semaphore::new(self.jobs));
            let aborted = Arc::new(AtomicBool::new(false));
            let mut outcomes = Vec::with_capacity(tasks.len());
            let mut handles = Vec::with_capacity(tasks.len());

            for scheduled in tasks {
                let permit = Arc::clone(&semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|e| anyhow!("executor semaphore closed: {}", e))?;

                if aborted.load(Ordering::SeqCst) {
                    debug!(task = %scheduled.task, "run aborted; not starting task");
                    outcomes.push((scheduled.id, TaskOutcome::NotStarted));
                    continue;
                }

                let ctx = Arc::clone(&self.ctx);
                let store = Arc::clone(&self.store);
                let aborted = Arc::clone(&aborted);
                let handle = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    let outcome = run_task_guarded(&ctx, &store, &scheduled.task);
                    if outcome.is_fatal() {
                        aborted.store(true, Ordering::SeqCst);
                    }
                    outcome
                });
                handles.push((scheduled.id, handle));
            }

            for (id, handle) in handles {
                let outcome = handle
                    .await
                    .map_err(|e| anyhow!("task {} did not complete: {}", id, e))?;
                outcomes.push((id, outcome));
            }

            outcomes.sort_by_key(|(id, _)| *id);
            Ok(outcomes)
        })
    }
}
