// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::builder::BuildContext;
use crate::dag::Scheduler;
use crate::errors::Result;
use crate::exec::ExecutorBackend;

use super::BuildReport;

/// Drives the scheduler wave by wave and delegates task execution to an
/// [`ExecutorBackend`].
///
/// All scheduling semantics live in [`Scheduler`]; this shell only moves
/// tasks between it, the executor and the context's dynamic task buffer.
pub struct Runtime<E: ExecutorBackend> {
    scheduler: Scheduler,
    ctx: Arc<BuildContext>,
    executor: E,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(scheduler: Scheduler, ctx: Arc<BuildContext>, executor: E) -> Self {
        Self {
            scheduler,
            ctx,
            executor,
        }
    }

    /// Run sweeps until every task is terminal, the run aborts or the
    /// scheduler stalls.
    ///
    /// A stall or a conflict among dynamically registered tasks ends the run
    /// with [`BuildReport::fault`] set; results recorded up to then are kept.
    pub async fn run(mut self) -> Result<BuildReport> {
        info!(tasks = self.scheduler.len(), "build started");
        let mut report = BuildReport::new();

        loop {
            let step = self.scheduler.next_wave();
            report.blocked += step.newly_blocked.len();

            if step.ready.is_empty() {
                if self.scheduler.is_aborted() {
                    break;
                }
                let absorbed = self.absorb_new_tasks(&mut report);
                if report.fault.is_some() {
                    break;
                }
                if absorbed > 0 {
                    continue;
                }
                if self.scheduler.is_finished() {
                    break;
                }
                if step.made_progress() {
                    continue;
                }
                warn!(wave = step.wave, postponed = step.postponed, "no task can make progress");
                report.fault = Some(self.scheduler.stall_error());
                break;
            }

            debug!(wave = step.wave, ready = step.ready.len(), "dispatching wave");
            let outcomes = self.executor.run_wave(step.ready).await?;
            for (id, outcome) in outcomes {
                self.scheduler.complete(id, &outcome);
                report.record(outcome);
            }

            if self.scheduler.is_aborted() {
                report.aborted = true;
                break;
            }
            self.absorb_new_tasks(&mut report);
            if report.fault.is_some() {
                break;
            }
        }

        info!(
            built = report.built,
            up_to_date = report.up_to_date,
            failed = report.failed,
            blocked = report.blocked,
            aborted = report.aborted,
            faulted = report.fault.is_some(),
            waves = self.scheduler.current_wave(),
            "build finished"
        );
        Ok(report)
    }

    fn absorb_new_tasks(&mut self, report: &mut BuildReport) -> usize {
        let new_tasks = self.ctx.take_new_tasks();
        match self.scheduler.absorb(new_tasks) {
            Ok(added) => added,
            Err(err) => {
                warn!(error = %err, "rejected dynamically registered tasks");
                report.fault = Some(err);
                0
            }
        }
    }
}
