// src/exec/task_runner.rs

//! Single task execution: cache check, builder invocation and signature
//! bookkeeping.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use anyhow::anyhow;
use tracing::{debug, error, info, warn};

use crate::builder::BuildContext;
use crate::dag::{Task, TaskResult};
use crate::engine::TaskOutcome;
use crate::errors::BuildFault;
use crate::signature::{compute_task_signature, Signature, SignatureStore};

/// Run `task`, turning a panicking builder into a fatal failure.
pub fn run_task_guarded(ctx: &BuildContext, store: &SignatureStore, task: &Task) -> TaskOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| run_task(ctx, store, task))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            fail_task(ctx, store, task, BuildFault::Fatal(anyhow!("builder panicked: {}", message)))
        }
    }
}

/// Run `task` unless its outputs are current.
///
/// - all outputs exist and every stored signature matches → `UpToDate`;
/// - builder succeeds → fresh signature stored for every output;
/// - an output is missing after a successful build → recoverable failure;
/// - builder fails → every output signature invalidated.
pub fn run_task(ctx: &BuildContext, store: &SignatureStore, task: &Task) -> TaskOutcome {
    let provider = ctx.provider();

    let signature = match compute_task_signature(provider.as_ref(), task) {
        Ok(signature) => signature,
        Err(fault) => return fail_task(ctx, store, task, fault),
    };

    if is_up_to_date(ctx, store, task, &signature) {
        debug!(task = %task, "outputs up to date; skipping");
        return TaskOutcome::UpToDate;
    }

    info!(task = %task, "building");
    if let Err(fault) = task.builder().build(ctx, task) {
        return fail_task(ctx, store, task, fault);
    }

    if let Some(missing) = task.outputs().iter().find(|out| !provider.exists(out)) {
        warn!(task = %task, output = %missing, "declared output was not produced");
        invalidate_outputs(ctx, store, task);
        let result = TaskResult::failure(task.clone(), format!("output '{}' not found", missing));
        return TaskOutcome::Failed {
            result,
            fatal: false,
        };
    }

    for output in task.outputs() {
        store.put(&provider.abs_path(output), signature.clone());
    }
    TaskOutcome::Built(TaskResult::success(task.clone()))
}

fn is_up_to_date(
    ctx: &BuildContext,
    store: &SignatureStore,
    task: &Task,
    signature: &Signature,
) -> bool {
    let provider = ctx.provider();
    task.outputs().iter().all(|output| {
        provider.exists(output)
            && store
                .get(&provider.abs_path(output))
                .is_some_and(|stored| &stored == signature)
    })
}

/// Record a failed attempt and invalidate the task's outputs.
fn fail_task(
    ctx: &BuildContext,
    store: &SignatureStore,
    task: &Task,
    fault: BuildFault,
) -> TaskOutcome {
    invalidate_outputs(ctx, store, task);

    match fault {
        BuildFault::Compile(err) => {
            error!(task = %task, line = ?err.line, "{}", err);
            let mut result = TaskResult::failure(task.clone(), err.message);
            result.line = err.line;
            TaskOutcome::Failed {
                result,
                fatal: false,
            }
        }
        BuildFault::Fatal(err) => {
            error!(task = %task, error = %format!("{:#}", err), "fatal builder fault");
            let mut result = TaskResult::failure(task.clone(), format!("{:#}", err));
            result.fault = Some(err);
            TaskOutcome::Failed {
                result,
                fatal: true,
            }
        }
    }
}

fn invalidate_outputs(ctx: &BuildContext, store: &SignatureStore, task: &Task) {
    for output in task.outputs() {
        store.invalidate(&ctx.provider().abs_path(output));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
