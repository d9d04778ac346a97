// src/dag/scheduler.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info, warn};

use crate::dag::conflict::validate_build_resource_mapping;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::task::{Task, TaskId};
use crate::dag::task_info::{ScheduledTask, TaskInfo, TaskRunState};
use crate::engine::TaskOutcome;
use crate::errors::{BuildError, Result};
use crate::fs::Resource;

/// Pure, synchronous core of the incremental scheduler.
///
/// There is no explicit graph: a task depends on another task when one of its
/// inputs is one of the other task's outputs. Each call to
/// [`Scheduler::next_wave`] sweeps all pending tasks in stable order and
/// returns the ones whose inputs are all available. Outcomes come back through
/// [`Scheduler::complete`]; dynamically created tasks join through
/// [`Scheduler::absorb`].
///
/// This type performs no IO, which keeps the relaxation semantics testable
/// without builders or a filesystem.
#[derive(Debug)]
pub struct Scheduler {
    tasks: Vec<TaskInfo>,
    /// Outputs of every currently known task.
    all_outputs: HashSet<Resource>,
    /// Outputs of tasks that are up to date or were built in this run.
    completed_outputs: HashSet<Resource>,
    /// Outputs of tasks that failed or were blocked in this run.
    failed_outputs: HashSet<Resource>,
    wave: u64,
    failed: bool,
    aborted: bool,
}

impl Scheduler {
    pub fn new(tasks: Vec<Task>) -> Self {
        let mut scheduler = Self {
            tasks: Vec::with_capacity(tasks.len()),
            all_outputs: HashSet::new(),
            completed_outputs: HashSet::new(),
            failed_outputs: HashSet::new(),
            wave: 0,
            failed: false,
            aborted: false,
        };
        scheduler.push_tasks(tasks);
        scheduler
    }

    /// Fold tasks registered while the previous wave ran into the frontier.
    ///
    /// New outputs must not collide with any known output.
    pub fn absorb(&mut self, new_tasks: Vec<Task>) -> Result<usize> {
        if new_tasks.is_empty() {
            return Ok(0);
        }
        validate_build_resource_mapping(
            self.tasks.iter().map(|info| &info.task).chain(new_tasks.iter()),
        )?;
        let count = new_tasks.len();
        self.push_tasks(new_tasks);
        debug!(count, total = self.tasks.len(), "absorbed dynamically created tasks");
        Ok(count)
    }

    fn push_tasks(&mut self, tasks: Vec<Task>) {
        for task in tasks {
            self.all_outputs.extend(task.outputs().iter().cloned());
            let id = TaskId(self.tasks.len());
            self.tasks.push(TaskInfo::new(id, task));
        }
    }

    /// Sweep every pending task once.
    ///
    /// - outstanding inputs produced by a failed or blocked task → `Blocked`,
    /// - no outstanding inputs → `Running` and returned as ready,
    /// - otherwise postponed.
    ///
    /// After an abort no task is scheduled.
    pub fn next_wave(&mut self) -> SchedulerStep {
        if self.aborted {
            return SchedulerStep {
                wave: self.wave,
                ..SchedulerStep::default()
            };
        }

        self.wave += 1;
        let mut step = SchedulerStep {
            wave: self.wave,
            ..SchedulerStep::default()
        };

        for idx in 0..self.tasks.len() {
            if self.tasks[idx].run_state != TaskRunState::Pending {
                continue;
            }

            let (has_outstanding, blocked) = {
                let outstanding = self.outstanding_inputs(&self.tasks[idx].task);
                let blocked = outstanding.iter().any(|r| self.failed_outputs.contains(*r));
                (!outstanding.is_empty(), blocked)
            };

            let info = &mut self.tasks[idx];
            if blocked {
                warn!(task = %info.task, wave = self.wave, "skipping task; an input comes from a failed task");
                info.run_state = TaskRunState::Blocked;
                self.failed_outputs.extend(info.task.outputs().iter().cloned());
                step.newly_blocked.push(info.id);
            } else if !has_outstanding {
                info.run_state = TaskRunState::Running;
                step.ready.push(ScheduledTask {
                    id: info.id,
                    task: info.task.clone(),
                    wave: self.wave,
                });
            } else {
                step.postponed += 1;
            }
        }

        debug!(
            wave = step.wave,
            ready = step.ready.len(),
            blocked = step.newly_blocked.len(),
            postponed = step.postponed,
            "scheduler sweep finished"
        );
        step
    }

    /// `(inputs ∩ all_outputs) − completed_outputs`
    fn outstanding_inputs<'a>(&self, task: &'a Task) -> Vec<&'a Resource> {
        task.inputs()
            .iter()
            .filter(|r| self.all_outputs.contains(*r) && !self.completed_outputs.contains(*r))
            .collect()
    }

    /// Record the finalized outcome of a task handed out by `next_wave`.
    pub fn complete(&mut self, id: TaskId, outcome: &TaskOutcome) {
        let Some(info) = self.tasks.get_mut(id.0) else {
            warn!(task = %id, "completion for unknown task; ignoring");
            return;
        };

        info.run_state = match outcome {
            TaskOutcome::UpToDate => TaskRunState::UpToDate,
            TaskOutcome::Built(_) => TaskRunState::Built,
            TaskOutcome::Failed { .. } => TaskRunState::Failed,
            TaskOutcome::NotStarted => TaskRunState::NotStarted,
        };

        match outcome {
            TaskOutcome::UpToDate | TaskOutcome::Built(_) => {
                self.completed_outputs
                    .extend(info.task.outputs().iter().cloned());
            }
            TaskOutcome::Failed { fatal, .. } => {
                self.failed = true;
                self.failed_outputs.extend(info.task.outputs().iter().cloned());
                if *fatal {
                    info!(task = %info.task, "fatal task failure; aborting run");
                    self.aborted = true;
                }
            }
            TaskOutcome::NotStarted => {}
        }
    }

    /// Every known task reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.tasks.iter().all(|info| info.run_state.is_terminal())
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn has_failures(&self) -> bool {
        self.failed
    }

    pub fn current_wave(&self) -> u64 {
        self.wave
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id.0).map(|info| &info.task)
    }

    pub fn run_state_of(&self, id: TaskId) -> Option<TaskRunState> {
        self.tasks.get(id.0).map(|info| info.run_state)
    }

    /// Tasks in the given state, in creation order.
    pub fn tasks_in_state(&self, state: TaskRunState) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|info| info.run_state == state)
            .map(|info| info.id)
            .collect()
    }

    /// Tasks that are still pending, as a stall error.
    ///
    /// The hint names a task on a dependency cycle when there is one.
    pub fn stall_error(&self) -> BuildError {
        let pending: Vec<&TaskInfo> = self
            .tasks
            .iter()
            .filter(|info| info.run_state == TaskRunState::Pending)
            .collect();

        let mut producers: HashMap<&Resource, TaskId> = HashMap::new();
        for info in &pending {
            for output in info.task.outputs() {
                producers.insert(output, info.id);
            }
        }

        // Edge direction: producer -> consumer.
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for info in &pending {
            graph.add_node(info.id.0);
            for input in info.task.inputs() {
                if let Some(producer) = producers.get(input) {
                    graph.add_edge(producer.0, info.id.0, ());
                }
            }
        }

        let on_cycle = tarjan_scc(&graph)
            .into_iter()
            .find(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .and_then(|scc| scc.into_iter().min());

        let name_of = |idx: usize| {
            self.tasks[idx]
                .task
                .primary_input()
                .map(|r| r.path().to_string())
                .unwrap_or_else(|| TaskId(idx).to_string())
        };

        let cycle_hint = on_cycle
            .or_else(|| pending.first().map(|info| info.id.0))
            .map(name_of)
            .unwrap_or_default();

        BuildError::Stalled {
            pending: pending.iter().map(|info| name_of(info.id.0)).collect(),
            cycle_hint,
        }
    }
}
