// tests/scheduler_property.rs

mod common;
use crate::common::{fake, task};

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;

use assetforge::dag::{Scheduler, Task, TaskId, TaskResult, TaskRunState};
use assetforge::engine::TaskOutcome;

/// Random acyclic dependency lists: task `i` may only depend on `0..i`.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, candidates)| {
                    if i == 0 {
                        BTreeSet::new()
                    } else {
                        candidates.into_iter().map(|c| c % i).collect()
                    }
                })
                .collect()
        })
    })
}

/// Tasks for `deps`, in the order given by `order`.
fn tasks_for(deps: &[BTreeSet<usize>], order: &[usize]) -> Vec<Task> {
    let b = fake();
    order
        .iter()
        .map(|&i| {
            let mut inputs = vec![format!("t{i}.in")];
            inputs.extend(deps[i].iter().map(|d| format!("build/t{d}.out")));
            let inputs: Vec<&str> = inputs.iter().map(String::as_str).collect();
            let output = format!("build/t{i}.out");
            task(&b, &inputs, &[output.as_str()])
        })
        .collect()
}

fn index_of(scheduler: &Scheduler, id: TaskId) -> usize {
    let input = scheduler
        .task(id)
        .and_then(|t| t.primary_input())
        .map(|r| r.path().to_string())
        .unwrap_or_default();
    input
        .trim_start_matches('t')
        .trim_end_matches(".in")
        .parse()
        .unwrap_or(usize::MAX)
}

fn permutation(n: usize) -> impl Strategy<Value = Vec<usize>> {
    Just((0..n).collect::<Vec<_>>()).prop_shuffle()
}

proptest! {
    #[test]
    fn every_task_runs_after_its_producers_in_any_order(
        (deps, order) in dag_strategy(12).prop_flat_map(|deps| {
            let n = deps.len();
            (Just(deps), permutation(n))
        }),
        failing in proptest::collection::btree_set(0..12usize, 0..3),
    ) {
        let mut scheduler = Scheduler::new(tasks_for(&deps, &order));
        let mut state: HashMap<usize, TaskRunState> = HashMap::new();
        let mut waves = 0;

        loop {
            let step = scheduler.next_wave();
            waves += 1;
            prop_assert!(waves <= deps.len() + 1, "too many waves");

            if step.ready.is_empty() {
                if scheduler.is_finished() {
                    break;
                }
                prop_assert!(step.made_progress(), "stalled on an acyclic graph");
                continue;
            }

            for scheduled in &step.ready {
                let i = index_of(&scheduler, scheduled.id);
                for d in &deps[i] {
                    prop_assert_eq!(state.get(d), Some(&TaskRunState::Built), "t{} ran before t{}", i, d);
                }
            }

            for scheduled in step.ready {
                let i = index_of(&scheduler, scheduled.id);
                let outcome = if failing.contains(&i) {
                    TaskOutcome::Failed { result: TaskResult::failure(scheduled.task, "boom"), fatal: false }
                } else {
                    TaskOutcome::Built(TaskResult::success(scheduled.task))
                };
                scheduler.complete(scheduled.id, &outcome);
                state.insert(i, scheduler.run_state_of(scheduled.id).unwrap_or(TaskRunState::Pending));
            }
        }

        // A task is blocked exactly when some producer failed or was blocked.
        let mut expected = vec![TaskRunState::Pending; deps.len()];
        for i in 0..deps.len() {
            let upstream_failed = deps[i].iter().any(|d| {
                matches!(expected[*d], TaskRunState::Failed | TaskRunState::Blocked)
            });
            expected[i] = if upstream_failed {
                TaskRunState::Blocked
            } else if failing.contains(&i) {
                TaskRunState::Failed
            } else {
                TaskRunState::Built
            };
        }
        for (position, &i) in order.iter().enumerate() {
            prop_assert_eq!(scheduler.run_state_of(TaskId(position)), Some(expected[i]));
        }
    }

    #[test]
    fn nothing_is_scheduled_after_a_fatal_failure(
        deps in dag_strategy(10),
        fatal_index in 0..10usize,
    ) {
        let order: Vec<usize> = (0..deps.len()).collect();
        let fatal_index = fatal_index % deps.len();
        let mut scheduler = Scheduler::new(tasks_for(&deps, &order));

        loop {
            let step = scheduler.next_wave();
            if step.ready.is_empty() {
                break;
            }
            for scheduled in step.ready {
                let i = index_of(&scheduler, scheduled.id);
                let outcome = if i == fatal_index {
                    TaskOutcome::Failed { result: TaskResult::failure(scheduled.task, "fatal"), fatal: true }
                } else {
                    TaskOutcome::Built(TaskResult::success(scheduled.task))
                };
                scheduler.complete(scheduled.id, &outcome);
            }
            if scheduler.is_aborted() {
                break;
            }
        }

        prop_assert!(scheduler.is_aborted());
        prop_assert!(scheduler.next_wave().ready.is_empty());
        prop_assert_eq!(scheduler.run_state_of(TaskId(fatal_index)), Some(TaskRunState::Failed));
    }
}
