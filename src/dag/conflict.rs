// src/dag/conflict.rs

//! Output-collision validation.
//!
//! Runs before any task executes: if two tasks declare the same output, the
//! build is rejected with [`BuildError::Conflict`].

use std::collections::HashMap;

use tracing::debug;

use crate::dag::task::Task;
use crate::errors::{BuildError, Result};
use crate::fs::Resource;

/// Reject any output declared by more than one task.
///
/// Tasks are visited in order; the conflict is reported when the second
/// claimant of an output is reached.
pub fn validate_build_resource_mapping<'a, I>(tasks: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut claimed: HashMap<&Resource, (usize, &Task)> = HashMap::new();

    for (index, task) in tasks.into_iter().enumerate() {
        for output in task.outputs() {
            match claimed.get(output) {
                Some((owner, _)) if *owner == index => {}
                Some((_, previous)) => return Err(conflict(output, task, previous)),
                None => {
                    claimed.insert(output, (index, task));
                }
            }
        }
    }

    debug!(outputs = claimed.len(), "no conflicting outputs");
    Ok(())
}

fn conflict(output: &Resource, task: &Task, previous: &Task) -> BuildError {
    let resource = representative_input(output, task.inputs(), previous.inputs())
        .cloned()
        .unwrap_or_else(|| output.clone());

    BuildError::Conflict {
        resource,
        output: output.path().to_string(),
        inputs: task.inputs().iter().map(|r| r.path().to_string()).collect(),
        other_inputs: previous.inputs().iter().map(|r| r.path().to_string()).collect(),
    }
}

/// Pick the input most likely responsible for a conflicting output.
///
/// A single-input task wins outright (current task first). Otherwise the
/// first input whose stem matches the output's stem, case-insensitively,
/// searching the current task then the earlier one. Falls back to the current
/// task's first input.
pub fn representative_input<'a>(
    output: &Resource,
    inputs: &'a [Resource],
    other_inputs: &'a [Resource],
) -> Option<&'a Resource> {
    if inputs.len() == 1 {
        return inputs.first();
    }
    if other_inputs.len() == 1 {
        return other_inputs.first();
    }

    let wanted = stem(output);
    inputs
        .iter()
        .chain(other_inputs)
        .find(|input| stem(input) == wanted)
        .or_else(|| inputs.first())
        .or_else(|| other_inputs.first())
}

/// Lowercased file name with up to two extensions removed
/// (`"Hero.Sprite.png"` → `"hero"`).
fn stem(resource: &Resource) -> String {
    let base = resource.base_name();
    let base = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };
    base.to_lowercase()
}
