#![allow(dead_code)]

use std::sync::Arc;

use assetforge::builder::Builder;
use assetforge::dag::{Task, TaskSpec};
use assetforge::fs::Resource;

pub use assetforge_test_utils::{
    init_tracing, with_timeout, ConfigFileBuilder, FakeBuilder, TestProject,
};

/// Shared fake builder for tasks constructed by hand.
pub fn fake() -> Arc<dyn Builder> {
    Arc::new(FakeBuilder::standard())
}

/// A task with the given inputs (first is primary) and outputs.
pub fn task(builder: &Arc<dyn Builder>, inputs: &[&str], outputs: &[&str]) -> Task {
    let mut spec = TaskSpec::new(Resource::new(inputs[0]));
    for input in &inputs[1..] {
        spec = spec.with_input(Resource::new(input));
    }
    for output in outputs {
        spec = spec.with_output(Resource::new(output));
    }
    Task::new(spec, Arc::clone(builder))
}

/// Contents of a mock file as UTF-8.
pub fn text(project: &TestProject, path: &str) -> String {
    project.read(path).unwrap_or_default()
}
