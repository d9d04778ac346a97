// src/builder/context.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::builder::{Builder, BuilderRegistry};
use crate::dag::task::Task;
use crate::errors::CompileError;
use crate::fs::{normalize_path, Resource, ResourceProvider};

/// Orchestrating context shared by the project, the scheduler and every
/// builder invocation.
///
/// It acts as the task factory and buffers tasks that builders register
/// through [`BuildContext::build_resource`]. Tasks registered during the
/// creation pass are drained by the project into the initial task set; tasks
/// registered while builders run are drained by the scheduler between waves.
pub struct BuildContext {
    provider: Arc<dyn ResourceProvider>,
    registry: Arc<BuilderRegistry>,
    build_dir: String,
    options: BTreeMap<String, String>,
    new_tasks: Mutex<Vec<Task>>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("root", &self.provider.root())
            .field("build_dir", &self.build_dir)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    pub fn new(
        provider: Arc<dyn ResourceProvider>,
        registry: Arc<BuilderRegistry>,
        build_dir: impl AsRef<str>,
        options: BTreeMap<String, String>,
    ) -> Self {
        Self {
            provider,
            registry,
            build_dir: normalize_path(build_dir.as_ref()),
            options,
            new_tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn provider(&self) -> &Arc<dyn ResourceProvider> {
        &self.provider
    }

    pub fn registry(&self) -> &BuilderRegistry {
        &self.registry
    }

    /// Build directory as a logical path relative to the root.
    pub fn build_dir(&self) -> &str {
        &self.build_dir
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// Option value, or `default` when unset.
    pub fn option<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.options.get(key).map(String::as_str).unwrap_or(default)
    }

    pub fn get(&self, path: &str) -> Resource {
        self.provider.get(path)
    }

    /// Output resource for `input` with extension `ext`, placed under the
    /// build directory. Inputs already inside the build directory (generated
    /// resources) keep their location.
    pub fn output_for(&self, input: &Resource, ext: &str) -> Resource {
        let renamed = input.with_extension(ext);
        if input.is_under(&self.build_dir) {
            renamed
        } else {
            Resource::new(format!("{}/{}", self.build_dir, renamed.path()))
        }
    }

    /// Create a task for `path` using the builder registered for its
    /// extension.
    ///
    /// Returns `Ok(None)` with a warning when no builder handles the
    /// extension.
    pub fn create_task(&self, path: &str) -> Result<Option<Task>, CompileError> {
        let Some(builder) = self.registry.lookup(path).cloned() else {
            warn!(input = %path, "No builder for '{}' found", path);
            return Ok(None);
        };
        let resource = self.get(path);
        self.create_task_with(&builder, resource).map(Some)
    }

    /// Create a task for `input` with an explicit builder.
    pub fn create_task_with(
        &self,
        builder: &Arc<dyn Builder>,
        input: Resource,
    ) -> Result<Task, CompileError> {
        let spec = builder.create(self, input)?;
        Ok(Task::new(spec, Arc::clone(builder)))
    }

    /// Create a task for a resource produced by another task and queue it.
    ///
    /// Callable from a builder's `create` (for example to unpack a container)
    /// or from its `build`.
    pub fn build_resource(&self, input: &Resource) -> Result<Option<Task>, CompileError> {
        let task = self.create_task(input.path())?;
        if let Some(task) = &task {
            self.push_new_task(task.clone());
        }
        Ok(task)
    }

    /// Like [`BuildContext::build_resource`] but with an explicit builder.
    pub fn build_resource_with(
        &self,
        input: &Resource,
        builder: &Arc<dyn Builder>,
    ) -> Result<Task, CompileError> {
        let task = self.create_task_with(builder, input.clone())?;
        self.push_new_task(task.clone());
        Ok(task)
    }

    /// Drain tasks registered since the last call.
    pub fn take_new_tasks(&self) -> Vec<Task> {
        std::mem::take(&mut *self.pending())
    }

    fn push_new_task(&self, task: Task) {
        debug!(task = %task, "registered dynamic task");
        self.pending().push(task);
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Task>> {
        self.new_tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
