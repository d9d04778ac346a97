// src/project.rs

//! Project lifecycle: source discovery, task creation, command execution and
//! build-state persistence.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};

use crate::builder::{BuildContext, BuilderRegistry};
use crate::config::ConfigFile;
use crate::dag::{validate_build_resource_mapping, Scheduler, Task};
use crate::engine::{BuildReport, Runtime};
use crate::errors::{BuildError, Result};
use crate::exec::LocalExecutor;
use crate::fs::{normalize_path, Resource, ResourceProvider};
use crate::library::{self, LibraryFetcher};
use crate::signature::store::STATE_FILE_NAME;
use crate::signature::SignatureStore;
use crate::types::Command;

/// A content project rooted at a resource provider.
#[derive(Debug)]
pub struct Project {
    provider: Arc<dyn ResourceProvider>,
    registry: Arc<BuilderRegistry>,
    config: ConfigFile,
    inputs: Vec<String>,
    tasks: Vec<Task>,
}

impl Project {
    pub fn new(
        provider: Arc<dyn ResourceProvider>,
        registry: Arc<BuilderRegistry>,
        config: ConfigFile,
    ) -> Self {
        Self {
            provider,
            registry,
            config,
            inputs: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn provider(&self) -> &Arc<dyn ResourceProvider> {
        &self.provider
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Build directory as a logical path.
    pub fn build_dir(&self) -> String {
        normalize_path(&self.config.project.build_dir)
    }

    pub fn option<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.config
            .options
            .get(key)
            .map(String::as_str)
            .unwrap_or(default)
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.config.options.insert(key.into(), value.into());
    }

    pub fn set_inputs(&mut self, inputs: Vec<String>) {
        self.inputs = inputs.iter().map(|p| normalize_path(p)).collect();
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Tasks created by the most recent [`Project::create_tasks`] or
    /// [`Project::build`].
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn state_resource(&self) -> Resource {
        Resource::new(format!("{}/{}", self.build_dir(), STATE_FILE_NAME))
    }

    /// Collect every file below `path` that has a registered builder.
    ///
    /// `path` is relative to the root, or absolute and then required to lie
    /// under the root. Directories matching a `skip_dirs` glob (by path or
    /// by name) and the build directory are not entered. The result, sorted,
    /// replaces the input set.
    pub fn find_sources(&mut self, path: &str, skip_dirs: &[String]) -> Result<()> {
        let root = self.provider.root().to_path_buf();
        let relative = if Path::new(path).is_absolute() {
            let stripped = Path::new(path).strip_prefix(&root).map_err(|_| {
                not_found(format!(
                    "the source '{}' must be located under the root '{}'",
                    path,
                    root.display()
                ))
            })?;
            stripped.to_string_lossy().into_owned()
        } else {
            path.to_string()
        };

        let start = normalize_path(&relative);
        let is_file = !start.is_empty() && self.provider.exists(&Resource::new(&start));
        if !is_file && !start.is_empty() && !self.provider.is_dir(&start) {
            return Err(not_found(format!(
                "the path '{}' can not be found under the root '{}'",
                path,
                root.display()
            )));
        }

        let skip = build_skip_set(skip_dirs)?;
        let build_dir = self.build_dir();
        let mut results = Vec::new();

        if is_file {
            if self.registry.has_builder(&start) {
                results.push(start);
            }
        } else {
            self.walk(&start, &skip, &build_dir, &mut results)?;
        }

        results.sort();
        info!(path = %path, sources = results.len(), "found sources");
        self.inputs = results;
        Ok(())
    }

    fn walk(
        &self,
        dir: &str,
        skip: &GlobSet,
        build_dir: &str,
        results: &mut Vec<String>,
    ) -> Result<()> {
        for child in self.provider.read_dir(dir)? {
            if self.provider.is_dir(&child) {
                let name = child.rsplit('/').next().unwrap_or(&child);
                if child == build_dir || skip.is_match(&child) || skip.is_match(name) {
                    debug!(dir = %child, "skipping directory");
                    continue;
                }
                self.walk(&child, skip, build_dir, results)?;
            } else if self.registry.has_builder(&child) {
                results.push(child);
            }
        }
        Ok(())
    }

    /// A fresh context for one build invocation.
    pub fn context(&self) -> Arc<BuildContext> {
        Arc::new(BuildContext::new(
            Arc::clone(&self.provider),
            Arc::clone(&self.registry),
            self.build_dir(),
            self.config.options.clone(),
        ))
    }

    /// Create one task per input, in creation-order priority.
    ///
    /// Inputs without a builder are skipped with a warning. A builder that
    /// rejects its input fails the whole creation pass. Tasks a builder
    /// registers with `build_resource` while creating its own task join the
    /// set here, ahead of that builder's task, so they are validated before
    /// anything runs.
    pub fn create_tasks(&mut self, ctx: &BuildContext) -> Result<&[Task]> {
        let sorted = self.registry.sort_inputs(&self.inputs);
        let mut tasks = Vec::with_capacity(sorted.len());
        for input in &sorted {
            let task = ctx.create_task(input)?;
            tasks.extend(ctx.take_new_tasks());
            if let Some(task) = task {
                tasks.push(task);
            }
        }
        debug!(inputs = sorted.len(), tasks = tasks.len(), "created tasks");
        self.tasks = tasks;
        Ok(&self.tasks)
    }

    /// Create tasks and check them for conflicting outputs without building.
    pub fn plan(&mut self) -> Result<&[Task]> {
        let ctx = self.context();
        self.create_tasks(&ctx)?;
        validate_build_resource_mapping(&self.tasks)?;
        Ok(&self.tasks)
    }

    /// Load state, create and validate tasks, run `commands` in order and
    /// save state. The state is saved even when a command fails.
    pub async fn build(&mut self, commands: &[Command]) -> Result<BuildReport> {
        let state = self.state_resource();
        let store = Arc::new(SignatureStore::load(self.provider.as_ref(), &state));

        let outcome = self.run_commands(commands, &store).await;

        match store.save(self.provider.as_ref(), &state) {
            Ok(()) => outcome,
            Err(err) if outcome.is_ok() => Err(err.into()),
            Err(err) => {
                warn!(error = %err, "could not save build state");
                outcome
            }
        }
    }

    async fn run_commands(
        &mut self,
        commands: &[Command],
        store: &Arc<SignatureStore>,
    ) -> Result<BuildReport> {
        self.missing_libraries();

        let ctx = self.context();
        self.create_tasks(&ctx)?;
        validate_build_resource_mapping(&self.tasks)?;

        let mut report = BuildReport::new();
        for command in commands {
            info!(command = %command, "running command");
            match command {
                Command::Build => {
                    let scheduler = Scheduler::new(self.tasks.clone());
                    let executor = LocalExecutor::new(
                        Arc::clone(&ctx),
                        Arc::clone(store),
                        self.config.project.jobs,
                    );
                    let run = Runtime::new(scheduler, Arc::clone(&ctx), executor)
                        .run()
                        .await?;
                    report.merge(run);
                    if report.aborted || report.fault.is_some() {
                        warn!("build did not finish; skipping remaining commands");
                        break;
                    }
                }
                Command::Clean => self.clean()?,
                Command::Distclean => self.distclean(store)?,
                Command::Resolve => {
                    let errors = self.resolve_libraries().await?;
                    report.library_errors.extend(errors);
                }
            }
        }
        Ok(report)
    }

    /// Remove every declared output of the current task set.
    pub fn clean(&self) -> Result<()> {
        let mut removed = 0usize;
        for output in self.tasks.iter().flat_map(|t| t.outputs()) {
            if self.provider.exists(output) {
                self.provider.remove(output)?;
                removed += 1;
            }
        }
        info!(removed, "cleaned outputs");
        Ok(())
    }

    /// Delete the build directory and forget every signature.
    pub fn distclean(&self, store: &SignatureStore) -> Result<()> {
        let build_dir = self.build_dir();
        self.provider.remove_dir_all(&build_dir)?;
        store.clear();
        info!(build_dir = %build_dir, "removed build directory");
        Ok(())
    }

    /// Configured library URLs not present locally.
    pub fn missing_libraries(&self) -> Vec<String> {
        library::missing_libraries(self.provider.as_ref(), &self.config.libraries.urls)
    }

    /// Fetch every configured library. Returns one message per failed URL.
    pub async fn resolve_libraries(&self) -> Result<Vec<String>> {
        let urls = &self.config.libraries.urls;
        if urls.is_empty() {
            debug!("no libraries configured");
            return Ok(Vec::new());
        }
        let fetcher = LibraryFetcher::new(&self.config.libraries)
            .map_err(|e| BuildError::Other(anyhow::Error::new(e)))?;
        let results = fetcher.resolve(self.provider.as_ref(), urls).await;
        Ok(results
            .into_iter()
            .filter_map(|(_, result)| result.err().map(|e| e.to_string()))
            .collect())
    }

    /// Builder options as a sorted map.
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.config.options
    }
}

fn not_found(message: String) -> BuildError {
    BuildError::IoError(io::Error::new(io::ErrorKind::NotFound, message))
}

fn build_skip_set(skip_dirs: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in skip_dirs {
        let glob = Glob::new(pattern.trim_end_matches('/')).map_err(|e| {
            BuildError::ConfigError(format!("invalid skip pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| BuildError::ConfigError(format!("invalid skip patterns: {}", e)))
}
