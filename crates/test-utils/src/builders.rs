#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use assetforge::builder::{Builder, BuilderRegistry};
use assetforge::builders::register_defaults;
use assetforge::config::{ConfigFile, RawConfigFile};
use assetforge::engine::BuildReport;
use assetforge::errors::BuildError;
use assetforge::fs::mock::MockFileSystem;
use assetforge::project::Project;
use assetforge::Command;

use crate::fake_builder::FakeBuilder;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.project.root = root.into();
        self
    }

    pub fn build_dir(mut self, dir: &str) -> Self {
        self.config.project.build_dir = dir.to_string();
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.project.jobs = jobs;
        self
    }

    pub fn skip_dir(mut self, pattern: &str) -> Self {
        self.config.project.skip_dirs.push(pattern.to_string());
        self
    }

    pub fn library(mut self, url: &str) -> Self {
        self.config.libraries.urls.push(url.to_string());
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.config.libraries.email = Some(email.to_string());
        self
    }

    pub fn auth(mut self, auth: &str) -> Self {
        self.config.libraries.auth = Some(auth.to_string());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.libraries.timeout_secs = secs;
        self
    }

    pub fn option(mut self, key: &str, value: &str) -> Self {
        self.config.options.insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-memory project with the reference builders and a [`FakeBuilder`]
/// registered.
pub struct TestProject {
    pub fs: MockFileSystem,
    pub fake: Arc<FakeBuilder>,
    pub config: ConfigFile,
    extra: Vec<Arc<dyn Builder>>,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            fs: MockFileSystem::new(),
            fake: Arc::new(FakeBuilder::standard()),
            config: ConfigFile::default(),
            extra: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ConfigFile) -> Self {
        self.config = config;
        self
    }

    /// Register an additional builder after the defaults.
    pub fn with_builder(mut self, builder: Arc<dyn Builder>) -> Self {
        self.extra.push(builder);
        self
    }

    pub fn file(&self, path: &str, content: &str) -> &Self {
        self.fs.add_file(path, content);
        self
    }

    pub fn read(&self, path: &str) -> Option<String> {
        self.fs
            .contents(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn registry(&self) -> BuilderRegistry {
        let mut registry = BuilderRegistry::new();
        register_defaults(&mut registry);
        registry.register_builder(self.fake.clone());
        for builder in &self.extra {
            registry.register_builder(Arc::clone(builder));
        }
        registry
    }

    /// A project over the mock filesystem with sources discovered from the
    /// root.
    pub fn project(&self) -> Result<Project, BuildError> {
        let mut project = Project::new(
            Arc::new(self.fs.clone()),
            Arc::new(self.registry()),
            self.config.clone(),
        );
        let skip_dirs = self.config.project.skip_dirs.clone();
        project.find_sources("", &skip_dirs)?;
        Ok(project)
    }

    pub async fn run(&self, commands: &[Command]) -> Result<BuildReport, BuildError> {
        self.project()?.build(commands).await
    }

    pub async fn build(&self) -> Result<BuildReport, BuildError> {
        self.run(&[Command::Build]).await
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
