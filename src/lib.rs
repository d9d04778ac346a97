// src/lib.rs

pub mod builder;
pub mod builders;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod library;
pub mod logging;
pub mod project;
pub mod signature;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_or_default, ConfigFile, RawConfigFile};
use crate::engine::BuildReport;
use crate::fs::RealFileSystem;
use crate::project::Project;

pub use crate::types::Command;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the real resource provider and the default builders
/// - source discovery
/// - the requested commands
pub async fn run(args: CliArgs) -> Result<BuildReport> {
    let cfg = apply_overrides(load_or_default(&args.config)?, &args)?;
    let root = resolve_root(&cfg, &args);
    info!(root = %root.display(), build_dir = %cfg.project.build_dir, "project configured");

    let provider = Arc::new(RealFileSystem::new(&root)?);
    let registry = Arc::new(builders::default_registry());
    let skip_dirs = cfg.project.skip_dirs.clone();

    let mut project = Project::new(provider, registry, cfg);
    project.find_sources(&args.input, &skip_dirs)?;

    if args.dry_run {
        print_dry_run(&mut project)?;
        return Ok(BuildReport::new());
    }

    Ok(project.build(&args.commands).await?)
}

/// CLI flags win over the config file; the result is validated again.
pub fn apply_overrides(cfg: ConfigFile, args: &CliArgs) -> Result<ConfigFile> {
    let mut raw = RawConfigFile::from(cfg);
    if let Some(output) = &args.output {
        raw.project.build_dir = output.clone();
    }
    if let Some(jobs) = args.jobs {
        raw.project.jobs = jobs as usize;
    }
    if let Some(email) = &args.email {
        raw.libraries.email = Some(email.clone());
    }
    if let Some(auth) = &args.auth {
        raw.libraries.auth = Some(auth.clone());
    }
    Ok(ConfigFile::try_from(raw)?)
}

/// `--root` as given; otherwise `[project].root` relative to the config
/// file's directory.
fn resolve_root(cfg: &ConfigFile, args: &CliArgs) -> PathBuf {
    if let Some(root) = &args.root {
        return root.clone();
    }
    if cfg.project.root.is_absolute() {
        return cfg.project.root.clone();
    }
    config_dir(&args.config).join(&cfg.project.root)
}

/// Directory containing the config file, or `.` for a bare file name.
fn config_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Print discovered inputs and planned tasks without building anything.
fn print_dry_run(project: &mut Project) -> Result<()> {
    println!("assetforge dry-run");
    println!("  build_dir = {}", project.build_dir());
    println!("  jobs = {}", project.config().project.jobs);
    println!();

    println!("inputs ({}):", project.inputs().len());
    for input in project.inputs() {
        println!("  - {input}");
    }

    let tasks = project.plan()?;
    println!();
    println!("tasks ({}):", tasks.len());
    for task in tasks {
        println!("  - {task}");
        for input in task.inputs().iter().skip(1) {
            println!("      input: {input}");
        }
        for output in task.outputs() {
            println!("      output: {output}");
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
