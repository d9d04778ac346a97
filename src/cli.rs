// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::Command;

/// Command-line arguments for `assetforge`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetforge",
    version,
    about = "Incrementally compile game content with pluggable builders.",
    long_about = None
)]
pub struct CliArgs {
    /// Commands to run, in order.
    #[arg(value_enum, required = true, value_name = "COMMAND")]
    pub commands: Vec<Command>,

    /// Path to the config file (TOML). A missing file means defaults.
    #[arg(long, value_name = "PATH", default_value = "Assetforge.toml")]
    pub config: PathBuf,

    /// Project root directory. Overrides `[project].root`.
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Build directory relative to the root. Overrides `[project].build_dir`.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<String>,

    /// Maximum number of concurrent builders. Overrides `[project].jobs`.
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub jobs: Option<u32>,

    /// Source directory to scan, relative to the root.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub input: String,

    /// Value of the `X-Email` header sent when resolving libraries.
    #[arg(long, value_name = "EMAIL")]
    pub email: Option<String>,

    /// Value of the `X-Auth` header sent when resolving libraries.
    #[arg(long, value_name = "TOKEN")]
    pub auth: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETFORGE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Discover sources and create tasks, print the plan, build nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
