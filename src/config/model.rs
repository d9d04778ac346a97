// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Configuration exactly as read from `Assetforge.toml`.
///
/// ```toml
/// [project]
/// root = "."
/// build_dir = "build"
/// skip_dirs = [".git", "node_modules"]
/// jobs = 4
///
/// [libraries]
/// urls = ["https://example.com/lib.zip"]
/// email = "dev@example.com"
/// auth = "token"
///
/// [options]
/// texture_compression = "none"
/// ```
///
/// All sections are optional. Turn it into a [`ConfigFile`] with
/// `ConfigFile::try_from` to get validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub libraries: LibrariesSection,

    /// Free-form options handed to builders through the build context.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Project root. Relative paths are resolved against the directory of
    /// the config file.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Output directory, relative to the root.
    #[serde(default = "default_build_dir")]
    pub build_dir: String,

    /// Glob patterns of directories skipped during source discovery.
    #[serde(default)]
    pub skip_dirs: Vec<String>,

    /// Maximum number of builders running concurrently.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_build_dir() -> String {
    "build".to_string()
}

fn default_jobs() -> usize {
    1
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            build_dir: default_build_dir(),
            skip_dirs: Vec::new(),
            jobs: default_jobs(),
        }
    }
}

/// `[libraries]` section: remote archives fetched by the `resolve` command.
#[derive(Debug, Clone, Deserialize)]
pub struct LibrariesSection {
    #[serde(default)]
    pub urls: Vec<String>,

    /// Sent as `X-Email`.
    #[serde(default)]
    pub email: Option<String>,

    /// Sent as `X-Auth`.
    #[serde(default)]
    pub auth: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for LibrariesSection {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            email: None,
            auth: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub libraries: LibrariesSection,
    pub options: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Construct without validation; only used after `validate_raw_config`.
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            project: raw.project,
            libraries: raw.libraries,
            options: raw.options,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(RawConfigFile::default())
    }
}

impl From<ConfigFile> for RawConfigFile {
    fn from(cfg: ConfigFile) -> Self {
        Self {
            project: cfg.project,
            libraries: cfg.libraries,
            options: cfg.options,
        }
    }
}
