// src/config/validate.rs

use std::path::Path;

use reqwest::Url;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{BuildError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_project(cfg)?;
    validate_libraries(cfg)?;
    Ok(())
}

fn validate_project(cfg: &RawConfigFile) -> Result<()> {
    if cfg.project.jobs == 0 {
        return Err(BuildError::ConfigError(
            "[project].jobs must be >= 1 (got 0)".to_string(),
        ));
    }

    let build_dir = cfg.project.build_dir.trim();
    if build_dir.is_empty() {
        return Err(BuildError::ConfigError(
            "[project].build_dir must not be empty".to_string(),
        ));
    }
    if Path::new(build_dir).is_absolute() || build_dir.starts_with('/') {
        return Err(BuildError::ConfigError(format!(
            "[project].build_dir must be relative to the project root (got '{}')",
            build_dir
        )));
    }

    for pattern in &cfg.project.skip_dirs {
        globset::Glob::new(pattern).map_err(|e| {
            BuildError::ConfigError(format!("invalid skip_dirs pattern '{}': {}", pattern, e))
        })?;
    }
    Ok(())
}

fn validate_libraries(cfg: &RawConfigFile) -> Result<()> {
    if cfg.libraries.timeout_secs == 0 {
        return Err(BuildError::ConfigError(
            "[libraries].timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    for url in &cfg.libraries.urls {
        let parsed = Url::parse(url).map_err(|e| {
            BuildError::ConfigError(format!("invalid library url '{}': {}", url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BuildError::ConfigError(format!(
                "library url '{}' must use http or https",
                url
            )));
        }
    }
    Ok(())
}
