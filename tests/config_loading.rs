// tests/config_loading.rs

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tempfile::tempdir;

use assetforge::apply_overrides;
use assetforge::cli::{CliArgs, LogLevel};
use assetforge::config::{load_and_validate, load_or_default, ConfigFile, RawConfigFile};
use assetforge::errors::BuildError;
use assetforge::logging::{log_filter, resolve_level};
use assetforge::Command;

type TestResult = Result<(), Box<dyn Error>>;

fn demos() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos")
}

fn validate(text: &str) -> Result<ConfigFile, BuildError> {
    let raw: RawConfigFile = toml::from_str(text)?;
    ConfigFile::try_from(raw)
}

fn config_error(text: &str) -> String {
    match validate(text) {
        Err(BuildError::ConfigError(message)) => message,
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn demo_config_loads() -> TestResult {
    let cfg = load_and_validate(demos().join("basic/Assetforge.toml"))?;

    assert_eq!(cfg.project.root, PathBuf::from("content"));
    assert_eq!(cfg.project.build_dir, "build");
    assert_eq!(cfg.project.jobs, 2);
    assert_eq!(cfg.project.skip_dirs, vec!["vendor", ".git"]);
    assert_eq!(cfg.libraries.timeout_secs, 10);
    assert_eq!(
        cfg.options.get("script.strip_comments").map(String::as_str),
        Some("true")
    );
    Ok(())
}

#[test]
fn empty_config_uses_defaults() -> TestResult {
    let cfg = validate("")?;

    assert_eq!(cfg.project.root, PathBuf::from("."));
    assert_eq!(cfg.project.build_dir, "build");
    assert_eq!(cfg.project.jobs, 1);
    assert!(cfg.project.skip_dirs.is_empty());
    assert!(cfg.libraries.urls.is_empty());
    assert_eq!(cfg.libraries.timeout_secs, 30);
    assert!(cfg.options.is_empty());
    Ok(())
}

#[test]
fn missing_file_falls_back_to_defaults() -> TestResult {
    let dir = tempdir()?;
    let cfg = load_or_default(dir.path().join("Assetforge.toml"))?;
    assert_eq!(cfg.project.jobs, 1);
    assert_eq!(cfg.project.build_dir, "build");
    Ok(())
}

#[test]
fn missing_file_is_an_error_when_required() {
    let dir = tempdir().expect("tempdir");
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, BuildError::IoError(_)), "got {err:?}");
}

#[test]
fn malformed_toml_is_reported() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("Assetforge.toml");
    fs::write(&path, "[project\njobs = 2\n")?;

    let err = load_or_default(&path).unwrap_err();
    assert!(matches!(err, BuildError::TomlError(_)), "got {err:?}");
    Ok(())
}

#[test]
fn zero_jobs_is_rejected() {
    let err = load_and_validate(demos().join("invalid-jobs.toml")).unwrap_err();
    assert!(matches!(err, BuildError::ConfigError(_)), "got {err:?}");
}

#[test]
fn build_dir_must_be_relative_and_non_empty() {
    assert!(config_error("[project]\nbuild_dir = \"\"\n").contains("must not be empty"));
    assert!(config_error("[project]\nbuild_dir = \"/tmp/out\"\n").contains("relative"));
}

#[test]
fn skip_patterns_must_be_valid_globs() {
    let message = config_error("[project]\nskip_dirs = [\"a[\"]\n");
    assert!(message.contains("a["), "{message}");
}

#[test]
fn library_urls_are_validated() {
    assert!(config_error("[libraries]\nurls = [\"not a url\"]\n").contains("invalid library url"));
    assert!(config_error("[libraries]\nurls = [\"ftp://example.com/a.zip\"]\n")
        .contains("http or https"));
    assert!(config_error("[libraries]\ntimeout_secs = 0\n").contains("timeout_secs"));
}

#[test]
fn cli_overrides_win_over_the_config_file() -> TestResult {
    let cfg = load_and_validate(demos().join("basic/Assetforge.toml"))?;
    let args = CliArgs::try_parse_from([
        "assetforge",
        "distclean",
        "build",
        "-o",
        "out",
        "-j",
        "8",
        "--email",
        "dev@example.com",
        "--auth",
        "secret",
    ])?;
    assert_eq!(args.commands, vec![Command::Distclean, Command::Build]);

    let cfg = apply_overrides(cfg, &args)?;
    assert_eq!(cfg.project.build_dir, "out");
    assert_eq!(cfg.project.jobs, 8);
    assert_eq!(cfg.libraries.email.as_deref(), Some("dev@example.com"));
    assert_eq!(cfg.libraries.auth.as_deref(), Some("secret"));
    assert_eq!(cfg.project.skip_dirs, vec!["vendor", ".git"]);
    Ok(())
}

#[test]
fn overrides_are_validated() -> TestResult {
    let args = CliArgs::try_parse_from(["assetforge", "build", "-o", "/abs"])?;
    let err = apply_overrides(ConfigFile::default(), &args).unwrap_err();
    assert!(err.to_string().contains("relative"), "{err}");
    Ok(())
}

#[test]
fn cli_requires_a_command_and_rejects_zero_jobs() {
    assert!(CliArgs::try_parse_from(["assetforge"]).is_err());
    assert!(CliArgs::try_parse_from(["assetforge", "build", "-j", "0"]).is_err());
    assert!(CliArgs::try_parse_from(["assetforge", "deploy"]).is_err());
}

#[test]
fn commands_parse_from_strings() -> TestResult {
    assert_eq!("resolve".parse::<Command>()?, Command::Resolve);
    assert_eq!(Command::Clean.to_string(), "clean");
    assert!("bogus".parse::<Command>().is_err());
    Ok(())
}

#[test]
fn log_level_prefers_flag_then_environment() {
    use tracing::Level;

    assert_eq!(resolve_level(Some(LogLevel::Trace), Some("error")), Level::TRACE);
    assert_eq!(resolve_level(None, Some("debug")), Level::DEBUG);
    assert_eq!(resolve_level(None, Some(" WARNING ")), Level::WARN);
    assert_eq!(resolve_level(None, Some("loud")), Level::INFO);
    assert_eq!(resolve_level(None, None), Level::INFO);
}

#[test]
fn log_environment_accepts_filter_directives() {
    let filter = log_filter(None, Some("assetforge::exec=debug,warn")).to_string();
    assert!(filter.contains("assetforge::exec=debug"), "{filter}");

    let filter = log_filter(Some(LogLevel::Error), Some("assetforge::exec=debug")).to_string();
    assert!(!filter.contains("assetforge::exec"), "{filter}");
}
