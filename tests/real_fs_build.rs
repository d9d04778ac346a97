// tests/real_fs_build.rs

mod common;
use crate::common::{init_tracing, with_timeout, ConfigFileBuilder, FakeBuilder};

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tempfile::tempdir;

use assetforge::builders::{default_registry, CollectionDesc};
use assetforge::cli::CliArgs;
use assetforge::engine::BuildReport;
use assetforge::fs::RealFileSystem;
use assetforge::project::Project;
use assetforge::Command;

type TestResult = Result<(), Box<dyn Error>>;

fn copy_dir(from: &Path, to: &Path) -> std::io::Result<()> {
    fs::create_dir_all(to)?;
    for entry in fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn demo_project(dir: &Path) -> std::io::Result<PathBuf> {
    let demo = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/basic");
    copy_dir(&demo, dir)?;
    Ok(dir.join("Assetforge.toml"))
}

async fn run_cli(args: &[&str]) -> Result<BuildReport, Box<dyn Error>> {
    let mut argv = vec!["assetforge"];
    argv.extend_from_slice(args);
    let args = CliArgs::try_parse_from(argv)?;
    Ok(with_timeout(assetforge::run(args)).await?)
}

/// A project over `root` with the reference builders and `fake`.
async fn build_with_fake(
    root: &Path,
    fake: &Arc<FakeBuilder>,
    jobs: usize,
) -> Result<BuildReport, Box<dyn Error>> {
    let mut registry = default_registry();
    registry.register_builder(fake.clone());
    let mut project = Project::new(
        Arc::new(RealFileSystem::new(root)?),
        Arc::new(registry),
        ConfigFileBuilder::new().jobs(jobs).build(),
    );
    project.find_sources(".", &[])?;
    Ok(with_timeout(project.build(&[Command::Build])).await?)
}

fn sleepy_sources(root: &Path, count: usize) -> std::io::Result<()> {
    for i in 0..count {
        fs::write(root.join(format!("t{i}.in")), format!("task {i}\nsleep: 50\n"))?;
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_tasks_run_concurrently_up_to_jobs() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    sleepy_sources(dir.path(), 8)?;
    let fake = Arc::new(FakeBuilder::standard());

    let report = build_with_fake(dir.path(), &fake, 4).await?;

    assert_eq!(report.built, 8);
    assert!(fake.peak_concurrency() >= 2, "peak {}", fake.peak_concurrency());
    assert!(fake.peak_concurrency() <= 4, "peak {}", fake.peak_concurrency());
    assert!(dir.path().join("build/t7.out").is_file());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_job_runs_tasks_one_at_a_time_in_order() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    sleepy_sources(dir.path(), 3)?;
    let fake = Arc::new(FakeBuilder::standard());

    build_with_fake(dir.path(), &fake, 1).await?;

    assert_eq!(fake.peak_concurrency(), 1);
    assert_eq!(fake.executions(), vec!["t0.in", "t1.in", "t2.in"]);
    Ok(())
}

#[tokio::test]
async fn state_survives_between_processes() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    fs::write(dir.path().join("a.in"), "alpha")?;
    let fake = Arc::new(FakeBuilder::standard());

    build_with_fake(dir.path(), &fake, 1).await?;
    assert!(dir.path().join("build/state").is_file());

    let report = build_with_fake(dir.path(), &fake, 1).await?;
    assert_eq!(report.up_to_date, 1);
    assert_eq!(fake.execution_count("a.in"), 1);

    fs::remove_file(dir.path().join("build/a.out"))?;
    let report = build_with_fake(dir.path(), &fake, 1).await?;
    assert_eq!(report.built, 1);
    assert_eq!(fs::read_to_string(dir.path().join("build/a.out"))?, "alpha");
    Ok(())
}

#[tokio::test]
async fn demo_project_builds_end_to_end() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = demo_project(dir.path())?;
    let config = config.to_string_lossy().into_owned();
    let build = dir.path().join("content/build");

    let report = run_cli(&["build", "--config", config.as_str()]).await?;
    assert!(report.is_success(), "{report}");
    // Five discovered sources plus one generated game object per root
    // collection that embeds one.
    assert_eq!(report.built, 7, "{report}");

    assert!(!build.join("vendor").exists());
    let script = fs::read_to_string(build.join("scripts/hero.scriptc"))?;
    assert!(!script.contains("hero behaviour"));
    assert!(script.contains("function update(self, dt)"));

    let hero = fs::read_to_string(build.join("hero.goc"))?;
    assert!(hero.contains("/scripts/hero.scriptc"));

    let main: CollectionDesc = toml::from_str(&fs::read_to_string(build.join("main.collectionc"))?)?;
    let ids: Vec<&str> = main.instances.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, ["/hero", "/sword", "/level/door", "/level/camera"]);
    let door = &main.instances[2];
    assert!((door.position.z - 6.0).abs() < 1e-9);
    assert!((door.scale - 2.0).abs() < 1e-9);
    assert_eq!(main.instances[0].children, vec!["/sword".to_string()]);
    assert_eq!(main.instances[3].prototype, "/build/main_generated_0.goc");
    assert!(build.join("main_generated_0.goc").is_file());

    let report = run_cli(&["build", "--config", config.as_str()]).await?;
    assert_eq!(report.built, 0, "{report}");
    assert_eq!(report.up_to_date, 5, "{report}");
    Ok(())
}

#[tokio::test]
async fn cli_flags_override_the_demo_config() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = demo_project(dir.path())?;
    let config = config.to_string_lossy().into_owned();
    let content = dir.path().join("content");

    let report = run_cli(&[
        "build",
        "--config",
        config.as_str(),
        "-o",
        "out",
        "-j",
        "3",
        "-i",
        "scripts",
    ])
    .await?;
    assert_eq!(report.built, 2, "{report}");
    assert!(content.join("out/scripts/camera.scriptc").is_file());
    assert!(!content.join("build").exists());
    Ok(())
}

#[tokio::test]
async fn dry_run_and_distclean_leave_no_outputs() -> TestResult {
    init_tracing();
    let dir = tempdir()?;
    let config = demo_project(dir.path())?;
    let config = config.to_string_lossy().into_owned();
    let build = dir.path().join("content/build");

    let report = run_cli(&["build", "--config", config.as_str(), "--dry-run"]).await?;
    assert_eq!(report.executed(), 0);
    assert!(!build.exists());

    run_cli(&["build", "--config", config.as_str()]).await?;
    assert!(build.join("main.collectionc").is_file());

    run_cli(&["distclean", "--config", config.as_str()]).await?;
    // The state file is written again after the build directory is removed.
    assert!(!build.join("main.collectionc").exists());
    assert!(build.join("state").is_file());
    Ok(())
}
