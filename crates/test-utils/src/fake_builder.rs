use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetforge::builder::{BuildContext, Builder, BuilderParams};
use assetforge::dag::{Task, TaskSpec};
use assetforge::errors::{BuildFault, CompileError};
use assetforge::fs::Resource;

/// A scripted builder driven by directives in each input's content.
///
/// One directive per line:
///
/// - `dep: <path>`: extra input (resolved relative to the input)
/// - `output: <path>`: extra declared output
/// - `reject: <message>`: task creation fails with a compile error
/// - `error: <line>: <message>`: build fails recoverably
/// - `fatal: <message>`: build fails fatally
/// - `panic`: builder panics
/// - `skip-output`: build succeeds without writing outputs
/// - `spawn: <path>`: write `<path>` and register it with `build_resource`
/// - `unpack: <path>`: register the existing `<path>` with `build_resource`
///   during task creation
/// - `sleep: <ms>`: sleep before producing outputs
///
/// Every other line is plain content. Outputs receive the concatenated
/// contents of all inputs.
#[derive(Debug)]
pub struct FakeBuilder {
    params: BuilderParams,
    executions: Arc<Mutex<Vec<String>>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeBuilder {
    pub fn new(
        name: &'static str,
        in_exts: &'static [&'static str],
        out_ext: &'static str,
        create_order: i32,
    ) -> Self {
        Self {
            params: BuilderParams {
                name,
                in_exts,
                out_ext,
                create_order,
            },
            executions: Arc::new(Mutex::new(Vec::new())),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// `.in` and `.alt` → `.out`, creation order 0.
    pub fn standard() -> Self {
        Self::new("fake", &[".in", ".alt"], ".out", 0)
    }

    /// Primary inputs of every build invocation, in start order.
    pub fn executions(&self) -> Vec<String> {
        self.executions.lock().unwrap().clone()
    }

    pub fn execution_count(&self, input: &str) -> usize {
        self.executions
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == input)
            .count()
    }

    pub fn clear_executions(&self) {
        self.executions.lock().unwrap().clear();
    }

    /// Highest number of concurrently running builds observed.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

fn directives(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let line = line.trim();
        match line {
            "panic" | "skip-output" => Some((line, "")),
            _ => line
                .split_once(": ")
                .filter(|(key, _)| {
                    matches!(
                        *key,
                        "dep" | "output" | "reject" | "error" | "fatal" | "spawn" | "unpack"
                            | "sleep"
                    )
                })
                .map(|(key, value)| (key, value.trim())),
        }
    })
}

struct RunningGuard<'a>(&'a AtomicUsize);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Builder for FakeBuilder {
    fn params(&self) -> BuilderParams {
        self.params
    }

    fn create(&self, ctx: &BuildContext, input: Resource) -> Result<TaskSpec, CompileError> {
        let text = ctx
            .provider()
            .read_to_string(&input)
            .map_err(|e| CompileError::new(&input, e.to_string()))?;

        let mut spec = TaskSpec::new(input.clone())
            .with_output(ctx.output_for(&input, self.params.out_ext));
        for (key, value) in directives(&text) {
            match key {
                "dep" => spec = spec.with_input(input.resolve(value)),
                "output" => spec = spec.with_output(Resource::new(value)),
                "reject" => return Err(CompileError::new(&input, value)),
                "unpack" => {
                    ctx.build_resource(&Resource::new(value))?;
                }
                _ => {}
            }
        }
        Ok(spec)
    }

    fn build(&self, ctx: &BuildContext, task: &Task) -> Result<(), BuildFault> {
        let input = task.primary_input().cloned().expect("fake task has an input");
        self.executions.lock().unwrap().push(input.path().to_string());

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = RunningGuard(&self.running);

        let text = ctx.provider().read_to_string(&input)?;
        let mut write_outputs = true;
        for (key, value) in directives(&text) {
            match key {
                "error" => {
                    let (line, message) = value.split_once(": ").unwrap_or(("1", value));
                    let line = line.parse().unwrap_or(1);
                    return Err(CompileError::at_line(&input, line, message).into());
                }
                "fatal" => return Err(anyhow::anyhow!("{}", value).into()),
                "panic" => panic!("fake builder panicked on {}", input),
                "skip-output" => write_outputs = false,
                "sleep" => std::thread::sleep(Duration::from_millis(value.parse().unwrap_or(0))),
                "spawn" => {
                    let generated = Resource::new(value);
                    ctx.provider()
                        .write(&generated, format!("generated by {}\n", input).as_bytes())?;
                    ctx.build_resource(&generated)?;
                }
                _ => {}
            }
        }

        if write_outputs {
            let mut content = Vec::new();
            for dep in task.inputs() {
                content.extend(ctx.provider().read(dep)?);
            }
            for output in task.outputs() {
                ctx.provider().write(output, &content)?;
            }
        }
        Ok(())
    }
}
