// src/builders/script.rs

use crate::builder::{BuildContext, Builder, BuilderParams};
use crate::dag::{Task, TaskSpec};
use crate::errors::{BuildFault, CompileError};
use crate::fs::Resource;

/// Option that drops full-line `--` comments from compiled scripts.
pub const STRIP_COMMENTS_OPTION: &str = "script.strip_comments";

/// Compiles script sources: UTF-8 validation and line-ending normalization.
#[derive(Debug, Clone, Copy)]
pub struct ScriptBuilder {
    params: BuilderParams,
}

impl ScriptBuilder {
    /// `.script` → `.scriptc`
    pub fn script() -> Self {
        Self {
            params: BuilderParams {
                name: "script",
                in_exts: &[".script"],
                out_ext: ".scriptc",
                create_order: 300,
            },
        }
    }

    /// `.lua` → `.luac`
    pub fn lua() -> Self {
        Self {
            params: BuilderParams {
                name: "lua",
                in_exts: &[".lua"],
                out_ext: ".luac",
                create_order: 300,
            },
        }
    }
}

impl Builder for ScriptBuilder {
    fn params(&self) -> BuilderParams {
        self.params
    }

    fn create(&self, ctx: &BuildContext, input: Resource) -> Result<TaskSpec, CompileError> {
        let output = ctx.output_for(&input, self.params.out_ext);
        let strip = ctx.option(STRIP_COMMENTS_OPTION, "false").to_string();
        Ok(TaskSpec::new(input)
            .with_output(output)
            .with_param("strip_comments", strip))
    }

    fn build(&self, ctx: &BuildContext, task: &Task) -> Result<(), BuildFault> {
        let (Some(input), Some(output)) = (task.primary_input(), task.outputs().first()) else {
            return Err(anyhow::anyhow!("script task without input or output").into());
        };
        let bytes = ctx.provider().read(input)?;
        let source = decode_utf8(input, &bytes)?;
        let strip = task.param("strip_comments") == Some("true");
        let compiled = compile_source(source, strip);
        ctx.provider().write(output, compiled.as_bytes())?;
        Ok(())
    }
}

/// Invalid UTF-8 is reported on the line where it starts.
fn decode_utf8<'a>(input: &Resource, bytes: &'a [u8]) -> Result<&'a str, CompileError> {
    std::str::from_utf8(bytes).map_err(|err| {
        let valid = &bytes[..err.valid_up_to()];
        let line = valid.iter().filter(|b| **b == b'\n').count() as u32 + 1;
        CompileError::at_line(input, line, "script is not valid UTF-8")
    })
}

fn compile_source(source: &str, strip_comments: bool) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        if strip_comments && line.trim_start().starts_with("--") {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}
