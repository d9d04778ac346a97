// src/builders/gameobject.rs

use std::collections::HashSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use toml::Spanned;

use crate::builder::{BuildContext, Builder, BuilderParams};
use crate::dag::{Task, TaskSpec};
use crate::errors::{BuildFault, CompileError};
use crate::fs::{extension_of, Resource};

/// Game object source:
///
/// ```toml
/// [[components]]
/// id = "sprite"
/// component = "/hero.sprite"
/// ```
#[derive(Debug, Deserialize)]
struct GameObjectSource {
    #[serde(default)]
    components: Vec<ComponentSource>,
}

#[derive(Debug, Deserialize)]
struct ComponentSource {
    id: Spanned<String>,
    component: String,
}

/// Compiled game object written to `.goc`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct GameObjectDesc {
    #[serde(default)]
    pub components: Vec<ComponentDesc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ComponentDesc {
    pub id: String,
    /// Compiled component reference (`"/hero.spritec"`).
    pub component: String,
}

/// `.go` → `.goc`
#[derive(Debug, Clone, Copy, Default)]
pub struct GameObjectBuilder;

impl GameObjectBuilder {
    pub const PARAMS: BuilderParams = BuilderParams {
        name: "gameobject",
        in_exts: &[".go"],
        out_ext: ".goc",
        create_order: 200,
    };
}

impl Builder for GameObjectBuilder {
    fn params(&self) -> BuilderParams {
        Self::PARAMS
    }

    fn create(&self, ctx: &BuildContext, input: Resource) -> Result<TaskSpec, CompileError> {
        let output = ctx.output_for(&input, Self::PARAMS.out_ext);
        Ok(TaskSpec::new(input).with_output(output))
    }

    fn build(&self, ctx: &BuildContext, task: &Task) -> Result<(), BuildFault> {
        let (Some(input), Some(output)) = (task.primary_input(), task.outputs().first()) else {
            return Err(anyhow::anyhow!("game object task without input or output").into());
        };
        let text = ctx.provider().read_to_string(input)?;
        let desc = compile_game_object(input, &text)?;
        let encoded = toml::to_string(&desc).map_err(anyhow::Error::from)?;
        ctx.provider().write(output, encoded.as_bytes())?;
        Ok(())
    }
}

/// Parse and validate a game object, rewriting component references to
/// their compiled extension.
pub fn compile_game_object(input: &Resource, text: &str) -> Result<GameObjectDesc, CompileError> {
    let source: GameObjectSource = toml::from_str(text).map_err(|err| {
        let message = err.message().to_string();
        match err.span() {
            Some(span) => CompileError::at_line(input, line_of(text, span), message),
            None => CompileError::new(input, message),
        }
    })?;

    let mut seen: HashSet<&str> = HashSet::new();
    let mut components = Vec::with_capacity(source.components.len());
    for component in &source.components {
        let id = component.id.get_ref();
        if !seen.insert(id) {
            return Err(CompileError::at_line(
                input,
                line_of(text, component.id.span()),
                format!("duplicate component id '{}'", id),
            ));
        }
        components.push(ComponentDesc {
            id: id.clone(),
            component: compiled_reference(&component.component),
        });
    }
    Ok(GameObjectDesc { components })
}

/// `"/a/b.sprite"` → `"/a/b.spritec"`; references without an extension are
/// kept as-is.
pub(crate) fn compiled_reference(reference: &str) -> String {
    match extension_of(reference) {
        Some(_) => format!("{}c", reference),
        None => reference.to_string(),
    }
}

/// 1-based line of the start of `span` in `text`.
pub(crate) fn line_of(text: &str, span: Range<usize>) -> u32 {
    let end = span.start.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() as u32 + 1
}
