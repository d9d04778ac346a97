// src/builders/collection.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::{BuildContext, Builder, BuilderParams};
use crate::builders::gameobject::{compiled_reference, line_of};
use crate::builders::math::{Quat, Vec3};
use crate::builders::properties::{
    compile_component_properties, ComponentPropertiesSource, ComponentPropertyDesc,
};
use crate::dag::{Task, TaskSpec};
use crate::errors::{BuildFault, CompileError};
use crate::fs::Resource;

fn default_scale() -> f64 {
    1.0
}

/// Collection source:
///
/// ```toml
/// name = "main"
///
/// [[instances]]
/// id = "hero"
/// prototype = "/hero.go"
/// position = [1.0, 0.0, 0.0]
/// rotation = [0.0, 0.0, 0.0, 1.0]
/// scale = 0.5
/// children = ["sword"]
///
/// [[instances.component_properties]]
/// id = "script"
/// properties = [{ id = "speed", type = "number", value = "2.5" }]
///
/// [[collection_instances]]
/// id = "level"
/// collection = "/level.collection"
///
/// [[embedded_instances]]
/// id = "camera"
/// data = """
/// [[components]]
/// id = "cam"
/// component = "/camera.camera"
/// """
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub instances: Vec<InstanceSource>,
    #[serde(default)]
    pub collection_instances: Vec<CollectionInstanceSource>,
    #[serde(default)]
    pub embedded_instances: Vec<EmbeddedInstanceSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceSource {
    pub id: String,
    pub prototype: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quat,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub component_properties: Vec<ComponentPropertiesSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionInstanceSource {
    pub id: String,
    pub collection: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quat,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

/// Instance whose game object is written inline as `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedInstanceSource {
    pub id: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quat,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub children: Vec<String>,
}

/// Flattened collection written to `.collectionc`. Nested collections are
/// resolved into plain instances with fully qualified ids.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionDesc {
    pub name: String,
    #[serde(default)]
    pub instances: Vec<InstanceDesc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceDesc {
    /// Fully qualified id, e.g. `"/level/room/hero"`.
    pub id: String,
    /// Compiled prototype reference.
    pub prototype: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_properties: Vec<ComponentPropertyDesc>,
}

/// `.collection` → `.collectionc`
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionBuilder;

impl CollectionBuilder {
    pub const PARAMS: BuilderParams = BuilderParams {
        name: "collection",
        in_exts: &[".collection"],
        out_ext: ".collectionc",
        create_order: 100,
    };
}

impl Builder for CollectionBuilder {
    fn params(&self) -> BuilderParams {
        Self::PARAMS
    }

    /// Inputs are the collection and every transitively referenced
    /// sub-collection, so editing a sub-collection rebuilds its parents.
    fn create(&self, ctx: &BuildContext, input: Resource) -> Result<TaskSpec, CompileError> {
        let source = load_collection(ctx, &input, None)?;
        let output = ctx.output_for(&input, Self::PARAMS.out_ext);
        let mut spec = TaskSpec::new(input.clone()).with_output(output);
        let mut ancestors = vec![input.clone()];
        collect_sub_collections(ctx, &input, &source, &mut ancestors, &mut spec)?;
        Ok(spec)
    }

    fn build(&self, ctx: &BuildContext, task: &Task) -> Result<(), BuildFault> {
        let (Some(input), Some(output)) = (task.primary_input(), task.outputs().first()) else {
            return Err(anyhow::anyhow!("collection task without input or output").into());
        };
        let source = load_collection(ctx, input, None)?;

        let mut flattener = Flattener::new(ctx, input);
        let mut ancestors = vec![input.clone()];
        flattener.flatten(input, &source, &Frame::root(), &mut ancestors)?;

        for (generated, data) in &flattener.embedded {
            ctx.provider().write(generated, data.as_bytes())?;
            ctx.build_resource(generated)?;
        }

        let desc = CollectionDesc {
            name: source.name,
            instances: flattener.instances,
        };
        let encoded = toml::to_string(&desc).map_err(anyhow::Error::from)?;
        ctx.provider().write(output, encoded.as_bytes())?;
        Ok(())
    }
}

/// Read and parse a collection. `referrer` names the collection that
/// referenced it, for error reporting.
fn load_collection(
    ctx: &BuildContext,
    resource: &Resource,
    referrer: Option<&Resource>,
) -> Result<CollectionSource, CompileError> {
    let blame = referrer.unwrap_or(resource);
    if !ctx.provider().exists(resource) {
        return Err(CompileError::new(
            blame,
            format!("collection '{}' not found", resource),
        ));
    }
    let text = ctx
        .provider()
        .read_to_string(resource)
        .map_err(|err| CompileError::new(resource, format!("{:#}", err)))?;
    parse_collection(resource, &text)
}

pub fn parse_collection(resource: &Resource, text: &str) -> Result<CollectionSource, CompileError> {
    let mut source: CollectionSource = toml::from_str(text).map_err(|err| {
        let message = err.message().to_string();
        match err.span() {
            Some(span) => CompileError::at_line(resource, line_of(text, span), message),
            None => CompileError::new(resource, message),
        }
    })?;
    for property in source
        .instances
        .iter_mut()
        .flat_map(|i| i.component_properties.iter_mut())
        .flat_map(|c| c.properties.iter_mut())
    {
        property.line = line_of(text, property.value.span());
    }
    Ok(source)
}

fn collect_sub_collections(
    ctx: &BuildContext,
    resource: &Resource,
    source: &CollectionSource,
    ancestors: &mut Vec<Resource>,
    spec: &mut TaskSpec,
) -> Result<(), CompileError> {
    for instance in &source.collection_instances {
        let sub = resource.resolve(&instance.collection);
        if ancestors.contains(&sub) {
            return Err(circular(resource, &sub));
        }
        if spec.inputs.contains(&sub) {
            continue;
        }
        let sub_source = load_collection(ctx, &sub, Some(resource))?;
        spec.inputs.push(sub.clone());
        ancestors.push(sub.clone());
        collect_sub_collections(ctx, &sub, &sub_source, ancestors, spec)?;
        ancestors.pop();
    }
    Ok(())
}

fn circular(resource: &Resource, sub: &Resource) -> CompileError {
    CompileError::new(
        resource,
        format!("collection '{}' includes itself through '{}'", sub, resource),
    )
}

/// Accumulated transform of the collection instances enclosing a
/// collection.
#[derive(Debug, Clone)]
struct Frame {
    position: Vec3,
    rotation: Quat,
    scale: f64,
    /// Scale of the collection instance that opened this frame.
    local_scale: f64,
    /// Id prefix, always ending in `/`.
    prefix: String,
}

impl Frame {
    fn root() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: 1.0,
            local_scale: 1.0,
            prefix: "/".to_string(),
        }
    }

    fn compose(&self, position: Vec3, rotation: Quat, scale: f64) -> (Vec3, Quat, f64) {
        (
            self.position + self.rotation.rotate(position.scale(self.local_scale)),
            self.rotation * rotation,
            self.scale * scale,
        )
    }

    fn enter(&self, instance: &CollectionInstanceSource) -> Frame {
        let (position, rotation, scale) =
            self.compose(instance.position, instance.rotation, instance.scale);
        Frame {
            position,
            rotation,
            scale,
            local_scale: instance.scale,
            prefix: format!("{}{}/", self.prefix, instance.id),
        }
    }

    fn qualify(&self, id: &str) -> String {
        format!("{}{}", self.prefix, id)
    }
}

struct Flattener<'a> {
    ctx: &'a BuildContext,
    root: &'a Resource,
    instances: Vec<InstanceDesc>,
    /// Generated game object resources and their contents.
    embedded: Vec<(Resource, String)>,
}

impl<'a> Flattener<'a> {
    fn new(ctx: &'a BuildContext, root: &'a Resource) -> Self {
        Self {
            ctx,
            root,
            instances: Vec::new(),
            embedded: Vec::new(),
        }
    }

    fn flatten(
        &mut self,
        resource: &Resource,
        source: &CollectionSource,
        frame: &Frame,
        ancestors: &mut Vec<Resource>,
    ) -> Result<(), CompileError> {
        let child_ids: HashSet<&str> = source
            .instances
            .iter()
            .flat_map(|i| i.children.iter())
            .chain(source.embedded_instances.iter().flat_map(|i| i.children.iter()))
            .map(String::as_str)
            .collect();

        let mut local_ids = HashSet::new();
        for instance in &source.instances {
            if !local_ids.insert(instance.id.as_str()) {
                return Err(duplicate_id(resource, &instance.id));
            }
            let prototype = absolute_reference(&resource.resolve(&instance.prototype));
            let properties =
                compile_component_properties(resource, &instance.component_properties)?;
            self.place(
                frame,
                &instance.id,
                compiled_reference(&prototype),
                (instance.position, instance.rotation, instance.scale),
                &instance.children,
                child_ids.contains(instance.id.as_str()),
            );
            if let Some(placed) = self.instances.last_mut() {
                placed.component_properties = properties;
            }
        }

        for instance in &source.embedded_instances {
            if !local_ids.insert(instance.id.as_str()) {
                return Err(duplicate_id(resource, &instance.id));
            }
            let generated = self.generated_resource();
            let prototype = compiled_reference(&absolute_reference(&generated));
            self.embedded.push((generated, instance.data.clone()));
            self.place(
                frame,
                &instance.id,
                prototype,
                (instance.position, instance.rotation, instance.scale),
                &instance.children,
                child_ids.contains(instance.id.as_str()),
            );
        }

        for instance in &source.collection_instances {
            if !local_ids.insert(instance.id.as_str()) {
                return Err(duplicate_id(resource, &instance.id));
            }
            let sub = resource.resolve(&instance.collection);
            if ancestors.contains(&sub) {
                return Err(circular(resource, &sub));
            }
            let sub_source = load_collection(self.ctx, &sub, Some(resource))?;
            let sub_frame = frame.enter(instance);
            debug!(collection = %sub, prefix = %sub_frame.prefix, "flattening sub-collection");
            ancestors.push(sub.clone());
            self.flatten(&sub, &sub_source, &sub_frame, ancestors)?;
            ancestors.pop();
        }
        Ok(())
    }

    /// Root instances are composed with the frame; children keep their
    /// local transform relative to their parent.
    fn place(
        &mut self,
        frame: &Frame,
        id: &str,
        prototype: String,
        (position, rotation, scale): (Vec3, Quat, f64),
        children: &[String],
        is_child: bool,
    ) {
        let (position, rotation, scale) = if is_child {
            (position, rotation, scale)
        } else {
            frame.compose(position, rotation, scale)
        };
        self.instances.push(InstanceDesc {
            id: frame.qualify(id),
            prototype,
            position,
            rotation,
            scale,
            children: children.iter().map(|c| frame.qualify(c)).collect(),
            component_properties: Vec::new(),
        });
    }

    /// `<build_dir>/<root collection>_generated_<n>.go`
    fn generated_resource(&self) -> Resource {
        let stem = self.root.with_extension("");
        let base = if self.root.is_under(self.ctx.build_dir()) {
            stem.path().to_string()
        } else {
            format!("{}/{}", self.ctx.build_dir(), stem.path())
        };
        Resource::new(format!("{}_generated_{}.go", base, self.embedded.len()))
    }
}

fn duplicate_id(resource: &Resource, id: &str) -> CompileError {
    CompileError::new(resource, format!("duplicate instance id '{}'", id))
}

fn absolute_reference(resource: &Resource) -> String {
    format!("/{}", resource.path())
}
