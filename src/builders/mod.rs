// src/builders/mod.rs

//! Reference builders shipped with the crate.
//!
//! | builder | inputs | output | order |
//! |---|---|---|---|
//! | [`CollectionBuilder`] | `.collection` | `.collectionc` | 100 |
//! | [`GameObjectBuilder`] | `.go` | `.goc` | 200 |
//! | [`ScriptBuilder`] | `.script`, `.lua` | `.scriptc`, `.luac` | 300 |

use std::sync::Arc;

use crate::builder::BuilderRegistry;

pub mod collection;
pub mod gameobject;
pub mod math;
pub mod properties;
pub mod script;

pub use collection::{CollectionBuilder, CollectionDesc, InstanceDesc};
pub use gameobject::{GameObjectBuilder, GameObjectDesc};
pub use properties::{ComponentPropertyDesc, PropertyDesc, PropertyType, PropertyValue};
pub use script::ScriptBuilder;

/// Register every reference builder.
pub fn register_defaults(registry: &mut BuilderRegistry) {
    registry.register_builder(Arc::new(CollectionBuilder));
    registry.register_builder(Arc::new(GameObjectBuilder));
    registry.register_builder(Arc::new(ScriptBuilder::script()));
    registry.register_builder(Arc::new(ScriptBuilder::lua()));
}

/// A registry with [`register_defaults`] applied.
pub fn default_registry() -> BuilderRegistry {
    let mut registry = BuilderRegistry::new();
    register_defaults(&mut registry);
    registry
}
