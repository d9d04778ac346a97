// src/builders/properties.rs

//! Typed component property overrides on collection instances.
//!
//! ```toml
//! [[instances.component_properties]]
//! id = "script"
//! properties = [
//!     { id = "speed", type = "number", value = "2.5" },
//!     { id = "target", type = "url", value = "/enemy" },
//!     { id = "offset", type = "vector3", value = "1, 2, 3" },
//! ]
//! ```
//!
//! Values are written as strings and parsed according to their type when the
//! collection is built.

use serde::{Deserialize, Serialize};
use toml::Spanned;

use crate::errors::CompileError;
use crate::fs::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    Number,
    Hash,
    Url,
    Vector3,
    Vector4,
    Quat,
}

impl PropertyType {
    fn components(self) -> Option<usize> {
        match self {
            PropertyType::Vector3 => Some(3),
            PropertyType::Vector4 | PropertyType::Quat => Some(4),
            PropertyType::Number | PropertyType::Hash | PropertyType::Url => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentPropertiesSource {
    pub id: String,
    #[serde(default)]
    pub properties: Vec<PropertySource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertySource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub value: Spanned<String>,
    /// Line of `value` in the collection source, filled in after parsing.
    #[serde(skip)]
    pub line: u32,
}

/// Compiled overrides for one component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentPropertyDesc {
    pub id: String,
    #[serde(default)]
    pub properties: Vec<PropertyDesc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyDesc {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PropertyType,
    pub value: PropertyValue,
}

/// Parsed property value. Hashes are stored as 16 hex digits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropertyValue {
    Number(f64),
    Text(String),
    Vector(Vec<f64>),
}

/// 64-bit hash of a property string, as hex.
pub fn hash_property(value: &str) -> String {
    hex::encode(&blake3::hash(value.as_bytes()).as_bytes()[..8])
}

pub fn compile_component_properties(
    resource: &Resource,
    sources: &[ComponentPropertiesSource],
) -> Result<Vec<ComponentPropertyDesc>, CompileError> {
    sources
        .iter()
        .map(|component| {
            let properties = component
                .properties
                .iter()
                .map(|property| compile_property(resource, property))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ComponentPropertyDesc {
                id: component.id.clone(),
                properties,
            })
        })
        .collect()
}

fn compile_property(
    resource: &Resource,
    property: &PropertySource,
) -> Result<PropertyDesc, CompileError> {
    let raw = property.value.get_ref().trim();
    let invalid = || {
        CompileError::at_line(
            resource,
            property.line,
            format!(
                "invalid value '{}' for property '{}' of type {:?}",
                raw, property.id, property.kind
            ),
        )
    };

    let value = match property.kind {
        PropertyType::Number => PropertyValue::Number(raw.parse().map_err(|_| invalid())?),
        PropertyType::Hash => PropertyValue::Text(hash_property(raw)),
        PropertyType::Url => PropertyValue::Text(raw.to_string()),
        kind => {
            let parts = raw
                .split(',')
                .map(|part| part.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| invalid())?;
            if Some(parts.len()) != kind.components() {
                return Err(invalid());
            }
            PropertyValue::Vector(parts)
        }
    };

    Ok(PropertyDesc {
        id: property.id.clone(),
        kind: property.kind,
        value,
    })
}

