// src/builder/registry.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::builder::Builder;
use crate::fs::extension_of;

/// Extension → builder map, populated once before scheduling.
#[derive(Debug, Default)]
pub struct BuilderRegistry {
    by_ext: HashMap<String, Arc<dyn Builder>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `builder` for `ext` (with leading dot). Last write wins; the
    /// replaced builder is returned.
    pub fn register(
        &mut self,
        ext: impl Into<String>,
        builder: Arc<dyn Builder>,
    ) -> Option<Arc<dyn Builder>> {
        let ext = ext.into();
        let previous = self.by_ext.insert(ext.clone(), builder);
        if let Some(prev) = &previous {
            debug!(ext = %ext, replaced = prev.params().name, "builder registration overwritten");
        }
        previous
    }

    /// Register `builder` for every input extension it declares.
    pub fn register_builder(&mut self, builder: Arc<dyn Builder>) {
        for ext in builder.params().in_exts {
            self.register(*ext, Arc::clone(&builder));
        }
    }

    /// Builder responsible for `path`, chosen by its extension.
    pub fn lookup(&self, path: &str) -> Option<&Arc<dyn Builder>> {
        extension_of(path).and_then(|ext| self.by_ext.get(ext))
    }

    pub fn has_builder(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    pub fn create_order(&self, path: &str) -> Option<i32> {
        self.lookup(path).map(|b| b.params().create_order)
    }

    /// Stable sort of `inputs` by creation-order priority.
    ///
    /// Ties keep discovery order; inputs without a builder go last.
    pub fn sort_inputs(&self, inputs: &[String]) -> Vec<String> {
        let mut sorted = inputs.to_vec();
        sorted.sort_by_key(|input| self.create_order(input).unwrap_or(i32::MAX));
        sorted
    }
}
