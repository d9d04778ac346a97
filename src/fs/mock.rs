// src/fs/mock.rs

use super::{normalize_path, Resource, ResourceProvider};
use anyhow::{anyhow, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory resource provider.
///
/// Directories exist implicitly as prefixes of stored files. Clones share the
/// same backing map, so a test can keep a handle and inspect what builders
/// wrote.
#[derive(Debug, Clone)]
pub struct MockFileSystem {
    root: PathBuf,
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/mock"),
            files: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn add_file(&self, path: impl AsRef<str>, content: impl Into<Vec<u8>>) {
        let path = normalize_path(path.as_ref());
        self.files().insert(path, content.into());
    }

    pub fn contents(&self, path: impl AsRef<str>) -> Option<Vec<u8>> {
        self.files().get(&normalize_path(path.as_ref())).cloned()
    }

    /// All stored file paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.files().keys().cloned().collect()
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn dir_prefix(path: &str) -> String {
    let path = normalize_path(path);
    if path.is_empty() {
        path
    } else {
        format!("{}/", path)
    }
}

impl ResourceProvider for MockFileSystem {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, resource: &Resource) -> bool {
        self.files().contains_key(resource.path())
    }

    fn read(&self, resource: &Resource) -> Result<Vec<u8>> {
        self.files()
            .get(resource.path())
            .cloned()
            .ok_or_else(|| anyhow!("File not found: {}", resource))
    }

    fn write(&self, resource: &Resource, contents: &[u8]) -> Result<()> {
        self.add_file(resource.path(), contents);
        Ok(())
    }

    fn remove(&self, resource: &Resource) -> Result<()> {
        self.files().remove(resource.path());
        Ok(())
    }

    fn remove_dir_all(&self, path: &str) -> Result<()> {
        let prefix = dir_prefix(path);
        self.files().retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = dir_prefix(path);
        self.files().keys().any(|k| k.starts_with(&prefix))
    }

    fn read_dir(&self, path: &str) -> Result<Vec<String>> {
        let prefix = dir_prefix(path);
        let files = self.files();
        let mut children = BTreeSet::new();
        for key in files.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                let child = rest.split('/').next().unwrap_or(rest);
                children.insert(format!("{}{}", prefix, child));
            }
        }
        if children.is_empty() && !prefix.is_empty() {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }
        Ok(children.into_iter().collect())
    }
}
