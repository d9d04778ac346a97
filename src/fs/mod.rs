// src/fs/mod.rs

//! Resource provider abstraction.
//!
//! Builders and the scheduler never touch `std::fs` directly; they go through
//! a [`ResourceProvider`] rooted at the project directory. Production uses
//! [`RealFileSystem`]; tests use [`mock::MockFileSystem`].

use std::fmt::Debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;
pub mod resource;

pub use resource::{extension_of, normalize_path, Resource};

/// Abstract resource access, keyed by logical path.
pub trait ResourceProvider: Send + Sync + Debug {
    /// Absolute project root.
    fn root(&self) -> &Path;

    fn exists(&self, resource: &Resource) -> bool;
    fn read(&self, resource: &Resource) -> Result<Vec<u8>>;
    /// Write the resource, creating parent directories as needed.
    fn write(&self, resource: &Resource, contents: &[u8]) -> Result<()>;
    /// Remove the resource. Removing a missing resource is not an error.
    fn remove(&self, resource: &Resource) -> Result<()>;
    /// Recursively remove a directory. A missing directory is not an error.
    fn remove_dir_all(&self, path: &str) -> Result<()>;
    fn is_dir(&self, path: &str) -> bool;

    /// Logical paths of the direct children of a directory.
    fn read_dir(&self, path: &str) -> Result<Vec<String>>;

    fn get(&self, path: &str) -> Resource {
        Resource::new(path)
    }

    fn abs_path(&self, resource: &Resource) -> PathBuf {
        self.root().join(resource.path())
    }

    fn read_to_string(&self, resource: &Resource) -> Result<String> {
        let bytes = self.read(resource)?;
        String::from_utf8(bytes).with_context(|| format!("{} is not valid UTF-8", resource))
    }
}

/// Implementation that uses `std::fs` below a root directory.
#[derive(Debug, Clone)]
pub struct RealFileSystem {
    root: PathBuf,
}

impl RealFileSystem {
    /// Create a provider rooted at `root` (made absolute, not canonicalized).
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = std::path::absolute(root.as_ref())
            .with_context(|| format!("resolving root directory {:?}", root.as_ref()))?;
        Ok(Self { root })
    }

    fn dir_path(&self, path: &str) -> PathBuf {
        let logical = normalize_path(path);
        if logical.is_empty() {
            self.root.clone()
        } else {
            self.root.join(logical)
        }
    }
}

impl ResourceProvider for RealFileSystem {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, resource: &Resource) -> bool {
        self.abs_path(resource).is_file()
    }

    fn read(&self, resource: &Resource) -> Result<Vec<u8>> {
        let path = self.abs_path(resource);
        fs::read(&path).with_context(|| format!("reading file {:?}", path))
    }

    fn write(&self, resource: &Resource, contents: &[u8]) -> Result<()> {
        let path = self.abs_path(resource);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating dir {:?}", parent))?;
        }
        let mut file =
            fs::File::create(&path).with_context(|| format!("creating file {:?}", path))?;
        file.write_all(contents)
            .with_context(|| format!("writing to file {:?}", path))?;
        Ok(())
    }

    fn remove(&self, resource: &Resource) -> Result<()> {
        let path = self.abs_path(resource);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing file {:?}", path)),
        }
    }

    fn remove_dir_all(&self, path: &str) -> Result<()> {
        let dir = self.dir_path(path);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing dir {:?}", dir)),
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        self.dir_path(path).is_dir()
    }

    fn read_dir(&self, path: &str) -> Result<Vec<String>> {
        let dir = self.dir_path(path);
        let prefix = normalize_path(path);
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir).with_context(|| format!("reading dir {:?}", dir))? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if prefix.is_empty() {
                entries.push(name);
            } else {
                entries.push(format!("{}/{}", prefix, name));
            }
        }
        Ok(entries)
    }
}
