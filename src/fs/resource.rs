// src/fs/resource.rs

//! Logical resource identity.

use std::fmt;

/// A resource is identified by its normalized, root-relative logical path.
///
/// Paths use forward slashes and carry no leading `/`, so `"/main/a.go"`,
/// `"main/./a.go"` and `"main\\a.go"` all name the same resource. Existence
/// and content are answered by a [`super::ResourceProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resource {
    path: String,
}

impl Resource {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// File name including extension.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// File name with the extension stripped.
    pub fn base_name(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    /// Extension including the leading dot (e.g. `".collection"`).
    pub fn extension(&self) -> Option<&str> {
        extension_of(&self.path)
    }

    /// Same resource path with the extension replaced by `ext` (with dot).
    pub fn with_extension(&self, ext: &str) -> Resource {
        let stem_len = self.path.len() - self.extension().map(str::len).unwrap_or(0);
        Resource {
            path: format!("{}{}", &self.path[..stem_len], ext),
        }
    }

    /// Whether this resource lives inside the directory `dir` (logical path).
    pub fn is_under(&self, dir: &str) -> bool {
        let dir = normalize_path(dir);
        if dir.is_empty() {
            return true;
        }
        self.path
            .strip_prefix(&dir)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Resolve `reference` relative to this resource.
    ///
    /// References starting with `/` are root-relative; everything else is
    /// relative to this resource's directory.
    pub fn resolve(&self, reference: &str) -> Resource {
        if reference.starts_with('/') {
            return Resource::new(reference);
        }
        match self.path.rfind('/') {
            Some(idx) => Resource::new(format!("{}/{}", &self.path[..idx], reference)),
            None => Resource::new(reference),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for Resource {
    fn from(path: &str) -> Self {
        Resource::new(path)
    }
}

/// Normalize a logical path: forward slashes, no empty or `.` segments,
/// `..` folded, no leading or trailing separator.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// Extension of a path's file name including the dot, if any.
pub fn extension_of(path: &str) -> Option<&str> {
    let name_start = path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    let name = &path[name_start..];
    match name.rfind('.') {
        Some(idx) if idx > 0 => Some(&name[idx..]),
        _ => None,
    }
}
