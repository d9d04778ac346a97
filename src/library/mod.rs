// src/library/mod.rs

//! Remote library archives.
//!
//! Libraries are zip archives referenced by URL in the `[libraries]` config
//! section. The `resolve` command downloads them into [`LIB_DIR`]; regular
//! builds only warn when some are missing locally.

use thiserror::Error;
use tracing::warn;

use crate::fs::{Resource, ResourceProvider};

pub mod fetch;

pub use fetch::LibraryFetcher;

/// Library archive directory, relative to the project root.
pub const LIB_DIR: &str = ".internal/lib";

/// Errors for a single library URL. They never affect build signatures.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Connection refused by the server at {url}")]
    ConnectionRefused {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("The URL {url} points to a resource which doesn't exist")]
    NotFound { url: String },

    #[error("The file obtained from {url} is not a valid zip file: {source}")]
    InvalidArchive {
        url: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("request to {url} failed with status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to store library from {url}: {reason}")]
    Io { url: String, reason: String },
}

/// File name of the local copy of `url`: a 16-hex-digit blake3 prefix of the
/// URL plus `.zip`.
pub fn library_file_name(url: &str) -> String {
    let digest = blake3::hash(url.as_bytes());
    format!("{}.zip", &digest.to_hex()[..16])
}

pub fn library_resource(url: &str) -> Resource {
    Resource::new(format!("{}/{}", LIB_DIR, library_file_name(url)))
}

/// URLs whose archive is not present locally. Logs a warning when any are.
pub fn missing_libraries(provider: &dyn ResourceProvider, urls: &[String]) -> Vec<String> {
    let missing: Vec<String> = urls
        .iter()
        .filter(|url| !provider.exists(&library_resource(url)))
        .cloned()
        .collect();
    if !missing.is_empty() {
        warn!(
            count = missing.len(),
            "Some libraries could not be found locally, use the resolve command to fetch them."
        );
    }
    missing
}
