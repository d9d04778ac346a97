// src/library/fetch.rs

use std::io::Cursor;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::LibrariesSection;
use crate::fs::{Resource, ResourceProvider};

use super::{library_resource, LibraryError, LIB_DIR};

/// Downloads library archives over HTTP.
#[derive(Debug, Clone)]
pub struct LibraryFetcher {
    client: Client,
    email: Option<String>,
    auth: Option<String>,
}

impl LibraryFetcher {
    pub fn new(settings: &LibrariesSection) -> Result<Self, LibraryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|source| LibraryError::Http {
                url: String::new(),
                source,
            })?;
        Ok(Self {
            client,
            email: settings.email.clone(),
            auth: settings.auth.clone(),
        })
    }

    /// Clean the library directory, then fetch every URL in order.
    ///
    /// A failing URL does not stop the others; one result per URL is
    /// returned.
    pub async fn resolve(
        &self,
        provider: &dyn ResourceProvider,
        urls: &[String],
    ) -> Vec<(String, Result<Resource, LibraryError>)> {
        if let Err(err) = provider.remove_dir_all(LIB_DIR) {
            warn!(error = %err, "could not clean library directory");
        }

        let mut results = Vec::with_capacity(urls.len());
        for url in urls {
            let result = self.fetch(provider, url).await;
            match &result {
                Ok(resource) => info!(url = %url, file = %resource, "library fetched"),
                Err(err) => warn!(url = %url, error = %err, "library fetch failed"),
            }
            results.push((url.clone(), result));
        }
        results
    }

    /// Download one archive and validate it. Invalid archives are deleted.
    pub async fn fetch(
        &self,
        provider: &dyn ResourceProvider,
        url: &str,
    ) -> Result<Resource, LibraryError> {
        debug!(url = %url, "fetching library");

        let mut request = self.client.get(url);
        if let Some(email) = &self.email {
            request = request.header("X-Email", email);
        }
        if let Some(auth) = &self.auth {
            request = request.header("X-Auth", auth);
        }

        let response = request.send().await.map_err(|source| classify(url, source))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LibraryError::NotFound {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(LibraryError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| classify(url, source))?;

        let target = library_resource(url);
        provider
            .write(&target, &bytes)
            .map_err(|err| LibraryError::Io {
                url: url.to_string(),
                reason: format!("{:#}", err),
            })?;

        if let Err(source) = zip::ZipArchive::new(Cursor::new(&bytes[..])) {
            if let Err(err) = provider.remove(&target) {
                warn!(file = %target, error = %err, "could not delete invalid library archive");
            }
            return Err(LibraryError::InvalidArchive {
                url: url.to_string(),
                source,
            });
        }

        Ok(target)
    }
}

fn classify(url: &str, source: reqwest::Error) -> LibraryError {
    if source.is_connect() {
        LibraryError::ConnectionRefused {
            url: url.to_string(),
            source,
        }
    } else {
        LibraryError::Http {
            url: url.to_string(),
            source,
        }
    }
}
