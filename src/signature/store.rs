// src/signature/store.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::fs::{Resource, ResourceProvider};
use crate::signature::Signature;

/// Name of the state file inside the build directory.
pub const STATE_FILE_NAME: &str = "state";

/// On-disk layout of the state file:
///
/// ```toml
/// [signatures]
/// "/abs/build/main.collectionc" = "6f1c..."
/// "/abs/build/broken.goc" = ""
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    signatures: BTreeMap<String, String>,
}

/// Absolute output path → signature, shared between concurrent workers.
///
/// Loaded once at build start, mutated during scheduling and saved once at
/// the end.
#[derive(Debug, Default)]
pub struct SignatureStore {
    entries: Mutex<BTreeMap<String, Signature>>,
}

fn key_for(abs_path: &Path) -> String {
    abs_path.to_string_lossy().replace('\\', "/")
}

impl SignatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store from `state`. A missing or corrupt state file yields an
    /// empty store.
    pub fn load(provider: &dyn ResourceProvider, state: &Resource) -> Self {
        if !provider.exists(state) {
            debug!(state = %state, "no build state found; starting with empty signature store");
            return Self::new();
        }

        match provider
            .read_to_string(state)
            .and_then(|text| Self::parse(&text))
        {
            Ok(store) => {
                info!(state = %state, entries = store.len(), "loaded build state");
                store
            }
            Err(err) => {
                warn!(state = %state, error = %err, "build state unreadable; ignoring it");
                Self::new()
            }
        }
    }

    fn parse(text: &str) -> Result<Self> {
        let file: StateFile = toml::from_str(text).context("parsing build state")?;
        let mut entries = BTreeMap::new();
        for (path, hex) in file.signatures {
            let signature = Signature::from_hex(&hex)
                .with_context(|| format!("invalid signature for {}", path))?;
            entries.insert(path, signature);
        }
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    /// Persist the store to `state`.
    pub fn save(&self, provider: &dyn ResourceProvider, state: &Resource) -> Result<()> {
        let file = StateFile {
            signatures: self
                .entries()
                .iter()
                .map(|(path, sig)| (path.clone(), sig.to_hex()))
                .collect(),
        };
        let text = toml::to_string(&file).context("serializing build state")?;
        provider.write(state, text.as_bytes())?;
        info!(state = %state, entries = file.signatures.len(), "saved build state");
        Ok(())
    }

    pub fn get(&self, abs_path: &Path) -> Option<Signature> {
        self.entries().get(&key_for(abs_path)).cloned()
    }

    pub fn put(&self, abs_path: &Path, signature: Signature) {
        self.entries().insert(key_for(abs_path), signature);
    }

    /// Reset the stored signature to the invalidated sentinel.
    pub fn invalidate(&self, abs_path: &Path) {
        self.put(abs_path, Signature::invalidated());
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, Signature>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
