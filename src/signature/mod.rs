// src/signature/mod.rs

//! Task content signatures.
//!
//! A signature is a blake3 digest over everything that determines a task's
//! outputs: the builder identity, the task parameters and each input's path
//! and content. It never depends on time or execution order.

use std::fmt;

use blake3::Hasher;
use tracing::trace;

use crate::dag::task::Task;
use crate::errors::{BuildFault, CompileError};
use crate::fs::ResourceProvider;

pub mod store;

pub use store::SignatureStore;

/// Bumped whenever the hashed layout below changes.
const SIGNATURE_DOMAIN: &[u8] = b"assetforge.task.v1";

/// Opaque content fingerprint. The empty signature is the invalidated
/// sentinel: it never equals a computed signature.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn invalidated() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn is_invalidated(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        hex::decode(s.trim()).map(Self)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalidated() {
            f.write_str("<invalidated>")
        } else {
            f.write_str(&self.to_hex())
        }
    }
}

/// Compute the signature of `task` from its builder, parameters and inputs.
///
/// A missing input is a recoverable [`CompileError`] on that input; any other
/// read failure is fatal.
pub fn compute_task_signature(
    provider: &dyn ResourceProvider,
    task: &Task,
) -> Result<Signature, BuildFault> {
    let mut hasher = Hasher::new();
    hasher.update(SIGNATURE_DOMAIN);
    update_field(&mut hasher, task.builder_name().as_bytes());

    hasher.update(&(task.params().len() as u64).to_le_bytes());
    for (key, value) in task.params() {
        update_field(&mut hasher, key.as_bytes());
        update_field(&mut hasher, value.as_bytes());
    }

    hasher.update(&(task.inputs().len() as u64).to_le_bytes());
    for input in task.inputs() {
        if !provider.exists(input) {
            return Err(CompileError::new(input, format!("input '{}' not found", input)).into());
        }
        let content = provider.read(input)?;
        update_field(&mut hasher, input.path().as_bytes());
        hasher.update(blake3::hash(&content).as_bytes());
    }

    let signature = Signature(hasher.finalize().as_bytes().to_vec());
    trace!(task = %task, signature = %signature, "computed task signature");
    Ok(signature)
}

/// Length-prefixed update so adjacent fields cannot alias.
fn update_field(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
