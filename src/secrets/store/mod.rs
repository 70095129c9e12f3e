//! # Secret Store
//!
//! Persistence seam for managed secrets.
//!
//! Each implementation of [`SecretStore`] provides:
//! - `get` - read a secret, with a distinguishable `NotFound`
//! - `write` - apply semantics over an object the caller has just read
//! - `delete` - remove a secret, with a distinguishable `NotFound`
//!
//! `create_or_update` is `get` followed by `write`. Callers that already hold
//! the stored object go straight to `write` and save the second read.
//!
//! A write folds `stringData` into `data`, merges labels, annotations and
//! owner references into the existing object and overwrites `data` wholesale.
//! When the merged object equals what is stored, nothing is written.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;

use crate::secrets::error::{Result, SecretsError};

pub mod cluster;
pub mod memory;

pub use cluster::KubeSecretStore;
pub use memory::MemorySecretStore;

/// Store trait for namespaced secrets
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read a secret, failing with `SecretsError::NotFound` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret>;

    /// Create the secret or bring the existing one in line with it
    /// Returns true if the stored object changed
    async fn create_or_update(&self, secret: &Secret) -> Result<bool> {
        let (namespace, name) = secret_key(secret)?;
        let existing = match self.get(namespace, name).await {
            Ok(existing) => Some(existing),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        self.write(existing.as_ref(), secret).await
    }

    /// Like `create_or_update`, given the stored object (`None` when absent)
    async fn write(&self, existing: Option<&Secret>, secret: &Secret) -> Result<bool>;

    /// Delete a secret, failing with `SecretsError::NotFound` when it does not exist
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Namespace and name of a secret that is about to be written
pub fn secret_key(secret: &Secret) -> Result<(&str, &str)> {
    let name = secret.metadata.name.as_deref().unwrap_or_default();
    let namespace = secret.metadata.namespace.as_deref().unwrap_or_default();
    if name.is_empty() || namespace.is_empty() {
        return Err(SecretsError::store(
            "apply",
            namespace,
            name,
            "secret must have both a name and a namespace",
        ));
    }
    Ok((namespace, name))
}

/// What a write has to send to the store
#[derive(Debug, Clone, PartialEq)]
pub enum WritePlan {
    Create(Secret),
    Replace(Secret),
    Unchanged,
}

/// Plan the write of `secret` over `existing`
#[must_use]
pub fn plan_write(existing: Option<&Secret>, secret: &Secret) -> WritePlan {
    let required = fold_string_data(secret);
    match existing {
        None => WritePlan::Create(required),
        Some(existing) => {
            merge_for_apply(existing, &required).map_or(WritePlan::Unchanged, WritePlan::Replace)
        }
    }
}

/// Copy of `secret` with `stringData` folded into `data`, the way the API server stores it
#[must_use]
pub fn fold_string_data(secret: &Secret) -> Secret {
    let mut folded = secret.clone();
    if let Some(string_data) = folded.string_data.take() {
        let data = folded.data.get_or_insert_with(Default::default);
        for (key, value) in string_data {
            data.insert(key, ByteString(value.into_bytes()));
        }
    }
    folded
}

/// Merge `required` into `existing`
///
/// Returns `None` when the result is identical to `existing`, meaning no
/// write is needed. `required` must already have its `stringData` folded.
#[must_use]
pub fn merge_for_apply(existing: &Secret, required: &Secret) -> Option<Secret> {
    let mut merged = existing.clone();

    if let Some(labels) = &required.metadata.labels {
        merged
            .metadata
            .labels
            .get_or_insert_with(Default::default)
            .extend(labels.clone());
    }
    if let Some(annotations) = &required.metadata.annotations {
        merged
            .metadata
            .annotations
            .get_or_insert_with(Default::default)
            .extend(annotations.clone());
    }
    if let Some(owner_refs) = &required.metadata.owner_references {
        let merged_refs = merged.metadata.owner_references.get_or_insert_with(Vec::new);
        for owner_ref in owner_refs {
            match merged_refs.iter_mut().find(|r| r.uid == owner_ref.uid) {
                Some(slot) => slot.clone_from(owner_ref),
                None => merged_refs.push(owner_ref.clone()),
            }
        }
    }

    // Managed keys are overwritten as a whole, never merged
    merged.data.clone_from(&required.data);
    merged.string_data = None;
    if required.type_.is_some() {
        merged.type_.clone_from(&required.type_);
    }

    (merged != *existing).then_some(merged)
}
