//! # In-Memory Secret Store
//!
//! [`SecretStore`] kept in process memory. Used by the test suites to drive
//! the lifecycle operations without a cluster. It records every write and
//! delete attempt and can be told to fail specific operations.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;

use super::{fold_string_data, plan_write, secret_key, SecretStore, WritePlan};
use crate::secrets::error::{Result, SecretsError};

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

#[derive(Debug, Default)]
struct State {
    secrets: BTreeMap<Key, Secret>,
    reads: BTreeMap<Key, usize>,
    writes: BTreeMap<Key, usize>,
    delete_attempts: Vec<Key>,
    failing_reads: BTreeSet<String>,
    failing_writes: BTreeSet<String>,
    failing_deletes: BTreeSet<String>,
    resource_version: u64,
}

impl State {
    fn bump_version(&mut self, secret: &mut Secret) {
        self.resource_version += 1;
        secret.metadata.resource_version = Some(self.resource_version.to_string());
    }
}

#[derive(Debug, Default)]
pub struct MemorySecretStore {
    state: Mutex<State>,
}

impl MemorySecretStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a secret without counting it as a write
    pub fn insert(&self, secret: Secret) {
        let mut secret = fold_string_data(&secret);
        let namespace = secret.metadata.namespace.clone().unwrap_or_default();
        let name = secret.metadata.name.clone().unwrap_or_default();
        let mut state = self.lock();
        state.bump_version(&mut secret);
        state.secrets.insert((namespace, name), secret);
    }

    #[must_use]
    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        self.lock().secrets.get(&key(namespace, name)).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().secrets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `get` calls that reached this secret
    #[must_use]
    pub fn read_count(&self, namespace: &str, name: &str) -> usize {
        self.lock()
            .reads
            .get(&key(namespace, name))
            .copied()
            .unwrap_or_default()
    }

    /// Number of writes that reached this secret
    #[must_use]
    pub fn write_count(&self, namespace: &str, name: &str) -> usize {
        self.lock()
            .writes
            .get(&key(namespace, name))
            .copied()
            .unwrap_or_default()
    }

    /// Every `(namespace, name)` a delete was attempted on, in call order
    #[must_use]
    pub fn delete_attempts(&self) -> Vec<(String, String)> {
        self.lock().delete_attempts.clone()
    }

    /// Make reads of `name` fail with a store error
    pub fn fail_reads_of(&self, name: &str) {
        self.lock().failing_reads.insert(name.to_string());
    }

    /// Make writes of `name` fail with a store error
    pub fn fail_writes_of(&self, name: &str) {
        self.lock().failing_writes.insert(name.to_string());
    }

    /// Make deletes of `name` fail with a store error
    pub fn fail_deletes_of(&self, name: &str) {
        self.lock().failing_deletes.insert(name.to_string());
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret> {
        let mut state = self.lock();
        *state.reads.entry(key(namespace, name)).or_default() += 1;
        if state.failing_reads.contains(name) {
            return Err(SecretsError::store("get", namespace, name, "injected failure"));
        }
        state
            .secrets
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| SecretsError::not_found(namespace, name))
    }

    /// The stored state is authoritative here, `existing` only has to agree with it
    async fn write(&self, _existing: Option<&Secret>, secret: &Secret) -> Result<bool> {
        let (namespace, name) = secret_key(secret)?;
        let key = key(namespace, name);

        let mut state = self.lock();
        *state.writes.entry(key.clone()).or_default() += 1;
        if state.failing_writes.contains(name) {
            return Err(SecretsError::store("apply", namespace, name, "injected failure"));
        }

        let plan = plan_write(state.secrets.get(&key), secret);
        match plan {
            WritePlan::Unchanged => Ok(false),
            WritePlan::Create(mut stored) | WritePlan::Replace(mut stored) => {
                state.bump_version(&mut stored);
                state.secrets.insert(key, stored);
                Ok(true)
            }
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        let key = key(namespace, name);
        let mut state = self.lock();
        state.delete_attempts.push(key.clone());
        if state.failing_deletes.contains(name) {
            return Err(SecretsError::store("delete", namespace, name, "injected failure"));
        }
        state
            .secrets
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| SecretsError::not_found(namespace, name))
    }
}
