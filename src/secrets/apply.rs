//! # Apply If Needed
//!
//! Create-or-update of a single managed secret, driven by a per-kind
//! "should update" predicate.
//!
//! 1. Read the stored secret
//! 2. Absent: write the desired secret
//! 3. Present: ask the predicate; write only when it says so
//!
//! A write replaces the managed keys wholesale. Read or write failures other
//! than `NotFound` are returned as they are.

use k8s_openapi::api::core::v1::Secret;
use tracing::debug;

use crate::secrets::error::Result;
use crate::secrets::store::{secret_key, SecretStore};

/// Predicate for service credentials: once minted they are never rewritten
#[allow(clippy::unnecessary_wraps, reason = "Must match the predicate signature")]
pub fn do_not_update(_existing: &Secret) -> Result<bool> {
    Ok(false)
}

/// Predicate for mirrored content: always hand the desired state to the store
#[allow(clippy::unnecessary_wraps, reason = "Must match the predicate signature")]
pub fn always_update(_existing: &Secret) -> Result<bool> {
    Ok(true)
}

/// Write `desired` if it is missing or `should_update` asks for it
///
/// Returns whether the store reported a change. A skipped write reports
/// `false`. The stored object is read once and handed to the write.
pub async fn apply_secret<F>(store: &dyn SecretStore, desired: &Secret, should_update: F) -> Result<bool>
where
    F: FnOnce(&Secret) -> Result<bool> + Send,
{
    let (namespace, name) = secret_key(desired)?;

    let existing = match store.get(namespace, name).await {
        Ok(existing) => Some(existing),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };

    if let Some(existing) = &existing {
        if !should_update(existing)? {
            debug!(namespace, name, "secret is up to date, skipping write");
            return Ok(false);
        }
    }

    store.write(existing.as_ref(), desired).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::error::SecretsError;
    use crate::secrets::store::MemorySecretStore;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn desired(value: &str) -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("metal3-ironic-password".to_string()),
                namespace: Some("ns".to_string()),
                ..Default::default()
            },
            string_data: Some(BTreeMap::from([(
                "password".to_string(),
                value.to_string(),
            )])),
            ..Default::default()
        }
    }

    fn stored_password(store: &MemorySecretStore) -> Vec<u8> {
        store
            .secret("ns", "metal3-ironic-password")
            .and_then(|s| s.data)
            .map(|d| d["password"].0.clone())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_absent_secret_is_created_without_consulting_predicate() {
        let store = MemorySecretStore::new();
        let changed = apply_secret(&store, &desired("one"), |_| {
            panic!("predicate must not run for a missing secret")
        })
        .await
        .unwrap();

        assert!(changed);
        assert_eq!(stored_password(&store), b"one");
    }

    #[tokio::test]
    async fn test_present_secret_left_alone_when_predicate_declines() {
        let store = MemorySecretStore::new();
        apply_secret(&store, &desired("one"), do_not_update).await.unwrap();

        let changed = apply_secret(&store, &desired("two"), do_not_update)
            .await
            .unwrap();

        assert!(!changed);
        assert_eq!(stored_password(&store), b"one");
        assert_eq!(store.write_count("ns", "metal3-ironic-password"), 1);
    }

    #[tokio::test]
    async fn test_present_secret_overwritten_when_predicate_agrees() {
        let store = MemorySecretStore::new();
        apply_secret(&store, &desired("one"), always_update).await.unwrap();

        let changed = apply_secret(&store, &desired("two"), always_update)
            .await
            .unwrap();

        assert!(changed);
        assert_eq!(stored_password(&store), b"two");
    }

    #[tokio::test]
    async fn test_predicate_error_propagates_without_write() {
        let store = MemorySecretStore::new();
        apply_secret(&store, &desired("one"), always_update).await.unwrap();

        let err = apply_secret(&store, &desired("two"), |_| {
            Err(SecretsError::Certificate("unreadable".to_string()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, SecretsError::Certificate(_)));
        assert_eq!(store.write_count("ns", "metal3-ironic-password"), 1);
    }

    /// Records what `apply_secret` asks of the store
    #[derive(Default)]
    struct RecordingStore {
        stored: Option<Secret>,
        reads: std::sync::atomic::AtomicUsize,
        written_over: std::sync::Mutex<Vec<Option<String>>>,
    }

    #[async_trait::async_trait]
    impl SecretStore for RecordingStore {
        async fn get(&self, namespace: &str, name: &str) -> Result<Secret> {
            self.reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.stored
                .clone()
                .ok_or_else(|| SecretsError::not_found(namespace, name))
        }

        async fn write(&self, existing: Option<&Secret>, _secret: &Secret) -> Result<bool> {
            self.written_over
                .lock()
                .unwrap()
                .push(existing.and_then(|s| s.metadata.resource_version.clone()));
            Ok(true)
        }

        async fn delete(&self, _namespace: &str, _name: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stored_secret_is_read_once_and_passed_to_write() {
        let mut stored = desired("one");
        stored.metadata.resource_version = Some("42".to_string());
        let store = RecordingStore {
            stored: Some(stored),
            ..Default::default()
        };

        assert!(apply_secret(&store, &desired("two"), always_update).await.unwrap());

        assert_eq!(store.reads.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(*store.written_over.lock().unwrap(), vec![Some("42".to_string())]);
    }

    #[tokio::test]
    async fn test_absent_secret_is_written_as_new() {
        let store = RecordingStore::default();

        assert!(apply_secret(&store, &desired("one"), do_not_update).await.unwrap());

        assert_eq!(store.reads.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(*store.written_over.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_read_failure_is_hard_error() {
        let store = MemorySecretStore::new();
        store.fail_reads_of("metal3-ironic-password");

        let err = apply_secret(&store, &desired("one"), always_update)
            .await
            .unwrap_err();

        assert!(matches!(err, SecretsError::Store { operation: "get", .. }));
        assert_eq!(store.write_count("ns", "metal3-ironic-password"), 0);
    }
}
