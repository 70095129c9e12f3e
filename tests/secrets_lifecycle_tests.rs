//! # Secret Lifecycle Integration Tests
//!
//! Drives ensure and delete against the in-memory store:
//! - credentials are minted once and never rewritten
//! - the pull secret mirror is double encoded and only signals real changes
//! - ensure stops at the first failing step
//! - delete attempts every managed name and reports every failure

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use base64::{prelude::BASE64_STANDARD, Engine as _};
use common::*;
use provisioning_secrets::constants::*;
use provisioning_secrets::secrets::credentials::rewrite_dialect_tag;
use provisioning_secrets::secrets::{MemorySecretStore, SecretsError};

fn ready_store() -> Arc<MemorySecretStore> {
    let store = Arc::new(MemorySecretStore::new());
    seed_pull_secret(&store, DOCKER_CONFIG);
    store
}

#[tokio::test]
async fn test_ensure_creates_all_four_secrets() {
    let store = ready_store();
    let changed = secrets(&store).ensure_all().await.unwrap();

    assert!(!changed, "ensure always reports false");
    for name in [IRONIC_SECRET_NAME, INSPECTOR_SECRET_NAME, TLS_SECRET_NAME, PULL_SECRET_NAME] {
        let secret = store
            .secret(NAMESPACE, name)
            .unwrap_or_else(|| panic!("{name} should exist"));
        let owners = secret.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].uid, OWNER_UID);
        assert_eq!(owners[0].controller, Some(true));
    }
}

#[tokio::test]
async fn test_service_credentials_content() {
    let store = ready_store();
    secrets(&store).ensure_all().await.unwrap();

    let cases = [
        (IRONIC_SECRET_NAME, IRONIC_USERNAME, "[ironic]"),
        (INSPECTOR_SECRET_NAME, INSPECTOR_USERNAME, "[inspector]"),
    ];
    for (name, username, section) in cases {
        let user = String::from_utf8(stored(&store, NAMESPACE, name, USERNAME_KEY)).unwrap();
        let password = String::from_utf8(stored(&store, NAMESPACE, name, PASSWORD_KEY)).unwrap();
        let htpasswd = String::from_utf8(stored(&store, NAMESPACE, name, HTPASSWD_KEY)).unwrap();
        let config = String::from_utf8(stored(&store, NAMESPACE, name, AUTH_CONFIG_KEY)).unwrap();

        assert_eq!(user, username);
        assert_eq!(password.len(), PASSWORD_LENGTH);
        assert!(password.bytes().all(|b| b.is_ascii_alphanumeric()));

        let hash = htpasswd
            .strip_prefix(&format!("{username}:"))
            .expect("htpasswd line starts with the username");
        assert!(hash.starts_with("$2y$05$"), "unexpected hash format: {hash}");
        assert!(bcrypt::verify(&password, &rewrite_dialect_tag(hash, "2a")).unwrap());

        assert!(config.starts_with(section));
        assert!(config.contains(&format!("username = {username}")));
        assert!(config.contains(&format!("password = {password}")));
    }
}

#[tokio::test]
async fn test_ensure_twice_leaves_credentials_untouched() {
    let store = ready_store();
    let secrets = secrets(&store);

    secrets.ensure_all().await.unwrap();
    let first = store.secret(NAMESPACE, IRONIC_SECRET_NAME).unwrap();

    secrets.ensure_all().await.unwrap();
    let second = store.secret(NAMESPACE, IRONIC_SECRET_NAME).unwrap();

    assert_eq!(first.data, second.data);
    assert_eq!(first.metadata.resource_version, second.metadata.resource_version);
    assert_eq!(store.write_count(NAMESPACE, IRONIC_SECRET_NAME), 1);
    assert_eq!(store.write_count(NAMESPACE, INSPECTOR_SECRET_NAME), 1);
    assert_eq!(store.write_count(NAMESPACE, TLS_SECRET_NAME), 1);
}

#[tokio::test]
async fn test_pull_secret_is_double_encoded_on_the_wire() {
    let store = ready_store();
    secrets(&store).ensure_all().await.unwrap();

    let mirrored = store.secret(NAMESPACE, PULL_SECRET_NAME).unwrap();
    assert_eq!(mirrored.type_.as_deref(), Some("Opaque"));

    let wire = serde_json::to_value(&mirrored).unwrap();
    let encoded = wire["data"][DOCKER_CONFIG_JSON_KEY].as_str().unwrap();
    let once = BASE64_STANDARD.decode(encoded).unwrap();
    let twice = BASE64_STANDARD.decode(once).unwrap();
    assert_eq!(twice, DOCKER_CONFIG);
}

#[tokio::test]
async fn test_pull_secret_hook_fires_only_on_change() {
    let store = ready_store();
    let (hook, calls) = counting_hook();
    let secrets = secrets(&store).with_pull_secret_change_hook(hook);

    secrets.ensure_all().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    secrets.ensure_all().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1, "unchanged mirror must not fire the hook");

    seed_pull_secret(&store, br#"{"auths":{}}"#);
    secrets.ensure_all().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_missing_pull_secret_source_is_reported() {
    let store = Arc::new(MemorySecretStore::new());
    let (hook, calls) = counting_hook();

    let err = secrets(&store)
        .with_pull_secret_change_hook(hook)
        .ensure_all()
        .await
        .unwrap_err();

    assert!(err.is_missing_source());
    assert!(err.to_string().starts_with("failed to create Registry pull secret"));
    assert!(store.secret(NAMESPACE, PULL_SECRET_NAME).is_none());
    assert_eq!(store.write_count(NAMESPACE, PULL_SECRET_NAME), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Earlier steps still ran
    assert!(store.secret(NAMESPACE, TLS_SECRET_NAME).is_some());
}

#[tokio::test]
async fn test_pull_secret_source_without_key_is_reported() {
    let store = Arc::new(MemorySecretStore::new());
    store.insert(secret(
        PULL_SECRET_SOURCE_NAMESPACE,
        PULL_SECRET_NAME,
        &[("config.json", b"{}")],
    ));

    let err = secrets(&store).mirror_pull_secret().await.unwrap_err();
    match err {
        SecretsError::MissingSource { key, .. } => {
            assert_eq!(key.as_deref(), Some(DOCKER_CONFIG_JSON_KEY));
        }
        other => panic!("expected MissingSource, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ensure_stops_at_first_failure() {
    let store = ready_store();
    store.fail_writes_of(INSPECTOR_SECRET_NAME);

    let err = secrets(&store).ensure_all().await.unwrap_err();

    assert!(matches!(err, SecretsError::Step { step: "failed to create Inspector password", .. }));
    assert!(store.secret(NAMESPACE, IRONIC_SECRET_NAME).is_some());
    assert!(store.secret(NAMESPACE, TLS_SECRET_NAME).is_none());
    assert!(store.secret(NAMESPACE, PULL_SECRET_NAME).is_none());
}

#[tokio::test]
async fn test_owner_without_uid_fails_the_first_step() {
    let store = ready_store();
    let mut owner = (*provisioning()).clone();
    owner.metadata.uid = None;

    let secrets = provisioning_secrets::secrets::ProvisioningSecrets::new(
        Arc::clone(&store) as Arc<dyn provisioning_secrets::secrets::SecretStore>,
        Arc::new(provisioning_secrets::secrets::SelfSignedCertificateProvider::default()),
        Arc::new(owner),
        NAMESPACE,
    );
    let err = secrets.ensure_all().await.unwrap_err();

    assert!(err.to_string().starts_with("failed to create Ironic password"));
    assert!(store.secret(NAMESPACE, IRONIC_SECRET_NAME).is_none());
}

#[tokio::test]
async fn test_delete_removes_every_managed_secret() {
    let store = ready_store();
    let secrets = secrets(&store);
    secrets.ensure_all().await.unwrap();
    store.insert(secret(NAMESPACE, IRONIC_RPC_SECRET_NAME, &[("password", b"legacy")]));
    store.insert(secret(NAMESPACE, MARIADB_SECRET_NAME, &[("password", b"legacy")]));

    secrets.delete_all().await.unwrap();

    for name in ALL_MANAGED_SECRET_NAMES {
        assert!(store.secret(NAMESPACE, name).is_none(), "{name} should be gone");
    }
    // The mirror source lives elsewhere and is never touched
    assert!(store.secret(PULL_SECRET_SOURCE_NAMESPACE, PULL_SECRET_NAME).is_some());
}

#[tokio::test]
async fn test_delete_of_absent_secrets_succeeds() {
    let store = Arc::new(MemorySecretStore::new());
    secrets(&store).delete_all().await.unwrap();
    assert_eq!(store.delete_attempts().len(), ALL_MANAGED_SECRET_NAMES.len());
}

#[tokio::test]
async fn test_delete_attempts_all_and_aggregates_failures() {
    let store = ready_store();
    let secrets = secrets(&store);
    secrets.ensure_all().await.unwrap();
    store.fail_deletes_of(INSPECTOR_SECRET_NAME);
    store.fail_deletes_of(TLS_SECRET_NAME);

    let err = secrets.delete_all().await.unwrap_err();

    let attempted: Vec<String> = store
        .delete_attempts()
        .into_iter()
        .map(|(_, name)| name)
        .collect();
    assert_eq!(attempted, ALL_MANAGED_SECRET_NAMES.map(str::to_string).to_vec());

    match &err {
        SecretsError::Aggregate(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected Aggregate, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains(INSPECTOR_SECRET_NAME));
    assert!(message.contains(TLS_SECRET_NAME));

    assert!(store.secret(NAMESPACE, IRONIC_SECRET_NAME).is_none());
    assert!(store.secret(NAMESPACE, PULL_SECRET_NAME).is_none());
    assert!(store.secret(NAMESPACE, TLS_SECRET_NAME).is_some());
}
