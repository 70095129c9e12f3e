//! Shared fixtures for the integration tests.

#![allow(dead_code, reason = "Not every test binary uses every fixture")]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use provisioning_secrets::constants::{
    DOCKER_CONFIG_JSON_KEY, PULL_SECRET_NAME, PULL_SECRET_SOURCE_NAMESPACE,
};
use provisioning_secrets::crd::{Provisioning, ProvisioningSpec};
use provisioning_secrets::secrets::{
    ChangeHook, MemorySecretStore, ProvisioningSecrets, SecretStore, SelfSignedCertificateProvider,
};

pub const NAMESPACE: &str = "openshift-machine-api";
pub const PROVISIONING_IP: &str = "172.22.0.3";
pub const OWNER_UID: &str = "0b7e6c1e-5d2c-4a43-9f57-1c2d8f1b7a10";
pub const DOCKER_CONFIG: &[u8] = br#"{"auths":{"quay.io":{"auth":"dXNlcjpwYXNz","email":""}}}"#;

pub fn provisioning() -> Arc<Provisioning> {
    let mut p = Provisioning::new(
        "provisioning-configuration",
        ProvisioningSpec {
            provisioning_ip: Some(PROVISIONING_IP.to_string()),
            ..Default::default()
        },
    );
    p.metadata.uid = Some(OWNER_UID.to_string());
    Arc::new(p)
}

pub fn secret(namespace: &str, name: &str, data: &[(&str, &[u8])]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.to_vec())))
                .collect::<BTreeMap<_, _>>(),
        ),
        type_: Some("kubernetes.io/dockerconfigjson".to_string()),
        ..Default::default()
    }
}

/// Seed the cluster-wide pull secret the mirror copies from
pub fn seed_pull_secret(store: &MemorySecretStore, payload: &[u8]) {
    store.insert(secret(
        PULL_SECRET_SOURCE_NAMESPACE,
        PULL_SECRET_NAME,
        &[(DOCKER_CONFIG_JSON_KEY, payload)],
    ));
}

/// Change hook that counts how often it fired
pub fn counting_hook() -> (ChangeHook, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let hook: ChangeHook = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (hook, calls)
}

pub fn secrets(store: &Arc<MemorySecretStore>) -> ProvisioningSecrets {
    ProvisioningSecrets::new(
        Arc::clone(store) as Arc<dyn SecretStore>,
        Arc::new(SelfSignedCertificateProvider::default()),
        provisioning(),
        NAMESPACE,
    )
}

/// Value stored under `key` in `namespace/name`, empty when absent
pub fn stored(store: &MemorySecretStore, namespace: &str, name: &str, key: &str) -> Vec<u8> {
    store
        .secret(namespace, name)
        .and_then(|s| s.data)
        .and_then(|data| data.get(key).map(|v| v.0.clone()))
        .unwrap_or_default()
}
