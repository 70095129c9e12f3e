//! # TLS Rotation Metric Tests
//!
//! Kept in its own test binary: the rotation counter is process-wide, so no
//! other test may rotate certificates concurrently.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use provisioning_secrets::constants::*;
use provisioning_secrets::observability::metrics;
use provisioning_secrets::secrets::tls::issue_certificate;
use provisioning_secrets::secrets::MemorySecretStore;
use time::OffsetDateTime;

fn store_with_expiring_certificate() -> Arc<MemorySecretStore> {
    let now = OffsetDateTime::now_utc();
    let expiring = issue_certificate(
        &[PROVISIONING_IP],
        now - Duration::from_secs(86_400),
        now + Duration::from_secs(5 * 86_400),
    )
    .unwrap();

    let store = Arc::new(MemorySecretStore::new());
    store.insert(secret(
        NAMESPACE,
        TLS_SECRET_NAME,
        &[
            (TLS_CERT_KEY, expiring.certificate_pem.as_slice()),
            (TLS_PRIVATE_KEY_KEY, expiring.private_key_pem.as_slice()),
        ],
    ));
    store
}

#[tokio::test]
async fn test_rotation_counted_only_after_successful_write() {
    // Write rejected: nothing rotated
    let failing = store_with_expiring_certificate();
    failing.fail_writes_of(TLS_SECRET_NAME);
    let before = metrics::tls_rotations_total();
    secrets(&failing)
        .reconcile_tls_secret(Some(PROVISIONING_IP))
        .await
        .unwrap_err();
    assert_eq!(metrics::tls_rotations_total(), before);

    // First issuance is a creation, not a rotation
    let empty = Arc::new(MemorySecretStore::new());
    secrets(&empty)
        .reconcile_tls_secret(Some(PROVISIONING_IP))
        .await
        .unwrap();
    assert_eq!(metrics::tls_rotations_total(), before);

    // Written replacement of an expiring certificate
    let expiring = store_with_expiring_certificate();
    secrets(&expiring)
        .reconcile_tls_secret(Some(PROVISIONING_IP))
        .await
        .unwrap();
    assert_eq!(metrics::tls_rotations_total(), before + 1);
}
