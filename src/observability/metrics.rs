//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `provisioning_secrets_reconciliations_total` - Total number of reconciliations
//! - `provisioning_secrets_reconciliation_errors_total` - Total number of reconciliation errors
//! - `provisioning_secrets_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `provisioning_secrets_applied_total` - Writes that changed a managed secret, by secret name
//! - `provisioning_secrets_deleted_total` - Managed secrets removed on teardown
//! - `provisioning_secrets_tls_rotations_total` - TLS certificates replaced because of expiry
//! - `provisioning_secrets_pull_secret_mirrored_total` - Changes written to the pull secret mirror

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "provisioning_secrets_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "provisioning_secrets_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "provisioning_secrets_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static SECRETS_APPLIED_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "provisioning_secrets_applied_total",
            "Total number of writes that changed a managed secret",
        ),
        &["secret"],
    )
    .expect("Failed to create SECRETS_APPLIED_TOTAL metric - this should never happen")
});

static SECRETS_DELETED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "provisioning_secrets_deleted_total",
        "Total number of managed secrets deleted on teardown",
    )
    .expect("Failed to create SECRETS_DELETED_TOTAL metric - this should never happen")
});

static TLS_ROTATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "provisioning_secrets_tls_rotations_total",
        "Total number of TLS certificates rotated because they were missing or near expiry",
    )
    .expect("Failed to create TLS_ROTATIONS_TOTAL metric - this should never happen")
});

static PULL_SECRET_MIRRORED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "provisioning_secrets_pull_secret_mirrored_total",
        "Total number of changes written to the mirrored registry pull secret",
    )
    .expect("Failed to create PULL_SECRET_MIRRORED_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SECRETS_APPLIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SECRETS_DELETED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TLS_ROTATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PULL_SECRET_MIRRORED_TOTAL.clone()))?;

    Ok(())
}

/// Gather every registered metric family
pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_secrets_applied(secret: &str) {
    SECRETS_APPLIED_TOTAL.with_label_values(&[secret]).inc();
}

pub fn increment_secrets_deleted() {
    SECRETS_DELETED_TOTAL.inc();
}

pub fn increment_tls_rotations() {
    TLS_ROTATIONS_TOTAL.inc();
}

/// Current value of the TLS rotation counter
#[must_use]
pub fn tls_rotations_total() -> u64 {
    TLS_ROTATIONS_TOTAL.get()
}

/// Default change hook for the pull secret mirror
pub fn increment_pull_secret_mirrored() {
    PULL_SECRET_MIRRORED_TOTAL.inc();
}
