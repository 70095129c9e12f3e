//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

use anyhow::{bail, Result};

use crate::constants::MAX_TLS_VALIDITY_DAYS;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace the managed secrets are written to
    pub target_namespace: String,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
    /// Port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Reconciliation error requeue interval (seconds)
    pub reconciliation_error_requeue_secs: u64,
    /// Requeue interval after a successful pass (seconds)
    /// Periodic passes are what eventually rotate the TLS certificate
    pub reconcile_interval_secs: u64,
    /// Certificates expiring within this many days are regenerated
    pub tls_rotation_window_days: u64,
    /// Validity of generated certificates (days)
    pub tls_validity_days: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            target_namespace: DEFAULT_TARGET_NAMESPACE.to_string(),
            log_level: "INFO".to_string(),
            log_format: "json".to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
            reconciliation_error_requeue_secs: DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            tls_rotation_window_days: DEFAULT_TLS_ROTATION_WINDOW_DAYS,
            tls_validity_days: DEFAULT_TLS_VALIDITY_DAYS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            target_namespace: env_var_or_default_str("POD_NAMESPACE", DEFAULT_TARGET_NAMESPACE),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            reconciliation_error_requeue_secs: env_var_or_default(
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            ),
            reconcile_interval_secs: env_var_or_default(
                "RECONCILE_INTERVAL_SECS",
                DEFAULT_RECONCILE_INTERVAL_SECS,
            ),
            tls_rotation_window_days: env_var_or_default(
                "TLS_ROTATION_WINDOW_DAYS",
                DEFAULT_TLS_ROTATION_WINDOW_DAYS,
            ),
            tls_validity_days: env_var_or_default("TLS_VALIDITY_DAYS", DEFAULT_TLS_VALIDITY_DAYS),
        }
    }

    /// Reject settings the controller cannot run with
    ///
    /// The rotation window must be shorter than the certificate validity,
    /// otherwise every freshly issued certificate is already due for rotation.
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub fn validate(&self) -> Result<()> {
        if self.tls_validity_days == 0 || self.tls_validity_days > MAX_TLS_VALIDITY_DAYS {
            bail!(
                "TLS_VALIDITY_DAYS must be between 1 and {MAX_TLS_VALIDITY_DAYS}, got {}",
                self.tls_validity_days
            );
        }
        if self.tls_rotation_window_days >= self.tls_validity_days {
            bail!(
                "TLS_ROTATION_WINDOW_DAYS ({}) must be shorter than TLS_VALIDITY_DAYS ({})",
                self.tls_rotation_window_days,
                self.tls_validity_days
            );
        }
        Ok(())
    }

    /// Get reconciliation error requeue duration
    #[must_use]
    pub fn reconciliation_error_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.reconciliation_error_requeue_secs)
    }

    /// Get requeue duration after a successful pass
    #[must_use]
    pub fn reconcile_interval_duration(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    #[must_use]
    pub fn tls_rotation_window(&self) -> Duration {
        days(self.tls_rotation_window_days)
    }

    #[must_use]
    pub fn tls_validity(&self) -> Duration {
        days(self.tls_validity_days)
    }
}

/// Saturates at `Duration::MAX` instead of wrapping
fn days(count: u64) -> Duration {
    count
        .checked_mul(SECONDS_PER_DAY)
        .map_or(Duration::MAX, Duration::from_secs)
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
