//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! Secret names and keys are part of the contract with the provisioning
//! backend and must not change. Timing values are defaults that can be
//! overridden through [`crate::config::ControllerConfig`].

/// Default namespace the managed secrets live in
pub const DEFAULT_TARGET_NAMESPACE: &str = "openshift-machine-api";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default requeue interval for reconciliation errors (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default requeue interval after a successful pass (seconds)
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 600;

/// Certificates expiring within this many days are regenerated
pub const DEFAULT_TLS_ROTATION_WINDOW_DAYS: u64 = 30;

/// Validity of freshly generated certificates, roughly two years
pub const DEFAULT_TLS_VALIDITY_DAYS: u64 = 365 * 2;

/// Upper bound accepted for `TLS_VALIDITY_DAYS`, ten years
pub const MAX_TLS_VALIDITY_DAYS: u64 = 365 * 10;

/// Finalizer placed on the `Provisioning` resource so teardown runs before it disappears
pub const PROVISIONING_FINALIZER: &str = "provisioning.metal3.io/secrets";

// Service-auth secrets

pub const IRONIC_SECRET_NAME: &str = "metal3-ironic-password";
pub const IRONIC_USERNAME: &str = "ironic-user";
pub const IRONIC_CONFIG_SECTION: &str = "ironic";

pub const INSPECTOR_SECRET_NAME: &str = "metal3-ironic-inspector-password";
pub const INSPECTOR_USERNAME: &str = "inspector-user";
pub const INSPECTOR_CONFIG_SECTION: &str = "inspector";

pub const USERNAME_KEY: &str = "username";
pub const PASSWORD_KEY: &str = "password";
pub const HTPASSWD_KEY: &str = "htpasswd";
pub const AUTH_CONFIG_KEY: &str = "auth-config";

// TLS secret

pub const TLS_SECRET_NAME: &str = "metal3-ironic-tls";
pub const TLS_CERT_KEY: &str = "tls.crt";
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

// Registry pull secret mirror

/// Namespace holding the cluster-wide pull secret
pub const PULL_SECRET_SOURCE_NAMESPACE: &str = "openshift-config";
/// Name of the pull secret, both at the source and in the target namespace
pub const PULL_SECRET_NAME: &str = "pull-secret";
pub const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";

// Legacy secrets, only kept so teardown still removes them

pub const IRONIC_RPC_SECRET_NAME: &str = "metal3-ironic-rpc-password";
pub const MARIADB_SECRET_NAME: &str = "metal3-mariadb-password";

/// Every name removed on teardown, in deletion order
pub const ALL_MANAGED_SECRET_NAMES: [&str; 6] = [
    MARIADB_SECRET_NAME,
    IRONIC_SECRET_NAME,
    INSPECTOR_SECRET_NAME,
    IRONIC_RPC_SECRET_NAME,
    TLS_SECRET_NAME,
    PULL_SECRET_NAME,
];

// Credential generation

/// Length of generated service passwords
pub const PASSWORD_LENGTH: usize = 16;

/// Alphabet for generated passwords. ASCII only, see `hash_password`.
pub const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// bcrypt cost used by `htpasswd -B` when no cost is given
pub const HTPASSWD_BCRYPT_COST: u32 = 5;
