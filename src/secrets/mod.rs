//! # Managed Secrets
//!
//! Idempotent reconciliation of the secrets the provisioning backend needs.
//!
//! - `credentials`: random passwords and htpasswd-compatible hashes
//! - `tls`: certificate provider contract and rotation check
//! - `store`: persistence seam, Kubernetes and in-memory implementations
//! - `owner`: controller owner references
//! - `apply`: create-or-update driven by a per-kind predicate
//! - `lifecycle`: ensure and delete the full set
//! - `error`: error taxonomy and aggregation strategies

pub mod apply;
pub mod credentials;
pub mod error;
pub mod lifecycle;
pub mod owner;
pub mod store;
pub mod tls;

pub use apply::{always_update, apply_secret, do_not_update};
pub use credentials::{generate_password, hash_password, Credential};
pub use error::{ErrorCollector, ErrorStrategy, SecretsError};
pub use lifecycle::{ChangeHook, ProvisioningSecrets};
pub use owner::set_controller_reference;
pub use store::{KubeSecretStore, MemorySecretStore, SecretStore};
pub use tls::{CertificateMaterial, CertificateProvider, SelfSignedCertificateProvider};
