//! # Controller
//!
//! Kubernetes controller driving the managed secrets from the `Provisioning`
//! resource.
//!
//! ## Module Structure
//!
//! - `reconcile` - finalizer routing to ensure and delete
//! - `status` - `SecretsReady` condition on the `Provisioning` status
//! - `error_policy` - requeue on reconciliation errors
//! - `watch_loop` - the `kube-runtime` controller loop

mod error_policy;
mod reconcile;
mod status;
mod watch_loop;

pub use error_policy::handle_reconciliation_error;
pub use reconcile::reconcile;
pub use status::{secrets_ready_status, SECRETS_READY_CONDITION};
pub use watch_loop::run_watch_loop;

use std::sync::Arc;

use kube::Client;
use thiserror::Error;

use crate::config::ControllerConfig;
use crate::crd::Provisioning;
use crate::secrets::{
    CertificateProvider, KubeSecretStore, ProvisioningSecrets, SecretStore, SecretsError,
    SelfSignedCertificateProvider,
};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Secret reconciliation failed: {0}")]
    Secrets(#[from] SecretsError),
    #[error("Finalizer error: {0}")]
    Finalizer(#[source] Box<kube_runtime::finalizer::Error<ControllerError>>),
}

/// Shared state handed to every reconciliation
pub struct Context {
    pub client: Client,
    pub config: ControllerConfig,
    pub store: Arc<dyn SecretStore>,
    pub certificates: Arc<dyn CertificateProvider>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Cluster-backed store and the self-signed certificate provider
    #[must_use]
    pub fn new(client: Client, config: ControllerConfig) -> Self {
        Self {
            store: Arc::new(KubeSecretStore::new(client.clone())),
            certificates: Arc::new(SelfSignedCertificateProvider::from_config(&config)),
            client,
            config,
        }
    }

    /// Managed secrets owned by `provisioning` in the configured namespace
    #[must_use]
    pub fn secrets_for(&self, provisioning: Arc<Provisioning>) -> ProvisioningSecrets {
        ProvisioningSecrets::new(
            Arc::clone(&self.store),
            Arc::clone(&self.certificates),
            provisioning,
            self.config.target_namespace.clone(),
        )
    }
}
