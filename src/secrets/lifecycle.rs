//! # Secret Lifecycle
//!
//! Ensures the full set of managed secrets exists, and removes it on
//! teardown.
//!
//! ## Ensure
//!
//! Runs in a fixed order and stops at the first failure:
//! 1. Ironic service credentials
//! 2. Inspector service credentials
//! 3. Ironic TLS certificate
//! 4. Registry pull secret mirror
//!
//! ## Delete
//!
//! Attempts every managed name, legacy ones included. Missing secrets count
//! as deleted and every other failure is reported together.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::{prelude::BASE64_STANDARD, Engine as _};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use tracing::{debug, info, warn};

use crate::constants::{
    ALL_MANAGED_SECRET_NAMES, DOCKER_CONFIG_JSON_KEY, INSPECTOR_CONFIG_SECTION,
    INSPECTOR_SECRET_NAME, INSPECTOR_USERNAME, IRONIC_CONFIG_SECTION, IRONIC_SECRET_NAME,
    IRONIC_USERNAME, PULL_SECRET_NAME, PULL_SECRET_SOURCE_NAMESPACE, TLS_CERT_KEY,
    TLS_PRIVATE_KEY_KEY, TLS_SECRET_NAME,
};
use crate::crd::Provisioning;
use crate::observability::metrics;
use crate::secrets::apply::{always_update, apply_secret, do_not_update};
use crate::secrets::credentials::Credential;
use crate::secrets::error::{ErrorCollector, ErrorStrategy, Result, SecretsError};
use crate::secrets::owner::set_controller_reference;
use crate::secrets::store::SecretStore;
use crate::secrets::tls::CertificateProvider;

/// Called when the mirrored pull secret actually changed
pub type ChangeHook = Arc<dyn Fn() + Send + Sync>;

const OPAQUE_SECRET_TYPE: &str = "Opaque";

/// Secrets owned by one `Provisioning` resource in the target namespace
pub struct ProvisioningSecrets {
    store: Arc<dyn SecretStore>,
    certificates: Arc<dyn CertificateProvider>,
    owner: Arc<Provisioning>,
    namespace: String,
    on_pull_secret_change: ChangeHook,
}

impl std::fmt::Debug for ProvisioningSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningSecrets")
            .field("owner", &self.owner.metadata.name)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl ProvisioningSecrets {
    /// The pull secret change hook defaults to bumping the mirror metric
    #[must_use]
    pub fn new(
        store: Arc<dyn SecretStore>,
        certificates: Arc<dyn CertificateProvider>,
        owner: Arc<Provisioning>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            certificates,
            owner,
            namespace: namespace.into(),
            on_pull_secret_change: Arc::new(metrics::increment_pull_secret_mirrored),
        }
    }

    #[must_use]
    pub fn with_pull_secret_change_hook(mut self, hook: ChangeHook) -> Self {
        self.on_pull_secret_change = hook;
        self
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create every managed secret that is missing and rotate a stale TLS certificate
    ///
    /// Always reports `false`: the individual applies do not give a uniform
    /// changed signal across all four kinds.
    pub async fn ensure_all(&self) -> Result<bool> {
        let mut errors = ErrorCollector::new(ErrorStrategy::FailFast);

        errors.record(
            self.create_ironic_secret(IRONIC_SECRET_NAME, IRONIC_USERNAME, IRONIC_CONFIG_SECTION)
                .await
                .map_err(|e| e.in_step("failed to create Ironic password")),
        )?;
        errors.record(
            self.create_ironic_secret(
                INSPECTOR_SECRET_NAME,
                INSPECTOR_USERNAME,
                INSPECTOR_CONFIG_SECTION,
            )
            .await
            .map_err(|e| e.in_step("failed to create Inspector password")),
        )?;
        errors.record(
            self.reconcile_tls_secret(self.owner.spec.provisioning_ip())
                .await
                .map_err(|e| e.in_step("failed to create TLS certificate")),
        )?;
        errors.record(
            self.mirror_pull_secret()
                .await
                .map_err(|e| e.in_step("failed to create Registry pull secret")),
        )?;

        errors.finish()?;
        Ok(false)
    }

    /// Delete every managed secret, including legacy names
    pub async fn delete_all(&self) -> Result<()> {
        let mut errors = ErrorCollector::new(ErrorStrategy::CollectAll);

        for name in ALL_MANAGED_SECRET_NAMES {
            let result = match self.store.delete(&self.namespace, name).await {
                Ok(()) => {
                    info!(namespace = %self.namespace, name, "deleted secret");
                    metrics::increment_secrets_deleted();
                    Ok(())
                }
                Err(e) if e.is_not_found() => {
                    debug!(namespace = %self.namespace, name, "secret already absent");
                    Ok(())
                }
                Err(e) => {
                    warn!(namespace = %self.namespace, name, error = %e, "failed to delete secret");
                    Err(e)
                }
            };
            errors.record(result)?;
        }

        errors.finish()
    }

    /// Mint service credentials unless the secret already exists
    pub async fn create_ironic_secret(
        &self,
        name: &str,
        username: &str,
        config_section: &str,
    ) -> Result<()> {
        let credential = Credential::generate(username, config_section)?;

        let mut secret = self.managed_secret(name)?;
        secret.string_data = Some(credential.to_string_data());

        let changed = apply_secret(self.store.as_ref(), &secret, do_not_update).await?;
        if changed {
            info!(namespace = %self.namespace, name, username, "created service credentials");
            metrics::increment_secrets_applied(name);
        }
        Ok(())
    }

    /// Write a fresh certificate when the stored one is missing or close to expiry
    pub async fn reconcile_tls_secret(&self, provisioning_ip: Option<&str>) -> Result<()> {
        let material = self.certificates.generate(provisioning_ip)?;

        let mut secret = self.managed_secret(TLS_SECRET_NAME)?;
        secret.data = Some(BTreeMap::from([
            (TLS_CERT_KEY.to_string(), ByteString(material.certificate_pem)),
            (
                TLS_PRIVATE_KEY_KEY.to_string(),
                ByteString(material.private_key_pem),
            ),
        ]));

        let certificates = self.certificates.as_ref();
        let mut rotating = false;
        let changed = apply_secret(self.store.as_ref(), &secret, |existing| {
            rotating = tls_needs_rotation(certificates, existing)?;
            Ok(rotating)
        })
        .await?;

        if changed {
            if rotating {
                info!(name = TLS_SECRET_NAME, "rotated TLS certificate that was missing or near expiry");
                metrics::increment_tls_rotations();
            }
            info!(
                namespace = %self.namespace,
                name = TLS_SECRET_NAME,
                provisioning_ip = provisioning_ip.unwrap_or_default(),
                "wrote TLS certificate"
            );
            metrics::increment_secrets_applied(TLS_SECRET_NAME);
        }
        Ok(())
    }

    /// Copy the cluster pull secret into the target namespace
    ///
    /// The payload is base64 encoded once more before being stored, so the
    /// value on the wire is encoded twice. The consumer expects that form.
    pub async fn mirror_pull_secret(&self) -> Result<()> {
        let source = match self
            .store
            .get(PULL_SECRET_SOURCE_NAMESPACE, PULL_SECRET_NAME)
            .await
        {
            Ok(source) => source,
            Err(e) if e.is_not_found() => return Err(missing_source(None)),
            Err(e) => return Err(e),
        };

        let payload = source
            .data
            .as_ref()
            .and_then(|data| data.get(DOCKER_CONFIG_JSON_KEY))
            .ok_or_else(|| missing_source(Some(DOCKER_CONFIG_JSON_KEY)))?;

        let mut secret = self.managed_secret(PULL_SECRET_NAME)?;
        secret.type_ = Some(OPAQUE_SECRET_TYPE.to_string());
        secret.string_data = Some(BTreeMap::from([(
            DOCKER_CONFIG_JSON_KEY.to_string(),
            BASE64_STANDARD.encode(&payload.0),
        )]));

        let changed = apply_secret(self.store.as_ref(), &secret, always_update).await?;
        if changed {
            info!(namespace = %self.namespace, name = PULL_SECRET_NAME, "mirrored registry pull secret");
            metrics::increment_secrets_applied(PULL_SECRET_NAME);
            (self.on_pull_secret_change)();
        }
        Ok(())
    }

    /// Empty secret in the target namespace, controlled by the owner
    fn managed_secret(&self, name: &str) -> Result<Secret> {
        let mut secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            ..Default::default()
        };
        set_controller_reference(&mut secret, self.owner.as_ref())?;
        Ok(secret)
    }
}

/// A stored TLS secret without a certificate is treated like a missing one
fn tls_needs_rotation(certificates: &dyn CertificateProvider, existing: &Secret) -> Result<bool> {
    match existing
        .data
        .as_ref()
        .and_then(|data| data.get(TLS_CERT_KEY))
        .filter(|cert| !cert.0.is_empty())
    {
        Some(cert) => certificates.is_expiring_soon(&cert.0),
        None => Ok(true),
    }
}

fn missing_source(key: Option<&str>) -> SecretsError {
    SecretsError::MissingSource {
        namespace: PULL_SECRET_SOURCE_NAMESPACE.to_string(),
        name: PULL_SECRET_NAME.to_string(),
        key: key.map(str::to_string),
    }
}
