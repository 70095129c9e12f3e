//! # Kubernetes Secret Store
//!
//! [`SecretStore`] backed by the Kubernetes API.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client};
use tracing::debug;

use super::{plan_write, secret_key, SecretStore, WritePlan};
use crate::secrets::error::{Result, SecretsError};

#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

impl KubeSecretStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn map_kube_error(
    operation: &'static str,
    namespace: &str,
    name: &str,
    err: kube::Error,
) -> SecretsError {
    match err {
        kube::Error::Api(api_err) if api_err.code == 404 => SecretsError::not_found(namespace, name),
        other => SecretsError::store(operation, namespace, name, other),
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret> {
        self.api(namespace)
            .get(name)
            .await
            .map_err(|e| map_kube_error("get", namespace, name, e))
    }

    async fn write(&self, existing: Option<&Secret>, secret: &Secret) -> Result<bool> {
        let (namespace, name) = secret_key(secret)?;
        let api = self.api(namespace);

        match plan_write(existing, secret) {
            WritePlan::Unchanged => Ok(false),
            WritePlan::Create(required) => {
                api.create(&PostParams::default(), &required)
                    .await
                    .map_err(|e| map_kube_error("create", namespace, name, e))?;
                debug!(namespace, name, "created secret");
                Ok(true)
            }
            WritePlan::Replace(merged) => {
                // `merged` keeps the resourceVersion that was read, so a concurrent
                // writer makes this fail with a conflict instead of clobbering it
                api.replace(name, &PostParams::default(), &merged)
                    .await
                    .map_err(|e| map_kube_error("update", namespace, name, e))?;
                debug!(namespace, name, "updated secret");
                Ok(true)
            }
        }
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        self.api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| map_kube_error("delete", namespace, name, e))
    }
}
