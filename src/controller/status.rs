//! # Status
//!
//! Maintains the `SecretsReady` condition on the `Provisioning` status.

use chrono::{DateTime, Utc};
use kube::api::{Patch, PatchParams};
use kube::{Api, ResourceExt};
use tracing::{debug, warn};

use crate::crd::{Condition, Provisioning, ProvisioningStatus};

pub const SECRETS_READY_CONDITION: &str = "SecretsReady";

const FIELD_MANAGER: &str = "provisioning-secrets-controller";

/// Status with the `SecretsReady` condition set from the last pass
///
/// `failure` carries the error message of a failed pass. The transition
/// time only moves when the condition status flips.
#[must_use]
pub fn secrets_ready_status(
    current: Option<&ProvisioningStatus>,
    generation: Option<i64>,
    failure: Option<&str>,
    now: DateTime<Utc>,
) -> ProvisioningStatus {
    let mut status = current.cloned().unwrap_or_default();
    status.observed_generation = generation;

    let (condition_status, reason, message) = match failure {
        None => ("True", "SecretsEnsured", "All managed secrets are present".to_string()),
        Some(message) => ("False", "EnsureFailed", message.to_string()),
    };

    let previous = status
        .conditions
        .iter()
        .position(|c| c.r#type == SECRETS_READY_CONDITION)
        .map(|i| status.conditions.remove(i));
    let last_transition_time = match previous {
        Some(previous) if previous.status == condition_status => previous.last_transition_time,
        _ => Some(now.to_rfc3339()),
    };

    status.conditions.push(Condition {
        r#type: SECRETS_READY_CONDITION.to_string(),
        status: condition_status.to_string(),
        last_transition_time,
        reason: Some(reason.to_string()),
        message: Some(message),
    });
    status
}

/// Patch the condition onto the resource
///
/// Failures are logged only; the secrets themselves are the outcome that
/// drives requeueing.
pub(super) async fn update_secrets_ready(
    api: &Api<Provisioning>,
    provisioning: &Provisioning,
    failure: Option<&str>,
) {
    let status = secrets_ready_status(
        provisioning.status.as_ref(),
        provisioning.metadata.generation,
        failure,
        Utc::now(),
    );
    if provisioning.status.as_ref() == Some(&status) {
        debug!("status unchanged, skipping patch");
        return;
    }

    let patch = serde_json::json!({ "status": status });
    let name = provisioning.name_any();
    match api
        .patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(patch))
        .await
    {
        Ok(_) => {}
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
            debug!(name, "Provisioning deleted before status could be updated");
        }
        Err(e) => warn!(name, error = %e, "failed to update Provisioning status"),
    }
}
