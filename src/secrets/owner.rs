//! # Ownership
//!
//! Controller owner references on managed secrets, so deleting the
//! `Provisioning` resource lets the garbage collector remove them too.

use k8s_openapi::api::core::v1::Secret;
use kube::Resource;

use crate::secrets::error::{Result, SecretsError};

/// Stamp `owner` as the controlling owner of `secret`
///
/// Fails when the owner has not been persisted yet (no uid) or when another
/// object already controls the secret.
pub fn set_controller_reference<K>(secret: &mut Secret, owner: &K) -> Result<()>
where
    K: Resource<DynamicType = ()>,
{
    let secret_name = secret.metadata.name.clone().unwrap_or_default();
    let owner_ref = owner
        .controller_owner_ref(&())
        .ok_or_else(|| SecretsError::OwnerReference {
            name: secret_name.clone(),
            reason: "owner has no name or uid".to_string(),
        })?;

    let refs = secret.metadata.owner_references.get_or_insert_with(Vec::new);
    if let Some(other) = refs
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner_ref.uid)
    {
        return Err(SecretsError::OwnerReference {
            name: secret_name,
            reason: format!("already controlled by {} {}", other.kind, other.name),
        });
    }

    refs.retain(|r| r.uid != owner_ref.uid);
    refs.push(owner_ref);
    Ok(())
}
