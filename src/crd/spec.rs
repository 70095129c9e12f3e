//! # Provisioning Spec
//!
//! Specification of the `Provisioning` custom resource.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::status::ProvisioningStatus;

/// Provisioning Custom Resource Definition
///
/// Cluster-scoped configuration for the bare-metal provisioning backend.
/// Every secret this controller manages carries a controller owner
/// reference pointing at this object.
///
/// # Example
///
/// ```yaml
/// apiVersion: metal3.io/v1alpha1
/// kind: Provisioning
/// metadata:
///   name: provisioning-configuration
/// spec:
///   provisioningNetwork: Managed
///   provisioningInterface: enp1s0
///   provisioningIP: 172.22.0.3
///   provisioningNetworkCIDR: 172.22.0.0/24
///   provisioningDHCPRange: 172.22.0.10,172.22.0.254
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    kind = "Provisioning",
    group = "metal3.io",
    version = "v1alpha1",
    status = "ProvisioningStatus",
    printcolumn = r#"{"name":"Network", "type":"string", "jsonPath":".spec.provisioningNetwork"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProvisioningSpec {
    /// Interface on the control plane nodes connected to the provisioning network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_interface: Option<String>,
    /// IP the provisioning services listen on
    /// The Ironic TLS certificate is issued for this address
    #[serde(rename = "provisioningIP", default, skip_serializing_if = "Option::is_none")]
    pub provisioning_ip: Option<String>,
    #[serde(rename = "provisioningNetworkCIDR", default, skip_serializing_if = "Option::is_none")]
    pub provisioning_network_cidr: Option<String>,
    /// Comma separated start and end address handed out by DHCP
    #[serde(rename = "provisioningDHCPRange", default, skip_serializing_if = "Option::is_none")]
    pub provisioning_dhcp_range: Option<String>,
    #[serde(rename = "provisioningOSDownloadURL", default, skip_serializing_if = "Option::is_none")]
    pub provisioning_os_download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_network: Option<ProvisioningNetwork>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provisioning_mac_addresses: Vec<String>,
    /// Whether the provisioning services watch hosts in every namespace
    #[serde(default)]
    pub watch_all_namespaces: bool,
    #[serde(
        rename = "preProvisioningOSDownloadURLs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub pre_provisioning_os_download_urls: Option<PreProvisioningOSDownloadURLs>,
}

/// How the provisioning network is managed
#[derive(Debug, Clone, Copy, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ProvisioningNetwork {
    Managed,
    Unmanaged,
    Disabled,
}

/// Images used before a host is provisioned
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms, reason = "Mirrors the API field names")]
pub struct PreProvisioningOSDownloadURLs {
    #[serde(rename = "isoURL", default, skip_serializing_if = "Option::is_none")]
    pub iso_url: Option<String>,
    #[serde(rename = "kernelURL", default, skip_serializing_if = "Option::is_none")]
    pub kernel_url: Option<String>,
    #[serde(rename = "initramfsURL", default, skip_serializing_if = "Option::is_none")]
    pub initramfs_url: Option<String>,
    #[serde(rename = "rootfsURL", default, skip_serializing_if = "Option::is_none")]
    pub rootfs_url: Option<String>,
}

impl ProvisioningSpec {
    /// Provisioning IP, treating an empty string as unset
    #[must_use]
    pub fn provisioning_ip(&self) -> Option<&str> {
        self.provisioning_ip
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_deserializes_api_field_names() {
        let spec: ProvisioningSpec = serde_json::from_value(serde_json::json!({
            "provisioningNetwork": "Managed",
            "provisioningIP": "172.22.0.3",
            "provisioningNetworkCIDR": "172.22.0.0/24",
            "provisioningDHCPRange": "172.22.0.10,172.22.0.254",
            "preProvisioningOSDownloadURLs": { "isoURL": "http://example/iso" }
        }))
        .expect("spec should deserialize");

        assert_eq!(spec.provisioning_network, Some(ProvisioningNetwork::Managed));
        assert_eq!(spec.provisioning_ip(), Some("172.22.0.3"));
        assert_eq!(
            spec.pre_provisioning_os_download_urls
                .and_then(|urls| urls.iso_url)
                .as_deref(),
            Some("http://example/iso")
        );
    }

    #[test]
    fn test_blank_provisioning_ip_is_unset() {
        let spec = ProvisioningSpec {
            provisioning_ip: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(spec.provisioning_ip(), None);
    }
}
