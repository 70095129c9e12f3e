//! # Custom Resource Definitions
//!
//! CRD types consumed by the controller.
//!
//! The `Provisioning` resource is the single cluster-scoped configuration
//! object that owns every managed secret. Only the fields this controller
//! reads, plus the ones needed to round-trip the object, are modelled.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `Provisioning` specification
//! - `status.rs` - Status types for tracking reconciliation state

mod spec;
mod status;

pub use spec::{PreProvisioningOSDownloadURLs, Provisioning, ProvisioningNetwork, ProvisioningSpec};
pub use status::{Condition, ProvisioningStatus};
