//! # Provisioning Secrets Controller
//!
//! Keeps the secrets the bare-metal provisioning services depend on present
//! and fresh in their namespace:
//!
//! - `metal3-ironic-password` and `metal3-ironic-inspector-password` - service
//!   credentials, minted once and never rewritten
//! - `metal3-ironic-tls` - self-signed certificate, rotated close to expiry
//! - `pull-secret` - mirror of the cluster registry pull secret
//!
//! Every managed secret is owned by the cluster-scoped `Provisioning`
//! resource and removed when it is deleted.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod secrets;
pub mod server;
