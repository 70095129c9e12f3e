//! # Logging
//!
//! `tracing` subscriber setup driven by [`ControllerConfig`].
//!
//! `RUST_LOG` takes precedence over `LOG_LEVEL` when set.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::ControllerConfig;

/// Filter directive used when `RUST_LOG` is not set
#[must_use]
pub fn default_directive(log_level: &str) -> String {
    let level = match log_level.to_ascii_lowercase().as_str() {
        level @ ("error" | "warn" | "info" | "debug" | "trace") => level.to_string(),
        _ => "info".to_string(),
    };
    format!("provisioning_secrets={level},provisioning_secrets_controller={level},kube=warn")
}

#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only if a global subscriber is already installed"
)]
pub fn init_logging(config: &ControllerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.log_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_format.eq_ignore_ascii_case("json") {
        builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install JSON log subscriber: {e}"))?;
    } else {
        builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
    }
    Ok(())
}
