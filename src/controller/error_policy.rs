//! # Error Policy
//!
//! Requeue after a failed reconciliation. There is no backoff of our own;
//! the next pass simply runs again after the configured interval.

use std::sync::Arc;

use kube::ResourceExt;
use kube_runtime::controller::Action;
use tracing::error;

use super::{Context, ControllerError};
use crate::crd::Provisioning;
use crate::observability::metrics;

pub fn handle_reconciliation_error(
    provisioning: Arc<Provisioning>,
    error: &ControllerError,
    ctx: Arc<Context>,
) -> Action {
    error!(
        resource.name = %provisioning.name_any(),
        error = %error,
        "Reconciliation error, retrying in {}s",
        ctx.config.reconciliation_error_requeue_secs
    );
    metrics::increment_reconciliation_errors();
    Action::requeue(ctx.config.reconciliation_error_requeue_duration())
}
