//! # Reconcile
//!
//! Routes `Provisioning` events through the finalizer:
//! - apply: ensure every managed secret, then requeue for the next pass
//! - cleanup: delete every managed secret before the finalizer is removed

use std::sync::Arc;
use std::time::Instant;

use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event};
use tracing::{error, info, Instrument};

use super::{status, Context, ControllerError};
use crate::constants::PROVISIONING_FINALIZER;
use crate::crd::Provisioning;
use crate::observability::metrics;

pub async fn reconcile(
    provisioning: Arc<Provisioning>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    let start = Instant::now();
    metrics::increment_reconciliations();

    let api: Api<Provisioning> = Api::all(ctx.client.clone());
    let span = tracing::info_span!(
        "controller.reconcile",
        resource.name = %provisioning.name_any(),
        target.namespace = %ctx.config.target_namespace
    );

    let ctx_ref = ctx.as_ref();
    let api_ref = &api;
    let result = finalizer(&api, PROVISIONING_FINALIZER, provisioning, |event| async move {
        match event {
            Event::Apply(provisioning) => apply(provisioning, ctx_ref, api_ref).await,
            Event::Cleanup(provisioning) => cleanup(provisioning, ctx_ref).await,
        }
    })
    .instrument(span)
    .await
    .map_err(|e| ControllerError::Finalizer(Box::new(e)));

    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    result
}

async fn apply(
    provisioning: Arc<Provisioning>,
    ctx: &Context,
    api: &Api<Provisioning>,
) -> Result<Action, ControllerError> {
    let secrets = ctx.secrets_for(Arc::clone(&provisioning));
    let outcome = secrets.ensure_all().await;

    let message = outcome.as_ref().err().map(ToString::to_string);
    status::update_secrets_ready(api, &provisioning, message.as_deref()).await;

    match outcome {
        Ok(_) => {
            info!(
                namespace = secrets.namespace(),
                "managed secrets are in place, next pass in {}s",
                ctx.config.reconcile_interval_secs
            );
            Ok(Action::requeue(ctx.config.reconcile_interval_duration()))
        }
        Err(e) => {
            error!(namespace = secrets.namespace(), error = %e, "failed to ensure managed secrets");
            Err(e.into())
        }
    }
}

async fn cleanup(provisioning: Arc<Provisioning>, ctx: &Context) -> Result<Action, ControllerError> {
    let secrets = ctx.secrets_for(provisioning);
    info!(namespace = secrets.namespace(), "Provisioning is being deleted, removing managed secrets");
    secrets.delete_all().await?;
    Ok(Action::await_change())
}
