//! # Watch Loop
//!
//! Runs the `kube-runtime` controller over the cluster-scoped `Provisioning`
//! resource until a shutdown signal arrives.

use std::sync::Arc;

use futures::StreamExt;
use kube::api::Api;
use kube_runtime::{watcher, Controller};
use tracing::{debug, info, warn};

use super::{handle_reconciliation_error, reconcile, Context};
use crate::crd::Provisioning;
use crate::server::ServerState;

pub async fn run_watch_loop(ctx: Arc<Context>, server_state: Arc<ServerState>) {
    let provisionings: Api<Provisioning> = Api::all(ctx.client.clone());

    info!("Starting controller watch loop...");
    server_state.set_ready(true);

    Controller::new(provisionings, watcher::Config::default().any_semantic())
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(resource.name = %object.name, "reconciled"),
                Err(e) => warn!(error = %e, "controller event failed"),
            }
        })
        .await;

    server_state.set_ready(false);
    info!("Controller watch loop stopped");
}
