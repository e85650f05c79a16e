//! # Watch Loop
//!
//! Runs a kube-runtime `Controller` for one managed resource kind and restarts
//! it if its stream ends before shutdown.

use crate::runtime::error_policy::error_policy;
use crate::runtime::{reconcile, Context, ManagedResource};
use futures::StreamExt;
use kube::Api;
use kube_runtime::{controller, watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub async fn run_watch_loop<K: ManagedResource>(ctx: Arc<Context<K>>) {
    let kind = K::kind(&()).to_string();
    let api: Api<K> = Api::all(ctx.client.clone());
    let shutdown = ctx.shutdown.clone();

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        info!(kind = %kind, "starting controller");
        let controller = Controller::new(api.clone(), watcher::Config::default().any_semantic())
            .with_config(
                controller::Config::default().concurrency(ctx.config.max_concurrent_reconciles),
            )
            .shutdown_on_signal()
            .run(reconcile::<K>, error_policy::<K>, Arc::clone(&ctx))
            .for_each(|result| async move {
                match result {
                    Ok((object, _action)) => debug!(object = %object.name, "reconciled"),
                    Err(e) => warn!(error = %e, "controller stream error"),
                }
            });

        tokio::select! {
            () = controller => {}
            () = shutdown.cancelled() => break,
        }

        if shutdown.is_cancelled() {
            break;
        }

        let delay = ctx.config.watch_restart_delay();
        warn!(
            kind = %kind,
            "controller stream ended, restarting in {} seconds",
            delay.as_secs()
        );
        tokio::time::sleep(delay).await;
    }

    info!(kind = %kind, "controller stopped");
}
