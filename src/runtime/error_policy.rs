//! # Error Policy
//!
//! Requeue failed reconciliations with a per-resource Fibonacci backoff.
//! Backoff state is tracked per resource so one failing resource never slows
//! down the others; a successful pass resets it.

use crate::observability::metrics;
use crate::runtime::{Context, ControllerError, ManagedResource};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{error, info};

pub fn error_policy<K: ManagedResource>(
    resource: Arc<K>,
    error: &ControllerError,
    ctx: Arc<Context<K>>,
) -> Action {
    let kind = K::kind(&());
    let name = resource.name_any();

    error!(kind = %kind, name = %name, error = %error, "reconciliation failed");
    metrics::increment_reconciliation_errors(&kind);

    let delay = ctx.next_backoff(&name);
    info!(
        kind = %kind,
        name = %name,
        "retrying in {}s (trigger source: error-backoff)",
        delay.as_secs()
    );

    metrics::increment_requeues_total("error-backoff");
    Action::requeue(delay)
}
