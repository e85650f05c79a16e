//! # Reconcile Driver
//!
//! Generic reconciliation pass for any managed resource kind.
//!
//! ## Apply
//!
//! 1. Connect (ProviderConfig + token) and Observe
//! 2. Absent: Create, persist the external-name annotation right away, then
//!    publish connection details to `writeConnectionSecretToRef`
//! 3. Present but drifted: Update
//! 4. Patch status with `Synced` and requeue after the poll interval
//!
//! ## Cleanup
//!
//! `deletionPolicy: Orphan` releases the finalizer without touching the
//! server. Otherwise Observe, Delete when present, then release.
//!
//! Every pass gets a child of the shutdown token, so in-flight remote calls
//! fail fast when the controller stops.

use crate::backoff::FibonacciBackoff;
use crate::config::ControllerConfig;
use crate::constants::{FIELD_MANAGER, FINALIZER};
use crate::crd::{Condition, DeletionPolicy, SecretReference, EXTERNAL_NAME_ANNOTATION};
use crate::managed::{ConnectionDetails, ExternalClient, Managed, ReconcileError};
use crate::observability::metrics;
use crate::runtime::{Connector, ControllerError};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Patch, PatchParams};
use kube::core::ClusterResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cluster-scoped custom resource the driver can reconcile
pub trait ManagedResource:
    Managed
    + Resource<DynamicType = (), Scope = ClusterResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> ManagedResource for K where
    K: Managed
        + Resource<DynamicType = (), Scope = ClusterResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Shared state of one kind's controller
pub struct Context<K: ManagedResource> {
    pub client: Client,
    pub connector: Arc<dyn Connector<K>>,
    pub config: ControllerConfig,
    pub shutdown: CancellationToken,
    backoff_states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl<K: ManagedResource> std::fmt::Debug for Context<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("kind", &K::kind(&()))
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<K: ManagedResource> Context<K> {
    pub fn new(
        client: Client,
        connector: Arc<dyn Connector<K>>,
        config: ControllerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            client,
            connector,
            config,
            shutdown,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Next error delay for `name`, advancing its backoff
    pub(crate) fn next_backoff(&self, name: &str) -> Duration {
        let min_secs = self.config.backoff_min_secs;
        let max_secs = self.config.backoff_max_secs;
        match self.backoff_states.lock() {
            Ok(mut states) => states
                .entry(name.to_string())
                .or_insert_with(|| FibonacciBackoff::new(min_secs, max_secs))
                .next_backoff(),
            Err(e) => {
                warn!("Failed to lock backoff states: {e}, using maximum backoff");
                Duration::from_secs(self.config.backoff_max_secs)
            }
        }
    }

    fn reset_backoff(&self, name: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(name);
        }
    }
}

/// What an apply pass did to the external resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created {
        external_name_assigned: bool,
        connection_details: ConnectionDetails,
    },
    Updated {
        connection_details: ConnectionDetails,
    },
    UpToDate {
        connection_details: ConnectionDetails,
    },
}

/// Observe, then Create or Update as needed
pub async fn sync_external<K: Managed + Send>(
    kind: &str,
    external: &dyn ExternalClient<K>,
    resource: &mut K,
    cancel: &CancellationToken,
) -> Result<SyncOutcome, ReconcileError> {
    let observation = recorded(kind, "observe", external.observe(resource, cancel).await)?;

    if !observation.resource_exists {
        let creation = recorded(kind, "create", external.create(resource, cancel).await)?;
        return Ok(SyncOutcome::Created {
            external_name_assigned: creation.external_name_assigned,
            connection_details: creation.connection_details,
        });
    }

    if !observation.resource_up_to_date {
        let update = recorded(kind, "update", external.update(resource, cancel).await)?;
        return Ok(SyncOutcome::Updated {
            connection_details: update.connection_details,
        });
    }

    Ok(SyncOutcome::UpToDate {
        connection_details: observation.connection_details,
    })
}

/// Observe, then Delete when the external resource still exists
pub async fn delete_external<K: Managed + Send>(
    kind: &str,
    external: &dyn ExternalClient<K>,
    resource: &mut K,
    cancel: &CancellationToken,
) -> Result<(), ReconcileError> {
    let observation = recorded(kind, "observe", external.observe(resource, cancel).await)?;
    if observation.resource_exists {
        recorded(kind, "delete", external.delete(resource, cancel).await)?;
    }
    Ok(())
}

fn recorded<T>(
    kind: &str,
    operation: &str,
    result: Result<T, ReconcileError>,
) -> Result<T, ReconcileError> {
    metrics::record_external_operation(kind, operation, result.is_ok());
    result
}

/// Reconcile one managed resource
pub async fn reconcile<K: ManagedResource>(
    resource: Arc<K>,
    ctx: Arc<Context<K>>,
) -> Result<Action, ControllerError> {
    let kind = K::kind(&()).to_string();
    let name = resource.name_any();
    let started = Instant::now();
    metrics::increment_reconciliations(&kind);

    let api: Api<K> = Api::all(ctx.client.clone());
    let cancel = ctx.shutdown.child_token();
    let (api_ref, ctx_ref, cancel_ref) = (&api, ctx.as_ref(), &cancel);

    let result = finalizer(&api, FINALIZER, resource, |event| async move {
        match event {
            Event::Apply(resource) => {
                apply(api_ref, (*resource).clone(), ctx_ref, cancel_ref).await
            }
            Event::Cleanup(resource) => {
                cleanup(api_ref, (*resource).clone(), ctx_ref, cancel_ref).await
            }
        }
    })
    .await
    .map_err(|e| ControllerError::Finalizer(Box::new(e)));

    metrics::observe_reconciliation_duration(&kind, started.elapsed().as_secs_f64());
    if result.is_ok() {
        ctx.reset_backoff(&name);
    }
    result
}

async fn apply<K: ManagedResource>(
    api: &Api<K>,
    mut resource: K,
    ctx: &Context<K>,
    cancel: &CancellationToken,
) -> Result<Action, ControllerError> {
    let kind = K::kind(&()).to_string();
    let outcome = async {
        let external = ctx.connector.connect(&resource).await?;
        let outcome = sync_external(&kind, external.as_ref(), &mut resource, cancel).await?;

        let details = match outcome {
            SyncOutcome::Created {
                external_name_assigned,
                connection_details,
            } => {
                if external_name_assigned {
                    persist_external_name(api, &resource).await?;
                }
                info!(
                    kind = %kind,
                    name = %resource.name_any(),
                    external_name = resource.external_name().unwrap_or_default(),
                    "created external resource"
                );
                connection_details
            }
            SyncOutcome::Updated { connection_details } => {
                info!(kind = %kind, name = %resource.name_any(), "updated external resource");
                connection_details
            }
            SyncOutcome::UpToDate { connection_details } => {
                debug!(kind = %kind, name = %resource.name_any(), "external resource up to date");
                connection_details
            }
        };

        publish_connection_details(&ctx.client, &resource, details).await?;
        Ok::<_, ControllerError>(Action::requeue(ctx.config.poll_interval()))
    }
    .await;

    finish(api, &mut resource, outcome).await
}

async fn cleanup<K: ManagedResource>(
    api: &Api<K>,
    mut resource: K,
    ctx: &Context<K>,
    cancel: &CancellationToken,
) -> Result<Action, ControllerError> {
    let kind = K::kind(&()).to_string();
    if resource.resource_spec().deletion_policy == DeletionPolicy::Orphan {
        info!(
            kind = %kind,
            name = %resource.name_any(),
            "orphaning external resource"
        );
        return Ok(Action::await_change());
    }

    let outcome = async {
        let external = ctx.connector.connect(&resource).await?;
        delete_external(&kind, external.as_ref(), &mut resource, cancel).await?;
        info!(kind = %kind, name = %resource.name_any(), "deleted external resource");
        Ok::<_, ControllerError>(Action::await_change())
    }
    .await;

    finish(api, &mut resource, outcome).await
}

/// Record `Synced` and write status back; the pass's own error wins over a
/// failed status patch
async fn finish<K: ManagedResource>(
    api: &Api<K>,
    resource: &mut K,
    outcome: Result<Action, ControllerError>,
) -> Result<Action, ControllerError> {
    match outcome {
        Ok(action) => {
            resource.set_condition(Condition::reconcile_success());
            patch_status(api, resource).await?;
            Ok(action)
        }
        Err(err) => {
            resource.set_condition(Condition::reconcile_error(err.to_string()));
            if let Err(patch_err) = patch_status(api, resource).await {
                warn!(
                    name = %resource.name_any(),
                    error = %patch_err,
                    "failed to record reconcile error on status"
                );
            }
            Err(err)
        }
    }
}

async fn patch_status<K: ManagedResource>(
    api: &Api<K>,
    resource: &K,
) -> Result<(), ControllerError> {
    let status = serde_json::to_value(resource)?
        .get("status")
        .cloned()
        .unwrap_or_default();
    api.patch_status(
        &resource.name_any(),
        &PatchParams::default(),
        &Patch::Merge(json!({ "status": status })),
    )
    .await?;
    Ok(())
}

async fn persist_external_name<K: ManagedResource>(
    api: &Api<K>,
    resource: &K,
) -> Result<(), ControllerError> {
    let patch = json!({
        "metadata": {
            "annotations": {
                EXTERNAL_NAME_ANNOTATION: resource.external_name(),
            }
        }
    });
    let name = resource.name_any();
    api.patch(&name, &PatchParams::default(), &Patch::Merge(patch))
        .await?;
    Ok(())
}

async fn publish_connection_details<K: ManagedResource>(
    client: &Client,
    resource: &K,
    details: ConnectionDetails,
) -> Result<(), ControllerError> {
    let Some(target) = resource.resource_spec().write_connection_secret_to_ref.as_ref() else {
        return Ok(());
    };
    if details.is_empty() {
        return Ok(());
    }

    let secret = connection_secret(resource, target, details);
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &target.namespace);
    secrets
        .patch(
            &target.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&secret),
        )
        .await?;
    debug!(
        secret = %format!("{}/{}", target.namespace, target.name),
        "published connection details"
    );
    Ok(())
}

/// Connection secret owned by `resource`
pub fn connection_secret<K: ManagedResource>(
    resource: &K,
    target: &SecretReference,
    details: ConnectionDetails,
) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(target.name.clone()),
            namespace: Some(target.namespace.clone()),
            owner_references: resource.controller_owner_ref(&()).map(|owner| vec![owner]),
            ..ObjectMeta::default()
        },
        data: Some(
            details
                .into_iter()
                .map(|(key, value)| (key, ByteString(value)))
                .collect(),
        ),
        type_: Some("connection.crossplane.io/v1alpha1".to_string()),
        ..Secret::default()
    }
}
