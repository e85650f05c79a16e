//! # Webhook Reconciler
//!
//! Drives `Webhook` resources against the repository webhook API.
//!
//! A webhook without a declared secret gets a generated one at Create. The
//! secret used is always returned as the `secret` connection detail. Updates
//! send the full desired state; an undeclared secret is left out of the body
//! so the server keeps the generated one.

use crate::bitbucket::WebhookApi;
use crate::constants::CONNECTION_KEY_SECRET;
use crate::crd::{Condition, Webhook};
use crate::managed::{
    cancellable, diff, external_id, generate, ConnectionDetails, ExternalClient,
    ExternalCreation, ExternalObservation, ExternalUpdate, Managed, ReconcileError,
    SecretGenerator,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const OP_GET: &str = "cannot get webhook from bitbucket API";
const OP_CREATE: &str = "cannot create webhook with bitbucket API";
const OP_UPDATE: &str = "cannot update webhook with bitbucket API";
const OP_DELETE: &str = "cannot delete webhook with bitbucket API";

pub struct WebhookReconciler {
    client: Arc<dyn WebhookApi>,
    secrets: Arc<dyn SecretGenerator>,
}

impl std::fmt::Debug for WebhookReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookReconciler").finish_non_exhaustive()
    }
}

impl WebhookReconciler {
    pub fn new(client: Arc<dyn WebhookApi>, secrets: Arc<dyn SecretGenerator>) -> Self {
        Self { client, secrets }
    }
}

#[async_trait]
impl ExternalClient<Webhook> for WebhookReconciler {
    async fn observe(
        &self,
        resource: &mut Webhook,
        cancel: &CancellationToken,
    ) -> Result<ExternalObservation, ReconcileError> {
        let Some(id) = external_id(&*resource) else {
            return Ok(ExternalObservation::absent());
        };
        let repo = resource.repo();

        let fetched = cancellable(cancel, OP_GET, self.client.get_webhook(&repo, id)).await?;
        let observed = match fetched {
            Ok(hook) => hook,
            Err(err) if err.is_not_found() => return Ok(ExternalObservation::absent()),
            Err(err) => return Err(ReconcileError::remote(OP_GET, &repo, err)),
        };

        // Same status surface as access keys
        resource.status_mut().at_provider.id = Some(observed.id);
        resource.set_condition(Condition::available());

        let diff = diff::webhook(&resource.webhook(), &observed);
        if !diff.is_up_to_date() {
            debug!(
                id,
                fields = ?diff.changed_fields(),
                "webhook differs from desired state"
            );
        }
        Ok(ExternalObservation::present(diff.is_up_to_date()))
    }

    async fn create(
        &self,
        resource: &mut Webhook,
        cancel: &CancellationToken,
    ) -> Result<ExternalCreation, ReconcileError> {
        resource.set_condition(Condition::creating());
        let repo = resource.repo();
        let mut desired = resource.webhook();

        if desired.configuration.secret.is_none() {
            let secrets = Arc::clone(&self.secrets);
            let password = move || secrets.password();
            let generated = generate(cancel, OP_CREATE, "webhook secret", password).await?;
            desired.configuration.secret = Some(generated);
        }
        let secret = desired.configuration.secret.clone().unwrap_or_default();

        let created = cancellable(
            cancel,
            OP_CREATE,
            self.client.create_webhook(&repo, &desired),
        )
        .await?
        .map_err(|err| ReconcileError::remote(OP_CREATE, &repo, err))?;

        resource.set_external_name(created.id.to_string());
        resource.status_mut().at_provider.id = Some(created.id);
        resource.set_condition(Condition::available());

        Ok(ExternalCreation {
            external_name_assigned: true,
            connection_details: ConnectionDetails::from([(
                CONNECTION_KEY_SECRET.to_string(),
                secret.into_bytes(),
            )]),
        })
    }

    async fn update(
        &self,
        resource: &mut Webhook,
        cancel: &CancellationToken,
    ) -> Result<ExternalUpdate, ReconcileError> {
        let Some(id) = external_id(&*resource) else {
            debug!("skipping update of webhook without identity");
            return Ok(ExternalUpdate::default());
        };
        let repo = resource.repo();
        let desired = resource.webhook();

        cancellable(
            cancel,
            OP_UPDATE,
            self.client.update_webhook(&repo, id, &desired),
        )
        .await?
        .map_err(|err| ReconcileError::remote(OP_UPDATE, &repo, err))?;

        resource.set_condition(Condition::available());
        Ok(ExternalUpdate::default())
    }

    async fn delete(
        &self,
        resource: &mut Webhook,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        resource.set_condition(Condition::deleting());
        let Some(id) = external_id(&*resource) else {
            return Ok(());
        };
        let repo = resource.repo();

        match cancellable(cancel, OP_DELETE, self.client.delete_webhook(&repo, id)).await? {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(ReconcileError::remote(OP_DELETE, &repo, err)),
        }
    }
}
