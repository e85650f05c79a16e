//! # Access Key Reconciler
//!
//! Drives `AccessKey` resources against the repository SSH key API.
//!
//! Only the permission of an existing key can change; label and key text are
//! fixed when the key is uploaded. An empty key generates an RSA keypair at
//! Create and returns the private half as `ssh-privatekey`.

use crate::bitbucket::AccessKeyApi;
use crate::constants::CONNECTION_KEY_SSH_PRIVATE_KEY;
use crate::crd::{AccessKey, AccessKeyObservation, Condition};
use crate::managed::{
    cancellable, diff, external_id, generate, ConnectionDetails, ExternalClient,
    ExternalCreation, ExternalObservation, ExternalUpdate, Managed, ReconcileError,
    SecretGenerator,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const OP_GET: &str = "cannot get access key from bitbucket API";
const OP_CREATE: &str = "cannot create access key with bitbucket API";
const OP_UPDATE: &str = "cannot update access key permission with bitbucket API";
const OP_DELETE: &str = "cannot delete access key with bitbucket API";

pub struct AccessKeyReconciler {
    client: Arc<dyn AccessKeyApi>,
    secrets: Arc<dyn SecretGenerator>,
}

impl std::fmt::Debug for AccessKeyReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessKeyReconciler")
            .finish_non_exhaustive()
    }
}

impl AccessKeyReconciler {
    pub fn new(client: Arc<dyn AccessKeyApi>, secrets: Arc<dyn SecretGenerator>) -> Self {
        Self { client, secrets }
    }
}

#[async_trait]
impl ExternalClient<AccessKey> for AccessKeyReconciler {
    async fn observe(
        &self,
        resource: &mut AccessKey,
        cancel: &CancellationToken,
    ) -> Result<ExternalObservation, ReconcileError> {
        let Some(id) = external_id(&*resource) else {
            return Ok(ExternalObservation::absent());
        };
        let repo = resource.repo();

        let fetched = cancellable(cancel, OP_GET, self.client.get_access_key(&repo, id)).await?;
        let observed = match fetched {
            Ok(key) => key,
            Err(err) if err.is_not_found() => return Ok(ExternalObservation::absent()),
            Err(err) => return Err(ReconcileError::remote(OP_GET, &repo, err)),
        };

        resource.status_mut().at_provider = AccessKeyObservation::from(&observed);
        resource.set_condition(Condition::available());

        let diff = diff::access_key(&resource.access_key(), &observed);
        if !diff.is_up_to_date() {
            debug!(
                id,
                fields = ?diff.changed_fields(),
                "access key differs from desired state"
            );
        }
        Ok(ExternalObservation::present(diff.is_up_to_date()))
    }

    async fn create(
        &self,
        resource: &mut AccessKey,
        cancel: &CancellationToken,
    ) -> Result<ExternalCreation, ReconcileError> {
        resource.set_condition(Condition::creating());
        let repo = resource.repo();
        let mut desired = resource.access_key();
        let mut connection_details = ConnectionDetails::new();

        if desired.key.is_empty() {
            let secrets = Arc::clone(&self.secrets);
            let key_pair = move || secrets.key_pair();
            let pair = generate(cancel, OP_CREATE, "ssh key pair", key_pair).await?;
            debug!(fingerprint = %pair.fingerprint, "generated ssh key pair");
            desired.key = pair.public_key;
            connection_details.insert(
                CONNECTION_KEY_SSH_PRIVATE_KEY.to_string(),
                pair.private_key_pem.to_vec(),
            );
        }

        let created = cancellable(
            cancel,
            OP_CREATE,
            self.client.create_access_key(&repo, &desired),
        )
        .await?
        .map_err(|err| ReconcileError::remote(OP_CREATE, &repo, err))?;

        resource.set_external_name(created.id.to_string());
        resource.status_mut().at_provider = AccessKeyObservation::from(&created);
        resource.set_condition(Condition::available());

        Ok(ExternalCreation {
            external_name_assigned: true,
            connection_details,
        })
    }

    async fn update(
        &self,
        resource: &mut AccessKey,
        cancel: &CancellationToken,
    ) -> Result<ExternalUpdate, ReconcileError> {
        let Some(id) = external_id(&*resource) else {
            debug!("skipping update of access key without identity");
            return Ok(ExternalUpdate::default());
        };
        let repo = resource.repo();
        let permission = resource.spec.for_provider.public_key.permission;

        cancellable(
            cancel,
            OP_UPDATE,
            self.client.update_access_key_permission(&repo, id, permission),
        )
        .await?
        .map_err(|err| ReconcileError::remote(OP_UPDATE, &repo, err))?;

        resource.set_condition(Condition::available());
        Ok(ExternalUpdate::default())
    }

    async fn delete(
        &self,
        resource: &mut AccessKey,
        cancel: &CancellationToken,
    ) -> Result<(), ReconcileError> {
        resource.set_condition(Condition::deleting());
        let Some(id) = external_id(&*resource) else {
            return Ok(());
        };
        let repo = resource.repo();

        match cancellable(cancel, OP_DELETE, self.client.delete_access_key(&repo, id)).await? {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => Ok(()),
            Err(err) => Err(ReconcileError::remote(OP_DELETE, &repo, err)),
        }
    }
}
