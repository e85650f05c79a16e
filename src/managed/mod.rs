//! # Managed Resources
//!
//! Reconciliation core for external resources owned by a Kubernetes object.
//!
//! The host loop drives an [`ExternalClient`] through four entry points:
//!
//! 1. **Observe** - fetch remote state by external identity and diff it against the desired state
//! 2. **Create** - create the remote resource, assign the identity, hand back generated secrets
//! 3. **Update** - push the full desired state under the known identity
//! 4. **Delete** - remove the remote resource; an absent resource counts as deleted
//!
//! Every entry point is safe to repeat. Nothing here retries or keeps state
//! across resources.
//!
//! ## Module Structure
//!
//! - `error.rs` - Error taxonomy
//! - `diff.rs` - Desired/observed comparison
//! - `secrets.rs` - Opaque secret and SSH keypair generation
//! - `access_key.rs` - Access key reconciler
//! - `webhook.rs` - Webhook reconciler

pub mod access_key;
pub mod diff;
pub mod error;
pub mod secrets;
pub mod webhook;

pub use access_key::AccessKeyReconciler;
pub use error::{GenerationError, IdentityParseError, ReconcileError};
pub use secrets::{KeyPair, OsSecretGenerator, SecretGenerator};
pub use webhook::WebhookReconciler;

use crate::crd::{Condition, ResourceSpec};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Named byte blobs the host persists into the connection secret
pub type ConnectionDetails = BTreeMap<String, Vec<u8>>;

/// Object that owns an external resource
///
/// Identity lives in a single string field; absent or empty means the remote
/// resource has not been created yet.
pub trait Managed {
    fn external_name(&self) -> Option<&str>;

    fn set_external_name(&mut self, name: String);

    fn conditions(&self) -> &[Condition];

    fn set_condition(&mut self, condition: Condition);

    fn resource_spec(&self) -> &ResourceSpec;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalObservation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
    pub connection_details: ConnectionDetails,
}

impl ExternalObservation {
    /// The remote resource does not exist (yet, or any more)
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn present(up_to_date: bool) -> Self {
        Self {
            resource_exists: true,
            resource_up_to_date: up_to_date,
            connection_details: ConnectionDetails::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalCreation {
    /// Set when Create wrote a new identity onto the resource
    pub external_name_assigned: bool,
    pub connection_details: ConnectionDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalUpdate {
    pub connection_details: ConnectionDetails,
}

/// Observe/Create/Update/Delete against the remote system for one resource kind
///
/// Implementations may mutate the resource's status and identity but never its
/// spec. All calls honor `cancel`: once it fires, the call fails with
/// [`ReconcileError::Cancelled`] and leaves the identity untouched.
#[async_trait]
pub trait ExternalClient<K: Managed + Send>: Send + Sync {
    async fn observe(
        &self,
        resource: &mut K,
        cancel: &CancellationToken,
    ) -> Result<ExternalObservation, ReconcileError>;

    async fn create(
        &self,
        resource: &mut K,
        cancel: &CancellationToken,
    ) -> Result<ExternalCreation, ReconcileError>;

    async fn update(
        &self,
        resource: &mut K,
        cancel: &CancellationToken,
    ) -> Result<ExternalUpdate, ReconcileError>;

    async fn delete(&self, resource: &mut K, cancel: &CancellationToken)
        -> Result<(), ReconcileError>;
}

/// Parse an external name into a server id
pub fn parse_external_id(name: &str) -> Result<i64, IdentityParseError> {
    name.trim()
        .parse::<i64>()
        .map_err(|source| IdentityParseError {
            value: name.to_string(),
            source,
        })
}

/// Server id of `resource`, or `None` when absent or unparseable
pub(crate) fn external_id<K: Managed>(resource: &K) -> Option<i64> {
    let name = resource.external_name()?;
    match parse_external_id(name) {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::debug!(error = %err, "ignoring external name");
            None
        }
    }
}

/// Run a secret generator on the blocking pool, racing `cancel`
pub(crate) async fn generate<T, F>(
    cancel: &CancellationToken,
    operation: &'static str,
    material: &'static str,
    generator: F,
) -> Result<T, ReconcileError>
where
    F: FnOnce() -> Result<T, GenerationError> + Send + 'static,
    T: Send + 'static,
{
    let joined = cancellable(cancel, operation, tokio::task::spawn_blocking(generator)).await?;
    joined
        .map_err(GenerationError::from)
        .and_then(|generated| generated)
        .map_err(|source| ReconcileError::Generation { material, source })
}

/// Run `fut` unless `cancel` fires first
///
/// Cancellation is checked before the future is polled, so an already
/// cancelled token never starts the operation.
pub(crate) async fn cancellable<F>(
    cancel: &CancellationToken,
    operation: &'static str,
    fut: F,
) -> Result<F::Output, ReconcileError>
where
    F: Future,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ReconcileError::Cancelled { operation }),
        output = fut => Ok(output),
    }
}
