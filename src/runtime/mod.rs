//! # Runtime
//!
//! Host loop around the managed-resource core.
//!
//! ## Module Structure
//!
//! - `connector.rs` - ProviderConfig + token Secret to a ready `ExternalClient`
//! - `reconcile.rs` - Finalizer-guarded Observe/Create/Update/Delete driver
//! - `error_policy.rs` - Per-resource Fibonacci backoff on failure
//! - `watch_loop.rs` - kube-runtime `Controller` per kind, restarted when its stream ends

pub mod connector;
pub mod error_policy;
pub mod reconcile;
pub mod watch_loop;

pub use connector::{BitbucketConnector, ConnectError, Connector};
pub use reconcile::{reconcile, Context, ManagedResource};
pub use watch_loop::run_watch_loop;

use crate::managed::ReconcileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("kubernetes API request failed: {0}")]
    Kube(#[from] kube::Error),

    #[error("cannot serialize resource: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("finalizer failed: {0}")]
    Finalizer(#[source] Box<kube_runtime::finalizer::Error<ControllerError>>),
}
