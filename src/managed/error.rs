//! # Reconcile Errors
//!
//! Error vocabulary surfaced by the external reconcilers.
//!
//! - Not-found is absorbed by Observe and Delete and only surfaces from Create/Update
//! - Transport failures carry a stable operation tag and the repository coordinate
//! - Identity parse failures never surface; callers treat them as "absent"
//! - Generation failures abort Create before any remote call

use crate::bitbucket::{ClientError, Repo};
use thiserror::Error;

/// Failure producing secret material
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("random source failed: {0}")]
    Random(#[from] rand::Error),
    #[error("key generation failed: {0}")]
    Key(#[from] openssl::error::ErrorStack),
    #[error("key generation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// External identity could not be read as a server id
#[derive(Debug, Error)]
#[error("external name {value:?} is not a valid id")]
pub struct IdentityParseError {
    pub value: String,
    #[source]
    pub source: std::num::ParseIntError,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Resource vanished between Observe and Create/Update
    #[error("{operation} ({repo}): resource not found")]
    NotFound { operation: &'static str, repo: Repo },

    #[error("{operation} ({repo}): {source}")]
    Transport {
        operation: &'static str,
        repo: Repo,
        #[source]
        source: ClientError,
    },

    #[error("cannot generate {material}: {source}")]
    Generation {
        material: &'static str,
        #[source]
        source: GenerationError,
    },

    #[error("{operation}: cancelled")]
    Cancelled { operation: &'static str },
}

impl ReconcileError {
    /// Wrap a client error, keeping not-found distinguishable
    pub(crate) fn remote(operation: &'static str, repo: &Repo, source: ClientError) -> Self {
        if source.is_not_found() {
            ReconcileError::NotFound {
                operation,
                repo: repo.clone(),
            }
        } else {
            ReconcileError::Transport {
                operation,
                repo: repo.clone(),
                source,
            }
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReconcileError::NotFound { .. })
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReconcileError::Cancelled { .. })
    }
}
