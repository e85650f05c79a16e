//! # Bitbucket Server API
//!
//! Domain types and client traits for the two repository-scoped resources the
//! controller manages: SSH access keys and webhooks.
//!
//! - `rest` - reqwest implementation against the Bitbucket Server REST API

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod rest;

/// Repository coordinate every remote call is routed by
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repo {
    pub project_key: String,
    pub repo: String,
}

impl Repo {
    pub fn new(project_key: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            project_key: project_key.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_key, self.repo)
    }
}

/// Access level granted to an access key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum Permission {
    /// Read only access to the repository
    #[default]
    #[serde(rename = "REPO_READ")]
    RepoRead,
    /// Read and write access to the repository
    #[serde(rename = "REPO_WRITE")]
    RepoWrite,
}

impl Permission {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::RepoRead => "REPO_READ",
            Permission::RepoWrite => "REPO_WRITE",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SSH access key as known to the server
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessKey {
    /// Server-assigned id, zero before creation
    pub id: i64,
    /// OpenSSH authorized-key line
    pub key: String,
    pub label: String,
    pub permission: Permission,
}

/// Webhook configuration block
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebhookConfiguration {
    /// Key the server HMAC-signs payloads with. `None` leaves the server value untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Webhook as known to the server
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    /// Server-assigned id, omitted from request bodies
    #[serde(default, skip_serializing)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub configuration: WebhookConfiguration,
    #[serde(default)]
    pub events: Vec<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Server metadata, never sent
    #[serde(default, skip_serializing)]
    pub created_date: Option<i64>,
    /// Server metadata, never sent
    #[serde(default, skip_serializing)]
    pub updated_date: Option<i64>,
}

/// Errors surfaced by the remote clients
///
/// `NotFound` is kept distinct so reconcilers can treat an absent resource as
/// a state rather than a failure.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not found")]
    NotFound,
    #[error("HTTP status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound)
    }
}

/// Access key operations
#[async_trait]
pub trait AccessKeyApi: Send + Sync {
    async fn create_access_key(&self, repo: &Repo, key: &AccessKey)
        -> Result<AccessKey, ClientError>;

    async fn delete_access_key(&self, repo: &Repo, id: i64) -> Result<(), ClientError>;

    async fn get_access_key(&self, repo: &Repo, id: i64) -> Result<AccessKey, ClientError>;

    async fn list_access_keys(&self, repo: &Repo) -> Result<Vec<AccessKey>, ClientError>;

    /// Permission is the only mutable attribute of an access key
    async fn update_access_key_permission(
        &self,
        repo: &Repo,
        id: i64,
        permission: Permission,
    ) -> Result<(), ClientError>;
}

/// Webhook operations
#[async_trait]
pub trait WebhookApi: Send + Sync {
    async fn create_webhook(&self, repo: &Repo, hook: &Webhook) -> Result<Webhook, ClientError>;

    async fn delete_webhook(&self, repo: &Repo, id: i64) -> Result<(), ClientError>;

    async fn get_webhook(&self, repo: &Repo, id: i64) -> Result<Webhook, ClientError>;

    async fn update_webhook(
        &self,
        repo: &Repo,
        id: i64,
        hook: &Webhook,
    ) -> Result<Webhook, ClientError>;
}
