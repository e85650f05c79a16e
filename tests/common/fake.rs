//! # Fake Clients
//!
//! Closure-backed implementations of the client traits. Any operation without
//! a configured closure panics when called, which makes "must not call the
//! server" assertions free. `create_delay` stalls Create so tests can cancel
//! while the call is in flight.

use async_trait::async_trait;
use bitbucket_server_controller::bitbucket::{
    AccessKey, AccessKeyApi, ClientError, Permission, Repo, Webhook, WebhookApi,
};
use std::time::Duration;

type Handler<A, R> = Box<dyn Fn(A) -> Result<R, ClientError> + Send + Sync>;

/// Fake [`AccessKeyApi`]
#[derive(Default)]
pub struct MockAccessKeyClient {
    pub mock_create: Option<Handler<(Repo, AccessKey), AccessKey>>,
    pub mock_delete: Option<Handler<(Repo, i64), ()>>,
    pub mock_get: Option<Handler<(Repo, i64), AccessKey>>,
    pub mock_list: Option<Handler<Repo, Vec<AccessKey>>>,
    pub mock_update_permission: Option<Handler<(Repo, i64, Permission), ()>>,
    pub create_delay: Option<Duration>,
}

impl std::fmt::Debug for MockAccessKeyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAccessKeyClient")
            .finish_non_exhaustive()
    }
}

fn unexpected(operation: &str) -> ! {
    panic!("unexpected call to {operation}")
}

async fn stall(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl AccessKeyApi for MockAccessKeyClient {
    async fn create_access_key(
        &self,
        repo: &Repo,
        key: &AccessKey,
    ) -> Result<AccessKey, ClientError> {
        stall(self.create_delay).await;
        match &self.mock_create {
            Some(f) => f((repo.clone(), key.clone())),
            None => unexpected("create_access_key"),
        }
    }

    async fn delete_access_key(&self, repo: &Repo, id: i64) -> Result<(), ClientError> {
        match &self.mock_delete {
            Some(f) => f((repo.clone(), id)),
            None => unexpected("delete_access_key"),
        }
    }

    async fn get_access_key(&self, repo: &Repo, id: i64) -> Result<AccessKey, ClientError> {
        match &self.mock_get {
            Some(f) => f((repo.clone(), id)),
            None => unexpected("get_access_key"),
        }
    }

    async fn list_access_keys(&self, repo: &Repo) -> Result<Vec<AccessKey>, ClientError> {
        match &self.mock_list {
            Some(f) => f(repo.clone()),
            None => unexpected("list_access_keys"),
        }
    }

    async fn update_access_key_permission(
        &self,
        repo: &Repo,
        id: i64,
        permission: Permission,
    ) -> Result<(), ClientError> {
        match &self.mock_update_permission {
            Some(f) => f((repo.clone(), id, permission)),
            None => unexpected("update_access_key_permission"),
        }
    }
}

/// Fake [`WebhookApi`]
#[derive(Default)]
pub struct MockWebhookClient {
    pub mock_create: Option<Handler<(Repo, Webhook), Webhook>>,
    pub mock_delete: Option<Handler<(Repo, i64), ()>>,
    pub mock_get: Option<Handler<(Repo, i64), Webhook>>,
    pub mock_update: Option<Handler<(Repo, i64, Webhook), Webhook>>,
    pub create_delay: Option<Duration>,
}

impl std::fmt::Debug for MockWebhookClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockWebhookClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl WebhookApi for MockWebhookClient {
    async fn create_webhook(&self, repo: &Repo, hook: &Webhook) -> Result<Webhook, ClientError> {
        stall(self.create_delay).await;
        match &self.mock_create {
            Some(f) => f((repo.clone(), hook.clone())),
            None => unexpected("create_webhook"),
        }
    }

    async fn delete_webhook(&self, repo: &Repo, id: i64) -> Result<(), ClientError> {
        match &self.mock_delete {
            Some(f) => f((repo.clone(), id)),
            None => unexpected("delete_webhook"),
        }
    }

    async fn get_webhook(&self, repo: &Repo, id: i64) -> Result<Webhook, ClientError> {
        match &self.mock_get {
            Some(f) => f((repo.clone(), id)),
            None => unexpected("get_webhook"),
        }
    }

    async fn update_webhook(
        &self,
        repo: &Repo,
        id: i64,
        hook: &Webhook,
    ) -> Result<Webhook, ClientError> {
        match &self.mock_update {
            Some(f) => f((repo.clone(), id, hook.clone())),
            None => unexpected("update_webhook"),
        }
    }
}
