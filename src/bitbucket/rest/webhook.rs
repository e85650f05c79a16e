//! Webhook endpoints under `/rest/api/1.0/projects/{project}/repos/{repo}/webhooks`.

use super::RestClient;
use crate::bitbucket::{ClientError, Repo, Webhook, WebhookApi};
use async_trait::async_trait;
use reqwest::{Method, Url};

impl RestClient {
    fn webhooks_url(&self, repo: &Repo, id: Option<i64>) -> Result<Url, ClientError> {
        let id = id.map(|id| id.to_string());
        let mut segments = vec![
            "rest",
            "api",
            "1.0",
            "projects",
            repo.project_key.as_str(),
            "repos",
            repo.repo.as_str(),
            "webhooks",
        ];
        if let Some(id) = &id {
            segments.push(id.as_str());
        }
        self.url(&segments)
    }
}

#[async_trait]
impl WebhookApi for RestClient {
    async fn create_webhook(&self, repo: &Repo, hook: &Webhook) -> Result<Webhook, ClientError> {
        let url = self.webhooks_url(repo, None)?;
        let request = self.request(Method::POST, url).json(hook);
        self.send_json(request).await
    }

    async fn delete_webhook(&self, repo: &Repo, id: i64) -> Result<(), ClientError> {
        let url = self.webhooks_url(repo, Some(id))?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }

    async fn get_webhook(&self, repo: &Repo, id: i64) -> Result<Webhook, ClientError> {
        let url = self.webhooks_url(repo, Some(id))?;
        self.send_json(self.request(Method::GET, url)).await
    }

    async fn update_webhook(
        &self,
        repo: &Repo,
        id: i64,
        hook: &Webhook,
    ) -> Result<Webhook, ClientError> {
        let url = self.webhooks_url(repo, Some(id))?;
        let request = self.request(Method::PUT, url).json(hook);
        self.send_json(request).await
    }
}
