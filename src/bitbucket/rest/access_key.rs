//! Access key endpoints under `/rest/keys/1.0/projects/{project}/repos/{repo}/ssh`.

use super::RestClient;
use crate::bitbucket::{AccessKey, AccessKeyApi, ClientError, Permission, Repo};
use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct PublicSshKey<'a> {
    text: &'a str,
    label: &'a str,
}

#[derive(Debug, Serialize)]
struct UploadKeyPayload<'a> {
    key: PublicSshKey<'a>,
    permission: Permission,
}

#[derive(Debug, Deserialize)]
struct KeyInfo {
    id: i64,
    #[serde(default)]
    text: String,
    #[serde(default)]
    label: String,
}

/// Key entry as returned by get, create and list
#[derive(Debug, Deserialize)]
struct KeyDescription {
    key: KeyInfo,
    permission: Permission,
}

impl From<KeyDescription> for AccessKey {
    fn from(description: KeyDescription) -> Self {
        Self {
            id: description.key.id,
            key: description.key.text,
            label: description.key.label,
            permission: description.permission,
        }
    }
}

impl RestClient {
    fn keys_url(&self, repo: &Repo, tail: &[&str]) -> Result<Url, ClientError> {
        let mut segments = vec![
            "rest",
            "keys",
            "1.0",
            "projects",
            repo.project_key.as_str(),
            "repos",
            repo.repo.as_str(),
            "ssh",
        ];
        segments.extend_from_slice(tail);
        self.url(&segments)
    }
}

#[async_trait]
impl AccessKeyApi for RestClient {
    async fn create_access_key(
        &self,
        repo: &Repo,
        key: &AccessKey,
    ) -> Result<AccessKey, ClientError> {
        let payload = UploadKeyPayload {
            key: PublicSshKey {
                text: &key.key,
                label: &key.label,
            },
            permission: key.permission,
        };
        let url = self.keys_url(repo, &[])?;
        let request = self.request(Method::POST, url).json(&payload);
        let created: KeyDescription = self.send_json(request).await?;
        Ok(created.into())
    }

    async fn delete_access_key(&self, repo: &Repo, id: i64) -> Result<(), ClientError> {
        let id = id.to_string();
        let url = self.keys_url(repo, &[id.as_str()])?;
        self.send_empty(self.request(Method::DELETE, url)).await
    }

    async fn get_access_key(&self, repo: &Repo, id: i64) -> Result<AccessKey, ClientError> {
        let id = id.to_string();
        let url = self.keys_url(repo, &[id.as_str()])?;
        // Documented as paged, but returns a single entry
        let key: KeyDescription = self.send_json(self.request(Method::GET, url)).await?;
        Ok(key.into())
    }

    async fn list_access_keys(&self, repo: &Repo) -> Result<Vec<AccessKey>, ClientError> {
        let url = self.keys_url(repo, &[])?;
        let keys: Vec<KeyDescription> = self.get_all_pages(url).await?;
        Ok(keys.into_iter().map(AccessKey::from).collect())
    }

    async fn update_access_key_permission(
        &self,
        repo: &Repo,
        id: i64,
        permission: Permission,
    ) -> Result<(), ClientError> {
        let id = id.to_string();
        let url = self.keys_url(repo, &[id.as_str(), "permission", permission.as_str()])?;
        self.send_empty(self.request(Method::PUT, url)).await
    }
}
