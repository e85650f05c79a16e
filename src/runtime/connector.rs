//! # Connector
//!
//! Builds the `ExternalClient` for a managed resource: resolves the
//! `ProviderConfig` it references, reads the access token from the referenced
//! Secret key, and wraps a REST client in the kind's reconciler.

use crate::bitbucket::rest::{ClientConfig, RestClient, TlsOptions};
use crate::bitbucket::ClientError;
use crate::crd::{AccessKey, CredentialsSource, ProviderConfig, SecretKeySelector, Webhook};
use crate::managed::{
    AccessKeyReconciler, ExternalClient, Managed, SecretGenerator, WebhookReconciler,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("cannot get ProviderConfig {name}: {source}")]
    ProviderConfig {
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("ProviderConfig {name} has no credentials secretRef")]
    MissingSecretRef { name: String },

    #[error("cannot get credentials secret {namespace}/{name}: {source}")]
    Secret {
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("credentials secret {namespace}/{name} has no key {key}")]
    MissingSecretKey {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("credentials secret {namespace}/{name} key {key} is not valid UTF-8")]
    InvalidToken {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("cannot create bitbucket client: {0}")]
    Client(#[from] ClientError),
}

/// Produces the external client for one resource
#[async_trait]
pub trait Connector<K: Managed + Send>: Send + Sync {
    async fn connect(&self, resource: &K) -> Result<Arc<dyn ExternalClient<K>>, ConnectError>;
}

/// Connector backed by the Kubernetes API
pub struct BitbucketConnector {
    client: Client,
    secrets: Arc<dyn SecretGenerator>,
}

impl std::fmt::Debug for BitbucketConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitbucketConnector").finish_non_exhaustive()
    }
}

impl BitbucketConnector {
    pub fn new(client: Client, secrets: Arc<dyn SecretGenerator>) -> Self {
        Self { client, secrets }
    }

    async fn rest_client(&self, provider_config: &str) -> Result<RestClient, ConnectError> {
        let configs: Api<ProviderConfig> = Api::all(self.client.clone());
        let config = configs
            .get(provider_config)
            .await
            .map_err(|source| ConnectError::ProviderConfig {
                name: provider_config.to_string(),
                source,
            })?;

        let token = match config.spec.credentials.source {
            CredentialsSource::None => String::new(),
            CredentialsSource::Secret => {
                let selector = config.spec.credentials.secret_ref.as_ref().ok_or_else(|| {
                    ConnectError::MissingSecretRef {
                        name: provider_config.to_string(),
                    }
                })?;
                self.read_token(selector).await?
            }
        };

        let tls = config.spec.tls.unwrap_or_default();
        debug!(
            provider_config,
            base_url = %config.spec.base_url,
            "connecting to bitbucket server"
        );
        Ok(RestClient::new(ClientConfig {
            base_url: config.spec.base_url,
            token,
            tls: TlsOptions {
                ca_bundle: tls.ca_bundle,
                insecure_skip_verify: tls.insecure_skip_verify,
            },
        })?)
    }

    async fn read_token(&self, selector: &SecretKeySelector) -> Result<String, ConnectError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &selector.namespace);
        let secret = secrets
            .get(&selector.name)
            .await
            .map_err(|source| ConnectError::Secret {
                namespace: selector.namespace.clone(),
                name: selector.name.clone(),
                source,
            })?;
        token_from_secret(&secret, selector)
    }
}

/// Extract the token stored under `selector.key`
pub fn token_from_secret(
    secret: &Secret,
    selector: &SecretKeySelector,
) -> Result<String, ConnectError> {
    let data = secret
        .data
        .as_ref()
        .and_then(|data| data.get(&selector.key))
        .ok_or_else(|| ConnectError::MissingSecretKey {
            namespace: selector.namespace.clone(),
            name: selector.name.clone(),
            key: selector.key.clone(),
        })?;

    let token = String::from_utf8(data.0.clone()).map_err(|_utf8| ConnectError::InvalidToken {
        namespace: selector.namespace.clone(),
        name: selector.name.clone(),
        key: selector.key.clone(),
    })?;
    Ok(token.trim().to_string())
}

#[async_trait]
impl Connector<AccessKey> for BitbucketConnector {
    async fn connect(
        &self,
        resource: &AccessKey,
    ) -> Result<Arc<dyn ExternalClient<AccessKey>>, ConnectError> {
        let client = self
            .rest_client(&resource.spec.resource.provider_config_ref.name)
            .await?;
        Ok(Arc::new(AccessKeyReconciler::new(
            Arc::new(client),
            Arc::clone(&self.secrets),
        )))
    }
}

#[async_trait]
impl Connector<Webhook> for BitbucketConnector {
    async fn connect(
        &self,
        resource: &Webhook,
    ) -> Result<Arc<dyn ExternalClient<Webhook>>, ConnectError> {
        let client = self
            .rest_client(&resource.spec.resource.provider_config_ref.name)
            .await?;
        Ok(Arc::new(WebhookReconciler::new(
            Arc::new(client),
            Arc::clone(&self.secrets),
        )))
    }
}
