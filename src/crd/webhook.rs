//! # Webhook
//!
//! Repository webhook posting events to an HTTP endpoint.

use crate::bitbucket::{self, Repo, WebhookConfiguration};
use crate::crd::resource::{Condition, ResourceSpec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Webhook Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: bitbucket-server.crossplane.io/v1alpha1
/// kind: Webhook
/// metadata:
///   name: ci-trigger
/// spec:
///   writeConnectionSecretToRef:
///     name: ci-trigger-webhook
///     namespace: ci
///   forProvider:
///     projectKey: PROJ
///     repoName: service
///     webhook:
///       name: ci
///       events:
///         - repo:refs_changed
///         - pr:opened
///       url: https://ci.example.com/hooks/bitbucket
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Webhook",
    group = "bitbucket-server.crossplane.io",
    version = "v1alpha1",
    status = "WebhookStatus",
    shortname = "bbhook",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    pub for_provider: WebhookParameters,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookParameters {
    /// Short project key, e.g. "FB" for a project called "Foo Bar"
    pub project_key: String,
    /// Repository name
    pub repo_name: String,
    pub webhook: BitbucketWebhook,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketWebhook {
    pub name: String,
    #[serde(default)]
    pub configuration: BitbucketWebhookConfiguration,
    /// Events the webhook subscribes to, e.g. `repo:refs_changed`. Order is not significant.
    #[serde(default)]
    pub events: Vec<String>,
    /// Endpoint the server POSTs events to
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketWebhookConfiguration {
    /// Signing secret. Leave empty to have one generated into the connection details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub at_provider: WebhookObservation,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Webhook {
    #[must_use]
    pub fn repo(&self) -> Repo {
        Repo::new(
            self.spec.for_provider.project_key.clone(),
            self.spec.for_provider.repo_name.clone(),
        )
    }

    /// Declared signing secret, if any
    #[must_use]
    pub fn declared_secret(&self) -> Option<&str> {
        self.spec
            .for_provider
            .webhook
            .configuration
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    /// Desired state as sent to the server
    #[must_use]
    pub fn webhook(&self) -> bitbucket::Webhook {
        let hook = &self.spec.for_provider.webhook;
        bitbucket::Webhook {
            name: hook.name.clone(),
            configuration: WebhookConfiguration {
                secret: self.declared_secret().map(str::to_string),
            },
            events: hook.events.clone(),
            url: hook.url.clone(),
            active: Some(true),
            ..bitbucket::Webhook::default()
        }
    }

    pub fn status_mut(&mut self) -> &mut WebhookStatus {
        self.status.get_or_insert_with(WebhookStatus::default)
    }
}
