//! # AccessKey
//!
//! SSH access key granting read or write access to a single repository.

use crate::bitbucket::{self, Permission, Repo};
use crate::crd::resource::{Condition, ResourceSpec};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// AccessKey Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: bitbucket-server.crossplane.io/v1alpha1
/// kind: AccessKey
/// metadata:
///   name: ci-deploy-key
/// spec:
///   providerConfigRef:
///     name: default
///   writeConnectionSecretToRef:
///     name: ci-deploy-key
///     namespace: ci
///   forProvider:
///     projectKey: PROJ
///     repoName: service
///     publicKey:
///       label: ci
///       permission: REPO_READ
/// ```
///
/// Leaving `publicKey.key` empty generates a keypair at creation; the private
/// key is published as `ssh-privatekey` in the connection secret.
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "AccessKey",
    group = "bitbucket-server.crossplane.io",
    version = "v1alpha1",
    status = "AccessKeyStatus",
    shortname = "bbkey",
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Synced", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}, {"name":"External-Name", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeySpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    pub for_provider: AccessKeyParameters,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyParameters {
    /// Short project key, e.g. "FB" for a project called "Foo Bar"
    pub project_key: String,
    /// Repository name
    pub repo_name: String,
    pub public_key: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    /// OpenSSH public key. Leave empty to generate a keypair.
    #[serde(default)]
    pub key: String,
    /// Text description of the key
    pub label: String,
    /// Access level, the only attribute that can change after creation
    #[serde(default)]
    pub permission: Permission,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub at_provider: AccessKeyObservation,
}

/// Key as last observed on the server
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessKeyObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<PublicKey>,
}

impl From<&bitbucket::AccessKey> for AccessKeyObservation {
    fn from(key: &bitbucket::AccessKey) -> Self {
        Self {
            id: Some(key.id),
            key: Some(PublicKey {
                key: key.key.clone(),
                label: key.label.clone(),
                permission: key.permission,
            }),
        }
    }
}

impl AccessKey {
    #[must_use]
    pub fn repo(&self) -> Repo {
        Repo::new(
            self.spec.for_provider.project_key.clone(),
            self.spec.for_provider.repo_name.clone(),
        )
    }

    /// Desired state as sent to the server
    #[must_use]
    pub fn access_key(&self) -> bitbucket::AccessKey {
        let public_key = &self.spec.for_provider.public_key;
        bitbucket::AccessKey {
            id: 0,
            key: public_key.key.trim().to_string(),
            label: public_key.label.clone(),
            permission: public_key.permission,
        }
    }

    pub fn status_mut(&mut self) -> &mut AccessKeyStatus {
        self.status.get_or_insert_with(AccessKeyStatus::default)
    }
}
