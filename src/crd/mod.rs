//! # Custom Resource Definitions
//!
//! CRD types for the Bitbucket Server controller.
//!
//! ## Module Structure
//!
//! - `resource.rs` - Spec fields and conditions shared by managed resources
//! - `access_key.rs` - `AccessKey` managed resource
//! - `webhook.rs` - `Webhook` managed resource
//! - `provider_config.rs` - `ProviderConfig` connection settings

mod access_key;
mod provider_config;
mod resource;
mod webhook;

use crate::managed::Managed;
use kube::ResourceExt;

pub use access_key::{
    AccessKey, AccessKeyObservation, AccessKeyParameters, AccessKeySpec, AccessKeyStatus,
    PublicKey,
};
pub use provider_config::{
    CredentialsSource, ProviderConfig, ProviderConfigSpec, ProviderCredentials,
    SecretKeySelector, TlsConfig,
};
pub use resource::{
    set_condition, Condition, DeletionPolicy, ProviderConfigReference, ReconcileCondition,
    ResourceSpec, SecretReference, CONDITION_READY, CONDITION_SYNCED, EXTERNAL_NAME_ANNOTATION,
};
pub use webhook::{
    BitbucketWebhook, BitbucketWebhookConfiguration, Webhook, WebhookObservation,
    WebhookParameters, WebhookSpec, WebhookStatus,
};

fn external_name_of<K: ResourceExt>(resource: &K) -> Option<&str> {
    resource
        .annotations()
        .get(EXTERNAL_NAME_ANNOTATION)
        .map(String::as_str)
        .filter(|name| !name.is_empty())
}

fn set_external_name_on<K: ResourceExt>(resource: &mut K, name: String) {
    resource
        .annotations_mut()
        .insert(EXTERNAL_NAME_ANNOTATION.to_string(), name);
}

impl Managed for AccessKey {
    fn external_name(&self) -> Option<&str> {
        external_name_of(self)
    }

    fn set_external_name(&mut self, name: String) {
        set_external_name_on(self, name);
    }

    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|status| status.conditions.as_slice())
            .unwrap_or_default()
    }

    fn set_condition(&mut self, condition: Condition) {
        set_condition(&mut self.status_mut().conditions, condition);
    }

    fn resource_spec(&self) -> &ResourceSpec {
        &self.spec.resource
    }
}

impl Managed for Webhook {
    fn external_name(&self) -> Option<&str> {
        external_name_of(self)
    }

    fn set_external_name(&mut self, name: String) {
        set_external_name_on(self, name);
    }

    fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|status| status.conditions.as_slice())
            .unwrap_or_default()
    }

    fn set_condition(&mut self, condition: Condition) {
        set_condition(&mut self.status_mut().conditions, condition);
    }

    fn resource_spec(&self) -> &ResourceSpec {
        &self.spec.resource
    }
}
