//! # Diff Engine
//!
//! Decides whether an observed resource matches the desired one.
//!
//! Each kind projects the fields it compares; everything else is excluded by
//! name, never by accident. Server ids and server metadata are never compared.
//! The result is all-or-nothing: callers issue a full Update on any difference.

use crate::bitbucket::{AccessKey, Webhook};

/// Fields that differ between desired and observed state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    changed: Vec<&'static str>,
}

impl Diff {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a scalar field by exact equality
    #[must_use]
    pub fn scalar<T: PartialEq + ?Sized>(
        mut self,
        field: &'static str,
        desired: &T,
        observed: &T,
    ) -> Self {
        if desired != observed {
            self.changed.push(field);
        }
        self
    }

    /// Compare a list field as a multiset; order carries no meaning
    #[must_use]
    pub fn unordered(
        mut self,
        field: &'static str,
        desired: &[String],
        observed: &[String],
    ) -> Self {
        if sorted(desired) != sorted(observed) {
            self.changed.push(field);
        }
        self
    }

    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        self.changed.is_empty()
    }

    #[must_use]
    pub fn changed_fields(&self) -> &[&'static str] {
        &self.changed
    }
}

fn sorted(values: &[String]) -> Vec<&str> {
    let mut values: Vec<&str> = values.iter().map(String::as_str).collect();
    values.sort_unstable();
    values
}

/// Compare access keys
///
/// Only `permission` can change on the server. `label` and `key` are fixed at
/// creation and excluded, as are `id` and any generated key material.
#[must_use]
pub fn access_key(desired: &AccessKey, observed: &AccessKey) -> Diff {
    Diff::new().scalar("permission", &desired.permission, &observed.permission)
}

/// Compare webhooks
///
/// Excludes `id`, `createdDate`, `updatedDate` and `active`. The signing secret
/// is compared only when the desired state declares one; a generated secret
/// lives on the server alone.
#[must_use]
pub fn webhook(desired: &Webhook, observed: &Webhook) -> Diff {
    let diff = Diff::new()
        .scalar("name", desired.name.as_str(), observed.name.as_str())
        .scalar("url", desired.url.as_str(), observed.url.as_str())
        .unordered("events", &desired.events, &observed.events);

    match &desired.configuration.secret {
        Some(secret) => diff.scalar(
            "configuration.secret",
            &Some(secret.as_str()),
            &observed.configuration.secret.as_deref(),
        ),
        None => diff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbucket::{Permission, WebhookConfiguration};

    fn events(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    fn hook() -> Webhook {
        Webhook {
            name: "ci".to_string(),
            configuration: WebhookConfiguration {
                secret: Some("s3cr3t".to_string()),
            },
            events: events(&["repo:modified", "repo:refs_changed"]),
            url: "https://ci.example.com/hook".to_string(),
            active: Some(true),
            ..Webhook::default()
        }
    }

    #[test]
    fn test_event_order_ignored() {
        let desired = hook();
        let mut observed = hook();
        observed.events.reverse();

        assert!(webhook(&desired, &observed).is_up_to_date());
    }

    #[test]
    fn test_event_multiplicity_matters() {
        let desired = hook();
        let mut observed = hook();
        observed.events.push("repo:modified".to_string());

        let diff = webhook(&desired, &observed);
        assert_eq!(diff.changed_fields(), ["events"]);
    }

    #[test]
    fn test_server_fields_ignored() {
        let desired = hook();
        let observed = Webhook {
            id: 12,
            created_date: Some(1_600_000_000_000),
            updated_date: Some(1_600_000_500_000),
            active: Some(false),
            ..hook()
        };

        assert!(webhook(&desired, &observed).is_up_to_date());
    }

    #[test]
    fn test_undeclared_secret_ignored() {
        let mut desired = hook();
        desired.configuration.secret = None;
        let observed = hook();

        assert!(webhook(&desired, &observed).is_up_to_date());
    }

    #[test]
    fn test_declared_secret_compared() {
        let desired = hook();
        let mut observed = hook();
        observed.configuration.secret = Some("rotated".to_string());

        assert_eq!(
            webhook(&desired, &observed).changed_fields(),
            ["configuration.secret"]
        );
    }

    #[test]
    fn test_declared_secret_missing_on_server() {
        let desired = hook();
        let mut observed = hook();
        observed.configuration.secret = None;

        assert_eq!(
            webhook(&desired, &observed).changed_fields(),
            ["configuration.secret"]
        );
    }

    #[test]
    fn test_url_and_name_compared() {
        let desired = hook();
        let mut observed = hook();
        observed.url = "https://other.example.com".to_string();
        observed.name = "other".to_string();

        assert_eq!(
            webhook(&desired, &observed).changed_fields(),
            ["name", "url"]
        );
    }

    #[test]
    fn test_access_key_permission_compared() {
        let desired = AccessKey {
            permission: Permission::RepoRead,
            ..AccessKey::default()
        };
        let observed = AccessKey {
            id: 99,
            permission: Permission::RepoWrite,
            ..AccessKey::default()
        };

        assert_eq!(
            access_key(&desired, &observed).changed_fields(),
            ["permission"]
        );
    }

    #[test]
    fn test_access_key_id_and_material_ignored() {
        let desired = AccessKey {
            label: "ci".to_string(),
            permission: Permission::RepoWrite,
            ..AccessKey::default()
        };
        let observed = AccessKey {
            id: 7,
            key: "ssh-rsa AAAA".to_string(),
            label: "ci".to_string(),
            permission: Permission::RepoWrite,
        };

        assert!(access_key(&desired, &observed).is_up_to_date());
    }
}
