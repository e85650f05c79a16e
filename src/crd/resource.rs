//! # Managed Resource Fields
//!
//! Spec fields and status conditions shared by every managed resource kind.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation holding the server-assigned identity of the external resource
pub const EXTERNAL_NAME_ANNOTATION: &str = "crossplane.io/external-name";

/// Condition type driven by the external reconcilers
pub const CONDITION_READY: &str = "Ready";
/// Condition type driven by the host loop
pub const CONDITION_SYNCED: &str = "Synced";

/// Fields common to every managed resource spec
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// ProviderConfig holding the server URL and credentials
    #[serde(default)]
    pub provider_config_ref: ProviderConfigReference,
    /// Secret that receives generated connection details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,
    /// What happens to the external resource when this object is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ProviderConfigReference {
    pub name: String,
}

impl Default for ProviderConfigReference {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct SecretReference {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
pub enum DeletionPolicy {
    /// Delete the external resource with the managed resource
    #[default]
    Delete,
    /// Leave the external resource in place
    Orphan,
}

/// Lifecycle phase reported on the `Ready` condition
///
/// Reflects what the reconciler last attempted, not what the server holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileCondition {
    Creating,
    Available,
    Deleting,
}

impl ReconcileCondition {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcileCondition::Creating => "Creating",
            ReconcileCondition::Available => "Available",
            ReconcileCondition::Deleting => "Deleting",
        }
    }
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    fn new(r#type: &str, status: bool, reason: &str, message: Option<String>) -> Self {
        Self {
            r#type: r#type.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            last_transition_time: Some(Utc::now().to_rfc3339()),
            reason: Some(reason.to_string()),
            message,
        }
    }

    #[must_use]
    pub fn ready(phase: ReconcileCondition) -> Self {
        Self::new(
            CONDITION_READY,
            phase == ReconcileCondition::Available,
            phase.reason(),
            None,
        )
    }

    #[must_use]
    pub fn creating() -> Self {
        Self::ready(ReconcileCondition::Creating)
    }

    #[must_use]
    pub fn available() -> Self {
        Self::ready(ReconcileCondition::Available)
    }

    #[must_use]
    pub fn deleting() -> Self {
        Self::ready(ReconcileCondition::Deleting)
    }

    #[must_use]
    pub fn reconcile_success() -> Self {
        Self::new(CONDITION_SYNCED, true, "ReconcileSuccess", None)
    }

    #[must_use]
    pub fn reconcile_error(message: impl Into<String>) -> Self {
        Self::new(
            CONDITION_SYNCED,
            false,
            "ReconcileError",
            Some(message.into()),
        )
    }

    /// Same type, status, reason and message
    #[must_use]
    pub fn equivalent(&self, other: &Condition) -> bool {
        self.r#type == other.r#type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Insert or replace the condition of the same type
///
/// The existing transition time is kept when nothing but the timestamp changed,
/// so repeated passes do not churn the status.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        Some(existing) if existing.equivalent(&condition) => {}
        Some(existing) => *existing = condition,
        None => conditions.push(condition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_condition_replaces_same_type() {
        let mut conditions = vec![Condition::creating(), Condition::reconcile_success()];
        set_condition(&mut conditions, Condition::available());

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].reason.as_deref(), Some("Available"));
        assert_eq!(conditions[0].status, "True");
    }

    #[test]
    fn test_set_condition_keeps_transition_time_when_unchanged() {
        let mut first = Condition::available();
        first.last_transition_time = Some("2021-01-01T00:00:00+00:00".to_string());
        let mut conditions = vec![first];

        set_condition(&mut conditions, Condition::available());

        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2021-01-01T00:00:00+00:00")
        );
    }

    #[test]
    fn test_ready_status_only_true_when_available() {
        assert_eq!(Condition::creating().status, "False");
        assert_eq!(Condition::deleting().status, "False");
        assert_eq!(Condition::available().status, "True");
    }

    #[test]
    fn test_reconcile_error_carries_message() {
        let condition = Condition::reconcile_error("cannot get webhook");
        assert_eq!(condition.r#type, CONDITION_SYNCED);
        assert_eq!(condition.message.as_deref(), Some("cannot get webhook"));
    }

    #[test]
    fn test_ready_reason_names_phase() {
        for (phase, reason) in [
            (ReconcileCondition::Creating, "Creating"),
            (ReconcileCondition::Available, "Available"),
            (ReconcileCondition::Deleting, "Deleting"),
        ] {
            let condition = Condition::ready(phase);
            assert_eq!(condition.r#type, CONDITION_READY);
            assert_eq!(condition.reason.as_deref(), Some(reason));
        }
    }
}
