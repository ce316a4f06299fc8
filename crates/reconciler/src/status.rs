//! Operator status record and condition upsert.
//!
//! The operator status is shared with other controllers, so writes are scoped
//! to a single named condition: [`set_condition`] replaces the entry with the
//! same type and leaves every other entry untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ConditionStatus;

/// Condition this reconciler owns on the operator status.
pub const API_SERVICES_AVAILABLE: &str = "APIServicesAvailable";

/// Reason reported whenever any APIService is failing or unavailable.
pub const REASON_ERROR: &str = "Error";

/// Whether the operator should act on its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ManagementState {
    #[default]
    Managed,
    Unmanaged,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_transition_time: DateTime<Utc>,
}

impl OperatorCondition {
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: Option<String>,
        message: Option<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason,
            message,
            last_transition_time: Utc::now(),
        }
    }

    /// Same status, reason and message, ignoring the transition time.
    pub fn same_state(&self, other: &Self) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperandVersion {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorStatus {
    #[serde(default)]
    pub conditions: Vec<OperatorCondition>,
    #[serde(default)]
    pub versions: Vec<OperandVersion>,
}

impl OperatorStatus {
    pub fn condition(&self, type_: &str) -> Option<&OperatorCondition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    pub fn version(&self, name: &str) -> Option<&str> {
        self.versions
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.version.as_str())
    }
}

/// Spec and status of the operator, as read at the start of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorState {
    #[serde(default)]
    pub management_state: ManagementState,
    #[serde(default)]
    pub status: OperatorStatus,
}

/// Upsert `condition` by type.
///
/// The transition time of an existing entry is kept when its status does not
/// change. Returns whether anything other than the transition time changed.
pub fn set_condition(conditions: &mut Vec<OperatorCondition>, condition: OperatorCondition) -> bool {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            let changed = !existing.same_state(&condition);
            let last_transition_time = if existing.status == condition.status {
                existing.last_transition_time
            } else {
                condition.last_transition_time
            };
            *existing = OperatorCondition {
                last_transition_time,
                ..condition
            };
            changed
        }
        None => {
            conditions.push(condition);
            true
        }
    }
}

/// Upsert an operand version by name.
pub fn set_version(versions: &mut Vec<OperandVersion>, name: &str, version: &str) {
    match versions.iter_mut().find(|v| v.name == name) {
        Some(existing) => existing.version = version.to_string(),
        None => versions.push(OperandVersion {
            name: name.to_string(),
            version: version.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn condition(type_: &str, status: ConditionStatus) -> OperatorCondition {
        OperatorCondition::new(type_, status, None, None)
    }

    #[test]
    fn test_set_condition_appends_new_type() {
        let mut conditions = vec![condition("Degraded", ConditionStatus::False)];
        let changed = set_condition(
            &mut conditions,
            condition(API_SERVICES_AVAILABLE, ConditionStatus::True),
        );

        assert!(changed);
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].type_, "Degraded");
    }

    #[test]
    fn test_set_condition_keeps_transition_time_when_status_unchanged() {
        let mut original = condition(API_SERVICES_AVAILABLE, ConditionStatus::False);
        original.last_transition_time = original.last_transition_time - Duration::hours(1);
        let before = original.last_transition_time;
        let mut conditions = vec![original];

        let update = OperatorCondition::new(
            API_SERVICES_AVAILABLE,
            ConditionStatus::False,
            Some(REASON_ERROR.to_string()),
            Some("new message".to_string()),
        );
        let changed = set_condition(&mut conditions, update);

        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time, before);
        assert_eq!(conditions[0].message.as_deref(), Some("new message"));
    }

    #[test]
    fn test_set_condition_moves_transition_time_on_status_change() {
        let mut original = condition(API_SERVICES_AVAILABLE, ConditionStatus::False);
        original.last_transition_time = original.last_transition_time - Duration::hours(1);
        let before = original.last_transition_time;
        let mut conditions = vec![original];

        set_condition(
            &mut conditions,
            condition(API_SERVICES_AVAILABLE, ConditionStatus::True),
        );

        assert!(conditions[0].last_transition_time > before);
        assert_eq!(conditions[0].status, ConditionStatus::True);
    }

    #[test]
    fn test_set_condition_identical_reports_unchanged() {
        let mut conditions = vec![condition(API_SERVICES_AVAILABLE, ConditionStatus::True)];
        let changed = set_condition(
            &mut conditions,
            condition(API_SERVICES_AVAILABLE, ConditionStatus::True),
        );
        assert!(!changed);
    }

    #[test]
    fn test_set_version_upserts() {
        let mut versions = Vec::new();
        set_version(&mut versions, "openshift-apiserver", "4.1.0");
        set_version(&mut versions, "openshift-apiserver", "4.2.0");

        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, "4.2.0");
    }

    #[test]
    fn test_operator_state_defaults_to_managed() {
        let state: Option<OperatorState> = serde_json::from_str("{}").ok();
        assert_eq!(
            state.map(|s| s.management_state),
            Some(ManagementState::Managed)
        );
    }
}
