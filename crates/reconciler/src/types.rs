//! Core types for the reconciler.

use std::collections::BTreeMap;
use std::fmt;

use apiservice_core::{ApiServiceEntry, OperatorConfig};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Fully qualified resource name of APIService objects.
pub const API_SERVICE_RESOURCE: &str = "apiservices.apiregistration.k8s.io";

/// Condition type an APIService uses to report it is serving.
pub const AVAILABLE_CONDITION: &str = "Available";

/// Annotation asking the service CA to inject its bundle into the APIService.
pub const INJECT_CABUNDLE_ANNOTATION: &str = "service.alpha.openshift.io/inject-cabundle";

/// Tri-state condition status, serialised as `True` / `False` / `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl ConditionStatus {
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::True => "True",
            Self::False => "False",
            Self::Unknown => "Unknown",
        };
        f.write_str(text)
    }
}

/// Reference to the service backing an APIService.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReference {
    pub namespace: String,
    pub name: String,
}

/// Spec of an APIService registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiServiceSpec {
    pub group: String,
    pub version: String,
    pub service: ServiceReference,
    pub group_priority_minimum: i32,
    pub version_priority: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// One entry of an APIService's status condition list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiServiceCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiServiceCondition {
    pub fn available(status: ConditionStatus, message: impl Into<String>) -> Self {
        Self {
            type_: AVAILABLE_CONDITION.to_string(),
            status,
            reason: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiServiceStatus {
    #[serde(default)]
    pub conditions: Vec<ApiServiceCondition>,
}

/// An APIService object as held by the remote store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiService {
    pub metadata: ObjectMeta,
    pub spec: ApiServiceSpec,
    #[serde(default)]
    pub status: ApiServiceStatus,
}

impl ApiService {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// The `Available` entry of the status condition list, if reported.
    pub fn available_condition(&self) -> Option<&ApiServiceCondition> {
        self.status
            .conditions
            .iter()
            .find(|c| c.type_ == AVAILABLE_CONDITION)
    }

    /// Replace the status conditions, keeping metadata and spec.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Vec<ApiServiceCondition>) -> Self {
        self.status.conditions = conditions;
        self
    }
}

/// An APIService the operator declares should exist.
///
/// Immutable for the duration of a pass; the reconciler only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredApiService {
    name: String,
    annotations: BTreeMap<String, String>,
    spec: ApiServiceSpec,
}

impl DesiredApiService {
    /// Declare an APIService for `group`/`version` backed by `service`.
    ///
    /// The identity is always `<version>.<group>`.
    pub fn new(group: impl Into<String>, version: impl Into<String>, service: ServiceReference) -> Self {
        let group = group.into();
        let version = version.into();
        let mut annotations = BTreeMap::new();
        annotations.insert(INJECT_CABUNDLE_ANNOTATION.to_string(), "true".to_string());
        Self {
            name: format!("{version}.{group}"),
            annotations,
            spec: ApiServiceSpec {
                group,
                version,
                service,
                group_priority_minimum: apiservice_core::config::DEFAULT_GROUP_PRIORITY_MINIMUM,
                version_priority: apiservice_core::config::DEFAULT_VERSION_PRIORITY,
            },
        }
    }

    #[must_use]
    pub const fn with_priorities(mut self, group_priority_minimum: i32, version_priority: i32) -> Self {
        self.spec.group_priority_minimum = group_priority_minimum;
        self.spec.version_priority = version_priority;
        self
    }

    /// Build from a config entry and the shared backing service.
    pub fn from_entry(entry: &ApiServiceEntry, service: &ServiceReference) -> Self {
        Self::new(entry.group.clone(), entry.version.clone(), service.clone())
            .with_priorities(entry.group_priority_minimum(), entry.version_priority())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn spec(&self) -> &ApiServiceSpec {
        &self.spec
    }

    /// The object to create when the APIService does not exist yet.
    pub fn to_object(&self) -> ApiService {
        ApiService {
            metadata: ObjectMeta {
                name: self.name.clone(),
                annotations: self.annotations.clone(),
            },
            spec: self.spec.clone(),
            status: ApiServiceStatus::default(),
        }
    }
}

/// Build the desired APIService set declared in the operator config.
pub fn desired_from_config(config: &OperatorConfig) -> Vec<DesiredApiService> {
    let service = ServiceReference {
        namespace: config.target_namespace.clone(),
        name: config.service_name.clone(),
    };
    config
        .api_services
        .iter()
        .map(|entry| DesiredApiService::from_entry(entry, &service))
        .collect_vec()
}

/// What one pass learned about a single APIService.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Creating the object failed; carries the store error text.
    EnsureFailed(String),
    /// Reading the object back failed; carries the store error text.
    FetchFailed(String),
    /// The object exists but is not serving; carries the remote message.
    Unavailable(String),
    Available,
}

impl Outcome {
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Per-APIService result of one pass. Created fresh every pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObservation {
    pub name: String,
    pub outcome: Outcome,
}

impl RemoteObservation {
    pub fn new(name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            name: name.into(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_service() -> ServiceReference {
        ServiceReference {
            namespace: "openshift-apiserver".to_string(),
            name: "api".to_string(),
        }
    }

    #[test]
    fn test_desired_identity_is_version_dot_group() {
        let desired = DesiredApiService::new("apps.openshift.io", "v1", api_service());
        assert_eq!(desired.name(), "v1.apps.openshift.io");
        assert_eq!(desired.spec().group_priority_minimum, 9900);
        assert_eq!(desired.spec().version_priority, 15);
    }

    #[test]
    fn test_to_object_carries_cabundle_annotation() {
        let object = DesiredApiService::new("build.openshift.io", "v1", api_service()).to_object();
        assert_eq!(object.name(), "v1.build.openshift.io");
        assert_eq!(
            object.metadata.annotations.get(INJECT_CABUNDLE_ANNOTATION).map(String::as_str),
            Some("true")
        );
        assert!(object.status.conditions.is_empty());
    }

    #[test]
    fn test_available_condition_lookup() {
        let object = ApiService::default().with_conditions(vec![
            ApiServiceCondition {
                type_: "Other".to_string(),
                status: ConditionStatus::True,
                reason: None,
                message: None,
            },
            ApiServiceCondition::available(ConditionStatus::False, "down"),
        ]);
        let condition = object.available_condition();
        assert_eq!(condition.map(|c| c.status), Some(ConditionStatus::False));
    }

    #[test]
    fn test_api_service_json_shape() {
        let object = DesiredApiService::new("apps.openshift.io", "v1", api_service()).to_object();
        let json = serde_json::to_value(&object).ok();
        let priority = json
            .as_ref()
            .and_then(|v| v.pointer("/spec/groupPriorityMinimum"))
            .and_then(serde_json::Value::as_i64);
        assert_eq!(priority, Some(9900));
    }

    #[test]
    fn test_condition_status_serialises_as_word() {
        let text = serde_json::to_string(&ConditionStatus::Unknown).ok();
        assert_eq!(text.as_deref(), Some("\"Unknown\""));
    }

    #[test]
    fn test_outcome_classification() {
        assert!(Outcome::Available.is_available());
        assert!(!Outcome::EnsureFailed("x".into()).is_available());
        assert!(!Outcome::Unavailable("x".into()).is_available());
    }
}
