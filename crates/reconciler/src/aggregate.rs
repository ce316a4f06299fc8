//! Condition aggregator: folds per-APIService observations into the single
//! `APIServicesAvailable` condition.
//!
//! The aggregator is a pure function and cannot fail. Failures are kept as
//! structured `(name, cause)` pairs until the message is rendered, and lines
//! are sorted so the message does not depend on evaluation order. Identical
//! lines are kept: the merge is a multiset merge. Line breaks inside a cause
//! are flattened to spaces so each failing APIService is exactly one line.

use itertools::Itertools;

use crate::status::{OperatorCondition, API_SERVICES_AVAILABLE, REASON_ERROR};
use crate::types::{ConditionStatus, Outcome, RemoteObservation, API_SERVICE_RESOURCE};

/// One failing or unavailable APIService.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Failure {
    pub name: String,
    pub cause: String,
}

impl Failure {
    /// Message line for this failure, `<resource>/<name>: <cause>`.
    pub fn line(&self) -> String {
        format!("{API_SERVICE_RESOURCE}/{}: {}", self.name, self.cause)
    }

    fn from_observation(observation: &RemoteObservation) -> Option<Self> {
        let cause = match &observation.outcome {
            Outcome::EnsureFailed(cause) | Outcome::FetchFailed(cause) => cause.clone(),
            Outcome::Unavailable(message) => format!("not available: {message}"),
            Outcome::Available => return None,
        };
        Some(Self {
            name: observation.name.clone(),
            cause: cause.replace(['\r', '\n'], " "),
        })
    }
}

/// Aggregated availability of all desired APIServices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedCondition {
    pub status: ConditionStatus,
    pub reason: Option<String>,
    pub message: Option<String>,
    failures: Vec<Failure>,
}

impl AggregatedCondition {
    /// The structured failures behind the message, sorted by line.
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub const fn is_available(&self) -> bool {
        self.status.is_true()
    }

    /// Message lines; empty when available.
    pub fn lines(&self) -> Vec<&str> {
        self.message
            .as_deref()
            .map(|m| m.split('\n').collect_vec())
            .unwrap_or_default()
    }

    /// The condition to upsert on the operator status.
    pub fn to_operator_condition(&self) -> OperatorCondition {
        OperatorCondition::new(
            API_SERVICES_AVAILABLE,
            self.status,
            self.reason.clone(),
            self.message.clone(),
        )
    }
}

/// Combine the observations of one pass into the aggregated condition.
pub fn aggregate(observations: &[RemoteObservation]) -> AggregatedCondition {
    let failures = observations
        .iter()
        .filter_map(Failure::from_observation)
        .sorted_by_cached_key(Failure::line)
        .collect_vec();

    if failures.is_empty() {
        return AggregatedCondition {
            status: ConditionStatus::True,
            reason: None,
            message: None,
            failures,
        };
    }

    let message = failures.iter().map(Failure::line).join("\n");
    AggregatedCondition {
        status: ConditionStatus::False,
        reason: Some(REASON_ERROR.to_string()),
        message: Some(message),
        failures,
    }
}
