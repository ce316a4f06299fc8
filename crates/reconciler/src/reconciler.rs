//! Reconciler implementation.
//!
//! One call to [`ApiServiceReconciler::sync`] is one reconciliation pass:
//!
//! ```text
//! read operator state -> management gate -> precondition
//!   -> ensure all -> fetch ensured -> aggregate -> write condition
//!   -> record version (only when every APIService is available)
//! ```

use std::sync::Arc;

use apiservice_core::OperatorConfig;
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, AggregatedCondition};
use crate::client::ApiServiceClient;
use crate::collect::{RemoteStatus, StatusCollector};
use crate::ensure::Ensurer;
use crate::error::{Error, Result};
use crate::events::{EventRecorder, TracingEventRecorder};
use crate::operator::{OperatorStatusStore, VersionRecorder};
use crate::provider::{DesiredApiServiceProvider, Precondition};
use crate::status::ManagementState;
use crate::types::{DesiredApiService, Outcome, RemoteObservation};

/// Configuration for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Component name the operand version is recorded under.
    pub component: String,
    /// Version recorded once every APIService is available.
    pub operand_version: String,
}

impl ReconcilerConfig {
    pub fn new(component: impl Into<String>, operand_version: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            operand_version: operand_version.into(),
        }
    }
}

impl From<&OperatorConfig> for ReconcilerConfig {
    fn from(config: &OperatorConfig) -> Self {
        Self::new(config.component.clone(), config.operand_version.clone())
    }
}

/// Why a pass did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Unmanaged,
    Removed,
    PreconditionNotMet,
}

/// Result of a pass that did not hit a pass-scoped error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The pass was not applicable; the operator status was not touched.
    Skipped(SkipReason),
    /// The condition was computed and written.
    Reconciled(AggregatedCondition),
}

impl SyncOutcome {
    /// Whether every desired APIService was available.
    pub const fn converged(&self) -> bool {
        match self {
            Self::Skipped(_) => false,
            Self::Reconciled(condition) => condition.is_available(),
        }
    }

    pub const fn condition(&self) -> Option<&AggregatedCondition> {
        match self {
            Self::Skipped(_) => None,
            Self::Reconciled(condition) => Some(condition),
        }
    }
}

/// K8s-style reconciler keeping APIServices registered and reporting their
/// aggregated availability.
pub struct ApiServiceReconciler {
    ensurer: Ensurer,
    collector: StatusCollector,
    provider: Arc<dyn DesiredApiServiceProvider>,
    precondition: Arc<dyn Precondition>,
    status: Arc<dyn OperatorStatusStore>,
    versions: Arc<dyn VersionRecorder>,
    config: ReconcilerConfig,
}

impl ApiServiceReconciler {
    /// Run one reconciliation pass.
    ///
    /// Per-APIService failures are folded into the condition and never
    /// returned from here.
    ///
    /// # Errors
    ///
    /// Returns a pass-scoped error when the operator state cannot be read, the
    /// precondition errors, the desired set cannot be obtained, or the
    /// condition cannot be written.
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let state = self
            .status
            .read()
            .await
            .map_err(|source| Error::StatusReadFailed { source })?;

        match state.management_state {
            ManagementState::Managed => {}
            ManagementState::Unmanaged => {
                debug!("Operator is unmanaged, skipping pass");
                return Ok(SyncOutcome::Skipped(SkipReason::Unmanaged));
            }
            ManagementState::Removed => {
                debug!("Operator is removed, skipping pass");
                return Ok(SyncOutcome::Skipped(SkipReason::Removed));
            }
        }

        match self.precondition.check().await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Precondition not met, skipping pass");
                return Ok(SyncOutcome::Skipped(SkipReason::PreconditionNotMet));
            }
            Err(err @ Error::PreconditionFailed { .. }) => return Err(err),
            Err(err) => return Err(Error::precondition_failed(err.to_string())),
        }

        let desired = self.provider.desired_api_services().await.map_err(|err| match err {
            Error::ProviderFailed { .. } => err,
            other => Error::provider_failed(other.to_string()),
        })?;

        info!(desired = desired.len(), "Starting reconciliation");

        let observations = self.observe(&desired).await;
        let condition = aggregate(&observations);

        self.status
            .upsert_condition(condition.to_operator_condition())
            .await
            .map_err(|source| Error::StatusWriteFailed { source })?;

        if condition.is_available() {
            self.versions
                .set_version(&self.config.component, &self.config.operand_version)
                .await;
            info!(
                component = %self.config.component,
                version = %self.config.operand_version,
                "All APIServices available"
            );
        } else {
            warn!(
                failing = condition.failures().len(),
                message = condition.message.as_deref().unwrap_or_default(),
                "APIServices not available"
            );
        }

        Ok(SyncOutcome::Reconciled(condition))
    }

    /// Ensure then fetch every desired APIService, producing exactly one
    /// observation per entry.
    ///
    /// APIServices whose ensure failed are not fetched.
    pub async fn observe(&self, desired: &[DesiredApiService]) -> Vec<RemoteObservation> {
        let ensured = self.ensurer.ensure_all(desired).await;

        let (ready, mut observations): (Vec<_>, Vec<_>) =
            ensured.into_iter().fold((Vec::new(), Vec::new()), |(mut ready, mut failed), (d, r)| {
                match r {
                    Ok(_) => ready.push(d),
                    Err(err) => failed.push(RemoteObservation::new(
                        d.name(),
                        Outcome::EnsureFailed(err.to_string()),
                    )),
                }
                (ready, failed)
            });

        let fetched = self.collector.fetch_all(ready).await;
        observations.extend(fetched.into_iter().map(|(d, result)| {
            let outcome = match result {
                Ok(RemoteStatus::Available) => Outcome::Available,
                Ok(RemoteStatus::Unavailable(message)) => Outcome::Unavailable(message),
                Err(err) => Outcome::FetchFailed(err.to_string()),
            };
            RemoteObservation::new(d.name(), outcome)
        }));

        observations
    }

}

#[allow(clippy::unnecessary_wraps)]
fn always_ready() -> Result<bool> {
    Ok(true)
}

/// Builder for [`ApiServiceReconciler`].
pub struct ReconcilerBuilder {
    client: Option<Arc<dyn ApiServiceClient>>,
    provider: Option<Arc<dyn DesiredApiServiceProvider>>,
    precondition: Option<Arc<dyn Precondition>>,
    status: Option<Arc<dyn OperatorStatusStore>>,
    versions: Option<Arc<dyn VersionRecorder>>,
    events: Option<Arc<dyn EventRecorder>>,
    config: ReconcilerConfig,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            client: None,
            provider: None,
            precondition: None,
            status: None,
            versions: None,
            events: None,
            config,
        }
    }

    /// Set the APIService client.
    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn ApiServiceClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the desired APIService provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn DesiredApiServiceProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the precondition. Defaults to always ready.
    #[must_use]
    pub fn with_precondition(mut self, precondition: Arc<dyn Precondition>) -> Self {
        self.precondition = Some(precondition);
        self
    }

    /// Set the operator status store.
    #[must_use]
    pub fn with_status(mut self, status: Arc<dyn OperatorStatusStore>) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the version recorder.
    #[must_use]
    pub fn with_versions(mut self, versions: Arc<dyn VersionRecorder>) -> Self {
        self.versions = Some(versions);
        self
    }

    /// Set the event recorder. Defaults to logging through tracing.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventRecorder>) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a required collaborator is missing.
    pub fn build(self) -> Result<ApiServiceReconciler> {
        let client = self
            .client
            .ok_or_else(|| Error::invalid_config("APIService client is required"))?;
        let provider = self
            .provider
            .ok_or_else(|| Error::invalid_config("desired APIService provider is required"))?;
        let status = self
            .status
            .ok_or_else(|| Error::invalid_config("operator status store is required"))?;
        let versions = self
            .versions
            .ok_or_else(|| Error::invalid_config("version recorder is required"))?;
        let precondition: Arc<dyn Precondition> = match self.precondition {
            Some(precondition) => precondition,
            None => Arc::new(always_ready),
        };
        let events: Arc<dyn EventRecorder> = match self.events {
            Some(events) => events,
            None => Arc::new(TracingEventRecorder),
        };

        Ok(ApiServiceReconciler {
            ensurer: Ensurer::new(client.clone(), events),
            collector: StatusCollector::new(client),
            provider,
            precondition,
            status,
            versions,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]

    use super::*;
    use crate::client::{ClientAction, InMemoryApiServiceClient, Reaction};
    use crate::error::StoreError;
    use crate::operator::{InMemoryOperatorStatus, InMemoryVersionRecorder};
    use crate::provider::InMemoryDesiredApiServices;
    use crate::status::API_SERVICES_AVAILABLE;
    use crate::types::{ApiServiceCondition, ConditionStatus, ServiceReference};

    fn desired(group: &str) -> DesiredApiService {
        DesiredApiService::new(group, "v1", ServiceReference::default())
    }

    fn available(group: &str) -> crate::types::ApiService {
        desired(group)
            .to_object()
            .with_conditions(vec![ApiServiceCondition::available(ConditionStatus::True, "")])
    }

    struct Fixture {
        client: Arc<InMemoryApiServiceClient>,
        status: Arc<InMemoryOperatorStatus>,
        versions: Arc<InMemoryVersionRecorder>,
    }

    impl Fixture {
        fn new(client: InMemoryApiServiceClient, status: InMemoryOperatorStatus) -> Self {
            Self {
                client: Arc::new(client),
                status: Arc::new(status),
                versions: Arc::new(InMemoryVersionRecorder::new()),
            }
        }

        fn builder(&self) -> ReconcilerBuilder {
            ReconcilerBuilder::new(ReconcilerConfig::new("openshift-apiserver", "4.2.0"))
                .with_client(self.client.clone())
                .with_provider(Arc::new(InMemoryDesiredApiServices::new(vec![
                    desired("apps.openshift.io"),
                    desired("build.openshift.io"),
                ])))
                .with_status(self.status.clone())
                .with_versions(self.versions.clone())
        }

        fn reconciler(&self) -> Option<ApiServiceReconciler> {
            self.builder().build().ok()
        }
    }

    #[tokio::test]
    async fn test_sync_all_available_records_version() {
        let fixture = Fixture::new(
            InMemoryApiServiceClient::with_objects([
                available("apps.openshift.io"),
                available("build.openshift.io"),
            ]),
            InMemoryOperatorStatus::new(),
        );
        let Some(reconciler) = fixture.reconciler() else {
            panic!("reconciler should build");
        };

        let outcome = reconciler.sync().await;

        assert!(outcome.as_ref().is_ok_and(SyncOutcome::converged));
        let condition = fixture.status.condition(API_SERVICES_AVAILABLE).await;
        assert_eq!(condition.map(|c| c.status), Some(ConditionStatus::True));
        assert_eq!(
            fixture.versions.version("openshift-apiserver").await.as_deref(),
            Some("4.2.0")
        );
    }

    #[tokio::test]
    async fn test_sync_unavailable_does_not_record_version() {
        let fixture = Fixture::new(
            InMemoryApiServiceClient::with_objects([available("apps.openshift.io")]),
            InMemoryOperatorStatus::new(),
        );
        let Some(reconciler) = fixture.reconciler() else {
            panic!("reconciler should build");
        };

        let outcome = reconciler.sync().await;

        // build was just created and reports no Available condition yet
        let lines = outcome
            .ok()
            .and_then(|o| o.condition().map(|c| c.lines().join("|")));
        assert_eq!(
            lines.as_deref(),
            Some("apiservices.apiregistration.k8s.io/v1.build.openshift.io: not available: no Available condition reported")
        );
        assert_eq!(fixture.versions.calls().await, 0);
    }

    #[tokio::test]
    async fn test_ensure_failure_skips_fetch_for_that_service() {
        let client = InMemoryApiServiceClient::with_objects([available("apps.openshift.io")])
            .prepend_reactor(|action| match action {
                ClientAction::Create(o) if o.name() == "v1.build.openshift.io" => {
                    Reaction::Fail(StoreError::backend("denied"))
                }
                _ => Reaction::Continue,
            });
        let fixture = Fixture::new(client, InMemoryOperatorStatus::new());
        let Some(reconciler) = fixture.reconciler() else {
            panic!("reconciler should build");
        };

        let observations = reconciler
            .observe(&[desired("apps.openshift.io"), desired("build.openshift.io")])
            .await;

        assert_eq!(observations.len(), 2);
        let gets_of = |actions: &[ClientAction], name: &str| {
            actions
                .iter()
                .filter(|a| matches!(a, ClientAction::Get(_)) && a.name() == name)
                .count()
        };
        let actions = fixture.client.actions().await;
        // apps: ensure read + status fetch; build: ensure read only
        assert_eq!(gets_of(&actions, "v1.apps.openshift.io"), 2);
        assert_eq!(gets_of(&actions, "v1.build.openshift.io"), 1);
    }

    #[tokio::test]
    async fn test_unmanaged_skips_without_status_write() {
        let fixture = Fixture::new(
            InMemoryApiServiceClient::new(),
            InMemoryOperatorStatus::with_management_state(ManagementState::Unmanaged),
        );
        let Some(reconciler) = fixture.reconciler() else {
            panic!("reconciler should build");
        };

        let outcome = reconciler.sync().await;

        assert_eq!(outcome.ok(), Some(SyncOutcome::Skipped(SkipReason::Unmanaged)));
        assert_eq!(fixture.status.writes().await, 0);
        assert!(fixture.client.actions().await.is_empty());
    }

    #[tokio::test]
    async fn test_removed_skips() {
        let fixture = Fixture::new(
            InMemoryApiServiceClient::new(),
            InMemoryOperatorStatus::with_management_state(ManagementState::Removed),
        );
        let Some(reconciler) = fixture.reconciler() else {
            panic!("reconciler should build");
        };

        let outcome = reconciler.sync().await;
        assert_eq!(outcome.ok(), Some(SyncOutcome::Skipped(SkipReason::Removed)));
    }

    #[tokio::test]
    async fn test_status_read_failure_is_pass_scoped() {
        let fixture = Fixture::new(
            InMemoryApiServiceClient::new(),
            InMemoryOperatorStatus::new().failing_reads(StoreError::backend("unreachable")),
        );
        let Some(reconciler) = fixture.reconciler() else {
            panic!("reconciler should build");
        };

        let outcome = reconciler.sync().await;
        assert!(matches!(outcome, Err(Error::StatusReadFailed { .. })));
    }

    #[tokio::test]
    async fn test_precondition_error_is_not_double_wrapped() {
        let fixture = Fixture::new(InMemoryApiServiceClient::new(), InMemoryOperatorStatus::new());
        let reconciler = fixture
            .builder()
            .with_precondition(Arc::new(|| -> Result<bool> {
                Err(Error::precondition_failed("cache not synced"))
            }))
            .build();
        let Ok(reconciler) = reconciler else {
            panic!("reconciler should build");
        };

        let outcome = reconciler.sync().await;
        assert_eq!(
            outcome.err().map(|e| e.to_string()),
            Some("precondition check failed: cache not synced".to_string())
        );
    }

    #[test]
    fn test_builder_requires_client() {
        let result = ReconcilerBuilder::new(ReconcilerConfig::new("c", "v"))
            .with_status(Arc::new(InMemoryOperatorStatus::new()))
            .build();
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_config_from_operator_config() {
        let operator = OperatorConfig {
            component: "openshift-apiserver".to_string(),
            operand_version: "4.2.0".to_string(),
            target_namespace: "openshift-apiserver".to_string(),
            service_name: "api".to_string(),
            sync_interval_secs: 30,
            max_consecutive_errors: 10,
            api_services: Vec::new(),
        };
        let config = ReconcilerConfig::from(&operator);
        assert_eq!(config, ReconcilerConfig::new("openshift-apiserver", "4.2.0"));
    }
}
