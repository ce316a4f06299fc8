//! Process wiring: file-backed stores, the reconciler, and the three commands.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use apiservice_core::{OperatorConfig, ResultExt};
use apiservice_reconciler::{
    desired_from_config, ApiServiceReconciler, FileApiServiceClient, FileOperatorStatusStore,
    InMemoryDesiredApiServices, LoopConfig, OperatorCondition, OperatorStatusStore,
    ReconcilerBuilder, ReconcilerConfig, ReconciliationLoop, SyncOutcome, TracingEventRecorder,
    API_SERVICES_AVAILABLE,
};
use tracing::{info, warn};

const API_SERVICES_DIR: &str = "apiservices";
const STATUS_FILE: &str = "status.json";

/// Everything a command needs, built once from the config.
pub struct App {
    reconciler: Arc<ApiServiceReconciler>,
    status: Arc<FileOperatorStatusStore>,
    loop_config: LoopConfig,
}

impl App {
    /// Wire the reconciler against stores under `state_dir`.
    pub fn new(config: &OperatorConfig, state_dir: &Path) -> Result<Self> {
        let client = Arc::new(FileApiServiceClient::new(state_dir.join(API_SERVICES_DIR)));
        let status = Arc::new(FileOperatorStatusStore::new(state_dir.join(STATUS_FILE)));
        let desired = Arc::new(InMemoryDesiredApiServices::new(desired_from_config(config)));

        let reconciler = ReconcilerBuilder::new(ReconcilerConfig::from(config))
            .with_client(client)
            .with_provider(desired)
            .with_status(status.clone())
            .with_versions(status.clone())
            .with_events(Arc::new(TracingEventRecorder))
            .build()
            .context("Failed to build reconciler")?;

        Ok(Self {
            reconciler: Arc::new(reconciler),
            status,
            loop_config: LoopConfig {
                interval: config.sync_interval(),
                max_errors: config.max_consecutive_errors,
                stop_on_error: false,
            },
        })
    }

    /// One pass. Returns whether every APIService is available.
    pub async fn sync(&self) -> Result<bool> {
        let outcome = self
            .reconciler
            .sync()
            .await
            .context("Reconciliation pass failed")?;

        match &outcome {
            SyncOutcome::Skipped(reason) => info!(?reason, "Pass skipped"),
            SyncOutcome::Reconciled(condition) if condition.is_available() => {
                info!("All APIServices available");
            }
            SyncOutcome::Reconciled(condition) => {
                for line in condition.lines() {
                    warn!("{line}");
                }
            }
        }
        Ok(outcome.converged())
    }

    /// Reconcile on the configured interval until Ctrl+C.
    pub async fn run(&self) -> Result<()> {
        let mut reconciliation =
            ReconciliationLoop::new(self.reconciler.clone(), self.loop_config.clone());
        let stopper = reconciliation.stopper();

        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.into_option_logged().is_some() {
                info!("Received Ctrl+C, stopping");
                stopper.stop();
            }
        });

        reconciliation
            .run()
            .await
            .context("Reconciliation loop gave up")
    }

    /// The stored `APIServicesAvailable` condition, if any pass has written one.
    pub async fn status(&self) -> Result<Option<OperatorCondition>> {
        let state = self
            .status
            .read()
            .await
            .with_context(|| format!("Failed to read {}", self.status.path().display()))?;
        Ok(state.status.condition(API_SERVICES_AVAILABLE).cloned())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use super::*;
    use apiservice_core::ConfigFormat;
    use apiservice_reconciler::ConditionStatus;

    const CONFIG: &str = r#"
operand_version = "4.2.0"

[[api_services]]
group = "apps.openshift.io"
version = "v1"

[[api_services]]
group = "build.openshift.io"
version = "v1"
"#;

    fn config() -> OperatorConfig {
        OperatorConfig::parse(CONFIG, ConfigFormat::Toml).unwrap()
    }

    #[tokio::test]
    async fn test_status_is_empty_before_first_pass() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(&config(), dir.path()).unwrap();

        assert_eq!(app.status().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sync_creates_objects_and_writes_condition() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(&config(), dir.path()).unwrap();

        // Freshly created objects carry no Available condition yet
        let converged = app.sync().await.unwrap();
        assert!(!converged);

        let objects = dir.path().join(API_SERVICES_DIR);
        assert!(objects.join("v1.apps.openshift.io.json").exists());
        assert!(objects.join("v1.build.openshift.io.json").exists());

        let Some(condition) = app.status().await.unwrap() else {
            panic!("condition should be written");
        };
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason.as_deref(), Some("Error"));
        assert_eq!(condition.message.map(|m| m.lines().count()), Some(2));
    }

    #[tokio::test]
    async fn test_second_sync_keeps_transition_time() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(&config(), dir.path()).unwrap();

        app.sync().await.unwrap();
        let first = app.status().await.unwrap();
        app.sync().await.unwrap();
        let second = app.status().await.unwrap();

        assert_eq!(first, second);
    }
}
