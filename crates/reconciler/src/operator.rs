//! Operator status store and version recorder seams.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::status::{set_condition, set_version, ManagementState, OperatorCondition, OperatorState};

/// Access to the operator's own spec and status record.
#[async_trait]
pub trait OperatorStatusStore: Send + Sync {
    /// Read the current operator state.
    async fn read(&self) -> Result<OperatorState, StoreError>;

    /// Upsert one condition by type, leaving all other conditions untouched.
    async fn upsert_condition(&self, condition: OperatorCondition) -> Result<(), StoreError>;
}

/// Records the version of a component once it is fully reconciled.
///
/// Best-effort from the reconciler's point of view: nothing is returned.
#[async_trait]
pub trait VersionRecorder: Send + Sync {
    async fn set_version(&self, component: &str, version: &str);
}

/// In-memory operator status for testing.
#[derive(Debug, Default)]
pub struct InMemoryOperatorStatus {
    state: RwLock<OperatorState>,
    read_failure: Option<StoreError>,
    write_failure: Option<StoreError>,
    writes: RwLock<usize>,
}

impl InMemoryOperatorStatus {
    /// Create a Managed operator with an empty status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `state`.
    pub fn with_state(state: OperatorState) -> Self {
        Self {
            state: RwLock::new(state),
            ..Self::default()
        }
    }

    /// Create an empty store in the given management state.
    pub fn with_management_state(management_state: ManagementState) -> Self {
        Self::with_state(OperatorState {
            management_state,
            ..OperatorState::default()
        })
    }

    /// Make every read fail with `err`.
    #[must_use]
    pub fn failing_reads(mut self, err: StoreError) -> Self {
        self.read_failure = Some(err);
        self
    }

    /// Make every condition write fail with `err`.
    #[must_use]
    pub fn failing_writes(mut self, err: StoreError) -> Self {
        self.write_failure = Some(err);
        self
    }

    /// Snapshot of the stored state.
    pub async fn state(&self) -> OperatorState {
        self.state.read().await.clone()
    }

    pub async fn condition(&self, type_: &str) -> Option<OperatorCondition> {
        self.state.read().await.status.condition(type_).cloned()
    }

    /// Number of successful condition writes.
    pub async fn writes(&self) -> usize {
        *self.writes.read().await
    }
}

#[async_trait]
impl OperatorStatusStore for InMemoryOperatorStatus {
    async fn read(&self) -> Result<OperatorState, StoreError> {
        if let Some(err) = &self.read_failure {
            return Err(err.clone());
        }
        Ok(self.state.read().await.clone())
    }

    async fn upsert_condition(&self, condition: OperatorCondition) -> Result<(), StoreError> {
        if let Some(err) = &self.write_failure {
            return Err(err.clone());
        }
        let mut state = self.state.write().await;
        set_condition(&mut state.status.conditions, condition);
        let mut writes = self.writes.write().await;
        *writes = writes.saturating_add(1);
        Ok(())
    }
}

#[async_trait]
impl VersionRecorder for InMemoryOperatorStatus {
    async fn set_version(&self, component: &str, version: &str) {
        let mut state = self.state.write().await;
        set_version(&mut state.status.versions, component, version);
    }
}

/// Version recorder that only keeps the latest version per component.
#[derive(Debug, Default)]
pub struct InMemoryVersionRecorder {
    versions: RwLock<BTreeMap<String, String>>,
    calls: RwLock<usize>,
}

impl InMemoryVersionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn version(&self, component: &str) -> Option<String> {
        self.versions.read().await.get(component).cloned()
    }

    /// Number of times a version was recorded.
    pub async fn calls(&self) -> usize {
        *self.calls.read().await
    }
}

#[async_trait]
impl VersionRecorder for InMemoryVersionRecorder {
    async fn set_version(&self, component: &str, version: &str) {
        self.versions
            .write()
            .await
            .insert(component.to_string(), version.to_string());
        let mut calls = self.calls.write().await;
        *calls = calls.saturating_add(1);
    }
}
