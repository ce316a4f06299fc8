//! File-backed collaborators used by the operator binary.
//!
//! - [`FileApiServiceClient`]: one JSON document per APIService in a directory
//! - [`FileOperatorStatusStore`]: a single JSON document holding the operator
//!   state, also used as the version recorder

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::ApiServiceClient;
use crate::error::StoreError;
use crate::operator::{OperatorStatusStore, VersionRecorder};
use crate::status::{set_condition, set_version, OperatorCondition, OperatorState};
use crate::types::{ApiService, API_SERVICE_RESOURCE};

/// APIService store keeping `<name>.json` files in a directory.
#[derive(Debug, Clone)]
pub struct FileApiServiceClient {
    dir: PathBuf,
}

impl FileApiServiceClient {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn object_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return Err(StoreError::backend(format!(
                "invalid {API_SERVICE_RESOURCE} name \"{name}\""
            )));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }
}

fn io_error(name: &str, err: &std::io::Error) -> StoreError {
    StoreError::Io {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

fn serialization_error(name: &str, err: &serde_json::Error) -> StoreError {
    StoreError::Serialization {
        name: name.to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl ApiServiceClient for FileApiServiceClient {
    async fn create(&self, object: &ApiService) -> Result<ApiService, StoreError> {
        let name = object.name();
        let path = self.object_path(name)?;
        let body = serde_json::to_vec_pretty(object).map_err(|e| serialization_error(name, &e))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(name, &e))?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => StoreError::already_exists(API_SERVICE_RESOURCE, name),
                _ => io_error(name, &e),
            })?;
        file.write_all(&body).await.map_err(|e| io_error(name, &e))?;
        file.flush().await.map_err(|e| io_error(name, &e))?;

        debug!(path = %path.display(), "Wrote APIService");
        Ok(object.clone())
    }

    async fn get(&self, name: &str) -> Result<ApiService, StoreError> {
        let path = self.object_path(name)?;
        let body = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::not_found(API_SERVICE_RESOURCE, name),
            _ => io_error(name, &e),
        })?;
        serde_json::from_slice(&body).map_err(|e| serialization_error(name, &e))
    }
}

/// Operator state kept in one JSON file.
///
/// A missing file reads as a Managed operator with an empty status. Writes
/// go through a temporary file and a rename.
#[derive(Debug)]
pub struct FileOperatorStatusStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileOperatorStatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn label(&self) -> String {
        self.path.display().to_string()
    }

    async fn load(&self) -> Result<OperatorState, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(body) => serde_json::from_slice(&body).map_err(|e| serialization_error(&self.label(), &e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(OperatorState::default()),
            Err(e) => Err(io_error(&self.label(), &e)),
        }
    }

    async fn save(&self, state: &OperatorState) -> Result<(), StoreError> {
        let label = self.label();
        let body = serde_json::to_vec_pretty(state).map_err(|e| serialization_error(&label, &e))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(&label, &e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| io_error(&label, &e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&label, &e))
    }
}

#[async_trait]
impl OperatorStatusStore for FileOperatorStatusStore {
    async fn read(&self) -> Result<OperatorState, StoreError> {
        self.load().await
    }

    async fn upsert_condition(&self, condition: OperatorCondition) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut state = self.load().await?;
        if set_condition(&mut state.status.conditions, condition) {
            debug!(path = %self.path.display(), "Operator condition changed");
        }
        self.save(&state).await
    }
}

#[async_trait]
impl VersionRecorder for FileOperatorStatusStore {
    async fn set_version(&self, component: &str, version: &str) {
        let _guard = self.lock.lock().await;
        let result = match self.load().await {
            Ok(mut state) => {
                set_version(&mut state.status.versions, component, version);
                self.save(&state).await
            }
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            warn!(component, version, error = %err, "Failed to record version");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic)]

    use super::*;
    use crate::status::API_SERVICES_AVAILABLE;
    use crate::types::{ConditionStatus, DesiredApiService, ServiceReference};

    fn object() -> ApiService {
        DesiredApiService::new("apps.openshift.io", "v1", ServiceReference::default()).to_object()
    }

    #[tokio::test]
    async fn test_file_client_create_and_get() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let client = FileApiServiceClient::new(dir.path().join("apiservices"));

        assert!(client.create(&object()).await.is_ok());
        let fetched = client.get("v1.apps.openshift.io").await;
        assert_eq!(fetched.ok(), Some(object()));
    }

    #[tokio::test]
    async fn test_file_client_create_twice_is_already_exists() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let client = FileApiServiceClient::new(dir.path());

        assert!(client.create(&object()).await.is_ok());
        let second = client.create(&object()).await;
        assert!(second.err().is_some_and(|e| e.is_already_exists()));
    }

    #[tokio::test]
    async fn test_file_client_missing_is_not_found() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let client = FileApiServiceClient::new(dir.path());

        let result = client.get("v1.apps.openshift.io").await;
        assert!(result.err().is_some_and(|e| e.is_not_found()));
    }

    #[tokio::test]
    async fn test_file_client_rejects_path_like_names() {
        let client = FileApiServiceClient::new("/tmp/unused");
        assert!(client.get("../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_status_store_missing_file_is_managed_default() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let store = FileOperatorStatusStore::new(dir.path().join("status.json"));

        assert_eq!(store.read().await.ok(), Some(OperatorState::default()));
    }

    #[tokio::test]
    async fn test_status_store_persists_conditions_and_versions() {
        let Ok(dir) = tempfile::tempdir() else {
            panic!("tempdir");
        };
        let path = dir.path().join("state").join("status.json");
        let store = FileOperatorStatusStore::new(&path);

        let condition =
            OperatorCondition::new(API_SERVICES_AVAILABLE, ConditionStatus::True, None, None);
        assert!(store.upsert_condition(condition).await.is_ok());
        store.set_version("openshift-apiserver", "4.2.0").await;

        let reopened = FileOperatorStatusStore::new(&path);
        let state = reopened.read().await.ok();
        let status = state.map(|s| s.status);
        assert_eq!(
            status
                .as_ref()
                .and_then(|s| s.condition(API_SERVICES_AVAILABLE))
                .map(|c| c.status),
            Some(ConditionStatus::True)
        );
        assert_eq!(
            status.as_ref().and_then(|s| s.version("openshift-apiserver")),
            Some("4.2.0")
        );
    }
}
