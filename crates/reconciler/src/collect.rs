//! Status collector: reads APIServices back and extracts their availability.

use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::client::ApiServiceClient;
use crate::error::{Error, Result};
use crate::types::{ApiService, DesiredApiService};

/// Unavailability message used when an APIService reports no `Available`
/// condition at all.
pub const NO_AVAILABLE_CONDITION: &str = "no Available condition reported";

/// Availability signal of one APIService.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Available,
    /// Not serving; carries the remote message verbatim.
    Unavailable(String),
}

/// Availability of a fetched object. Pure.
pub fn availability(object: &ApiService) -> RemoteStatus {
    match object.available_condition() {
        None => RemoteStatus::Unavailable(NO_AVAILABLE_CONDITION.to_string()),
        Some(condition) if condition.status.is_true() => RemoteStatus::Available,
        Some(condition) => RemoteStatus::Unavailable(condition.message.clone().unwrap_or_default()),
    }
}

pub struct StatusCollector {
    client: Arc<dyn ApiServiceClient>,
}

impl StatusCollector {
    pub fn new(client: Arc<dyn ApiServiceClient>) -> Self {
        Self { client }
    }

    /// Read the APIService for `desired` and report its availability.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] on any store error, including "not found".
    pub async fn fetch(&self, desired: &DesiredApiService) -> Result<RemoteStatus> {
        let object = self
            .client
            .get(desired.name())
            .await
            .map_err(|source| Error::Fetch {
                name: desired.name().to_string(),
                source,
            })?;
        let status = availability(&object);
        debug!(api_service = desired.name(), status = ?status, "Fetched APIService");
        Ok(status)
    }

    /// Fetch every entry, one result per entry in input order.
    pub async fn fetch_all<'a>(
        &self,
        desired: impl IntoIterator<Item = &'a DesiredApiService>,
    ) -> Vec<(&'a DesiredApiService, Result<RemoteStatus>)> {
        let desired: Vec<&DesiredApiService> = desired.into_iter().collect();
        let results = join_all(desired.iter().map(|d| self.fetch(d))).await;
        desired.into_iter().zip(results).collect()
    }
}
