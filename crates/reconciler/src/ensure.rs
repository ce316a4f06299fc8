//! Ensurer: create-if-absent for desired APIServices.
//!
//! Each APIService is read first and only created when the store reports it
//! missing, so an existing object is never written. "Already exists" from the
//! create still counts as success, since another writer may win the race.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use crate::client::ApiServiceClient;
use crate::error::{Error, Result, StoreError};
use crate::events::{Event, EventRecorder};
use crate::types::DesiredApiService;

/// How an APIService came to exist after [`Ensurer::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ensured {
    Created,
    AlreadyExisted,
}

pub struct Ensurer {
    client: Arc<dyn ApiServiceClient>,
    events: Arc<dyn EventRecorder>,
}

impl Ensurer {
    pub fn new(client: Arc<dyn ApiServiceClient>, events: Arc<dyn EventRecorder>) -> Self {
        Self { client, events }
    }

    /// Make sure an object named after `desired` exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Ensure`] when the read fails for a reason other than
    /// "not found", or the create fails for a reason other than
    /// "already exists".
    pub async fn ensure(&self, desired: &DesiredApiService) -> Result<Ensured> {
        match self.client.get(desired.name()).await {
            Ok(_) => {
                debug!(api_service = desired.name(), "APIService already exists");
                return Ok(Ensured::AlreadyExisted);
            }
            Err(err) if err.is_not_found() => {}
            Err(source) => {
                return Err(self
                    .failed(desired, "ApiServiceGetFailed", "read", source)
                    .await);
            }
        }

        match self.client.create(&desired.to_object()).await {
            Ok(_) => {
                debug!(api_service = desired.name(), "Created APIService");
                self.events
                    .record(Event::normal(
                        "ApiServiceCreated",
                        format!("Created APIService {} because it was missing", desired.name()),
                    ))
                    .await;
                Ok(Ensured::Created)
            }
            Err(err) if err.is_already_exists() => {
                debug!(api_service = desired.name(), "APIService created concurrently");
                Ok(Ensured::AlreadyExisted)
            }
            Err(source) => Err(self
                .failed(desired, "ApiServiceCreateFailed", "create", source)
                .await),
        }
    }

    async fn failed(
        &self,
        desired: &DesiredApiService,
        reason: &str,
        verb: &str,
        source: StoreError,
    ) -> Error {
        warn!(api_service = desired.name(), error = %source, "Failed to {verb} APIService");
        self.events
            .record(Event::warning(
                reason,
                format!("Failed to {verb} APIService {}: {source}", desired.name()),
            ))
            .await;
        Error::Ensure {
            name: desired.name().to_string(),
            source,
        }
    }

    /// Ensure every desired APIService, one result per entry in input order.
    ///
    /// A failure on one entry never prevents attempts on the others.
    pub async fn ensure_all<'a>(
        &self,
        desired: &'a [DesiredApiService],
    ) -> Vec<(&'a DesiredApiService, Result<Ensured>)> {
        let results = join_all(desired.iter().map(|d| self.ensure(d))).await;
        desired.iter().zip(results).collect()
    }
}
