//! Desired APIService providers and the precondition seam.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::types::DesiredApiService;

/// Source of the APIServices the operator should keep registered.
#[async_trait]
pub trait DesiredApiServiceProvider: Send + Sync {
    /// Get the current desired set.
    async fn desired_api_services(&self) -> Result<Vec<DesiredApiService>>;
}

/// Simple in-memory desired set.
#[derive(Debug, Default)]
pub struct InMemoryDesiredApiServices {
    services: RwLock<Vec<DesiredApiService>>,
}

impl InMemoryDesiredApiServices {
    /// Create a provider with an initial set.
    pub fn new(services: Vec<DesiredApiService>) -> Self {
        Self {
            services: RwLock::new(services),
        }
    }

    /// Replace the desired set.
    pub async fn update(&self, services: Vec<DesiredApiService>) {
        *self.services.write().await = services;
    }

    /// Modify the desired set in place.
    pub async fn modify<F>(&self, f: F)
    where
        F: FnOnce(&mut Vec<DesiredApiService>),
    {
        let mut services = self.services.write().await;
        f(&mut services);
    }
}

#[async_trait]
impl DesiredApiServiceProvider for InMemoryDesiredApiServices {
    async fn desired_api_services(&self) -> Result<Vec<DesiredApiService>> {
        Ok(self.services.read().await.clone())
    }
}

/// Gate evaluated before any ensure or fetch work.
///
/// `Ok(false)` means "not yet applicable": the pass is skipped without
/// touching the operator status.
#[async_trait]
pub trait Precondition: Send + Sync {
    async fn check(&self) -> Result<bool>;
}

#[async_trait]
impl<F> Precondition for F
where
    F: Fn() -> Result<bool> + Send + Sync,
{
    async fn check(&self) -> Result<bool> {
        self()
    }
}
