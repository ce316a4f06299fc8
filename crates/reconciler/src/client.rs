//! Remote APIService client trait and the in-memory implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::types::{ApiService, ApiServiceCondition, API_SERVICE_RESOURCE};

/// Store operations the reconciler needs on APIService objects.
#[async_trait]
pub trait ApiServiceClient: Send + Sync {
    /// Create `object`. Fails with [`StoreError::AlreadyExists`] if an object
    /// with the same name is present.
    async fn create(&self, object: &ApiService) -> Result<ApiService, StoreError>;

    /// Read an object by name. Fails with [`StoreError::NotFound`] if absent.
    async fn get(&self, name: &str) -> Result<ApiService, StoreError>;
}

/// A call observed by [`InMemoryApiServiceClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    Create(ApiService),
    Get(String),
}

impl ClientAction {
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Get(_) => "get",
        }
    }

    /// Name of the object the action targets.
    pub fn name(&self) -> &str {
        match self {
            Self::Create(object) => object.name(),
            Self::Get(name) => name,
        }
    }
}

/// What a reactor decides for an intercepted action.
#[derive(Debug, Clone)]
pub enum Reaction {
    /// Not handled; try the next reactor, then the default behaviour.
    Continue,
    /// Fail the call with this error.
    Fail(StoreError),
    /// Answer the call with this object without touching the store.
    Respond(ApiService),
}

/// Hook consulted before the default in-memory behaviour.
pub type Reactor = Arc<dyn Fn(&ClientAction) -> Reaction + Send + Sync>;

/// In-memory APIService store for testing.
///
/// Every call is recorded. Reactors run newest-first and may intercept a call
/// to inject failures or substitute objects.
#[derive(Default)]
pub struct InMemoryApiServiceClient {
    objects: RwLock<BTreeMap<String, ApiService>>,
    actions: RwLock<Vec<ClientAction>>,
    reactors: Vec<Reactor>,
}

impl InMemoryApiServiceClient {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `objects`.
    pub fn with_objects(objects: impl IntoIterator<Item = ApiService>) -> Self {
        let objects = objects
            .into_iter()
            .map(|o| (o.metadata.name.clone(), o))
            .collect();
        Self {
            objects: RwLock::new(objects),
            ..Self::default()
        }
    }

    /// Put `reactor` in front of all existing reactors.
    #[must_use]
    pub fn prepend_reactor<F>(mut self, reactor: F) -> Self
    where
        F: Fn(&ClientAction) -> Reaction + Send + Sync + 'static,
    {
        self.reactors.insert(0, Arc::new(reactor));
        self
    }

    /// Replace the status conditions of a stored object.
    ///
    /// Returns false if the object does not exist.
    pub async fn set_conditions(&self, name: &str, conditions: Vec<ApiServiceCondition>) -> bool {
        let mut objects = self.objects.write().await;
        match objects.get_mut(name) {
            Some(object) => {
                object.status.conditions = conditions;
                true
            }
            None => false,
        }
    }

    pub async fn object(&self, name: &str) -> Option<ApiService> {
        self.objects.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// All calls made so far, in order.
    pub async fn actions(&self) -> Vec<ClientAction> {
        self.actions.read().await.clone()
    }

    /// Number of calls with the given verb.
    pub async fn count(&self, verb: &str) -> usize {
        self.actions
            .read()
            .await
            .iter()
            .filter(|a| a.verb() == verb)
            .count()
    }

    async fn react(&self, action: ClientAction) -> Reaction {
        let reaction = self
            .reactors
            .iter()
            .map(|reactor| reactor(&action))
            .find(|r| !matches!(r, Reaction::Continue))
            .unwrap_or(Reaction::Continue);
        self.actions.write().await.push(action);
        reaction
    }
}

#[async_trait]
impl ApiServiceClient for InMemoryApiServiceClient {
    async fn create(&self, object: &ApiService) -> Result<ApiService, StoreError> {
        match self.react(ClientAction::Create(object.clone())).await {
            Reaction::Fail(err) => return Err(err),
            Reaction::Respond(answer) => return Ok(answer),
            Reaction::Continue => {}
        }

        let mut objects = self.objects.write().await;
        if objects.contains_key(object.name()) {
            return Err(StoreError::already_exists(API_SERVICE_RESOURCE, object.name()));
        }
        objects.insert(object.name().to_string(), object.clone());
        Ok(object.clone())
    }

    async fn get(&self, name: &str) -> Result<ApiService, StoreError> {
        match self.react(ClientAction::Get(name.to_string())).await {
            Reaction::Fail(err) => return Err(err),
            Reaction::Respond(answer) => return Ok(answer),
            Reaction::Continue => {}
        }

        self.objects
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::not_found(API_SERVICE_RESOURCE, name))
    }
}
