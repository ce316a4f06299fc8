//! Operator events: human-readable progress and warnings.
//!
//! Purely observational. Nothing in a pass depends on whether an event was
//! recorded.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Normal,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    pub reason: String,
    pub message: String,
}

impl Event {
    pub fn normal(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Normal,
            reason: reason.into(),
            message: message.into(),
        }
    }

    pub fn warning(reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Warning,
            reason: reason.into(),
            message: message.into(),
        }
    }
}

/// Sink for operator events.
#[async_trait]
pub trait EventRecorder: Send + Sync {
    async fn record(&self, event: Event);
}

/// Keeps every event in memory, for tests.
#[derive(Debug, Default)]
pub struct InMemoryEventRecorder {
    events: RwLock<Vec<Event>>,
}

impl InMemoryEventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    /// Reasons of all recorded events, in order.
    pub async fn reasons(&self) -> Vec<String> {
        self.events
            .read()
            .await
            .iter()
            .map(|e| e.reason.clone())
            .collect()
    }
}

#[async_trait]
impl EventRecorder for InMemoryEventRecorder {
    async fn record(&self, event: Event) {
        self.events.write().await.push(event);
    }
}

/// Forwards events to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventRecorder;

#[async_trait]
impl EventRecorder for TracingEventRecorder {
    async fn record(&self, event: Event) {
        match event.kind {
            EventKind::Normal => info!(reason = %event.reason, "{}", event.message),
            EventKind::Warning => warn!(reason = %event.reason, "{}", event.message),
        }
    }
}
