//! K8s-style reconciliation of APIService registrations.
//!
//! This crate keeps a declared set of APIServices registered in a remote store
//! and derives one aggregated `APIServicesAvailable` condition from their
//! reported availability:
//!
//! - **Ensure**: create every desired APIService that is missing
//! - **Collect**: read each one back and extract its `Available` condition
//! - **Aggregate**: fold all outcomes into one sorted, diffable condition
//! - **Report**: upsert the condition on the operator status, and record the
//!   operand version once everything is available
//!
//! # Key Concepts
//!
//! ## Partial failure
//!
//! A failure on one APIService never stops work on the others. Per-APIService
//! errors become lines of the condition message; only pass-scoped errors
//! (operator status read/write, precondition, desired set) are returned from
//! [`ApiServiceReconciler::sync`].
//!
//! ## Seams
//!
//! The remote store, operator status, version recorder, event recorder,
//! precondition and desired set are all traits, with in-memory
//! implementations for tests and file-backed ones for the binary.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use apiservice_reconciler::{
//!     DesiredApiService, InMemoryApiServiceClient, InMemoryDesiredApiServices,
//!     InMemoryOperatorStatus, ReconcilerBuilder, ReconcilerConfig, ServiceReference,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let status = Arc::new(InMemoryOperatorStatus::new());
//!     let reconciler = ReconcilerBuilder::new(ReconcilerConfig::new("openshift-apiserver", "4.2.0"))
//!         .with_client(Arc::new(InMemoryApiServiceClient::new()))
//!         .with_provider(Arc::new(InMemoryDesiredApiServices::new(vec![
//!             DesiredApiService::new("apps.openshift.io", "v1", ServiceReference::default()),
//!         ])))
//!         .with_status(status.clone())
//!         .with_versions(status)
//!         .build();
//!
//!     // reconciler?.sync().await?;
//! }
//! ```

pub mod aggregate;
pub mod client;
pub mod collect;
pub mod ensure;
pub mod error;
pub mod events;
pub mod file_store;
pub mod r#loop;
pub mod operator;
pub mod provider;
pub mod reconciler;
pub mod status;
pub mod types;

// Re-export main types
pub use aggregate::{aggregate, AggregatedCondition, Failure};
pub use client::{ApiServiceClient, ClientAction, InMemoryApiServiceClient, Reaction, Reactor};
pub use collect::{availability, RemoteStatus, StatusCollector, NO_AVAILABLE_CONDITION};
pub use ensure::{Ensured, Ensurer};
pub use error::{Error, Result, StoreError};
pub use events::{Event, EventKind, EventRecorder, InMemoryEventRecorder, TracingEventRecorder};
pub use file_store::{FileApiServiceClient, FileOperatorStatusStore};
pub use operator::{InMemoryOperatorStatus, InMemoryVersionRecorder, OperatorStatusStore, VersionRecorder};
pub use provider::{DesiredApiServiceProvider, InMemoryDesiredApiServices, Precondition};
pub use r#loop::{LoopConfig, LoopStopper, ReconciliationLoop};
pub use reconciler::{
    ApiServiceReconciler, ReconcilerBuilder, ReconcilerConfig, SkipReason, SyncOutcome,
};
pub use status::{
    set_condition, ManagementState, OperandVersion, OperatorCondition, OperatorState,
    OperatorStatus, API_SERVICES_AVAILABLE, REASON_ERROR,
};
pub use types::{
    desired_from_config, ApiService, ApiServiceCondition, ApiServiceSpec, ApiServiceStatus,
    ConditionStatus, DesiredApiService, ObjectMeta, Outcome, RemoteObservation, ServiceReference,
    API_SERVICE_RESOURCE, AVAILABLE_CONDITION, INJECT_CABUNDLE_ANNOTATION,
};
