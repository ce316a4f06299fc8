//! Error types for the reconciler crate.
//!
//! Two scopes exist. Resource-scoped errors ([`Error::Ensure`],
//! [`Error::Fetch`]) are captured per APIService and folded into the
//! aggregated condition; they never escape [`crate::ApiServiceReconciler::sync`].
//! Pass-scoped errors abort the pass and are returned to the caller.

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a remote object store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{resource} \"{name}\" already exists")]
    AlreadyExists { resource: String, name: String },

    #[error("{resource} \"{name}\" not found")]
    NotFound { resource: String, name: String },

    #[error("failed to serialize {name}: {reason}")]
    Serialization { name: String, reason: String },

    #[error("storage I/O failed for {name}: {reason}")]
    Io { name: String, reason: String },

    /// Any other backend failure; the message is reported verbatim.
    #[error("{0}")]
    Backend(String),
}

impl StoreError {
    pub fn already_exists(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource: resource.into(),
            name: name.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            name: name.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Reconciler error types.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The precondition check itself failed.
    #[error("precondition check failed: {reason}")]
    PreconditionFailed { reason: String },

    /// The desired APIService set could not be obtained.
    #[error("failed to get desired api services: {reason}")]
    ProviderFailed { reason: String },

    /// The operator state could not be read.
    #[error("failed to read operator status: {source}")]
    StatusReadFailed { source: StoreError },

    /// The aggregated condition was computed but could not be persisted.
    #[error("failed to update operator status: {source}")]
    StatusWriteFailed { source: StoreError },

    /// Creating an APIService failed for a reason other than "already exists".
    #[error("{source}")]
    Ensure { name: String, source: StoreError },

    /// Reading an APIService back failed.
    #[error("{source}")]
    Fetch { name: String, source: StoreError },

    /// Reconciliation loop gave up.
    #[error("reconciliation failed: {reason}")]
    ReconcileFailed { reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a precondition failed error.
    pub fn precondition_failed(reason: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            reason: reason.into(),
        }
    }

    /// Create a provider failed error.
    pub fn provider_failed(reason: impl Into<String>) -> Self {
        Self::ProviderFailed {
            reason: reason.into(),
        }
    }

    /// Create a reconcile failed error.
    pub fn reconcile_failed(reason: impl Into<String>) -> Self {
        Self::ReconcileFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_is_verbatim() {
        let err = StoreError::backend("TEST ERROR: fail to create apiservice");
        assert_eq!(err.to_string(), "TEST ERROR: fail to create apiservice");
    }

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("apiservices.apiregistration.k8s.io", "v1.apps.openshift.io");
        assert_eq!(
            err.to_string(),
            "apiservices.apiregistration.k8s.io \"v1.apps.openshift.io\" not found"
        );
        assert!(err.is_not_found());
        assert!(!err.is_already_exists());
    }

    #[test]
    fn test_ensure_error_shows_cause_only() {
        let err = Error::Ensure {
            name: "v1.build.openshift.io".to_string(),
            source: StoreError::backend("boom"),
        };
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_status_write_names_cause() {
        let err = Error::StatusWriteFailed {
            source: StoreError::backend("conflict"),
        };
        assert_eq!(err.to_string(), "failed to update operator status: conflict");
    }
}
