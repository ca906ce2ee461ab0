//! Error types for kubestress
//!
//! Errors carry the context needed to tell apart a broken invocation, a
//! broken scenario, and a failing cluster. Each variant names the object or
//! file involved so per-task failures stay readable after aggregation.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for kubestress operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Invalid load configuration
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The offending setting (e.g., "repeat_count")
        field: Option<String>,
    },

    /// Cluster credentials could not be turned into a client
    #[error("credentials error for {}: {message}", path.display())]
    Credentials {
        /// Kubeconfig path that was being loaded
        path: PathBuf,
        /// Description of what failed
        message: String,
    },

    /// Scenario templates could not be loaded
    #[error("template error in scenario {scenario}: {message}")]
    Template {
        /// Scenario being loaded
        scenario: String,
        /// Description of what failed
        message: String,
    },

    /// A named object does not exist in the cluster
    #[error("{kind} {name} not found")]
    NotFound {
        /// Resource kind (Node, Pod, ...)
        kind: String,
        /// Resource name
        name: String,
    },

    /// The operation was cancelled before it reached the API server
    #[error("{operation} cancelled")]
    Cancelled {
        /// Operation that was cancelled
        operation: String,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "pool", "emulator")
        context: String,
    },
}

impl Error {
    /// Create a validation error naming the offending setting
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a credentials error for a kubeconfig path
    pub fn credentials(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Credentials {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a template error for a scenario
    pub fn template(scenario: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Template {
            scenario: scenario.into(),
            message: msg.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create a cancellation error
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// True for "object does not exist", whether reported locally or by the API server
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube {
                source: kube::Error::Api(ae),
            } => ae.code == 404,
            _ => false,
        }
    }

    /// True when the API server rejected a write because the object changed
    /// or already exists
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::Kube { source: kube::Error::Api(ae) } if ae.code == 409
        )
    }
}
