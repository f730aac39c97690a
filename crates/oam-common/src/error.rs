//! Error types for the OAM controller
//!
//! Errors carry the names needed to find the offending object in a cluster:
//! the application, the component instance, or the kind being handled.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for OAM operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A referenced object does not exist
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        /// Kind of the missing object
        kind: String,
        /// Name of the missing object
        name: String,
        /// Namespace that was searched
        namespace: String,
    },

    /// A handler received an object of a kind it does not handle
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Kind the handler expects
        expected: String,
        /// Kind that was delivered
        actual: String,
    },

    /// The ComponentSchematic declares a workload type the controller cannot convert
    #[error("WorkloadType {workload_type} is undefined (component {component})")]
    UndefinedWorkloadType {
        /// The workload type string as declared
        workload_type: String,
        /// Component instance declaring it
        component: String,
    },

    /// A status record carries a kind the status aggregator does not understand
    #[error("Kind {kind} is undefined")]
    UndefinedKind {
        /// The unknown kind
        kind: String,
    },

    /// Validation error for descriptor content
    #[error("validation error for {application}: {message}")]
    Validation {
        /// Name of the application with invalid content
        application: String,
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.components[0].instanceName")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// A write collided with an object we do not control, or lost an update race
    #[error("conflict on {kind} {name}: {message}")]
    Conflict {
        /// Kind of the contended object
        kind: String,
        /// Name of the contended object
        name: String,
        /// Description of the collision
        message: String,
        /// Whether re-running the operation may succeed
        retryable: bool,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "reconciler", "watcher")
        context: String,
    },
}

impl Error {
    /// Create a not-found error for the given object
    pub fn not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an undefined workload type error
    pub fn undefined_workload_type(
        workload_type: impl Into<String>,
        component: impl Into<String>,
    ) -> Self {
        Self::UndefinedWorkloadType {
            workload_type: workload_type.into(),
            component: component.into(),
        }
    }

    /// Create an undefined kind error
    pub fn undefined_kind(kind: impl Into<String>) -> Self {
        Self::UndefinedKind { kind: kind.into() }
    }

    /// Create a validation error with the given message
    ///
    /// For simple validation errors without application context.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            application: UNKNOWN_CONTEXT.to_string(),
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error with application context and field path
    pub fn validation_for_field(
        application: impl Into<String>,
        field: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self::Validation {
            application: application.into(),
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with resource kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// A create collided with an existing object that is not ours
    pub fn foreign_object(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Conflict {
            kind: kind.into(),
            name: name.into(),
            message: "object already exists and is not managed by this application".to_string(),
            retryable: false,
        }
    }

    /// A conditional update kept losing against concurrent writers
    pub fn update_conflict(
        kind: impl Into<String>,
        name: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            name: name.into(),
            message: format!("still conflicting after {attempts} attempts"),
            retryable: true,
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Descriptor problems (validation, unknown types, wrong kinds) need a
    /// spec change and are not retried. Missing schematics may still appear.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => {
                // Don't retry on 4xx errors (validation, forbidden, etc.)
                !matches!(
                    source,
                    kube::Error::Api(ae) if (400..500).contains(&ae.code)
                )
            }
            Error::NotFound { .. } => true,
            Error::TypeMismatch { .. } => false,
            Error::UndefinedWorkloadType { .. } => false,
            Error::UndefinedKind { .. } => false,
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
            Error::Conflict { retryable, .. } => *retryable,
            Error::Internal { .. } => true,
        }
    }

    /// True if this is a 409 returned by the API server
    pub fn is_api_conflict(&self) -> bool {
        matches!(self, Error::Kube { source: kube::Error::Api(ae) } if ae.code == 409)
    }

    /// True if this is a 404 returned by the API server
    pub fn is_api_not_found(&self) -> bool {
        matches!(self, Error::Kube { source: kube::Error::Api(ae) } if ae.code == 404)
    }

    /// Get the context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Internal { context, .. } => Some(context),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}
