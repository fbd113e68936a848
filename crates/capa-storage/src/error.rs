//! Error types for the object store abstraction layer.

use std::fmt;

/// Errors that can occur during object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("Object not found: {kind} {key}")]
    NotFound {
        /// The kind of object that was not found.
        kind: String,
        /// The namespace/name of the object that was not found.
        key: String,
    },

    /// The object changed since the caller last read it.
    #[error("Conflict on {kind} {key}: expected resourceVersion {expected}, found {actual}")]
    Conflict {
        /// The kind of object.
        kind: String,
        /// The namespace/name of the object.
        key: String,
        /// The resourceVersion the caller based its write on.
        expected: String,
        /// The resourceVersion currently stored.
        actual: String,
    },

    /// Attempted to create an object that already exists.
    #[error("Object already exists: {kind} {key}")]
    AlreadyExists {
        /// The kind of object that already exists.
        kind: String,
        /// The namespace/name of the object that already exists.
        key: String,
    },

    /// The submitted patch or object is malformed.
    #[error("Invalid patch: {message}")]
    InvalidPatch {
        /// Description of why the patch is invalid.
        message: String,
    },

    /// The store does not serve this kind.
    #[error("Unsupported kind: {type_meta}")]
    UnsupportedKind {
        /// The group/version/kind that was requested.
        type_meta: String,
    },

    /// Failed to reach the store.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// An internal store error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StoreError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, key: impl fmt::Display) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key: key.to_string(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(
        kind: impl Into<String>,
        key: impl fmt::Display,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            kind: kind.into(),
            key: key.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(kind: impl Into<String>, key: impl fmt::Display) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            key: key.to_string(),
        }
    }

    /// Creates a new `InvalidPatch` error.
    #[must_use]
    pub fn invalid_patch(message: impl Into<String>) -> Self {
        Self::InvalidPatch {
            message: message.into(),
        }
    }

    /// Creates a new `UnsupportedKind` error.
    #[must_use]
    pub fn unsupported_kind(type_meta: impl fmt::Display) -> Self {
        Self::UnsupportedKind {
            type_meta: type_meta.to_string(),
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is a resourceVersion conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns `true` if a later attempt may succeed without changing the request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Conflict | ErrorCategory::NotFound | ErrorCategory::Infrastructure
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::InvalidPatch { .. } => ErrorCategory::Validation,
            Self::UnsupportedKind { .. } => ErrorCategory::Validation,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<capa_core::CoreError> for StoreError {
    fn from(err: capa_core::CoreError) -> Self {
        Self::invalid_patch(err.to_string())
    }
}

/// Categories of store errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Object not found.
    NotFound,
    /// Conflict (version or existence).
    Conflict,
    /// Validation error.
    Validation,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::not_found("ROSAControlPlane", "ns1/cp");
        assert_eq!(err.to_string(), "Object not found: ROSAControlPlane ns1/cp");

        let err = StoreError::conflict("ROSAControlPlane", "ns1/cp", "3", "4");
        assert_eq!(
            err.to_string(),
            "Conflict on ROSAControlPlane ns1/cp: expected resourceVersion 3, found 4"
        );

        let err = StoreError::already_exists("Cluster", "ns1/demo");
        assert_eq!(err.to_string(), "Object already exists: Cluster ns1/demo");
    }

    #[test]
    fn test_error_predicates() {
        let err = StoreError::not_found("Cluster", "ns1/demo");
        assert!(err.is_not_found());
        assert!(!err.is_conflict());

        let err = StoreError::conflict("Cluster", "ns1/demo", "1", "2");
        assert!(err.is_conflict());
        assert!(err.is_retryable());

        assert!(StoreError::connection_error("refused").is_retryable());
        assert!(!StoreError::invalid_patch("bad").is_retryable());
        assert!(!StoreError::unsupported_kind("v1, Kind=Foo").is_retryable());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            StoreError::already_exists("Cluster", "ns1/demo").category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            StoreError::internal("boom").category().to_string(),
            "internal"
        );
    }
}
