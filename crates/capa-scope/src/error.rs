use capa_core::ObjectKey;
use capa_storage::{ErrorCategory, StoreError};
use thiserror::Error;

/// Errors returned by scope construction and commits.
#[derive(Debug, Error)]
pub enum ScopeError {
    /// A required collaborator was not supplied. Fix the call site.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The patch helper could not be set up for the target object.
    #[error("Failed to init patch helper: {source}")]
    Initialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The store rejected or failed to apply a patch.
    #[error("Failed to patch {kind} {key}: {source}")]
    Commit {
        kind: String,
        key: ObjectKey,
        #[source]
        source: StoreError,
    },
}

impl ScopeError {
    /// Create a new InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a new Initialization error wrapping its cause
    pub fn initialization(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Initialization {
            source: source.into(),
        }
    }

    /// Create a new Commit error wrapping the store failure
    pub fn commit(kind: impl Into<String>, key: ObjectKey, source: StoreError) -> Self {
        Self::Commit {
            kind: kind.into(),
            key,
            source,
        }
    }

    /// The store error behind a commit failure, untouched.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Commit { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether requeueing the reconcile pass may help.
    ///
    /// Construction failures never are; commit failures follow the store error.
    pub fn is_retryable(&self) -> bool {
        self.store_error().is_some_and(StoreError::is_retryable)
    }

    /// Store error category for commit failures.
    pub fn category(&self) -> Option<ErrorCategory> {
        self.store_error().map(StoreError::category)
    }
}

/// Convenience result type for scope operations
pub type Result<T> = std::result::Result<T, ScopeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_invalid_argument() {
        let err = ScopeError::invalid_argument("cluster is required");
        assert_eq!(err.to_string(), "Invalid argument: cluster is required");
        assert!(!err.is_retryable());
        assert!(err.store_error().is_none());
    }

    #[test]
    fn test_initialization_keeps_cause() {
        let err = ScopeError::initialization(StoreError::unsupported_kind("v1, Kind=Foo"));
        assert_eq!(
            err.to_string(),
            "Failed to init patch helper: Unsupported kind: v1, Kind=Foo"
        );
        let cause = err.source().unwrap();
        assert!(cause.downcast_ref::<StoreError>().is_some());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_commit_surfaces_store_error() {
        let err = ScopeError::commit(
            "ROSAControlPlane",
            ObjectKey::new("ns1", "cp"),
            StoreError::conflict("ROSAControlPlane", "ns1/cp", "3", "4"),
        );
        assert!(err.to_string().starts_with("Failed to patch ROSAControlPlane ns1/cp"));
        assert!(err.store_error().unwrap().is_conflict());
        assert!(err.is_retryable());
        assert_eq!(err.category(), Some(ErrorCategory::Conflict));
    }
}
