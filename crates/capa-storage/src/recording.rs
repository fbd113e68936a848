//! RecordingStore - a store wrapper that remembers every patch submission
//! and counts reads.
//!
//! Useful for asserting exactly what a controller sent, and for diagnostics
//! when chasing cross-controller write conflicts.
//!
//! # Example
//!
//! ```ignore
//! let store = Arc::new(RecordingStore::new(InMemoryStore::new()));
//! // ... run a reconcile pass against `store` ...
//! let submissions = store.submissions().await;
//! assert_eq!(submissions.len(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use capa_core::{ConditionType, ObjectKey, TypeMeta};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::traits::ObjectStore;
use crate::types::{PatchDocument, StoredObject};

/// One call to [`ObjectStore::patch`] as seen by the wrapper.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSubmission {
    pub type_meta: TypeMeta,
    pub key: ObjectKey,
    pub document: PatchDocument,
    pub owned_conditions: Vec<ConditionType>,
    /// Whether the inner store accepted the patch.
    pub succeeded: bool,
}

/// A store wrapper that records patch submissions before delegating.
pub struct RecordingStore<S: ObjectStore> {
    /// The inner store implementation.
    inner: S,
    submissions: Mutex<Vec<PatchSubmission>>,
    reads: AtomicUsize,
}

impl<S: ObjectStore> RecordingStore<S> {
    /// Create a new recording wrapper.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            submissions: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
        }
    }

    /// Number of `get` calls passed through so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Snapshot of all submissions so far, oldest first.
    pub async fn submissions(&self) -> Vec<PatchSubmission> {
        self.submissions.lock().await.clone()
    }

    /// Number of submissions so far.
    pub async fn submission_count(&self) -> usize {
        self.submissions.lock().await.len()
    }

    /// Forget recorded submissions and reads.
    pub async fn clear(&self) {
        self.submissions.lock().await.clear();
        self.reads.store(0, Ordering::Relaxed);
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for RecordingStore<S> {
    async fn get(
        &self,
        type_meta: &TypeMeta,
        key: &ObjectKey,
    ) -> Result<Option<StoredObject>, StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.inner.get(type_meta, key).await
    }

    async fn create(
        &self,
        type_meta: &TypeMeta,
        object: &Value,
    ) -> Result<StoredObject, StoreError> {
        self.inner.create(type_meta, object).await
    }

    async fn update(
        &self,
        type_meta: &TypeMeta,
        object: &Value,
    ) -> Result<StoredObject, StoreError> {
        self.inner.update(type_meta, object).await
    }

    async fn patch(
        &self,
        type_meta: &TypeMeta,
        key: &ObjectKey,
        patch: &PatchDocument,
        owned_conditions: &[ConditionType],
    ) -> Result<StoredObject, StoreError> {
        let result = self
            .inner
            .patch(type_meta, key, patch, owned_conditions)
            .await;
        let submission = PatchSubmission {
            type_meta: type_meta.clone(),
            key: key.clone(),
            document: patch.clone(),
            owned_conditions: owned_conditions.to_vec(),
            succeeded: result.is_ok(),
        };
        let mut submissions = self.submissions.lock().await;
        submissions.push(submission);
        debug!(
            kind = %type_meta.kind,
            key = %key,
            total = submissions.len(),
            "Recorded patch submission"
        );
        result
    }

    fn is_registered(&self, type_meta: &TypeMeta) -> bool {
        self.inner.is_registered(type_meta)
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}
