//! Store traits for the object store abstraction layer.
//!
//! [`ObjectStore`] is the collaborator a reconciliation scope writes through.
//! It works on untyped JSON so backends stay independent of concrete kinds;
//! [`TypedObjectStore`] layers typed helpers on top for callers and tests.

use async_trait::async_trait;
use capa_core::{ConditionType, ObjectKey, Resource, TypeMeta};
use serde_json::Value;

use crate::error::StoreError;
use crate::types::{PatchDocument, StoredObject};

/// The storage trait every object store backend implements.
///
/// Implementations must be thread-safe (`Send + Sync`): many controllers
/// write the same objects concurrently, each restricted to the fields and
/// condition types it owns.
///
/// # Example
///
/// ```ignore
/// use capa_storage::{ObjectStore, PatchDocument, StoreError};
///
/// async fn mark_ready(store: &dyn ObjectStore, key: &ObjectKey) -> Result<(), StoreError> {
///     let doc = PatchDocument::new().with_merge_patch(json!({"status": {"ready": true}}));
///     store.patch(&RosaControlPlane::type_meta(), key, &doc, &[]).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads an object by kind and key.
    ///
    /// Returns `None` if the object does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::UnsupportedKind` for kinds the store does not serve,
    /// or an error for infrastructure issues.
    async fn get(
        &self,
        type_meta: &TypeMeta,
        key: &ObjectKey,
    ) -> Result<Option<StoredObject>, StoreError>;

    /// Creates a new object.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if an object with the same key exists.
    /// Returns `StoreError::InvalidPatch` if the object has no `metadata.name`.
    async fn create(
        &self,
        type_meta: &TypeMeta,
        object: &Value,
    ) -> Result<StoredObject, StoreError>;

    /// Replaces an existing object.
    ///
    /// If the object carries `metadata.resourceVersion`, the update only
    /// succeeds when it matches the stored version.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the object does not exist.
    /// Returns `StoreError::Conflict` if the resourceVersion is stale.
    async fn update(
        &self,
        type_meta: &TypeMeta,
        object: &Value,
    ) -> Result<StoredObject, StoreError>;

    /// Applies a patch document to an existing object.
    ///
    /// The merge patch is applied as RFC 7396. Condition edits are merged by
    /// type and only for types listed in `owned_conditions`; every other
    /// condition on the stored object is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the object does not exist.
    /// Returns `StoreError::Conflict` if the document carries a stale resourceVersion.
    /// Returns `StoreError::InvalidPatch` if the document cannot be applied.
    async fn patch(
        &self,
        type_meta: &TypeMeta,
        key: &ObjectKey,
        patch: &PatchDocument,
        owned_conditions: &[ConditionType],
    ) -> Result<StoredObject, StoreError>;

    /// Returns whether this store serves the given kind.
    fn is_registered(&self, type_meta: &TypeMeta) -> bool;

    /// Returns the name of this store backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// Typed convenience layer over any [`ObjectStore`].
#[async_trait]
pub trait TypedObjectStore {
    /// Reads and deserializes an object.
    async fn get_resource<T: Resource>(&self, key: &ObjectKey) -> Result<Option<T>, StoreError>;

    /// Serializes and creates an object, returning it as stored.
    async fn create_resource<T: Resource>(&self, object: &T) -> Result<T, StoreError>;

    /// Serializes and replaces an object, returning it as stored.
    async fn update_resource<T: Resource>(&self, object: &T) -> Result<T, StoreError>;
}

#[async_trait]
impl<S: ObjectStore + ?Sized> TypedObjectStore for S {
    async fn get_resource<T: Resource>(&self, key: &ObjectKey) -> Result<Option<T>, StoreError> {
        match self.get(&T::type_meta(), key).await? {
            Some(stored) => Ok(Some(stored.into_resource()?)),
            None => Ok(None),
        }
    }

    async fn create_resource<T: Resource>(&self, object: &T) -> Result<T, StoreError> {
        let value = object.to_json()?;
        self.create(&T::type_meta(), &value).await?.into_resource()
    }

    async fn update_resource<T: Resource>(&self, object: &T) -> Result<T, StoreError> {
        let value = object.to_json()?;
        self.update(&T::type_meta(), &value).await?.into_resource()
    }
}
