use async_trait::async_trait;
use capa_core::{ConditionType, ObjectKey, Resource, TypeMeta};
use capa_storage::{ObjectStore, PatchDocument, StoreError, StoredObject};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Kind plus namespace/name.
pub type StorageKey = (TypeMeta, ObjectKey);

pub(crate) fn make_storage_key(type_meta: &TypeMeta, key: &ObjectKey) -> StorageKey {
    (type_meta.clone(), key.clone())
}

/// In-memory object store using dashmap.
///
/// This store provides:
/// - Concurrent access with per-entry write locking
/// - Monotonic resourceVersions shared across all kinds
/// - `metadata.generation` bumps when `spec` changes
/// - Patch application through [`PatchDocument::apply_to`]
#[derive(Debug)]
pub struct InMemoryStore {
    objects: DashMap<StorageKey, StoredObject>,
    kinds: DashSet<TypeMeta>,
    /// Atomic counter for generating resourceVersions
    version_counter: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Creates an empty store with no registered kinds.
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            kinds: DashSet::new(),
            version_counter: AtomicU64::new(1),
        }
    }

    /// Registers the kind of `T`.
    pub fn with_kind<T: Resource>(self) -> Self {
        self.register_kind(T::type_meta());
        self
    }

    pub fn register_kind(&self, type_meta: TypeMeta) {
        self.kinds.insert(type_meta);
    }

    /// Number of stored objects across all kinds.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Generates the next resourceVersion.
    fn next_version(&self) -> String {
        self.version_counter
            .fetch_add(1, Ordering::SeqCst)
            .to_string()
    }

    fn ensure_registered(&self, type_meta: &TypeMeta) -> Result<(), StoreError> {
        if self.kinds.contains(type_meta) {
            Ok(())
        } else {
            Err(StoreError::unsupported_kind(type_meta))
        }
    }
}

/// Reads namespace/name out of `metadata`.
fn object_key(object: &Value) -> Result<ObjectKey, StoreError> {
    let name = object
        .pointer("/metadata/name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if name.is_empty() {
        return Err(StoreError::invalid_patch("metadata.name is required"));
    }
    let namespace = object
        .pointer("/metadata/namespace")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok(ObjectKey::new(namespace, name))
}

fn resource_version(object: &Value) -> Option<&str> {
    object
        .pointer("/metadata/resourceVersion")
        .and_then(Value::as_str)
}

fn generation(object: &Value) -> i64 {
    object
        .pointer("/metadata/generation")
        .and_then(Value::as_i64)
        .unwrap_or(1)
}

fn metadata_mut(object: &mut Value) -> Result<&mut Map<String, Value>, StoreError> {
    object
        .get_mut("metadata")
        .and_then(Value::as_object_mut)
        .ok_or_else(|| StoreError::invalid_patch("metadata must be a JSON object"))
}

/// Writes the server-managed metadata fields for a new revision.
fn stamp_revision(
    object: &mut Value,
    version: &str,
    generation: i64,
) -> Result<(), StoreError> {
    let metadata = metadata_mut(object)?;
    metadata.insert("resourceVersion".into(), Value::String(version.to_string()));
    metadata.insert("generation".into(), Value::from(generation));
    Ok(())
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get(
        &self,
        type_meta: &TypeMeta,
        key: &ObjectKey,
    ) -> Result<Option<StoredObject>, StoreError> {
        self.ensure_registered(type_meta)?;
        let storage_key = make_storage_key(type_meta, key);
        Ok(self
            .objects
            .get(&storage_key)
            .map(|entry| entry.value().clone()))
    }

    async fn create(
        &self,
        type_meta: &TypeMeta,
        object: &Value,
    ) -> Result<StoredObject, StoreError> {
        self.ensure_registered(type_meta)?;
        let key = object_key(object)?;
        let storage_key = make_storage_key(type_meta, &key);

        match self.objects.entry(storage_key) {
            Entry::Occupied(_) => Err(StoreError::already_exists(&type_meta.kind, &key)),
            Entry::Vacant(slot) => {
                let mut stored = object.clone();
                let version = self.next_version();
                stamp_revision(&mut stored, &version, 1)?;
                let metadata = metadata_mut(&mut stored)?;
                metadata
                    .entry("uid")
                    .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
                metadata
                    .entry("creationTimestamp")
                    .or_insert_with(|| Value::String(capa_core::now().to_string()));

                debug!(kind = %type_meta.kind, key = %key, version = %version, "Created object");
                let stored = StoredObject::new(type_meta.clone(), key, version, stored);
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn update(
        &self,
        type_meta: &TypeMeta,
        object: &Value,
    ) -> Result<StoredObject, StoreError> {
        self.ensure_registered(type_meta)?;
        let key = object_key(object)?;
        let storage_key = make_storage_key(type_meta, &key);

        let mut entry = self
            .objects
            .get_mut(&storage_key)
            .ok_or_else(|| StoreError::not_found(&type_meta.kind, &key))?;

        if let Some(expected) = resource_version(object)
            && expected != entry.resource_version
        {
            return Err(StoreError::conflict(
                &type_meta.kind,
                &key,
                expected,
                entry.resource_version.clone(),
            ));
        }

        let mut updated = object.clone();
        let mut next_generation = generation(&entry.object);
        if updated.get("spec") != entry.object.get("spec") {
            next_generation += 1;
        }
        // Identity fields are server-owned and survive a full replace.
        let preserved: Vec<(String, Value)> = ["uid", "creationTimestamp"]
            .iter()
            .filter_map(|field| {
                entry
                    .object
                    .pointer(&format!("/metadata/{field}"))
                    .map(|v| (field.to_string(), v.clone()))
            })
            .collect();
        let version = self.next_version();
        stamp_revision(&mut updated, &version, next_generation)?;
        let metadata = metadata_mut(&mut updated)?;
        for (field, value) in preserved {
            metadata.insert(field, value);
        }

        debug!(kind = %type_meta.kind, key = %key, version = %version, "Updated object");
        *entry = StoredObject::new(type_meta.clone(), key, version, updated);
        Ok(entry.value().clone())
    }

    async fn patch(
        &self,
        type_meta: &TypeMeta,
        key: &ObjectKey,
        patch: &PatchDocument,
        owned_conditions: &[ConditionType],
    ) -> Result<StoredObject, StoreError> {
        self.ensure_registered(type_meta)?;
        let storage_key = make_storage_key(type_meta, key);

        let mut entry = self
            .objects
            .get_mut(&storage_key)
            .ok_or_else(|| StoreError::not_found(&type_meta.kind, key))?;

        if let Some(expected) = patch.resource_version.as_deref()
            && expected != entry.resource_version
        {
            return Err(StoreError::conflict(
                &type_meta.kind,
                key,
                expected,
                entry.resource_version.clone(),
            ));
        }

        if patch.is_empty() {
            debug!(kind = %type_meta.kind, key = %key, "Empty patch, nothing to apply");
            return Ok(entry.value().clone());
        }

        let mut patched = entry.object.clone();
        let applied_conditions = patch.apply_to(&mut patched, owned_conditions)?;

        if object_key(&patched)? != *key {
            return Err(StoreError::invalid_patch(
                "metadata.name and metadata.namespace cannot be patched",
            ));
        }

        let mut next_generation = generation(&entry.object);
        if patched.get("spec") != entry.object.get("spec") {
            next_generation += 1;
        }
        let version = self.next_version();
        stamp_revision(&mut patched, &version, next_generation)?;

        debug!(
            kind = %type_meta.kind,
            key = %key,
            version = %version,
            conditions = applied_conditions,
            "Patched object"
        );
        *entry = StoredObject::new(type_meta.clone(), key.clone(), version, patched);
        Ok(entry.value().clone())
    }

    fn is_registered(&self, type_meta: &TypeMeta) -> bool {
        self.kinds.contains(type_meta)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
