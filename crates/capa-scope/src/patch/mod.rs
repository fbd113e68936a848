//! Patch helper: snapshot an object once, later submit only what changed.
//!
//! [`PatchHelper::new`] captures the object's JSON form as the baseline.
//! [`PatchHelper::patch`] diffs the current object against that baseline and
//! submits a [`PatchDocument`] holding
//! - an RFC 7396 merge patch of every changed field outside `status.conditions`
//! - upserts/removals for changed conditions whose type is owned
//!
//! Conditions of any other type are never submitted, even if the in-memory
//! object changed them. Server-managed metadata (`resourceVersion`,
//! `generation`, `uid`, `creationTimestamp`) is never diffed.

mod diff;

pub use diff::{changed_paths, merge_diff};

use std::marker::PhantomData;

use capa_core::{
    ConditionSet, ConditionType, CoreError, HasConditions, ObjectKey, Resource, TypeMeta,
};
use capa_storage::{DynObjectStore, PatchDocument, StoreError, StoredObject};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, ScopeError};

/// Knobs for how patches are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatchOptions {
    /// Send the object's current resourceVersion as a precondition.
    pub optimistic_lock: bool,
}

/// Patchable view of an object at one point in time.
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    fields: Value,
    conditions: ConditionSet,
}

impl Snapshot {
    fn capture<T: Resource + HasConditions>(object: &T) -> std::result::Result<Self, CoreError> {
        let mut fields = object.to_json()?;
        diff::strip_unpatchable(&mut fields);
        Ok(Self {
            fields,
            conditions: object.conditions().clone(),
        })
    }
}

/// Computes and submits minimal patches for one object of kind `T`.
pub struct PatchHelper<T> {
    client: DynObjectStore,
    type_meta: TypeMeta,
    key: ObjectKey,
    baseline: Snapshot,
    options: PatchOptions,
    _marker: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for PatchHelper<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchHelper")
            .field("backend", &self.client.backend_name())
            .field("type_meta", &self.type_meta)
            .field("key", &self.key)
            .field("options", &self.options)
            .finish()
    }
}

impl<T: Resource + HasConditions> PatchHelper<T> {
    /// Captures `object` as the baseline for later diffs.
    ///
    /// # Errors
    ///
    /// Returns `ScopeError::Initialization` when no client is given, the
    /// client does not serve `T`'s kind, or the object cannot be serialized
    /// (missing name, non-object JSON).
    pub fn new(object: &T, client: Option<DynObjectStore>, options: PatchOptions) -> Result<Self> {
        let client = client.ok_or_else(|| {
            ScopeError::initialization(StoreError::connection_error(
                "no object store client configured",
            ))
        })?;
        let type_meta = T::type_meta();
        if !client.is_registered(&type_meta) {
            return Err(ScopeError::initialization(StoreError::unsupported_kind(
                &type_meta,
            )));
        }
        let baseline = Snapshot::capture(object).map_err(ScopeError::initialization)?;

        Ok(Self {
            client,
            type_meta,
            key: object.key(),
            baseline,
            options,
            _marker: PhantomData,
        })
    }

    pub fn client(&self) -> &DynObjectStore {
        &self.client
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    /// Builds the patch document turning the baseline into `object`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError` if `object` cannot be serialized.
    pub fn calculate(
        &self,
        object: &T,
        owned_conditions: &[ConditionType],
    ) -> std::result::Result<PatchDocument, CoreError> {
        let current = Snapshot::capture(object)?;
        let merge_patch = merge_diff(&self.baseline.fields, &current.fields)
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let conditions = current
            .conditions
            .diff_owned(&self.baseline.conditions, owned_conditions);

        let mut document = PatchDocument::new()
            .with_merge_patch(merge_patch)
            .with_conditions(conditions);
        if self.options.optimistic_lock
            && let Some(version) = &object.metadata().resource_version
        {
            document = document.with_resource_version(version.clone());
        }
        Ok(document)
    }

    /// Whether committing `object` now would submit anything.
    pub fn has_changes(&self, object: &T, owned_conditions: &[ConditionType]) -> bool {
        self.calculate(object, owned_conditions)
            .map(|document| !document.is_empty())
            .unwrap_or(false)
    }

    /// JSON pointer paths of non-condition fields changed since the baseline.
    pub fn changed_paths(&self, object: &T) -> Vec<String> {
        match Snapshot::capture(object) {
            Ok(current) => changed_paths(&self.baseline.fields, &current.fields),
            Err(_) => Vec::new(),
        }
    }

    /// Diffs `object` against the baseline and submits the result.
    ///
    /// An empty diff performs no write and returns `Ok(None)`. Otherwise
    /// exactly one store patch is issued, carrying `owned_conditions` as the
    /// allow-list for condition merging. Store failures are returned as
    /// `ScopeError::Commit` with the store error as source. Nothing is retried.
    pub async fn patch(
        &self,
        object: &T,
        owned_conditions: &[ConditionType],
    ) -> Result<Option<StoredObject>> {
        let document = self
            .calculate(object, owned_conditions)
            .map_err(|e| self.commit_error(StoreError::from(e)))?;

        if document.is_empty() {
            debug!(kind = %self.type_meta.kind, key = %self.key, "No changes to persist");
            return Ok(None);
        }

        let paths = self.changed_paths(object);
        let condition_types: Vec<&str> = document.condition_types().map(|t| t.as_str()).collect();
        debug!(
            kind = %self.type_meta.kind,
            key = %self.key,
            paths = ?paths,
            conditions = ?condition_types,
            precondition = ?document.resource_version,
            "Submitting patch"
        );

        let stored = self
            .client
            .patch(&self.type_meta, &self.key, &document, owned_conditions)
            .await
            .map_err(|e| {
                warn!(
                    kind = %self.type_meta.kind,
                    key = %self.key,
                    error = %e,
                    "Patch rejected by store"
                );
                self.commit_error(e)
            })?;

        info!(
            kind = %self.type_meta.kind,
            key = %self.key,
            resource_version = %stored.resource_version,
            fields = paths.len(),
            conditions = condition_types.len(),
            "Patched object"
        );
        Ok(Some(stored))
    }

    /// Makes `object`'s current state the new baseline.
    ///
    /// # Errors
    ///
    /// Returns `CoreError` if `object` cannot be serialized.
    pub fn reset_baseline(&mut self, object: &T) -> std::result::Result<(), CoreError> {
        self.baseline = Snapshot::capture(object)?;
        Ok(())
    }

    fn commit_error(&self, source: StoreError) -> ScopeError {
        ScopeError::commit(self.type_meta.kind.clone(), self.key.clone(), source)
    }
}
