//! Types exchanged with object store backends.

use capa_core::{ConditionChange, ConditionSet, ConditionType, ObjectKey, Resource, TypeMeta};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// JSON pointer of the condition array inside an object.
pub const CONDITIONS_POINTER: &str = "/status/conditions";

/// An object as held by the store, with the version it was read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    /// Group/version/kind of the object.
    pub type_meta: TypeMeta,
    /// Namespace and name.
    pub key: ObjectKey,
    /// Opaque version string; changes on every applied write.
    pub resource_version: String,
    /// The full object as JSON, `metadata.resourceVersion` included.
    pub object: Value,
}

impl StoredObject {
    /// Creates a new `StoredObject`.
    #[must_use]
    pub fn new(
        type_meta: TypeMeta,
        key: ObjectKey,
        resource_version: impl Into<String>,
        object: Value,
    ) -> Self {
        Self {
            type_meta,
            key,
            resource_version: resource_version.into(),
            object,
        }
    }

    /// Deserializes the stored JSON into a typed object.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPatch` if the JSON does not match `T`.
    pub fn into_resource<T: Resource>(self) -> Result<T, StoreError> {
        Ok(T::from_json(self.object)?)
    }
}

/// The minimal change a controller submits for one object.
///
/// `merge_patch` is an RFC 7396 merge patch over every field except
/// `status.conditions`; condition edits travel in `conditions` so they can be
/// merged by type instead of replacing the whole array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchDocument {
    /// RFC 7396 merge patch for non-condition fields.
    pub merge_patch: Value,
    /// Owned-condition edits.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ConditionChange>,
    /// If set, the store must reject the patch unless the object is still at this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl Default for PatchDocument {
    fn default() -> Self {
        Self {
            merge_patch: Value::Object(Map::new()),
            conditions: Vec::new(),
            resource_version: None,
        }
    }
}

impl PatchDocument {
    /// Creates an empty patch document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the merge patch part.
    #[must_use]
    pub fn with_merge_patch(mut self, merge_patch: Value) -> Self {
        self.merge_patch = merge_patch;
        self
    }

    /// Sets the condition edits.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Vec<ConditionChange>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Requires the stored object to still be at `resource_version`.
    #[must_use]
    pub fn with_resource_version(mut self, resource_version: impl Into<String>) -> Self {
        self.resource_version = Some(resource_version.into());
        self
    }

    /// Returns true when applying this document would change nothing.
    ///
    /// A resourceVersion precondition alone does not count as a change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let merge_empty = match &self.merge_patch {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        };
        merge_empty && self.conditions.is_empty()
    }

    /// Condition types this document edits.
    pub fn condition_types(&self) -> impl Iterator<Item = &ConditionType> {
        self.conditions.iter().map(ConditionChange::condition_type)
    }

    /// Applies this document to `target` in place, the way a store does server-side.
    ///
    /// Condition edits outside `owned` are dropped. Returns the number of
    /// condition edits applied.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPatch` if the target is not an object, the
    /// merge patch is not an object, the merge patch tries to replace
    /// `status.conditions` wholesale, or the stored conditions are malformed.
    pub fn apply_to(
        &self,
        target: &mut Value,
        owned: &[ConditionType],
    ) -> Result<usize, StoreError> {
        if !target.is_object() {
            return Err(StoreError::invalid_patch("patch target is not a JSON object"));
        }
        match &self.merge_patch {
            Value::Null => {}
            Value::Object(_) => {
                if self.merge_patch.pointer(CONDITIONS_POINTER).is_some() {
                    return Err(StoreError::invalid_patch(
                        "status.conditions must be patched by condition type",
                    ));
                }
                json_patch::merge(target, &self.merge_patch);
            }
            _ => {
                return Err(StoreError::invalid_patch("merge patch must be a JSON object"));
            }
        }

        if self.conditions.is_empty() {
            return Ok(0);
        }

        let Some(root) = target.as_object_mut() else {
            return Err(StoreError::invalid_patch("patch target is not a JSON object"));
        };
        let status = root
            .entry("status")
            .or_insert_with(|| Value::Object(Map::new()));
        if !status.is_object() {
            *status = Value::Object(Map::new());
        }
        let Some(status) = status.as_object_mut() else {
            return Err(StoreError::internal("status is not a JSON object"));
        };

        let mut conditions: ConditionSet = match status.remove("conditions") {
            Some(existing) => serde_json::from_value(existing).map_err(|e| {
                StoreError::invalid_patch(format!("stored conditions are malformed: {e}"))
            })?,
            None => ConditionSet::new(),
        };
        let applied = conditions.apply_owned(&self.conditions, owned);
        if !conditions.is_empty() {
            let value = serde_json::to_value(&conditions)
                .map_err(|e| StoreError::internal(format!("failed to encode conditions: {e}")))?;
            status.insert("conditions".to_string(), value);
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use capa_core::{Condition, ConditionStatus, reasons};
    use serde_json::json;

    const READY: ConditionType = ConditionType::from_static("ROSAControlPlaneReady");

    fn stored_object() -> Value {
        json!({
            "metadata": {"name": "cp", "namespace": "ns1"},
            "spec": {"rosaClusterName": "rosa", "region": "us-east-1"},
            "status": {"conditions": [
                {"type": "Foreign", "status": "True", "lastTransitionTime": "2024-01-01T00:00:00Z"}
            ]}
        })
    }

    #[test]
    fn test_empty_document() {
        assert!(PatchDocument::new().is_empty());
        assert!(PatchDocument::new().with_resource_version("5").is_empty());
        assert!(
            !PatchDocument::new()
                .with_merge_patch(json!({"spec": {"region": "eu-west-1"}}))
                .is_empty()
        );
    }

    #[test]
    fn test_apply_merge_patch_and_owned_condition() {
        let mut target = stored_object();
        let ready = Condition::true_condition(READY)
            .with_reason(reasons::PROVISIONED)
            .with_last_transition_time("2024-02-01T00:00:00Z".parse().unwrap());
        let doc = PatchDocument::new()
            .with_merge_patch(json!({"spec": {"region": null, "version": "4.14"}}))
            .with_conditions(vec![ConditionChange::Upsert { condition: ready }]);

        let applied = doc.apply_to(&mut target, &[READY]).unwrap();

        assert_eq!(applied, 1);
        assert_json_eq!(
            target,
            json!({
                "metadata": {"name": "cp", "namespace": "ns1"},
                "spec": {"rosaClusterName": "rosa", "version": "4.14"},
                "status": {"conditions": [
                    {"type": "Foreign", "status": "True",
                     "lastTransitionTime": "2024-01-01T00:00:00Z"},
                    {"type": "ROSAControlPlaneReady", "status": "True",
                     "lastTransitionTime": "2024-02-01T00:00:00Z", "reason": "Provisioned"}
                ]}
            })
        );
    }

    #[test]
    fn test_apply_drops_unowned_condition_edits() {
        let mut target = stored_object();
        let doc = PatchDocument::new().with_conditions(vec![ConditionChange::Upsert {
            condition: Condition::new("Foreign", ConditionStatus::False),
        }]);

        let applied = doc.apply_to(&mut target, &[READY]).unwrap();

        assert_eq!(applied, 0);
        assert_eq!(target["status"]["conditions"][0]["status"], "True");
    }

    #[test]
    fn test_apply_rejects_wholesale_condition_replacement() {
        let mut target = stored_object();
        let doc = PatchDocument::new().with_merge_patch(json!({"status": {"conditions": []}}));
        let err = doc.apply_to(&mut target, &[READY]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPatch { .. }));
    }

    #[test]
    fn test_apply_rejects_non_object_patch() {
        let mut target = stored_object();
        let doc = PatchDocument::new().with_merge_patch(json!(["nope"]));
        assert!(doc.apply_to(&mut target, &[READY]).is_err());
    }

    #[test]
    fn test_removing_last_condition_drops_array() {
        let mut target = json!({"metadata": {"name": "cp"}, "status": {"conditions": [
            {"type": "ROSAControlPlaneReady", "status": "True",
             "lastTransitionTime": "2024-01-01T00:00:00Z"}
        ]}});
        let doc = PatchDocument::new().with_conditions(vec![ConditionChange::Remove {
            condition_type: READY,
        }]);
        doc.apply_to(&mut target, &[READY]).unwrap();
        assert_eq!(target["status"], json!({}));
    }

    #[test]
    fn test_wire_form() {
        let doc = PatchDocument::new()
            .with_merge_patch(json!({"status": {"ready": true}}))
            .with_resource_version("12");
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"mergePatch": {"status": {"ready": true}}, "resourceVersion": "12"})
        );
    }
}
