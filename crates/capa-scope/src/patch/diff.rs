//! JSON diffing between a baseline snapshot and the current object.

use json_patch::PatchOperation;
use serde_json::{Map, Value};

/// Metadata fields the store owns. Never diffed, never submitted.
const SERVER_MANAGED_METADATA: &[&str] =
    &["resourceVersion", "generation", "uid", "creationTimestamp"];

/// Removes server-managed metadata and `status.conditions` from an object.
///
/// Conditions are diffed by type separately and must never be expressed as
/// part of the merge patch.
pub(crate) fn strip_unpatchable(value: &mut Value) {
    if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
        for field in SERVER_MANAGED_METADATA {
            metadata.remove(*field);
        }
    }
    if let Some(status) = value.get_mut("status").and_then(Value::as_object_mut) {
        status.remove("conditions");
    }
}

/// Builds the RFC 7396 merge patch turning `before` into `after`.
///
/// Returns `None` when the two are equal. Objects are diffed key by key,
/// removed keys become `null`, anything else (arrays included) is replaced
/// wholesale.
pub fn merge_diff(before: &Value, after: &Value) -> Option<Value> {
    match (before, after) {
        (Value::Object(before), Value::Object(after)) => {
            let mut patch = Map::new();
            for (key, after_value) in after {
                match before.get(key) {
                    Some(before_value) => {
                        if let Some(diff) = merge_diff(before_value, after_value) {
                            patch.insert(key.clone(), diff);
                        }
                    }
                    None => {
                        patch.insert(key.clone(), after_value.clone());
                    }
                }
            }
            for key in before.keys() {
                if !after.contains_key(key) {
                    patch.insert(key.clone(), Value::Null);
                }
            }
            if patch.is_empty() {
                None
            } else {
                Some(Value::Object(patch))
            }
        }
        (before, after) if before == after => None,
        (_, after) => Some(after.clone()),
    }
}

/// JSON pointer paths that differ between `before` and `after`, for logging.
pub fn changed_paths(before: &Value, after: &Value) -> Vec<String> {
    json_patch::diff(before, after)
        .0
        .iter()
        .map(|op| operation_path(op).to_string())
        .collect()
}

/// Extracts the path from a JSON Patch operation.
fn operation_path(op: &PatchOperation) -> &str {
    match op {
        PatchOperation::Add(add_op) => add_op.path.as_str(),
        PatchOperation::Remove(remove_op) => remove_op.path.as_str(),
        PatchOperation::Replace(replace_op) => replace_op.path.as_str(),
        PatchOperation::Move(move_op) => move_op.path.as_str(),
        PatchOperation::Copy(copy_op) => copy_op.path.as_str(),
        PatchOperation::Test(test_op) => test_op.path.as_str(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_values_have_no_diff() {
        let value = json!({"spec": {"region": "us-east-1"}, "status": {"ready": false}});
        assert_eq!(merge_diff(&value, &value), None);
    }

    #[test]
    fn test_nested_change_only_carries_changed_leaf() {
        let before = json!({"spec": {"region": "us-east-1", "version": "4.14"}});
        let after = json!({"spec": {"region": "us-east-1", "version": "4.15"}});
        assert_eq!(
            merge_diff(&before, &after),
            Some(json!({"spec": {"version": "4.15"}}))
        );
    }

    #[test]
    fn test_removed_key_becomes_null() {
        let before = json!({"status": {"failureMessage": "boom", "ready": false}});
        let after = json!({"status": {"ready": false}});
        assert_eq!(
            merge_diff(&before, &after),
            Some(json!({"status": {"failureMessage": null}}))
        );
    }

    #[test]
    fn test_arrays_replace_wholesale() {
        let before = json!({"metadata": {"finalizers": ["a"]}});
        let after = json!({"metadata": {"finalizers": ["a", "b"]}});
        assert_eq!(
            merge_diff(&before, &after),
            Some(json!({"metadata": {"finalizers": ["a", "b"]}}))
        );
    }

    #[test]
    fn test_applying_diff_reproduces_after() {
        let before = json!({"spec": {"a": 1, "b": {"c": 2}}, "status": {"x": true}});
        let after = json!({"spec": {"a": 1, "b": {"d": 3}}, "status": {"x": true, "y": "new"}});
        let patch = merge_diff(&before, &after).unwrap();
        let mut patched = before.clone();
        json_patch::merge(&mut patched, &patch);
        assert_eq!(patched, after);
    }

    #[test]
    fn test_strip_unpatchable() {
        let mut value = json!({
            "metadata": {"name": "cp", "resourceVersion": "5", "generation": 2, "uid": "u"},
            "status": {"ready": true, "conditions": [{"type": "Ready"}]}
        });
        strip_unpatchable(&mut value);
        assert_eq!(
            value,
            json!({"metadata": {"name": "cp"}, "status": {"ready": true}})
        );
    }

    #[test]
    fn test_changed_paths() {
        let before = json!({"spec": {"region": "us-east-1"}, "status": {}});
        let after = json!({"spec": {"region": "eu-west-1"}, "status": {"ready": true}});
        let mut paths = changed_paths(&before, &after);
        paths.sort();
        assert_eq!(paths, vec!["/spec/region", "/status/ready"]);
    }
}
