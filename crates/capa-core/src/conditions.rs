//! Status conditions and the merge-by-type algebra used when patching them.
//!
//! A [`ConditionSet`] holds at most one [`Condition`] per [`ConditionType`] and
//! keeps insertion order, so the serialized array stays stable across writes.
//! Controllers only ever write the condition types they own; the helpers here
//! (`diff_owned`, `apply_owned`, `merge_owned`, `filter_owned`) never touch an
//! entry whose type is outside the owned list.

use crate::time::{Timestamp, now};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::{Borrow, Cow};
use std::fmt;

/// Identifier of a condition, unique within a [`ConditionSet`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConditionType(Cow<'static, str>);

impl ConditionType {
    pub const fn from_static(value: &'static str) -> Self {
        Self(Cow::Borrowed(value))
    }

    pub fn new(value: impl Into<String>) -> Self {
        Self(Cow::Owned(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Summary condition most objects report.
pub const READY_CONDITION: ConditionType = ConditionType::from_static("Ready");

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ConditionType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConditionType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ConditionType {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Serialize for ConditionType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ConditionType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// How bad a `False` condition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub status: ConditionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<ConditionSeverity>,
    pub last_transition_time: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    pub fn new(condition_type: impl Into<ConditionType>, status: ConditionStatus) -> Self {
        Self {
            condition_type: condition_type.into(),
            status,
            severity: None,
            last_transition_time: now(),
            reason: None,
            message: None,
        }
    }

    pub fn true_condition(condition_type: impl Into<ConditionType>) -> Self {
        Self::new(condition_type, ConditionStatus::True)
    }

    pub fn false_condition(
        condition_type: impl Into<ConditionType>,
        reason: impl Into<String>,
        severity: ConditionSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self::new(condition_type, ConditionStatus::False)
            .with_reason(reason)
            .with_severity(severity)
            .with_message(message)
    }

    pub fn unknown_condition(
        condition_type: impl Into<ConditionType>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(condition_type, ConditionStatus::Unknown)
            .with_reason(reason)
            .with_message(message)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_severity(mut self, severity: ConditionSeverity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_last_transition_time(mut self, time: Timestamp) -> Self {
        self.last_transition_time = time;
        self
    }

    /// Compares everything except the transition time.
    pub fn has_same_state(&self, other: &Condition) -> bool {
        self.condition_type == other.condition_type
            && self.status == other.status
            && self.severity == other.severity
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// A single owned-condition edit carried by a patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ConditionChange {
    Upsert {
        condition: Condition,
    },
    Remove {
        #[serde(rename = "type")]
        condition_type: ConditionType,
    },
}

impl ConditionChange {
    pub fn condition_type(&self) -> &ConditionType {
        match self {
            Self::Upsert { condition } => &condition.condition_type,
            Self::Remove { condition_type } => condition_type,
        }
    }
}

/// Ordered set of conditions keyed by type. Serialized as a JSON array.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConditionSet {
    items: IndexMap<ConditionType, Condition>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, condition_type: &str) -> Option<&Condition> {
        self.items.get(condition_type)
    }

    pub fn contains(&self, condition_type: &str) -> bool {
        self.items.contains_key(condition_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.items.values()
    }

    pub fn is_true(&self, condition_type: &str) -> bool {
        self.get(condition_type)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }

    pub fn is_false(&self, condition_type: &str) -> bool {
        self.get(condition_type)
            .is_some_and(|c| c.status == ConditionStatus::False)
    }

    /// Inserts or replaces the condition of the same type, keeping its position.
    ///
    /// The previous transition time survives when the status did not flip.
    pub fn set(&mut self, mut condition: Condition) {
        match self.items.get_mut(condition.condition_type.as_str()) {
            Some(existing) => {
                if existing.status == condition.status {
                    condition.last_transition_time = existing.last_transition_time;
                }
                *existing = condition;
            }
            None => {
                self.items.insert(condition.condition_type.clone(), condition);
            }
        }
    }

    pub fn mark_true(&mut self, condition_type: impl Into<ConditionType>) {
        self.set(Condition::true_condition(condition_type));
    }

    pub fn mark_false(
        &mut self,
        condition_type: impl Into<ConditionType>,
        reason: impl Into<String>,
        severity: ConditionSeverity,
        message: impl Into<String>,
    ) {
        self.set(Condition::false_condition(
            condition_type,
            reason,
            severity,
            message,
        ));
    }

    pub fn mark_unknown(
        &mut self,
        condition_type: impl Into<ConditionType>,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.set(Condition::unknown_condition(condition_type, reason, message));
    }

    pub fn remove(&mut self, condition_type: &str) -> Option<Condition> {
        self.items.shift_remove(condition_type)
    }

    /// Copy of this set restricted to the owned types, order preserved.
    pub fn filter_owned(&self, owned: &[ConditionType]) -> ConditionSet {
        let items = self
            .items
            .iter()
            .filter(|(t, _)| owned.contains(t))
            .map(|(t, c)| (t.clone(), c.clone()))
            .collect();
        ConditionSet { items }
    }

    /// Owned-condition edits that turn `before` into `self`.
    ///
    /// Unchanged owned conditions and every non-owned condition are left out.
    pub fn diff_owned(
        &self,
        before: &ConditionSet,
        owned: &[ConditionType],
    ) -> Vec<ConditionChange> {
        let mut changes = Vec::new();
        for condition_type in owned {
            let previous = before.get(condition_type.as_str());
            match self.get(condition_type.as_str()) {
                Some(current) if previous != Some(current) => {
                    changes.push(ConditionChange::Upsert {
                        condition: current.clone(),
                    });
                }
                Some(_) => {}
                None if previous.is_some() => {
                    changes.push(ConditionChange::Remove {
                        condition_type: condition_type.clone(),
                    });
                }
                None => {}
            }
        }
        changes
    }

    /// Applies edits verbatim, skipping any whose type is not owned.
    ///
    /// Returns how many edits were applied.
    pub fn apply_owned(
        &mut self,
        changes: &[ConditionChange],
        owned: &[ConditionType],
    ) -> usize {
        let mut applied = 0;
        for change in changes {
            if !owned.contains(change.condition_type()) {
                continue;
            }
            match change {
                ConditionChange::Upsert { condition } => {
                    match self.items.get_mut(condition.condition_type.as_str()) {
                        Some(existing) => *existing = condition.clone(),
                        None => {
                            self.items
                                .insert(condition.condition_type.clone(), condition.clone());
                        }
                    }
                }
                ConditionChange::Remove { condition_type } => {
                    self.items.shift_remove(condition_type.as_str());
                }
            }
            applied += 1;
        }
        applied
    }

    /// Takes `other`'s value for every owned type; other entries stay as they are.
    pub fn merge_owned(&mut self, other: &ConditionSet, owned: &[ConditionType]) {
        let changes = other.diff_owned(self, owned);
        self.apply_owned(&changes, owned);
    }
}

impl FromIterator<Condition> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        let mut set = ConditionSet::new();
        for condition in iter {
            set.items
                .insert(condition.condition_type.clone(), condition);
        }
        set
    }
}

impl Serialize for ConditionSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.items.values())
    }
}

impl<'de> Deserialize<'de> for ConditionSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // `null` reads as empty. Duplicate types collapse onto the last entry.
        let conditions = Option::<Vec<Condition>>::deserialize(deserializer)?;
        Ok(conditions.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const OWNED: ConditionType = ConditionType::from_static("ROSAControlPlaneReady");

    fn at(ts: &str) -> Timestamp {
        ts.parse().unwrap()
    }

    #[test]
    fn test_set_keeps_transition_time_when_status_unchanged() {
        let mut set = ConditionSet::new();
        set.set(
            Condition::true_condition("Ready")
                .with_last_transition_time(at("2024-01-01T00:00:00Z")),
        );
        set.set(
            Condition::true_condition("Ready")
                .with_reason("StillFine")
                .with_last_transition_time(at("2024-06-01T00:00:00Z")),
        );

        let ready = set.get("Ready").unwrap();
        assert_eq!(ready.last_transition_time, at("2024-01-01T00:00:00Z"));
        assert_eq!(ready.reason.as_deref(), Some("StillFine"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_set_moves_transition_time_on_flip() {
        let mut set = ConditionSet::new();
        set.set(
            Condition::true_condition("Ready")
                .with_last_transition_time(at("2024-01-01T00:00:00Z")),
        );
        set.set(
            Condition::false_condition("Ready", "Deleting", ConditionSeverity::Info, "")
                .with_last_transition_time(at("2024-06-01T00:00:00Z")),
        );
        assert_eq!(
            set.get("Ready").unwrap().last_transition_time,
            at("2024-06-01T00:00:00Z")
        );
        assert!(set.is_false("Ready"));
    }

    #[test]
    fn test_set_preserves_insertion_order() {
        let mut set = ConditionSet::new();
        set.mark_true("A");
        set.mark_true("B");
        set.mark_unknown("A", "Waiting", "waiting for B");
        let types: Vec<_> = set.iter().map(|c| c.condition_type.as_str()).collect();
        assert_eq!(types, vec!["A", "B"]);
    }

    #[test]
    fn test_diff_owned_ignores_foreign_types() {
        let before = ConditionSet::new();
        let mut after = before.clone();
        after.mark_true("Foreign");
        after.mark_true(OWNED);

        let changes = after.diff_owned(&before, &[OWNED]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].condition_type(), &OWNED);
    }

    #[test]
    fn test_diff_owned_unchanged_is_empty() {
        let mut before = ConditionSet::new();
        before.mark_true(OWNED);
        let after = before.clone();
        assert!(after.diff_owned(&before, &[OWNED]).is_empty());
    }

    #[test]
    fn test_diff_owned_reports_removal() {
        let mut before = ConditionSet::new();
        before.mark_true(OWNED);
        let mut after = before.clone();
        after.remove(OWNED.as_str());

        let changes = after.diff_owned(&before, &[OWNED]);
        assert_eq!(
            changes,
            vec![ConditionChange::Remove {
                condition_type: OWNED
            }]
        );
    }

    #[test]
    fn test_apply_owned_skips_foreign_changes() {
        let mut target = ConditionSet::new();
        target.mark_true("Foreign");

        let changes = vec![
            ConditionChange::Remove {
                condition_type: ConditionType::new("Foreign"),
            },
            ConditionChange::Upsert {
                condition: Condition::true_condition(OWNED),
            },
        ];
        let applied = target.apply_owned(&changes, &[OWNED]);

        assert_eq!(applied, 1);
        assert!(target.is_true("Foreign"));
        assert!(target.is_true(OWNED.as_str()));
    }

    #[test]
    fn test_merge_owned_and_filter_owned() {
        let mut remote = ConditionSet::new();
        remote.mark_true("Foreign");
        remote.mark_false(OWNED, "Old", ConditionSeverity::Warning, "stale");

        let mut local = ConditionSet::new();
        local.mark_true(OWNED);
        local.mark_false("Foreign", "LocalOnly", ConditionSeverity::Error, "must not leak");

        remote.merge_owned(&local, &[OWNED]);
        assert!(remote.is_true(OWNED.as_str()));
        assert!(remote.is_true("Foreign"));

        let owned_only = remote.filter_owned(&[OWNED]);
        assert_eq!(owned_only.len(), 1);
        assert!(owned_only.contains(OWNED.as_str()));
    }

    #[test]
    fn test_serde_array_form() {
        let value = json!([
            {"type": "Ready", "status": "True", "lastTransitionTime": "2024-01-01T00:00:00Z"},
            {"type": "ROSAControlPlaneReady", "status": "False", "severity": "Warning",
             "lastTransitionTime": "2024-01-01T00:00:00Z", "reason": "Provisioning"},
            {"type": "Ready", "status": "False", "lastTransitionTime": "2024-02-01T00:00:00Z"}
        ]);
        let set: ConditionSet = serde_json::from_value(value).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.is_false("Ready"));
        assert_eq!(
            set.get("ROSAControlPlaneReady").unwrap().severity,
            Some(ConditionSeverity::Warning)
        );

        let back = serde_json::to_value(&set).unwrap();
        assert_eq!(back[0]["type"], "Ready");
        assert_eq!(back[1]["reason"], "Provisioning");
        assert!(back[0].get("reason").is_none());
    }

    #[test]
    fn test_condition_change_wire_form() {
        let change = ConditionChange::Remove {
            condition_type: OWNED,
        };
        assert_eq!(
            serde_json::to_value(&change).unwrap(),
            json!({"op": "remove", "type": "ROSAControlPlaneReady"})
        );
    }

    #[test]
    fn test_null_conditions_read_as_empty() {
        let set: ConditionSet = serde_json::from_value(json!(null)).unwrap();
        assert!(set.is_empty());
    }
}
