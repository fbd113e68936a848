use crate::conditions::ConditionSet;
use crate::meta::{HasConditions, ObjectMeta, ObjectReference, Resource};
use serde::{Deserialize, Serialize};

/// Cluster API `Cluster`, the parent of every infrastructure object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cluster {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ClusterSpec,
    #[serde(default)]
    pub status: ClusterStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_plane_ref: Option<ObjectReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure_ref: Option<ObjectReference>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub control_plane_ready: bool,
    #[serde(default, skip_serializing_if = "ConditionSet::is_empty")]
    pub conditions: ConditionSet,
}

impl Cluster {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            ..Self::default()
        }
    }
}

impl Resource for Cluster {
    const API_VERSION: &'static str = "cluster.x-k8s.io/v1beta1";
    const KIND: &'static str = "Cluster";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl HasConditions for Cluster {
    fn conditions(&self) -> &ConditionSet {
        &self.status.conditions
    }

    fn conditions_mut(&mut self) -> &mut ConditionSet {
        &mut self.status.conditions
    }
}
