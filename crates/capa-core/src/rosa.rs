//! `ROSAControlPlane`: a Red Hat OpenShift Service on AWS hosted control plane.

use crate::conditions::{ConditionSet, ConditionType};
use crate::meta::{HasConditions, LocalObjectReference, ObjectMeta, Resource};
use serde::{Deserialize, Serialize};

/// Overall readiness of the ROSA control plane, owned by its controller.
pub const ROSA_CONTROL_PLANE_READY_CONDITION: ConditionType =
    ConditionType::from_static("ROSAControlPlaneReady");

/// Condition reasons reported on [`ROSA_CONTROL_PLANE_READY_CONDITION`].
pub mod reasons {
    pub const RECONCILIATION_FAILED: &str = "ReconciliationFailed";
    pub const PROVISIONED: &str = "Provisioned";
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RosaControlPlane {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: RosaControlPlaneSpec,
    #[serde(default)]
    pub status: RosaControlPlaneStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosaControlPlaneSpec {
    /// Cluster name as known to OpenShift Cluster Manager.
    #[serde(default)]
    pub rosa_cluster_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    /// Secret in the control plane's namespace holding OCM credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret_ref: Option<LocalObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane_endpoint: Option<ApiEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub host: String,
    pub port: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosaControlPlaneStatus {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ready: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub initialized: bool,
    /// OCM cluster ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "consoleURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub console_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "ConditionSet::is_empty")]
    pub conditions: ConditionSet,
}

impl RosaControlPlane {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::new(namespace, name),
            ..Self::default()
        }
    }

    pub fn with_rosa_cluster_name(mut self, rosa_cluster_name: impl Into<String>) -> Self {
        self.spec.rosa_cluster_name = rosa_cluster_name.into();
        self
    }

    pub fn with_credentials_secret(mut self, name: impl Into<String>) -> Self {
        self.spec.credentials_secret_ref = Some(LocalObjectReference::new(name));
        self
    }
}

impl Resource for RosaControlPlane {
    const API_VERSION: &'static str = "controlplane.cluster.x-k8s.io/v1beta2";
    const KIND: &'static str = "ROSAControlPlane";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl HasConditions for RosaControlPlane {
    fn conditions(&self) -> &ConditionSet {
        &self.status.conditions
    }

    fn conditions_mut(&mut self) -> &mut ConditionSet {
        &mut self.status.conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_form() {
        let mut cp = RosaControlPlane::new("ns1", "demo-control-plane")
            .with_rosa_cluster_name("demo-rosa")
            .with_credentials_secret("rosa-creds");
        cp.status.console_url = Some("https://console.example".into());

        let value = cp.to_json().unwrap();
        assert_eq!(
            value,
            json!({
                "metadata": {"name": "demo-control-plane", "namespace": "ns1"},
                "spec": {
                    "rosaClusterName": "demo-rosa",
                    "credentialsSecretRef": {"name": "rosa-creds"}
                },
                "status": {"consoleURL": "https://console.example"}
            })
        );
    }

    #[test]
    fn test_to_json_requires_name() {
        let cp = RosaControlPlane::new("ns1", "");
        assert!(cp.to_json().is_err());
    }

    #[test]
    fn test_from_json() {
        let cp = RosaControlPlane::from_json(json!({
            "metadata": {"name": "cp", "namespace": "ns1", "resourceVersion": "7"},
            "spec": {"rosaClusterName": "rosa"},
            "status": {"conditions": [
                {"type": "ROSAControlPlaneReady", "status": "True",
                 "lastTransitionTime": "2024-01-01T00:00:00Z"}
            ]}
        }))
        .unwrap();
        assert_eq!(cp.metadata.resource_version.as_deref(), Some("7"));
        assert!(
            cp.conditions()
                .is_true(ROSA_CONTROL_PLANE_READY_CONDITION.as_str())
        );
    }

    #[test]
    fn test_from_json_null_conditions() {
        let cp = RosaControlPlane::from_json(json!({
            "metadata": {"name": "cp", "namespace": "ns1"},
            "spec": {"rosaClusterName": "rosa"},
            "status": {"ready": false, "conditions": null}
        }))
        .unwrap();
        assert!(cp.conditions().is_empty());
    }
}
