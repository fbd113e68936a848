//! Core object model for CAPA reconciliation scopes.
//!
//! Defines object identity ([`ObjectMeta`], [`ObjectKey`], [`TypeMeta`]), the
//! [`Resource`] trait every stored object implements, the condition algebra in
//! [`conditions`], and the two objects a ROSA control plane controller works
//! with: the parent [`Cluster`] and the [`RosaControlPlane`] it reconciles.

pub mod cluster;
pub mod conditions;
pub mod error;
pub mod meta;
pub mod rosa;
pub mod time;

pub use cluster::{Cluster, ClusterSpec, ClusterStatus};
pub use conditions::{
    Condition, ConditionChange, ConditionSet, ConditionSeverity, ConditionStatus, ConditionType,
    READY_CONDITION,
};
pub use error::{CoreError, ErrorCategory, Result};
pub use meta::{
    HasConditions, LocalObjectReference, ObjectKey, ObjectMeta, ObjectReference, Resource,
    SecretReference, TypeMeta,
};
pub use rosa::{
    ROSA_CONTROL_PLANE_READY_CONDITION, RosaControlPlane, RosaControlPlaneSpec,
    RosaControlPlaneStatus, reasons,
};
pub use time::{Timestamp, now};
