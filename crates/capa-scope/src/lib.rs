//! # capa-scope
//!
//! Reconciliation scope for `ROSAControlPlane` objects.
//!
//! A [`RosaControlPlaneScope`] is built once per reconcile pass from a
//! [`ScopeParams`]. It validates its inputs, snapshots the control plane, and
//! exposes the identity accessors the reconciler needs. When the pass ends,
//! [`RosaControlPlaneScope::close`] (or [`with_scope`]) submits a single patch
//! with the changed fields and the owned `ROSAControlPlaneReady` condition.
//! Conditions set by other controllers are never overwritten.
//!
//! ## Example
//!
//! ```ignore
//! use capa_scope::{RosaControlPlaneScope, ScopeParams, config, observability};
//!
//! let cfg = config::loader::load_config(None)?;
//! observability::init_tracing(&cfg.logging)?;
//!
//! let mut scope = RosaControlPlaneScope::new(
//!     ScopeParams::new("rosacontrolplane")
//!         .with_config(&cfg)
//!         .with_client(store)
//!         .with_cluster(cluster)
//!         .with_control_plane(control_plane),
//! )?;
//! scope
//!     .control_plane_mut()
//!     .status
//!     .conditions
//!     .mark_true(ROSA_CONTROL_PLANE_READY_CONDITION);
//! scope.close().await?;
//! ```

pub mod config;
pub mod error;
pub mod observability;
pub mod patch;
mod runner;
mod scope;

pub use config::{BaselinePolicy, ConfigError, LoggingConfig, ScopeConfig, ScopeSettings};
pub use error::{Result, ScopeError};
pub use patch::{PatchHelper, PatchOptions};
pub use runner::with_scope;
pub use scope::{OWNED_CONDITIONS, RosaControlPlaneScope, ScopeParams};
