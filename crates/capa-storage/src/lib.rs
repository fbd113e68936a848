//! # capa-storage
//!
//! Object store abstraction layer for CAPA reconciliation scopes.
//!
//! This crate defines the traits and types a store backend implements and a
//! reconciliation scope writes through. It contains no real backend; the
//! in-memory one lives in `capa-store-memory`.
//!
//! ## Overview
//!
//! The main trait is [`ObjectStore`], which defines:
//! - get/create/update of whole objects, with resourceVersion checks
//! - patch submission of a [`PatchDocument`] restricted to owned condition types
//!
//! ## Example
//!
//! ```ignore
//! use capa_storage::{ObjectStore, PatchDocument};
//!
//! let doc = PatchDocument::new()
//!     .with_merge_patch(json!({"status": {"ready": true}}))
//!     .with_conditions(changes);
//! store
//!     .patch(&RosaControlPlane::type_meta(), &key, &doc, &[ROSA_CONTROL_PLANE_READY_CONDITION])
//!     .await?;
//! ```

mod error;
pub mod recording;
mod traits;
mod types;

// Re-export everything from submodules
pub use error::{ErrorCategory, StoreError};
pub use recording::{PatchSubmission, RecordingStore};
pub use traits::{ObjectStore, TypedObjectStore};
pub use types::{CONDITIONS_POINTER, PatchDocument, StoredObject};

/// Type alias for a store result.
pub type StoreResult<T> = Result<T, StoreError>;

/// Type alias for a shared store trait object.
pub type DynObjectStore = std::sync::Arc<dyn ObjectStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use capa_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StoreError};
    pub use crate::recording::{PatchSubmission, RecordingStore};
    pub use crate::traits::{ObjectStore, TypedObjectStore};
    pub use crate::types::{CONDITIONS_POINTER, PatchDocument, StoredObject};
    pub use crate::{DynObjectStore, StoreResult};
}
