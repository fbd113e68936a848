//! In-memory object store backend for CAPA reconciliation scopes.
//!
//! This crate provides an in-memory implementation of the `ObjectStore` trait
//! from `capa-storage`, using dashmap for concurrent access. It behaves like
//! an API server for the parts a scope relies on: resourceVersion bumps on
//! every applied write, optimistic-lock conflicts, merge patches, and
//! condition merges restricted to owned types.
//!
//! # Example
//!
//! ```ignore
//! use capa_store_memory::InMemoryStore;
//! use capa_storage::TypedObjectStore;
//!
//! let store = InMemoryStore::new()
//!     .with_kind::<Cluster>()
//!     .with_kind::<RosaControlPlane>();
//! let created = store.create_resource(&RosaControlPlane::new("ns1", "cp")).await?;
//! ```

pub mod storage;

// Re-export the ObjectStore trait for convenience
pub use capa_storage::{ObjectStore, StoreError, StoredObject};

pub use storage::{InMemoryStore, StorageKey};
