//! In-memory object store backend for vsync.
//!
//! This crate provides an in-memory implementation of the `ObjectStore` trait
//! from `vsync-storage`, using DashMap for concurrent access. It backs the
//! test suites and local experiments with both the physical and the virtual
//! side of a sync pair.
//!
//! # Example
//!
//! ```ignore
//! use vsync_db_memory::InMemoryStore;
//! use vsync_storage::ObjectStore;
//!
//! let store = InMemoryStore::new("physical");
//! let created = store.create(&revision).await?;
//! assert!(created.metadata.uid.is_some());
//! ```

pub mod storage;

// Re-export the ObjectStore trait for convenience
pub use vsync_storage::{ObjectStore, StorageError};

pub use storage::{InMemoryStore, StorageKey};

/// Creates a new in-memory store wrapped for sharing.
pub fn create_store(name: &'static str) -> vsync_storage::DynStore {
    std::sync::Arc::new(InMemoryStore::new(name))
}
