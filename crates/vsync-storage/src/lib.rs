//! # vsync-storage
//!
//! Object store abstraction layer for vsync.
//!
//! This crate defines the trait both the physical and the virtual store
//! clients implement, the error taxonomy the reconciler reasons about, and
//! the evented wrapper that turns writes into watch events. Backends live in
//! separate crates.
//!
//! ## Example
//!
//! ```ignore
//! use vsync_storage::{ObjectStore, StorageError};
//!
//! async fn revisions(store: &dyn ObjectStore, ns: &str) -> Result<Vec<Object>, StorageError> {
//!     let gvk = GroupVersionKind::new("serving.knative.dev", "v1", "Revision");
//!     store.list(&gvk, Some(ns)).await
//! }
//! ```

mod error;
pub mod evented;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use evented::EventedStore;
pub use traits::ObjectStore;
pub use types::{StoreEvent, StoreEventType};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn ObjectStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use vsync_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::evented::EventedStore;
    pub use crate::traits::ObjectStore;
    pub use crate::types::{StoreEvent, StoreEventType};
    pub use crate::{DynStore, StorageResult};
}
