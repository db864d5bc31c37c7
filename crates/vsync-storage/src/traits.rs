//! Store traits for the object store abstraction layer.

use async_trait::async_trait;
use vsync_core::{GroupVersionKind, Object, ObjectKey};

use crate::StorageResult;

/// Client for one object store (the physical or the virtual cluster).
///
/// Implementations must be thread-safe (`Send + Sync`). Objects are versioned
/// through `metadata.resourceVersion`; writes carrying a resource version are
/// rejected with `StorageError::Conflict` when it is stale.
///
/// # Example
///
/// ```ignore
/// use vsync_storage::{ObjectStore, StorageError};
///
/// async fn must_get(store: &dyn ObjectStore, gvk: &GroupVersionKind, key: &ObjectKey)
///     -> Result<Object, StorageError>
/// {
///     store
///         .get(gvk, key)
///         .await?
///         .ok_or_else(|| StorageError::not_found(&gvk.kind, key))
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads an object by type and key.
    ///
    /// Returns `None` if the object does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing objects.
    async fn get(
        &self,
        gvk: &GroupVersionKind,
        key: &ObjectKey,
    ) -> StorageResult<Option<Object>>;

    /// Lists objects of a type, optionally restricted to one namespace.
    async fn list(
        &self,
        gvk: &GroupVersionKind,
        namespace: Option<&str>,
    ) -> StorageResult<Vec<Object>>;

    /// Creates a new object and returns it as stored (uid and resource version assigned).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if an object with the same type and key exists.
    /// Returns `StorageError::InvalidObject` if the object has no name.
    async fn create(&self, object: &Object) -> StorageResult<Object>;

    /// Replaces the metadata and spec of an existing object.
    ///
    /// The status section of `object` is ignored; the stored status is kept.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    /// Returns `StorageError::Conflict` if the resource version is stale.
    async fn update(&self, object: &Object) -> StorageResult<Object>;

    /// Replaces only the status section of an existing object.
    ///
    /// # Errors
    ///
    /// Same as [`ObjectStore::update`].
    async fn update_status(&self, object: &Object) -> StorageResult<Object>;

    /// Deletes an object.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    async fn delete(&self, object: &Object) -> StorageResult<()>;

    /// Returns the name of this store backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
