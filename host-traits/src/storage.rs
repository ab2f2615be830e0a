//! Key-Value Storage Abstraction
//!
//! The token store persists its fields to two interchangeable string
//! key-value backends: one scoped to the current session and one that
//! survives restarts. Both speak this trait; the selection between them is
//! the token store's concern, not the backend's.
//!
//! # Security
//!
//! Backends hold credentials. Implementations must never log stored values,
//! and error messages must not include them.
//!
//! # Example
//!
//! ```ignore
//! use host_traits::storage::KeyValueStore;
//!
//! async fn remember(store: &dyn KeyValueStore) -> host_traits::error::Result<()> {
//!     store.set("remember_me", "true").await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

use crate::error::Result;

/// String key-value storage backend.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieve a value. Returns `Ok(None)` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, overwriting any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Idempotent; removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check for a key without reading its value.
    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Remove every key held by this backend.
    async fn clear(&self) -> Result<()>;
}
