// # List Store Trait
//
// Defines the interface to the remote allow/block list collections.
//
// ## Implementations
//
// - Pi-hole v6 HTTP API: `pihole-api` crate
// - Test doubles: `tests/common/mod.rs`
//
// ## Usage
//
// ```rust,ignore
// use pihole_core::{ListStore, ListType};
//
// async fn show(store: &dyn ListStore) -> pihole_core::Result<()> {
//     for entry in store.list(ListType::Block).await? {
//         println!("{} enabled={}", entry.address, entry.enabled);
//     }
//     Ok(())
// }
// ```

use crate::model::{ListEntry, ListKey, ListType};
use async_trait::async_trait;
use serde_json::Value;

/// Trait for remote list store implementations
///
/// Every method is a single independent remote call. There is no
/// transaction spanning several calls: a failure leaves earlier calls
/// applied.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to the configured instance only
/// - ✅ Parse instance-specific responses into [`ListEntry`] values
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (re-running the reconciliation is the recovery path)
/// - ❌ Cache remote state between calls
/// - ❌ Decide whether a write is needed (owned by the differ)
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Fetch every entry of one list type
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<ListEntry>)`: The complete remote collection, in remote order
    /// - `Err(Error)`: Transport, authentication or decoding failure
    async fn list(&self, list_type: ListType) -> Result<Vec<ListEntry>, crate::Error>;

    /// Fetch a single entry by business key
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ListEntry))`: The entry exists
    /// - `Ok(None)`: No entry with that address and type
    /// - `Err(Error)`: The request failed
    async fn get(&self, key: &ListKey) -> Result<Option<ListEntry>, crate::Error>;

    /// Create a new entry with the given attributes
    ///
    /// # Returns
    ///
    /// The raw API response
    async fn create(&self, entry: &ListEntry) -> Result<Value, crate::Error>;

    /// Overwrite the attributes of an existing entry
    ///
    /// # Returns
    ///
    /// The raw API response
    async fn update(&self, entry: &ListEntry) -> Result<Value, crate::Error>;

    /// Delete one entry
    ///
    /// # Returns
    ///
    /// The raw API response (`Value::Null` for empty bodies)
    async fn delete(&self, key: &ListKey) -> Result<Value, crate::Error>;

    /// Whether [`ListStore::batch_delete`] is backed by a real batch call
    ///
    /// When false the applier issues one [`ListStore::delete`] per key, so a
    /// failure partway through is reported with accurate counts.
    fn supports_batch_delete(&self) -> bool {
        false
    }

    /// Delete several entries, possibly of different types, in one call
    ///
    /// Only called when [`ListStore::supports_batch_delete`] returns true.
    ///
    /// # Returns
    ///
    /// The raw API response of the batch call
    async fn batch_delete(&self, _keys: &[ListKey]) -> Result<Value, crate::Error> {
        Err(crate::Error::provider(
            self.store_name(),
            "batch delete is not supported",
        ))
    }

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}
