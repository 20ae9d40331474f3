// # Group Store Trait
//
// Read-only access to the groups defined on the remote instance. The
// reconciler never creates groups; it only checks that declared group IDs
// exist before writing anything.

use crate::model::Group;
use async_trait::async_trait;

/// Trait for remote group store implementations
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Fetch every group known to the remote instance
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Group>)`: All remote groups
    /// - `Err(Error)`: The request failed or the response was malformed
    async fn list_groups(&self) -> Result<Vec<Group>, crate::Error>;
}
