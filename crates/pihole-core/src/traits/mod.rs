//! Remote store traits
//!
//! The reconciler only talks to the outside world through these interfaces.
//!
//! - [`ListStore`]: Read and write allow/block list entries
//! - [`GroupStore`]: Read the remote group collection

pub mod group_store;
pub mod list_store;

pub use group_store::GroupStore;
pub use list_store::ListStore;
