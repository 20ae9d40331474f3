// # pihole-core
//
// Core library for declarative Pi-hole allow/block list management.
//
// ## Architecture Overview
//
// This library reconciles a declared set of list entries against the live
// state of a Pi-hole instance:
// - **ListStore / GroupStore**: Traits for the remote collections
// - **loader**: Normalizes declarations and fills defaults
// - **diff**: Classifies entries into create / update / delete / unchanged
// - **apply**: Executes the writes in a fixed, non-transactional order
// - **summary**: Builds the structured result
// - **Reconciler**: Runs the whole pipeline for one of three modes
//
// ## Modes
//
// 1. **Upsert**: one entry, explicit present/absent
// 2. **Replace**: one list type, undeclared entries are deleted
// 3. **Patch**: both list types, deletion only via `state: absent`
//
// ## Design Principles
//
// 1. **Business keys**: entries match on `(address, type)`, never remote IDs
// 2. **Stateless**: every run fetches fresh remote state
// 3. **Idempotent**: a second run with the same input writes nothing
// 4. **Non-atomic**: a failed write stops the run; re-running converges

pub mod apply;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod loader;
pub mod model;
pub mod summary;
pub mod traits;

// Re-export core types for convenience
pub use config::{ConnectionConfig, Manifest, PatchSpec, ReconcileOptions, ReplaceSpec, UpsertSpec};
pub use diff::ChangeSet;
pub use engine::Reconciler;
pub use error::{Error, Result};
pub use model::{DeclaredEntry, DesiredState, Group, GroupId, ListEntry, ListKey, ListType};
pub use summary::ReconciliationResult;
pub use traits::{GroupStore, ListStore};
