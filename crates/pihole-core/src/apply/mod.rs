//! Applier: execute a change set against a list store
//!
//! Operations run one at a time in a fixed order: deletions, then
//! creations, then updates. Deleting first frees a business key before it is
//! re-added. There is no rollback: the first failing call stops the run and
//! everything that completed before it stays applied.

use crate::diff::ChangeSet;
use crate::error::Error;
use crate::model::{ListEntry, ListKey};
use crate::traits::ListStore;
use serde_json::Value;
use std::fmt;
use tracing::{info, warn};

/// Kind of write, for counting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Entry removal
    Delete,
    /// Entry creation
    Create,
    /// Entry attribute update
    Update,
}

/// One independent remote write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Delete a single entry
    Delete(ListKey),
    /// Delete several entries in one call
    BatchDelete(Vec<ListKey>),
    /// Create an entry
    Create(ListEntry),
    /// Overwrite an entry's attributes
    Update(ListEntry),
}

impl Operation {
    /// The kind of write
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Delete(_) | Operation::BatchDelete(_) => OperationKind::Delete,
            Operation::Create(_) => OperationKind::Create,
            Operation::Update(_) => OperationKind::Update,
        }
    }

    /// Number of entries this operation touches
    pub fn entry_count(&self) -> usize {
        match self {
            Operation::BatchDelete(keys) => keys.len(),
            _ => 1,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Delete(key) => write!(f, "delete {}", key),
            Operation::BatchDelete(keys) => write!(f, "batch delete of {} lists", keys.len()),
            Operation::Create(entry) => write!(f, "create {}", entry.key()),
            Operation::Update(entry) => write!(f, "update {}", entry.key()),
        }
    }
}

/// Order a change set into remote writes
///
/// With `batching`, all deletions go into one batch call; a single deletion
/// always uses the plain delete call. Without it, every key gets its own
/// delete call.
pub fn plan(changes: &ChangeSet, batching: bool) -> Vec<Operation> {
    let mut operations = Vec::with_capacity(changes.write_count());

    match changes.to_delete.as_slice() {
        [] => {}
        keys @ [_, _, ..] if batching => operations.push(Operation::BatchDelete(keys.to_vec())),
        keys => operations.extend(keys.iter().cloned().map(Operation::Delete)),
    }
    operations.extend(changes.to_create.iter().cloned().map(Operation::Create));
    operations.extend(changes.to_update.iter().cloned().map(Operation::Update));

    operations
}

/// A write that succeeded
#[derive(Debug)]
pub struct CompletedOperation {
    /// The operation
    pub operation: Operation,
    /// Raw API response
    pub response: Value,
}

/// The write that stopped the run
#[derive(Debug)]
pub struct FailedOperation {
    /// The operation
    pub operation: Operation,
    /// Why it failed
    pub error: Error,
}

/// Outcome of applying a plan
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Writes that succeeded, in execution order
    pub completed: Vec<CompletedOperation>,
    /// The failing write, if the run stopped early
    pub failed: Option<FailedOperation>,
}

impl ApplyReport {
    /// Entries touched by completed operations of one kind
    pub fn count(&self, kind: OperationKind) -> usize {
        self.completed
            .iter()
            .filter(|done| done.operation.kind() == kind)
            .map(|done| done.operation.entry_count())
            .sum()
    }
}

/// Executes plans against a list store
pub struct Applier<'a> {
    store: &'a dyn ListStore,
}

impl<'a> Applier<'a> {
    /// Create an applier writing to `store`
    pub fn new(store: &'a dyn ListStore) -> Self {
        Self { store }
    }

    /// Execute `operations` sequentially, stopping at the first failure
    pub async fn apply(&self, operations: Vec<Operation>) -> ApplyReport {
        let mut report = ApplyReport::default();

        for operation in operations {
            match self.execute(&operation).await {
                Ok(response) => {
                    info!("Applied {} via {}", operation, self.store.store_name());
                    report.completed.push(CompletedOperation {
                        operation,
                        response,
                    });
                }
                Err(error) => {
                    warn!(
                        "{} failed after {} completed operation(s): {}",
                        operation,
                        report.completed.len(),
                        error
                    );
                    report.failed = Some(FailedOperation { operation, error });
                    break;
                }
            }
        }

        report
    }

    async fn execute(&self, operation: &Operation) -> Result<Value, Error> {
        match operation {
            Operation::Delete(key) => self.store.delete(key).await,
            Operation::BatchDelete(keys) => self.store.batch_delete(keys).await,
            Operation::Create(entry) => self.store.create(entry).await,
            Operation::Update(entry) => self.store.update(entry).await,
        }
    }
}
