//! Test doubles and common utilities for reconciliation contract tests
//!
//! The list store double behaves like a tiny in-memory Pi-hole: writes
//! really change the stored entries, so a second run sees the effects of the
//! first. Every call is recorded in order.

#![allow(dead_code)]

use pihole_core::error::{Error, Result};
use pihole_core::{
    Group, GroupId, GroupStore, ListEntry, ListKey, ListStore, ListType, ReconcileOptions,
    Reconciler,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A recorded call against a store double
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List(ListType),
    Get(ListKey),
    Create(ListEntry),
    Update(ListEntry),
    Delete(ListKey),
    BatchDelete(Vec<ListKey>),
    ListGroups,
}

impl StoreCall {
    /// Whether this call modifies remote state
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StoreCall::Create(_)
                | StoreCall::Update(_)
                | StoreCall::Delete(_)
                | StoreCall::BatchDelete(_)
        )
    }
}

/// An in-memory list store that records every call
pub struct RecordingListStore {
    /// Current remote entries, in remote order
    entries: Arc<Mutex<Vec<ListEntry>>>,
    /// Every call, in order
    calls: Arc<Mutex<Vec<StoreCall>>>,
    /// Zero-based index of the write that should fail
    fail_write_at: Arc<Mutex<Option<usize>>>,
    /// Make every read fail
    fail_reads: Arc<AtomicBool>,
    /// Whether the store offers a batch delete call
    batching: bool,
}

impl RecordingListStore {
    pub fn new(entries: Vec<ListEntry>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_write_at: Arc::new(Mutex::new(None)),
            fail_reads: Arc::new(AtomicBool::new(false)),
            batching: true,
        }
    }

    /// A store without a batch delete call
    pub fn without_batching(entries: Vec<ListEntry>) -> Self {
        Self {
            batching: false,
            ..Self::new(entries)
        }
    }

    /// Create a store that shares entries, call log and failure switches
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            entries: Arc::clone(&other.entries),
            calls: Arc::clone(&other.calls),
            fail_write_at: Arc::clone(&other.fail_write_at),
            fail_reads: Arc::clone(&other.fail_reads),
            batching: other.batching,
        }
    }

    /// Fail the `index`-th write (zero-based) of the whole test
    pub fn fail_write_at(&self, index: usize) {
        *self.fail_write_at.lock().unwrap() = Some(index);
    }

    /// Stop injecting write failures
    pub fn heal(&self) {
        *self.fail_write_at.lock().unwrap() = None;
        self.fail_reads.store(false, Ordering::SeqCst);
    }

    /// Make every read fail
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<StoreCall> {
        self.calls().into_iter().filter(StoreCall::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn entries(&self) -> Vec<ListEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn entry(&self, address: &str, list_type: ListType) -> Option<ListEntry> {
        self.entries()
            .into_iter()
            .find(|e| e.address == address && e.list_type == list_type)
    }

    fn record(&self, call: StoreCall) -> Result<()> {
        let is_write = call.is_write();
        let mut calls = self.calls.lock().unwrap();
        let write_index = calls.iter().filter(|c| c.is_write()).count();
        calls.push(call);

        if is_write && *self.fail_write_at.lock().unwrap() == Some(write_index) {
            return Err(Error::http("injected write failure"));
        }
        if !is_write && self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::http("injected read failure"));
        }
        Ok(())
    }

    fn remove(&self, key: &ListKey) {
        self.entries
            .lock()
            .unwrap()
            .retain(|e| !(e.address == key.address && e.list_type == key.list_type));
    }
}

#[async_trait::async_trait]
impl ListStore for RecordingListStore {
    async fn list(&self, list_type: ListType) -> Result<Vec<ListEntry>> {
        self.record(StoreCall::List(list_type))?;
        Ok(self
            .entries()
            .into_iter()
            .filter(|e| e.list_type == list_type)
            .collect())
    }

    async fn get(&self, key: &ListKey) -> Result<Option<ListEntry>> {
        self.record(StoreCall::Get(key.clone()))?;
        Ok(self.entry(&key.address, key.list_type))
    }

    async fn create(&self, entry: &ListEntry) -> Result<Value> {
        self.record(StoreCall::Create(entry.clone()))?;
        self.entries.lock().unwrap().push(entry.clone());
        Ok(json!({"lists": [entry]}))
    }

    async fn update(&self, entry: &ListEntry) -> Result<Value> {
        self.record(StoreCall::Update(entry.clone()))?;
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries
            .iter_mut()
            .find(|e| e.address == entry.address && e.list_type == entry.list_type)
        {
            *existing = entry.clone();
        }
        Ok(json!({"lists": [entry]}))
    }

    async fn delete(&self, key: &ListKey) -> Result<Value> {
        self.record(StoreCall::Delete(key.clone()))?;
        self.remove(key);
        Ok(Value::Null)
    }

    fn supports_batch_delete(&self) -> bool {
        self.batching
    }

    async fn batch_delete(&self, keys: &[ListKey]) -> Result<Value> {
        self.record(StoreCall::BatchDelete(keys.to_vec()))?;
        for key in keys {
            self.remove(key);
        }
        Ok(Value::Null)
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}

/// A group store returning a fixed set of groups
pub struct StaticGroupStore {
    groups: Vec<Group>,
    /// Shared with the list store so group reads show up in the same log
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl StaticGroupStore {
    pub fn new(ids: &[GroupId], lists: &RecordingListStore) -> Self {
        Self {
            groups: ids
                .iter()
                .map(|&id| Group {
                    id,
                    name: format!("group-{}", id),
                    enabled: true,
                })
                .collect(),
            calls: Arc::clone(&lists.calls),
        }
    }
}

#[async_trait::async_trait]
impl GroupStore for StaticGroupStore {
    async fn list_groups(&self) -> Result<Vec<Group>> {
        self.calls.lock().unwrap().push(StoreCall::ListGroups);
        Ok(self.groups.clone())
    }
}

/// Build a reconciler over a store double (groups 0 and 1 exist)
pub fn reconciler(store: &RecordingListStore) -> Reconciler {
    reconciler_with(store, &[0, 1], ReconcileOptions::default())
}

/// Build a reconciler with explicit groups and options
pub fn reconciler_with(
    store: &RecordingListStore,
    groups: &[GroupId],
    options: ReconcileOptions,
) -> Reconciler {
    Reconciler::new(
        Box::new(RecordingListStore::sharing_state_with(store)),
        Box::new(StaticGroupStore::new(groups, store)),
        options,
    )
}

pub fn block(address: &str) -> ListEntry {
    ListEntry::new(address, ListType::Block)
}

pub fn allow(address: &str) -> ListEntry {
    ListEntry::new(address, ListType::Allow)
}
