//! Differ: classify declared entries against remote state
//!
//! Three strategies, one per reconciliation mode. They are deliberately kept
//! apart because they encode different intents:
//!
//! | Strategy | Deletes | Compared fields |
//! |---|---|---|
//! | [`diff_upsert`] | only when `state = absent` | `enabled`, plus `comment`/`groups` when declared |
//! | [`diff_replace`] | every remote entry of the type that is not declared | `enabled`, `comment`, `groups` |
//! | [`diff_patch`] | only entries declared `absent` | `enabled`, `comment`, `groups` |
//!
//! Each bucket keeps the order of its source collection (declaration order,
//! or remote order for implicit deletions).

use crate::loader::UpsertRequest;
use crate::model::{DeclaredEntry, DesiredState, ListEntry, ListKey, ListType};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Classified operations for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Entries to create, with the attributes to send
    pub to_create: Vec<ListEntry>,
    /// Entries to update, with the full attribute set to send
    pub to_update: Vec<ListEntry>,
    /// Keys to delete
    pub to_delete: Vec<ListKey>,
    /// Declared keys that already match
    pub unchanged: Vec<ListKey>,
}

impl ChangeSet {
    /// True when no write is needed
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    /// Number of writes this change set implies (batching aside)
    pub fn write_count(&self) -> usize {
        self.to_create.len() + self.to_update.len() + self.to_delete.len()
    }
}

/// Remote entries indexed by business key
struct RemoteIndex<'a> {
    entries: HashMap<(ListType, &'a str), &'a ListEntry>,
}

impl<'a> RemoteIndex<'a> {
    fn new(remote: &'a [ListEntry]) -> Self {
        Self {
            entries: remote
                .iter()
                .map(|entry| ((entry.list_type, entry.address.as_str()), entry))
                .collect(),
        }
    }

    fn get(&self, list_type: ListType, address: &str) -> Option<&'a ListEntry> {
        self.entries.get(&(list_type, address)).copied()
    }
}

/// Single-entry upsert
///
/// `remote` is the entry currently stored under the request's key, if any.
pub fn diff_upsert(request: &UpsertRequest, remote: Option<&ListEntry>) -> ChangeSet {
    let mut changes = ChangeSet::default();

    match (request.state, remote) {
        (DesiredState::Present, None) => {
            debug!("{} does not exist, will create", request.key);
            changes.to_create.push(request.to_entry());
        }
        (DesiredState::Present, Some(current)) => {
            let comment_differs = request
                .comment
                .as_ref()
                .is_some_and(|comment| *comment != current.comment);
            let groups_differ = request
                .groups
                .as_ref()
                .is_some_and(|groups| *groups != current.groups);
            let enabled_differs = request.enabled != current.enabled;

            if comment_differs || groups_differ || enabled_differs {
                debug!(
                    "{} differs (comment: {}, groups: {}, enabled: {}), will update",
                    request.key, comment_differs, groups_differ, enabled_differs
                );
                changes.to_update.push(request.merged_with(current));
            } else {
                changes.unchanged.push(request.key.clone());
            }
        }
        (DesiredState::Absent, Some(_)) => {
            debug!("{} exists, will delete", request.key);
            changes.to_delete.push(request.key.clone());
        }
        (DesiredState::Absent, None) => {
            changes.unchanged.push(request.key.clone());
        }
    }

    changes
}

/// Full replacement of one list type
///
/// Remote entries of `list_type` missing from `declared` are deleted. Remote
/// entries of the other type are ignored.
pub fn diff_replace(list_type: ListType, declared: &[ListEntry], remote: &[ListEntry]) -> ChangeSet {
    let index = RemoteIndex::new(remote);
    let declared_addresses: HashSet<&str> =
        declared.iter().map(|entry| entry.address.as_str()).collect();

    let mut changes = ChangeSet::default();

    changes.to_delete = remote
        .iter()
        .filter(|entry| entry.list_type == list_type)
        .filter(|entry| !declared_addresses.contains(entry.address.as_str()))
        .map(ListEntry::key)
        .collect();

    for entry in declared {
        classify_present(&mut changes, entry, index.get(list_type, &entry.address));
    }

    changes
}

/// Incremental patch across both list types
///
/// `remote` holds the current entries of both types. Undeclared remote
/// entries are never touched; deletion only happens for entries declared
/// `absent` that exist remotely.
pub fn diff_patch(declared: &[DeclaredEntry], remote: &[ListEntry]) -> ChangeSet {
    let index = RemoteIndex::new(remote);
    let mut changes = ChangeSet::default();

    for DeclaredEntry { entry, state } in declared {
        let current = index.get(entry.list_type, &entry.address);
        match state {
            DesiredState::Present => classify_present(&mut changes, entry, current),
            DesiredState::Absent if current.is_some() => {
                debug!("{} declared absent, will delete", entry.key());
                changes.to_delete.push(entry.key());
            }
            DesiredState::Absent => changes.unchanged.push(entry.key()),
        }
    }

    changes
}

fn classify_present(changes: &mut ChangeSet, entry: &ListEntry, current: Option<&ListEntry>) {
    match current {
        None => {
            debug!("{} does not exist, will create", entry.key());
            changes.to_create.push(entry.clone());
        }
        Some(current) => {
            let fields = entry.differing_fields(current);
            if fields.is_empty() {
                changes.unchanged.push(entry.key());
            } else {
                debug!("{} differs in {:?}, will update", entry.key(), fields);
                changes.to_update.push(entry.clone());
            }
        }
    }
}
