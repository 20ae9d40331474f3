//! Desired-state loader
//!
//! Turns raw declarations into normalized values: addresses are trimmed and
//! must be non-empty, unset optional fields take their defaults
//! (`enabled = true`, `comment = ""`, `groups = []`), and a business key may
//! be declared at most once per run. Nothing here touches the network.

use crate::config::{PatchSpec, ReplaceSpec, UpsertSpec};
use crate::error::{Error, Result};
use crate::model::{DeclaredEntry, DesiredState, GroupId, ListEntry, ListKey, ListType};
use std::collections::{BTreeSet, HashSet};

/// A normalized single-entry declaration
///
/// `comment` and `groups` stay optional: an unset field is not compared
/// against the remote entry and keeps its remote value on update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertRequest {
    /// Business key
    pub key: ListKey,
    /// Declared presence
    pub state: DesiredState,
    /// Enabled flag (always compared)
    pub enabled: bool,
    /// Declared comment, if any
    pub comment: Option<String>,
    /// Declared groups, if any
    pub groups: Option<BTreeSet<GroupId>>,
}

impl UpsertRequest {
    /// Group IDs that must exist remotely before anything is written
    pub fn groups_to_validate(&self) -> Option<&BTreeSet<GroupId>> {
        self.groups.as_ref().filter(|groups| !groups.is_empty())
    }

    /// The entry to create when nothing exists remotely
    pub fn to_entry(&self) -> ListEntry {
        ListEntry {
            address: self.key.address.clone(),
            list_type: self.key.list_type,
            enabled: self.enabled,
            comment: self.comment.clone().unwrap_or_default(),
            groups: self.groups.clone().unwrap_or_default(),
        }
    }

    /// The entry to write over `remote`, keeping remote values for unset fields
    pub fn merged_with(&self, remote: &ListEntry) -> ListEntry {
        ListEntry {
            address: self.key.address.clone(),
            list_type: self.key.list_type,
            enabled: self.enabled,
            comment: self
                .comment
                .clone()
                .unwrap_or_else(|| remote.comment.clone()),
            groups: self.groups.clone().unwrap_or_else(|| remote.groups.clone()),
        }
    }
}

/// Normalize a single-entry declaration
pub fn load_upsert(spec: &UpsertSpec) -> Result<UpsertRequest> {
    let address = normalize_address(&spec.address)?;
    Ok(UpsertRequest {
        key: ListKey::new(address, spec.list_type),
        state: spec.state,
        enabled: spec.enabled,
        comment: spec.comment.clone(),
        groups: spec.groups.as_ref().map(|g| g.iter().copied().collect()),
    })
}

/// Normalize a full-replacement declaration for one list type
pub fn load_replace(list_type: ListType, specs: &[ReplaceSpec]) -> Result<Vec<ListEntry>> {
    let mut seen = HashSet::with_capacity(specs.len());
    specs
        .iter()
        .map(|spec| {
            let entry = normalize(
                &spec.address,
                list_type,
                spec.enabled,
                spec.comment.as_deref(),
                spec.groups.as_deref(),
            )?;
            reject_duplicate(&mut seen, &entry)?;
            Ok(entry)
        })
        .collect()
}

/// Normalize an incremental declaration spanning both list types
pub fn load_patch(specs: &[PatchSpec]) -> Result<Vec<DeclaredEntry>> {
    let mut seen = HashSet::with_capacity(specs.len());
    specs
        .iter()
        .map(|spec| {
            let entry = normalize(
                &spec.address,
                spec.list_type,
                spec.enabled,
                spec.comment.as_deref(),
                spec.groups.as_deref(),
            )?;
            reject_duplicate(&mut seen, &entry)?;
            Ok(DeclaredEntry {
                entry,
                state: spec.state,
            })
        })
        .collect()
}

fn normalize(
    address: &str,
    list_type: ListType,
    enabled: Option<bool>,
    comment: Option<&str>,
    groups: Option<&[GroupId]>,
) -> Result<ListEntry> {
    Ok(ListEntry {
        address: normalize_address(address)?,
        list_type,
        enabled: enabled.unwrap_or(true),
        comment: comment.unwrap_or_default().to_string(),
        groups: groups.unwrap_or_default().iter().copied().collect(),
    })
}

fn normalize_address(address: &str) -> Result<String> {
    let address = address.trim();
    if address.is_empty() {
        return Err(Error::invalid_input("List address cannot be empty"));
    }
    Ok(address.to_string())
}

fn reject_duplicate(seen: &mut HashSet<ListKey>, entry: &ListEntry) -> Result<()> {
    if !seen.insert(entry.key()) {
        return Err(Error::DuplicateEntry {
            address: entry.address.clone(),
            list_type: entry.list_type,
        });
    }
    Ok(())
}
