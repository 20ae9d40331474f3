//! List entry data model
//!
//! All values here are scoped to one reconciliation run. Entries are matched
//! by their business key, `(address, list_type)`, never by a remote ID.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Remote group identifier
pub type GroupId = u32;

/// Which Pi-hole list collection an entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    /// Allow list (exceptions to blocking)
    Allow,
    /// Block list
    Block,
}

impl ListType {
    /// Both list types, allow first
    pub const ALL: [ListType; 2] = [ListType::Allow, ListType::Block];

    /// The lowercase wire name (`allow` / `block`)
    pub fn as_str(&self) -> &'static str {
        match self {
            ListType::Allow => "allow",
            ListType::Block => "block",
        }
    }

    /// Capitalized name used in result messages
    pub fn title(&self) -> &'static str {
        match self {
            ListType::Allow => "Allow",
            ListType::Block => "Block",
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a declared entry should exist remotely
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Entry should exist with the declared attributes
    #[default]
    Present,
    /// Entry should not exist
    Absent,
}

/// Composite business key of a list entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListKey {
    /// List address (usually a URL)
    pub address: String,
    /// List type
    #[serde(rename = "type")]
    pub list_type: ListType,
}

impl ListKey {
    /// Create a new key
    pub fn new(address: impl Into<String>, list_type: ListType) -> Self {
        Self {
            address: address.into(),
            list_type,
        }
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address, self.list_type)
    }
}

/// A declared or observed list record with every field populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    /// List address, the business key within one list type
    pub address: String,

    /// List type
    #[serde(rename = "type")]
    pub list_type: ListType,

    /// Whether the list is enabled
    pub enabled: bool,

    /// Free-form comment
    pub comment: String,

    /// Groups this list is assigned to
    pub groups: BTreeSet<GroupId>,
}

impl ListEntry {
    /// Create an entry with default attributes (enabled, no comment, no groups)
    pub fn new(address: impl Into<String>, list_type: ListType) -> Self {
        Self {
            address: address.into(),
            list_type,
            enabled: true,
            comment: String::new(),
            groups: BTreeSet::new(),
        }
    }

    /// Set the enabled flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Set the group memberships
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.groups = groups.into_iter().collect();
        self
    }

    /// The business key of this entry
    pub fn key(&self) -> ListKey {
        ListKey::new(self.address.clone(), self.list_type)
    }

    /// Names of the compared attributes that differ from `other`
    ///
    /// Only `enabled`, `comment` and `groups` are compared; groups compare as
    /// sets.
    pub fn differing_fields(&self, other: &ListEntry) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.enabled != other.enabled {
            fields.push("enabled");
        }
        if self.comment != other.comment {
            fields.push("comment");
        }
        if self.groups != other.groups {
            fields.push("groups");
        }
        fields
    }
}

/// A normalized entry together with its declared presence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredEntry {
    /// Normalized attributes
    pub entry: ListEntry,
    /// Declared presence
    pub state: DesiredState,
}

/// A remote group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group ID
    pub id: GroupId,
    /// Group name
    #[serde(default)]
    pub name: String,
    /// Whether the group is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn differing_fields_ignores_group_order() {
        let a = ListEntry::new("https://x/a.txt", ListType::Block).with_groups([1, 0]);
        let b = ListEntry::new("https://x/a.txt", ListType::Block).with_groups([0, 1]);

        assert!(a.differing_fields(&b).is_empty());
    }

    #[test]
    fn differing_fields_names_each_change() {
        let a = ListEntry::new("https://x/a.txt", ListType::Allow).with_comment("old");
        let b = ListEntry::new("https://x/a.txt", ListType::Allow)
            .with_comment("new")
            .with_enabled(false);

        assert_eq!(a.differing_fields(&b), vec!["enabled", "comment"]);
    }

    #[test]
    fn list_type_serializes_lowercase() {
        let json = serde_json::to_string(&ListKey::new("a", ListType::Allow)).unwrap();
        assert_eq!(json, r#"{"address":"a","type":"allow"}"#);
    }
}
