//! Configuration and declared-input types
//!
//! This module defines the connection settings and the raw, partially
//! specified list declarations callers hand to the reconciler. Declarations
//! are normalized by [`crate::loader`] before any comparison happens.

use crate::model::{DesiredState, GroupId, ListType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Connection settings for one Pi-hole instance
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Base URL of the instance (e.g. `https://pihole.example.com`)
    pub url: String,

    /// Web interface / API password
    /// ⚠️ NEVER log this value
    pub password: String,
}

impl ConnectionConfig {
    /// Create a new connection configuration
    pub fn new(url: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            password: password.into(),
        }
    }

    /// Validate the connection configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.url.is_empty() {
            return Err(crate::Error::config("Pi-hole URL cannot be empty"));
        }
        if !self.url.starts_with("https://") && !self.url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "Pi-hole URL must use HTTP or HTTPS scheme. Got: {}",
                self.url
            )));
        }
        if self.password.is_empty() {
            return Err(crate::Error::config("Pi-hole password cannot be empty"));
        }
        Ok(())
    }
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Run-level options
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Fetch and diff, but never write
    #[serde(default)]
    pub dry_run: bool,
}

impl ReconcileOptions {
    /// Options for a dry run
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

/// Declaration for single-entry upsert mode
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertSpec {
    /// List address (required)
    pub address: String,

    /// List type
    #[serde(rename = "type", default = "default_list_type")]
    pub list_type: ListType,

    /// Whether the entry should exist
    pub state: DesiredState,

    /// Comment; when unset, an existing comment is neither compared nor changed
    #[serde(default)]
    pub comment: Option<String>,

    /// Group IDs; when unset, existing groups are neither compared nor changed
    #[serde(default)]
    pub groups: Option<Vec<GroupId>>,

    /// Whether the list is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl UpsertSpec {
    /// Declare an entry that should be present
    pub fn present(address: impl Into<String>, list_type: ListType) -> Self {
        Self {
            address: address.into(),
            list_type,
            state: DesiredState::Present,
            comment: None,
            groups: None,
            enabled: true,
        }
    }

    /// Declare an entry that should be absent
    pub fn absent(address: impl Into<String>, list_type: ListType) -> Self {
        Self {
            state: DesiredState::Absent,
            ..Self::present(address, list_type)
        }
    }

    /// Set the comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the group IDs
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.groups = Some(groups.into_iter().collect());
        self
    }

    /// Enable or disable the list
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// One entry of a full-replacement declaration (single list type)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaceSpec {
    /// List address (required)
    pub address: String,

    /// Whether the list is enabled (default: true)
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Comment (default: empty)
    #[serde(default)]
    pub comment: Option<String>,

    /// Group IDs (default: none)
    #[serde(default)]
    pub groups: Option<Vec<GroupId>>,
}

impl ReplaceSpec {
    /// Declare an entry with every optional field unset
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    /// Set the comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the group IDs
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.groups = Some(groups.into_iter().collect());
        self
    }

    /// Enable or disable the list
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }
}

/// One entry of an incremental declaration across both list types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchSpec {
    /// List address (required)
    pub address: String,

    /// List type (default: block)
    #[serde(rename = "type", default = "default_list_type")]
    pub list_type: ListType,

    /// Whether the entry should exist (default: present)
    #[serde(default)]
    pub state: DesiredState,

    /// Whether the list is enabled (default: true)
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Comment (default: empty)
    #[serde(default)]
    pub comment: Option<String>,

    /// Group IDs (default: none)
    #[serde(default)]
    pub groups: Option<Vec<GroupId>>,
}

impl PatchSpec {
    /// Declare an entry that should be present
    pub fn present(address: impl Into<String>, list_type: ListType) -> Self {
        Self {
            address: address.into(),
            list_type,
            state: DesiredState::Present,
            enabled: None,
            comment: None,
            groups: None,
        }
    }

    /// Declare an entry that should be absent
    pub fn absent(address: impl Into<String>, list_type: ListType) -> Self {
        Self {
            state: DesiredState::Absent,
            ..Self::present(address, list_type)
        }
    }

    /// Set the comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the group IDs
    pub fn with_groups(mut self, groups: impl IntoIterator<Item = GroupId>) -> Self {
        self.groups = Some(groups.into_iter().collect());
        self
    }

    /// Enable or disable the list
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }
}

/// A complete declaration for one run, tagged by reconciliation mode
///
/// ```json
/// {"mode": "replace", "type": "block", "lists": [{"address": "https://x/a.txt"}]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Manifest {
    /// Create, update or delete exactly one entry
    Upsert(UpsertSpec),

    /// Make one list type contain exactly the declared entries
    Replace {
        /// List type being replaced (default: block)
        #[serde(rename = "type", default = "default_list_type")]
        list_type: ListType,
        /// Declared entries; anything else of this type is deleted
        lists: Vec<ReplaceSpec>,
    },

    /// Apply explicit present/absent declarations across both list types
    Patch {
        /// Declared entries; undeclared remote entries are left alone
        lists: Vec<PatchSpec>,
    },
}

impl Manifest {
    /// Parse a manifest from JSON text
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        serde_json::from_str(json)
            .map_err(|e| crate::Error::invalid_input(format!("Invalid manifest: {}", e)))
    }

    /// Read and parse a manifest file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!("Cannot read manifest {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Short mode name for logging
    pub fn mode_name(&self) -> &'static str {
        match self {
            Manifest::Upsert(_) => "upsert",
            Manifest::Replace { .. } => "replace",
            Manifest::Patch { .. } => "patch",
        }
    }
}

fn default_list_type() -> ListType {
    ListType::Block
}

fn default_enabled() -> bool {
    true
}
