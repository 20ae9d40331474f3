//! List reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Normalizing the declared entries
//! - Fetching a complete snapshot of the remote lists
//! - Validating declared group IDs (single-entry mode)
//! - Classifying entries and applying the resulting writes
//! - Summarizing what happened
//!
//! ## Architecture
//!
//! ```text
//!   declared specs                      ┌──────────────┐
//!        │                              │  ListStore   │
//!        ▼                              │  GroupStore  │
//!  ┌───────────┐   ┌─────────┐          └──────────────┘
//!  │  loader   │──▶│  diff   │◀── fetch ──────┤
//!  └───────────┘   └─────────┘                │
//!                       │ ChangeSet           │
//!                       ▼                     │
//!                  ┌─────────┐    writes      │
//!                  │  apply  │────────────────┘
//!                  └─────────┘
//!                       │ ApplyReport
//!                       ▼
//!                  ┌─────────┐
//!                  │ summary │──▶ ReconciliationResult
//!                  └─────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Normalize declarations (no network)
//! 2. Fetch remote state; any failure aborts before writing
//! 3. Classify into create / update / delete / unchanged
//! 4. Nothing to do → report unchanged, zero writes
//! 5. Dry run → report the plan, zero writes
//! 6. Apply deletions, creations, updates in that order
//!
//! Every remote call is awaited before the next one is issued. Runs are
//! stateless; concurrent runs against the same instance must be serialized
//! by the caller.

use crate::apply::{Applier, plan};
use crate::config::{Manifest, PatchSpec, ReconcileOptions, ReplaceSpec, UpsertSpec};
use crate::diff::{ChangeSet, diff_patch, diff_replace, diff_upsert};
use crate::error::{Error, Result};
use crate::loader::{load_patch, load_replace, load_upsert};
use crate::model::{DesiredState, Group, GroupId, ListEntry, ListType};
use crate::summary::{ReconciliationResult, RunMode, summarize, summarize_plan};
use crate::traits::{GroupStore, ListStore};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// One-shot reconciliation engine
///
/// Holds no state between runs; each call fetches fresh remote state.
pub struct Reconciler {
    /// Remote list collections
    lists: Box<dyn ListStore>,

    /// Remote group collection
    groups: Box<dyn GroupStore>,

    /// Run options
    options: ReconcileOptions,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `lists`: List store implementation
    /// - `groups`: Group store implementation
    /// - `options`: Run options (dry run)
    pub fn new(
        lists: Box<dyn ListStore>,
        groups: Box<dyn GroupStore>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            lists,
            groups,
            options,
        }
    }

    /// Run the reconciliation described by a manifest
    pub async fn run(&self, manifest: &Manifest) -> Result<ReconciliationResult> {
        info!(
            "Reconciling lists via {} [mode: {}, {}]",
            self.lists.store_name(),
            manifest.mode_name(),
            if self.options.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        let result = match manifest {
            Manifest::Upsert(spec) => self.upsert(spec).await,
            Manifest::Replace { list_type, lists } => self.replace(*list_type, lists).await,
            Manifest::Patch { lists } => self.patch(lists).await,
        }?;

        info!("{} (changed: {})", result.message, result.changed);
        Ok(result)
    }

    /// Create, update or delete a single entry
    ///
    /// Declared groups are validated against the remote group collection
    /// before anything else happens.
    pub async fn upsert(&self, spec: &UpsertSpec) -> Result<ReconciliationResult> {
        let request = load_upsert(spec)?;
        let list_type = request.key.list_type;

        if let Some(groups) = request.groups_to_validate() {
            self.validate_groups(groups).await?;
        }

        let current = self
            .lists
            .get(&request.key)
            .await
            .map_err(|e| Error::fetch(format!("{}: {}", request.key, e)))?;

        let changes = diff_upsert(&request, current.as_ref());
        if changes.is_empty() {
            return Ok(match (request.state, current) {
                (DesiredState::Present, Some(current)) => self
                    .unchanged(format!(
                        "{} list already exists with the desired configuration",
                        list_type.title()
                    ))
                    .with_response(serde_json::to_value(current)?),
                _ => self.unchanged(format!("{} list does not exist", list_type.title())),
            });
        }

        self.execute(RunMode::Upsert(list_type), &changes).await
    }

    /// Make one list type contain exactly the declared entries
    ///
    /// Remote entries of `list_type` that are not declared are deleted.
    pub async fn replace(
        &self,
        list_type: ListType,
        specs: &[ReplaceSpec],
    ) -> Result<ReconciliationResult> {
        let declared = load_replace(list_type, specs)?;
        let remote = self.fetch(list_type).await?;

        let changes = diff_replace(list_type, &declared, &remote);
        if changes.is_empty() {
            return Ok(self.unchanged("No changes required"));
        }

        self.execute(RunMode::Replace(list_type), &changes).await
    }

    /// Apply explicit present/absent declarations across both list types
    ///
    /// Remote entries that are not declared are left untouched.
    pub async fn patch(&self, specs: &[PatchSpec]) -> Result<ReconciliationResult> {
        let declared = load_patch(specs)?;

        let mut remote = Vec::new();
        for list_type in ListType::ALL {
            remote.extend(self.fetch(list_type).await?);
        }

        if declared.is_empty() {
            return Ok(self.unchanged("No lists to update"));
        }

        let changes = diff_patch(&declared, &remote);
        if changes.is_empty() {
            return Ok(self.unchanged("No lists to update"));
        }

        self.execute(RunMode::Patch, &changes).await
    }

    /// Fetch the complete remote collection of one list type
    async fn fetch(&self, list_type: ListType) -> Result<Vec<ListEntry>> {
        let entries = self
            .lists
            .list(list_type)
            .await
            .map_err(|e| Error::fetch(format!("{} lists: {}", list_type, e)))?;

        debug!("Fetched {} {} list(s)", entries.len(), list_type);
        Ok(entries)
    }

    /// Fail unless every declared group exists remotely
    async fn validate_groups(&self, declared: &BTreeSet<GroupId>) -> Result<()> {
        let groups = self
            .groups
            .list_groups()
            .await
            .map_err(|e| Error::fetch(format!("groups: {}", e)))?;

        check_groups(declared, &groups)
    }

    /// Apply a non-empty change set, or describe it in a dry run
    async fn execute(&self, mode: RunMode, changes: &ChangeSet) -> Result<ReconciliationResult> {
        if self.options.dry_run {
            warn!(
                "[DRY-RUN] Skipping {} write(s): {} create, {} update, {} delete",
                changes.write_count(),
                changes.to_create.len(),
                changes.to_update.len(),
                changes.to_delete.len()
            );
            return Ok(summarize_plan(changes));
        }

        let operations = plan(changes, self.lists.supports_batch_delete());
        let report = Applier::new(self.lists.as_ref()).apply(operations).await;
        summarize(mode, report)
    }

    fn unchanged(&self, message: impl Into<String>) -> ReconciliationResult {
        let mut result = ReconciliationResult::unchanged(message);
        result.dry_run = self.options.dry_run;
        result
    }
}

/// Check declared group IDs against the remote group collection
///
/// # Returns
///
/// - `Ok(())`: every declared ID exists
/// - `Err(Error::InvalidGroups)`: names the unknown IDs and every known ID
pub fn check_groups(declared: &BTreeSet<GroupId>, groups: &[Group]) -> Result<()> {
    let available: BTreeSet<GroupId> = groups.iter().map(|group| group.id).collect();
    let invalid: Vec<GroupId> = declared.difference(&available).copied().collect();

    if invalid.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidGroups {
            invalid,
            available: available.into_iter().collect(),
        })
    }
}
