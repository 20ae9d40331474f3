//! Result summarizer
//!
//! Converts an apply report (or a dry-run plan) into the structured result
//! returned to callers. Counts always reflect operations that actually
//! completed, never merely classified ones.

use crate::apply::{ApplyReport, OperationKind};
use crate::diff::ChangeSet;
use crate::error::{Error, Result};
use crate::model::ListType;
use serde::Serialize;
use serde_json::{Value, json};

/// Which reconciliation mode produced a result (drives the message wording)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Single-entry upsert of one list type
    Upsert(ListType),
    /// Full replacement of one list type
    Replace(ListType),
    /// Incremental patch across both list types
    Patch,
}

impl RunMode {
    fn applied_message(&self, created: usize, updated: usize, deleted: usize) -> String {
        match self {
            RunMode::Upsert(list_type) => {
                let verb = if deleted > 0 {
                    "deleted"
                } else if created > 0 {
                    "created"
                } else {
                    "updated"
                };
                format!("{} list {}", list_type.title(), verb)
            }
            RunMode::Replace(list_type) => format!(
                "{} lists updated, removed: {}, added: {}, changed: {}",
                list_type.title(),
                deleted,
                created,
                updated
            ),
            RunMode::Patch => format!(
                "Lists updated, removed: {}, added: {}, changed: {}",
                deleted, created, updated
            ),
        }
    }
}

/// Outcome of one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    /// Whether remote state was (or, in a dry run, would be) modified
    pub changed: bool,
    /// Entries created
    pub created_count: usize,
    /// Entries updated
    pub updated_count: usize,
    /// Entries deleted
    pub deleted_count: usize,
    /// Human-readable summary
    pub message: String,
    /// Raw API response of the write, single-entry mode only
    pub response: Option<Value>,
    /// Whether this result comes from a dry run
    pub dry_run: bool,
}

impl ReconciliationResult {
    /// A run that needed no writes
    pub fn unchanged(message: impl Into<String>) -> Self {
        Self {
            changed: false,
            created_count: 0,
            updated_count: 0,
            deleted_count: 0,
            message: message.into(),
            response: None,
            dry_run: false,
        }
    }

    /// Attach the raw API response (or current remote record) to the result
    pub fn with_response(mut self, response: Value) -> Self {
        self.response = Some(response);
        self
    }

    /// Render the `{changed, result: {...}}` shape printed by the CLI
    pub fn to_output(&self) -> Value {
        let mut result = json!({
            "message": self.message,
            "counts": {
                "created": self.created_count,
                "updated": self.updated_count,
                "deleted": self.deleted_count,
            },
        });
        if let Some(response) = &self.response {
            result["response"] = response.clone();
        }
        if self.dry_run {
            result["dry_run"] = Value::Bool(true);
        }
        json!({ "changed": self.changed, "result": result })
    }
}

/// Summarize an apply report
///
/// A report with a failed operation becomes [`Error::Apply`] carrying the
/// counts of everything that completed before the failure.
pub fn summarize(mode: RunMode, report: ApplyReport) -> Result<ReconciliationResult> {
    let created = report.count(OperationKind::Create);
    let updated = report.count(OperationKind::Update);
    let deleted = report.count(OperationKind::Delete);
    let changed = !report.completed.is_empty();

    let ApplyReport { completed, failed } = report;

    if let Some(failed) = failed {
        let partial = ReconciliationResult {
            changed,
            created_count: created,
            updated_count: updated,
            deleted_count: deleted,
            message: format!(
                "Partially applied, removed: {}, added: {}, changed: {}",
                deleted, created, updated
            ),
            response: None,
            dry_run: false,
        };
        return Err(Error::Apply {
            message: format!("{}: {}", failed.operation, failed.error),
            partial: Box::new(partial),
        });
    }

    let response = match mode {
        RunMode::Upsert(_) => completed.into_iter().last().map(|done| done.response),
        RunMode::Replace(_) | RunMode::Patch => None,
    };

    Ok(ReconciliationResult {
        changed,
        created_count: created,
        updated_count: updated,
        deleted_count: deleted,
        message: mode.applied_message(created, updated, deleted),
        response,
        dry_run: false,
    })
}

/// Summarize what a dry run would have done
pub fn summarize_plan(changes: &ChangeSet) -> ReconciliationResult {
    let created = changes.to_create.len();
    let updated = changes.to_update.len();
    let deleted = changes.to_delete.len();

    ReconciliationResult {
        changed: !changes.is_empty(),
        created_count: created,
        updated_count: updated,
        deleted_count: deleted,
        message: format!(
            "Dry run, would remove: {}, add: {}, change: {}",
            deleted, created, updated
        ),
        response: None,
        dry_run: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::{CompletedOperation, FailedOperation, Operation};
    use crate::model::{ListEntry, ListKey};

    fn completed(operation: Operation) -> CompletedOperation {
        CompletedOperation {
            operation,
            response: json!({"ok": true}),
        }
    }

    #[test]
    fn replace_message_counts_batch_entries() {
        let report = ApplyReport {
            completed: vec![
                completed(Operation::BatchDelete(vec![
                    ListKey::new("a", ListType::Block),
                    ListKey::new("b", ListType::Block),
                ])),
                completed(Operation::Create(ListEntry::new("c", ListType::Block))),
            ],
            failed: None,
        };

        let result = summarize(RunMode::Replace(ListType::Block), report).unwrap();
        assert!(result.changed);
        assert_eq!(result.deleted_count, 2);
        assert_eq!(
            result.message,
            "Block lists updated, removed: 2, added: 1, changed: 0"
        );
        assert!(result.response.is_none());
    }

    #[test]
    fn upsert_result_carries_response() {
        let report = ApplyReport {
            completed: vec![completed(Operation::Update(ListEntry::new(
                "a",
                ListType::Allow,
            )))],
            failed: None,
        };

        let result = summarize(RunMode::Upsert(ListType::Allow), report).unwrap();
        assert_eq!(result.message, "Allow list updated");
        assert_eq!(result.response, Some(json!({"ok": true})));
    }

    #[test]
    fn failure_becomes_apply_error_with_partial_counts() {
        let report = ApplyReport {
            completed: vec![completed(Operation::Delete(ListKey::new(
                "a",
                ListType::Block,
            )))],
            failed: Some(FailedOperation {
                operation: Operation::Create(ListEntry::new("b", ListType::Block)),
                error: Error::http("connection reset"),
            }),
        };

        let err = summarize(RunMode::Patch, report).unwrap_err();
        let partial = err.partial_result().expect("partial result");
        assert!(partial.changed);
        assert_eq!(partial.deleted_count, 1);
        assert_eq!(partial.created_count, 0);
        assert!(err.to_string().contains("create b (block)"));
    }

    #[test]
    fn output_shape_includes_counts() {
        let output = ReconciliationResult::unchanged("No changes required").to_output();
        assert_eq!(output["changed"], json!(false));
        assert_eq!(output["result"]["message"], json!("No changes required"));
        assert_eq!(output["result"]["counts"]["deleted"], json!(0));
        assert!(output["result"].get("dry_run").is_none());
    }
}
