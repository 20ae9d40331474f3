//! Error types for list reconciliation
//!
//! Every failure is fatal to the run that produced it. The variants mirror the
//! stage that failed so callers can tell "nothing was touched" (connection,
//! fetch, validation) apart from "some writes already happened" (apply).

use crate::model::GroupId;
use crate::summary::ReconciliationResult;
use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for list reconciliation
#[derive(Error, Debug)]
pub enum Error {
    /// The remote endpoint could not be reached
    #[error("Failed to connect to Pi-hole: {0}")]
    Connection(String),

    /// The remote endpoint rejected the credentials or session
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A read query failed after connecting; no writes were attempted
    #[error("Failed to retrieve current lists: {0}")]
    Fetch(String),

    /// Declared group IDs that the remote instance does not know about
    #[error("The following group IDs do not exist: {invalid:?}. Available groups: {available:?}")]
    InvalidGroups {
        /// Declared IDs missing remotely, ascending
        invalid: Vec<GroupId>,
        /// Every group ID the remote instance reported
        available: Vec<GroupId>,
    },

    /// A write failed partway through the run
    ///
    /// Operations applied before the failing call stay applied. Re-running
    /// the same input converges.
    #[error(
        "Failed to apply list changes: {message} (already applied: removed {}, added {}, changed {}); re-run to converge",
        .partial.deleted_count,
        .partial.created_count,
        .partial.updated_count
    )]
    Apply {
        /// Description of the failing operation and its cause
        message: String,
        /// What had been applied before the failure
        partial: Box<ReconciliationResult>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Structurally invalid declared input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The same business key was declared more than once
    #[error("Duplicate list entry: {address} ({list_type})")]
    DuplicateEntry {
        /// Declared address
        address: String,
        /// Declared list type
        list_type: crate::model::ListType,
    },

    /// Remote record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Store-specific error
    #[error("Store error ({store}): {message}")]
    Provider {
        /// Store name
        store: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a store-specific error
    pub fn provider(store: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            store: store.into(),
            message: message.into(),
        }
    }

    /// Whether remote state may have been modified before this error surfaced
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Apply { partial, .. } if partial.changed)
    }

    /// The partial result carried by an apply failure
    pub fn partial_result(&self) -> Option<&ReconciliationResult> {
        match self {
            Self::Apply { partial, .. } => Some(partial),
            _ => None,
        }
    }
}
