//! Error types for fleet-ingest
//!
//! Validation blockers surface before any store call. Store failures during a
//! commit run are caught per item and never reach this type.

use thiserror::Error;
use uuid::Uuid;

use crate::models::AssetField;

/// Session and commit boundary errors
#[derive(Debug, Error)]
pub enum IngestError {
    /// Commit refused: no item is selected
    #[error("No items selected for import")]
    NothingSelected,

    /// Commit refused: a selected attachment has no parent
    #[error("Attachment '{item}' has no parent asset")]
    UnresolvedParent { item: String },

    /// Session item id not present (merged away or never existed)
    #[error("Unknown session item: {0}")]
    UnknownItem(Uuid),

    /// Parent reference rejected by the session
    #[error("Invalid parent: {0}")]
    InvalidParent(String),

    /// Fragment group index out of range
    #[error("Unknown fragment group: {0}")]
    UnknownFragmentGroup(usize),

    /// Operation needs the item to be in a different mode
    #[error("Item {item} is in mode '{mode}', operation requires '{required}'")]
    WrongMode {
        item: Uuid,
        mode: crate::models::ImportMode,
        required: crate::models::ImportMode,
    },

    /// Attachment update requested but no duplicate attachment is known
    #[error("Item {0} has no existing attachment to update")]
    NoExistingAttachment(Uuid),

    /// Value does not fit the field's type
    #[error("Invalid value '{value}' for {field}")]
    InvalidField { field: AssetField, value: String },

    /// Record store error
    #[error("Store error: {0}")]
    Store(#[from] fleet_common::Error),
}

/// Result type for session and commit operations
pub type IngestResult<T> = Result<T, IngestError>;
