//! Duplicate verdicts and backfill diffs

use serde::{Deserialize, Serialize};
use std::fmt;

use super::fields::{AssetField, FieldValue};
use super::registry::Attachment;

/// Classification of a candidate against the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStatus {
    #[default]
    None,
    Exact,
    Potential,
}

/// Which rule produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchReason {
    Serial,
    Year,
    Price,
    Date,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Serial => "serial",
            Self::Year => "year",
            Self::Price => "price",
            Self::Date => "date",
        };
        f.write_str(s)
    }
}

/// One backfillable field on a matched registry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiff {
    pub field: AssetField,
    pub label: String,
    pub existing_value: Option<FieldValue>,
    pub candidate_value: FieldValue,
    pub will_apply: bool,
}

/// Result of the registry duplicate detector for one candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateVerdict {
    pub status: DuplicateStatus,
    pub reason: Option<MatchReason>,
    pub matched_record_id: Option<String>,
    pub matched_display_name: Option<String>,
    pub matched_date: Option<String>,
    pub backfillable_fields: Vec<FieldDiff>,
}

impl DuplicateVerdict {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_match(&self) -> bool {
        self.status != DuplicateStatus::None
    }

    pub fn has_backfill(&self) -> bool {
        !self.backfillable_fields.is_empty()
    }

    /// Backfills the caller has not vetoed
    pub fn applied_fields(&self) -> impl Iterator<Item = &FieldDiff> {
        self.backfillable_fields.iter().filter(|d| d.will_apply)
    }
}

/// Result of the attachment duplicate matcher
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum AttachmentVerdict {
    #[default]
    None,
    Duplicate { existing: Attachment },
}

impl AttachmentVerdict {
    pub fn existing(&self) -> Option<&Attachment> {
        match self {
            Self::None => None,
            Self::Duplicate { existing } => Some(existing),
        }
    }
}
