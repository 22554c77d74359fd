//! Per-candidate working state inside an import session

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::candidate::CandidateRecord;
use super::fields::{AssetField, FieldValue};
use super::registry::AttachmentPayload;
use super::verdict::{AttachmentVerdict, DuplicateVerdict};

/// How a candidate will be committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    New,
    UpdateExisting,
    Skip,
    Attachment,
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::UpdateExisting => "update_existing",
            Self::Skip => "skip",
            Self::Attachment => "attachment",
        };
        f.write_str(s)
    }
}

/// Parent of an attachment: a registry row, or a session item not yet written
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ParentRef {
    Resolved(String),
    PendingItem(Uuid),
}

/// What to do with an attachment at commit time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentAction {
    /// Create, unless a duplicate is found right before writing
    #[default]
    Create,
    Skip,
    UpdateExisting,
    ImportAnyway,
}

/// Editable attachment sub-fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentFields {
    pub name: String,
    pub value: Option<f64>,
    pub serial_number: Option<String>,
    pub description: Option<String>,
}

impl AttachmentFields {
    /// Seed from the candidate: make+model as name, price as value
    pub fn seeded_from(record: &CandidateRecord) -> Self {
        let name = format!("{} {}", record.make.trim(), record.model.trim())
            .trim()
            .to_string();
        let description = if record.notes.trim().is_empty() {
            None
        } else {
            Some(record.notes.clone())
        };
        Self {
            name,
            value: record.purchase_price,
            serial_number: record.serial_number.clone(),
            description,
        }
    }

    pub fn to_payload(&self) -> AttachmentPayload {
        AttachmentPayload {
            name: self.name.clone(),
            value: self.value,
            serial_number: self.serial_number.clone(),
            description: self.description.clone(),
        }
    }
}

/// Attachment-only state, present exactly when mode is `Attachment`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentState {
    pub fields: AttachmentFields,
    pub parent: Option<ParentRef>,
    pub verdict: AttachmentVerdict,
    pub action: AttachmentAction,
    /// Bumped whenever the inputs of the duplicate check change
    pub revision: u64,
}

impl AttachmentState {
    pub fn seeded_from(record: &CandidateRecord, parent: Option<ParentRef>) -> Self {
        Self {
            fields: AttachmentFields::seeded_from(record),
            parent,
            ..Default::default()
        }
    }
}

/// Which session item (and document) a field value came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSource {
    pub item_id: Uuid,
    pub file_name: Option<String>,
}

/// Mutable working state for one surviving candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSessionItem {
    /// Ephemeral id, valid only for the lifetime of the session
    pub id: Uuid,
    /// Position of the originating candidate in the batch
    pub batch_index: usize,
    pub record: CandidateRecord,
    pub selected: bool,
    pub category: Option<String>,
    pub mode: ImportMode,
    pub attachment: Option<AttachmentState>,
    pub verdict: DuplicateVerdict,
    pub merged_from: Vec<Uuid>,
    pub field_sources: BTreeMap<AssetField, FieldSource>,
    pub original_values: BTreeMap<AssetField, Option<FieldValue>>,
}

impl ImportSessionItem {
    pub fn new(batch_index: usize, record: CandidateRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_index,
            category: record.hints.suggested_category.clone(),
            record,
            selected: true,
            mode: ImportMode::New,
            attachment: None,
            verdict: DuplicateVerdict::none(),
            merged_from: Vec::new(),
            field_sources: BTreeMap::new(),
            original_values: BTreeMap::new(),
        }
    }

    pub fn display_name(&self) -> String {
        match &self.attachment {
            Some(state) if !state.fields.name.trim().is_empty() => state.fields.name.clone(),
            _ => self.record.display_name(),
        }
    }

    pub fn parent(&self) -> Option<&ParentRef> {
        self.attachment.as_ref().and_then(|a| a.parent.as_ref())
    }

    /// Whether the item is writable as-is
    ///
    /// Unselected items are trivially resolved. Selected attachments need a parent.
    pub fn is_resolved(&self) -> bool {
        if !self.selected {
            return true;
        }
        self.mode != ImportMode::Attachment || self.parent().is_some()
    }

    /// Committed as a top-level asset (new or update)
    pub fn is_asset_write(&self) -> bool {
        matches!(self.mode, ImportMode::New | ImportMode::UpdateExisting)
    }
}
