//! Attachment duplicate matching
//!
//! Scoped to one parent asset: compares a candidate attachment against the
//! attachments already stored under that parent.

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::fuzzy_matcher::attachment_name_matches;
use crate::models::{Attachment, AttachmentFields, AttachmentVerdict, CandidateRecord};
use crate::store::RecordStore;

/// Name and serial used for matching
///
/// Editable attachment fields win; blank ones fall back to the candidate's
/// make+model and serial/VIN.
pub fn match_keys(fields: &AttachmentFields, record: &CandidateRecord) -> (String, Option<String>) {
    let name = if fields.name.trim().is_empty() {
        format!("{} {}", record.make.trim(), record.model.trim())
            .trim()
            .to_string()
    } else {
        fields.name.clone()
    };
    let serial = match fields.serial_number.as_deref() {
        Some(s) if !s.trim().is_empty() => Some(s.to_string()),
        _ => record.serial_number.clone(),
    };
    (name, serial)
}

/// First attachment in `existing` matching `name`/`serial`
pub fn find_duplicate_attachment<'a>(
    name: &str,
    serial: Option<&str>,
    existing: &'a [Attachment],
) -> Option<&'a Attachment> {
    existing
        .iter()
        .find(|a| attachment_name_matches(name, serial, a))
}

/// Snapshot of everything an attachment duplicate check needs
///
/// Taken from the session before the store read so no session borrow is held
/// across the await. `revision` lets the session discard a stale result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentProbe {
    pub item_id: Uuid,
    pub parent_id: String,
    pub name: String,
    pub serial_number: Option<String>,
    pub revision: u64,
}

/// Store-backed attachment duplicate check
pub struct AttachmentMatcher<'a> {
    store: &'a dyn RecordStore,
}

impl<'a> AttachmentMatcher<'a> {
    pub fn new(store: &'a dyn RecordStore) -> Self {
        Self { store }
    }

    /// Fetch the parent's attachments and look for a duplicate
    pub async fn check(&self, probe: &AttachmentProbe) -> fleet_common::Result<AttachmentVerdict> {
        let existing = self.store.list_attachments(&probe.parent_id).await?;

        let verdict = match find_duplicate_attachment(
            &probe.name,
            probe.serial_number.as_deref(),
            &existing,
        ) {
            Some(found) => AttachmentVerdict::Duplicate {
                existing: found.clone(),
            },
            None => AttachmentVerdict::None,
        };

        debug!(
            item_id = %probe.item_id,
            parent_id = %probe.parent_id,
            candidates = existing.len(),
            duplicate = ?verdict.existing().map(|a| &a.id),
            "Attachment duplicate check"
        );
        Ok(verdict)
    }
}
