//! Pure session reducers
//!
//! Each reducer takes item values and returns the next state. `ImportSession`
//! is the only caller that mutates; the reducers can be tested on their own.
//!
//! **Legal states:**
//! - `skip` ⇒ not selected; every other mode ⇒ selected when entered
//! - `attachment` ⇔ attachment state present
//! - parent references name a registry row or a surviving non-attachment item

use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use crate::error::{IngestError, IngestResult};
use crate::models::{
    AttachmentAction, AttachmentState, AttachmentVerdict, DuplicateStatus, DuplicateVerdict,
    ImportMode, ImportSessionItem, ParentRef, RegistryRecord,
};
use crate::services::{merge_items, DuplicateDetector};

/// Mode an item starts in, given its hints and registry verdict
pub fn initial_mode(item: &ImportSessionItem) -> ImportMode {
    if item.record.is_attachment_hint() {
        return ImportMode::Attachment;
    }
    mode_for_verdict(&item.verdict)
}

fn mode_for_verdict(verdict: &DuplicateVerdict) -> ImportMode {
    match verdict.status {
        DuplicateStatus::Exact if verdict.has_backfill() => ImportMode::UpdateExisting,
        DuplicateStatus::Exact => ImportMode::Skip,
        DuplicateStatus::Potential if verdict.has_backfill() => ImportMode::UpdateExisting,
        _ => ImportMode::New,
    }
}

/// Move `item` into `mode`
///
/// Entering `attachment` seeds the attachment fields from the candidate with
/// `parent` and a fresh verdict at `revision`. Re-entering the current
/// attachment mode keeps the existing attachment state. Leaving it drops the
/// state.
pub fn apply_mode_change(
    mut item: ImportSessionItem,
    mode: ImportMode,
    parent: Option<ParentRef>,
    revision: u64,
) -> ImportSessionItem {
    match mode {
        ImportMode::Attachment => {
            if item.mode != ImportMode::Attachment || item.attachment.is_none() {
                let mut state = AttachmentState::seeded_from(&item.record, parent);
                state.revision = revision;
                item.attachment = Some(state);
            }
        }
        _ => item.attachment = None,
    }

    item.selected = mode != ImportMode::Skip;
    item.mode = mode;
    item
}

/// Re-run duplicate detection for `item`
///
/// Vetoed backfills survive when the same registry record still matches with
/// the same value. Non-attachment items auto-transition: no match moves an
/// update/skip item to `new`; an exact match with nothing to backfill moves
/// it to `skip` and deselects it.
pub fn recompute_verdict(
    mut item: ImportSessionItem,
    registry: &[RegistryRecord],
    detector: &DuplicateDetector,
) -> ImportSessionItem {
    let mut verdict = detector.detect(&item.record, registry);

    if verdict.matched_record_id.is_some()
        && verdict.matched_record_id == item.verdict.matched_record_id
    {
        for diff in verdict.backfillable_fields.iter_mut() {
            let vetoed = item.verdict.backfillable_fields.iter().any(|old| {
                old.field == diff.field
                    && !old.will_apply
                    && old.candidate_value == diff.candidate_value
            });
            if vetoed {
                diff.will_apply = false;
            }
        }
    }

    let previous = item.mode;
    if item.mode != ImportMode::Attachment {
        if !verdict.is_match() && matches!(item.mode, ImportMode::UpdateExisting | ImportMode::Skip)
        {
            item.mode = ImportMode::New;
            item.selected = true;
        } else if verdict.status == DuplicateStatus::Exact && !verdict.has_backfill() {
            item.mode = ImportMode::Skip;
            item.selected = false;
        }
    }

    if previous != item.mode {
        debug!(
            item_id = %item.id,
            from = %previous,
            to = %item.mode,
            status = ?verdict.status,
            "Mode changed by verdict"
        );
    }

    item.verdict = verdict;
    item
}

/// Fold `secondaries` into `primary`, left to right
///
/// Secondary items leave the list. Every parent reference to a secondary is
/// rewritten to the primary. When the primary is itself an attachment, or
/// referenced one of its own secondaries, the reference is dropped instead.
/// Rewritten attachments get a fresh verdict at `revision`.
pub fn apply_merge(
    items: Vec<ImportSessionItem>,
    primary: Uuid,
    secondaries: &[Uuid],
    revision: u64,
) -> IngestResult<Vec<ImportSessionItem>> {
    let absorbed: HashSet<Uuid> = secondaries.iter().copied().filter(|id| *id != primary).collect();

    let mut merged = items
        .iter()
        .find(|i| i.id == primary)
        .cloned()
        .ok_or(IngestError::UnknownItem(primary))?;
    for id in secondaries.iter().filter(|id| absorbed.contains(id)) {
        let secondary = items
            .iter()
            .find(|i| i.id == *id)
            .ok_or(IngestError::UnknownItem(*id))?;
        merged = merge_items(&merged, secondary);
    }

    let mut next: Vec<ImportSessionItem> = items
        .into_iter()
        .filter(|i| !absorbed.contains(&i.id))
        .map(|i| if i.id == primary { merged.clone() } else { i })
        .collect();

    let primary_is_attachment = merged.mode == ImportMode::Attachment;
    for item in next.iter_mut() {
        let Some(state) = item.attachment.as_mut() else {
            continue;
        };
        let Some(ParentRef::PendingItem(parent)) = state.parent else {
            continue;
        };
        if !absorbed.contains(&parent) {
            continue;
        }
        state.parent = if item.id == primary || primary_is_attachment {
            None
        } else {
            Some(ParentRef::PendingItem(primary))
        };
        state.verdict = AttachmentVerdict::None;
        state.action = AttachmentAction::Create;
        state.revision = revision;
    }

    debug!(primary = %primary, absorbed = absorbed.len(), "Fragments merged");
    Ok(next)
}
