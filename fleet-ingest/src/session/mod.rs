//! Import session state
//!
//! Owns the per-candidate working state between batch load and commit. All
//! caller overrides go through the methods here; the state transitions
//! themselves live in [`reducers`].
//!
//! **Lifecycle:**
//! 1. `start` / `load`: detect registry duplicates, compute initial modes,
//!    find fragment groups
//! 2. Caller overrides (`set_mode`, `set_parent`, `edit_field`, ...)
//! 3. `validate_for_commit`, then hand the session to `CommitExecutor`

pub mod reducers;

use std::collections::HashMap;

use tracing::{debug, info};
use uuid::Uuid;

use crate::config::MatchPolicy;
use crate::error::{IngestError, IngestResult};
use crate::models::{
    AssetField, AttachmentAction, AttachmentFields, AttachmentState, AttachmentVerdict,
    DocumentSummary, ExtractionBatch, FieldConflict, FieldSource, FieldValue, ImportMode,
    ImportSessionItem, ParentRef, RegistryRecord,
};
use crate::services::attachment_matcher::match_keys;
use crate::services::{
    AttachmentMatcher, AttachmentProbe, DuplicateDetector, FragmentGroup, FragmentGrouper,
};
use crate::store::RecordStore;

/// Working state of one import
pub struct ImportSession {
    items: Vec<ImportSessionItem>,
    registry: Vec<RegistryRecord>,
    fragment_groups: Vec<FragmentGroup>,
    conflicts: Vec<FieldConflict>,
    /// Batch index of every item ever created, merged ones included
    origins: HashMap<Uuid, usize>,
    detector: DuplicateDetector,
    next_revision: u64,
}

impl ImportSession {
    /// Start a session over `batch` against a registry snapshot
    pub fn start(
        batch: ExtractionBatch,
        registry: Vec<RegistryRecord>,
        policy: MatchPolicy,
    ) -> Self {
        let detector = DuplicateDetector::with_policy(policy);
        let fragment_groups = FragmentGrouper::with_policy(policy).group(&batch.candidates);

        let mut items: Vec<ImportSessionItem> = batch
            .candidates
            .into_iter()
            .enumerate()
            .map(|(idx, record)| ImportSessionItem::new(idx, record))
            .collect();
        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let hinted_attachment: Vec<bool> =
            items.iter().map(|i| i.record.is_attachment_hint()).collect();

        let mut session = Self {
            items: Vec::new(),
            registry,
            fragment_groups,
            conflicts: batch.conflicts,
            origins: ids.iter().copied().zip(0..).collect(),
            detector,
            next_revision: 0,
        };

        for item in items.iter_mut() {
            item.verdict = session.detector.detect(&item.record, &session.registry);
            if item.category.is_none() {
                item.category = session.matched_category(item);
            }
            seed_field_sources(item, &batch.document_summaries);

            let mode = reducers::initial_mode(item);
            let parent = if mode == ImportMode::Attachment {
                item.record
                    .hints
                    .suggested_parent_index
                    .filter(|&idx| idx != item.batch_index)
                    .filter(|&idx| hinted_attachment.get(idx) == Some(&false))
                    .map(|idx| ParentRef::PendingItem(ids[idx]))
            } else {
                None
            };
            let revision = session.bump_revision();
            *item = reducers::apply_mode_change(item.clone(), mode, parent, revision);
        }
        session.items = items;

        info!(
            items = session.items.len(),
            registry = session.registry.len(),
            fragment_groups = session.fragment_groups.len(),
            "Import session started"
        );
        session
    }

    /// Fetch the registry from `store` and start a session
    pub async fn load(
        store: &dyn RecordStore,
        batch: ExtractionBatch,
        policy: MatchPolicy,
    ) -> IngestResult<Self> {
        let registry = store.list_assets().await?;
        Ok(Self::start(batch, registry, policy))
    }

    pub fn items(&self) -> &[ImportSessionItem] {
        &self.items
    }

    pub fn item(&self, id: Uuid) -> Option<&ImportSessionItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn registry(&self) -> &[RegistryRecord] {
        &self.registry
    }

    pub fn fragment_groups(&self) -> &[FragmentGroup] {
        &self.fragment_groups
    }

    pub fn selected_items(&self) -> impl Iterator<Item = &ImportSessionItem> {
        self.items.iter().filter(|i| i.selected)
    }

    /// Session item created from batch candidate `batch_index`, if it survives
    pub fn item_for_batch_index(&self, batch_index: usize) -> Option<&ImportSessionItem> {
        self.items.iter().find(|i| i.batch_index == batch_index)
    }

    fn bump_revision(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }

    fn position(&self, id: Uuid) -> IngestResult<usize> {
        self.items
            .iter()
            .position(|i| i.id == id)
            .ok_or(IngestError::UnknownItem(id))
    }

    fn matched_category(&self, item: &ImportSessionItem) -> Option<String> {
        let matched = item.verdict.matched_record_id.as_deref()?;
        self.registry
            .iter()
            .find(|r| r.id == matched)
            .and_then(|r| r.category.clone())
    }

    fn attachment_state_mut(&mut self, id: Uuid) -> IngestResult<&mut AttachmentState> {
        let pos = self.position(id)?;
        let item = &mut self.items[pos];
        let mode = item.mode;
        item.attachment.as_mut().ok_or(IngestError::WrongMode {
            item: id,
            mode,
            required: ImportMode::Attachment,
        })
    }

    /// Parent a new attachment of `id` would get from the extractor hint
    fn hinted_parent(&self, id: Uuid) -> Option<ParentRef> {
        let item = self.item(id)?;
        let idx = item.record.hints.suggested_parent_index?;
        let parent = self.item_for_batch_index(idx)?;
        (parent.id != id && parent.mode != ImportMode::Attachment)
            .then_some(ParentRef::PendingItem(parent.id))
    }

    /// Change the import mode of one item
    ///
    /// An item leaving for `attachment` can no longer be a parent: items
    /// pointing at it lose their parent reference.
    pub fn set_mode(&mut self, id: Uuid, mode: ImportMode) -> IngestResult<()> {
        let pos = self.position(id)?;
        let parent = if mode == ImportMode::Attachment {
            self.hinted_parent(id)
        } else {
            None
        };
        let revision = self.bump_revision();
        let item = self.items[pos].clone();
        let previous = item.mode;
        self.items[pos] = reducers::apply_mode_change(item, mode, parent, revision);

        if mode == ImportMode::Attachment && previous != ImportMode::Attachment {
            self.detach_children_of(id);
        }

        debug!(item_id = %id, from = %previous, to = %mode, "Mode set");
        Ok(())
    }

    fn detach_children_of(&mut self, parent_id: Uuid) {
        let target = ParentRef::PendingItem(parent_id);
        let orphaned: Vec<Uuid> = self
            .items
            .iter()
            .filter(|i| i.parent() == Some(&target))
            .map(|i| i.id)
            .collect();
        for child in orphaned {
            let revision = self.bump_revision();
            if let Ok(state) = self.attachment_state_mut(child) {
                state.parent = None;
                state.verdict = AttachmentVerdict::None;
                state.action = AttachmentAction::Create;
                state.revision = revision;
            }
        }
    }

    /// Link an attachment item to its parent
    ///
    /// Resets the attachment verdict; the caller re-runs the duplicate check.
    pub fn set_parent(&mut self, id: Uuid, parent: Option<ParentRef>) -> IngestResult<()> {
        match &parent {
            Some(ParentRef::PendingItem(target)) => {
                if *target == id {
                    return Err(IngestError::InvalidParent(
                        "an item cannot be its own parent".to_string(),
                    ));
                }
                let target_item = self
                    .item(*target)
                    .ok_or_else(|| IngestError::InvalidParent(format!("unknown item {target}")))?;
                if target_item.mode == ImportMode::Attachment {
                    return Err(IngestError::InvalidParent(format!(
                        "'{}' is itself an attachment",
                        target_item.display_name()
                    )));
                }
            }
            Some(ParentRef::Resolved(asset_id)) => {
                if !self.registry.iter().any(|r| &r.id == asset_id) {
                    return Err(IngestError::InvalidParent(format!(
                        "asset {asset_id} is not in the registry"
                    )));
                }
            }
            None => {}
        }

        let revision = self.bump_revision();
        let state = self.attachment_state_mut(id)?;
        state.parent = parent;
        state.verdict = AttachmentVerdict::None;
        state.action = AttachmentAction::Create;
        state.revision = revision;
        Ok(())
    }

    /// Overwrite one candidate field
    ///
    /// The first edit of a field remembers the extracted value for
    /// `revert_field`. Match-relevant edits re-run duplicate detection.
    pub fn edit_field(
        &mut self,
        id: Uuid,
        field: AssetField,
        value: Option<FieldValue>,
    ) -> IngestResult<()> {
        let pos = self.position(id)?;
        let item = &mut self.items[pos];
        let original = item.record.get(field);
        item.record.set(field, value)?;
        item.original_values.entry(field).or_insert(original);
        item.field_sources.remove(&field);
        if field == AssetField::Category {
            item.category = item.record.hints.suggested_category.clone();
        }

        if field.is_match_relevant() {
            self.refresh_verdict(pos);
        }
        self.invalidate_attachment_keys(pos, field);
        Ok(())
    }

    /// Restore a field to its extracted value
    pub fn revert_field(&mut self, id: Uuid, field: AssetField) -> IngestResult<()> {
        let pos = self.position(id)?;
        let item = &mut self.items[pos];
        let Some(original) = item.original_values.remove(&field) else {
            return Ok(());
        };
        item.record.set(field, original)?;
        if field == AssetField::Category {
            item.category = item.record.hints.suggested_category.clone();
        }

        if field.is_match_relevant() {
            self.refresh_verdict(pos);
        }
        self.invalidate_attachment_keys(pos, field);
        Ok(())
    }

    /// Blank attachment fields match on make, model and serial, so a change
    /// there outdates any in-flight duplicate check
    fn invalidate_attachment_keys(&mut self, pos: usize, field: AssetField) {
        if !matches!(
            field,
            AssetField::Make | AssetField::Model | AssetField::SerialNumber
        ) || self.items[pos].attachment.is_none()
        {
            return;
        }
        let revision = self.bump_revision();
        if let Some(state) = self.items[pos].attachment.as_mut() {
            state.verdict = AttachmentVerdict::None;
            state.action = AttachmentAction::Create;
            state.revision = revision;
        }
    }

    fn refresh_verdict(&mut self, pos: usize) {
        let item = self.items[pos].clone();
        self.items[pos] = reducers::recompute_verdict(item, &self.registry, &self.detector);
        if self.items[pos].category.is_none() {
            let category = self.matched_category(&self.items[pos]);
            self.items[pos].category = category;
        }
    }

    /// Caller override of the resolved category
    pub fn set_category(&mut self, id: Uuid, category: Option<String>) -> IngestResult<()> {
        let pos = self.position(id)?;
        self.items[pos].category = category;
        Ok(())
    }

    /// Replace the editable attachment fields
    pub fn set_attachment_fields(
        &mut self,
        id: Uuid,
        fields: AttachmentFields,
    ) -> IngestResult<()> {
        let revision = self.bump_revision();
        let state = self.attachment_state_mut(id)?;
        state.fields = fields;
        state.verdict = AttachmentVerdict::None;
        state.action = AttachmentAction::Create;
        state.revision = revision;
        Ok(())
    }

    /// Choose how an attachment is committed
    pub fn set_attachment_action(
        &mut self,
        id: Uuid,
        action: AttachmentAction,
    ) -> IngestResult<()> {
        let state = self.attachment_state_mut(id)?;
        if action == AttachmentAction::UpdateExisting && state.verdict.existing().is_none() {
            return Err(IngestError::NoExistingAttachment(id));
        }
        state.action = action;
        Ok(())
    }

    /// Veto or re-enable one backfill
    ///
    /// Returns false when `field` is not among the item's backfillable fields.
    pub fn set_field_apply(
        &mut self,
        id: Uuid,
        field: AssetField,
        apply: bool,
    ) -> IngestResult<bool> {
        let pos = self.position(id)?;
        let diff = self.items[pos]
            .verdict
            .backfillable_fields
            .iter_mut()
            .find(|d| d.field == field);
        Ok(match diff {
            Some(d) => {
                d.will_apply = apply;
                true
            }
            None => false,
        })
    }

    /// Flip selection; returns the new flag
    ///
    /// Selecting a `skip` item moves it to `new`.
    pub fn toggle_select(&mut self, id: Uuid) -> IngestResult<bool> {
        let pos = self.position(id)?;
        let item = &self.items[pos];
        if item.selected {
            self.items[pos].selected = false;
        } else if item.mode == ImportMode::Skip {
            let revision = self.bump_revision();
            let item = self.items[pos].clone();
            self.items[pos] = reducers::apply_mode_change(item, ImportMode::New, None, revision);
        } else {
            self.items[pos].selected = true;
        }
        Ok(self.items[pos].selected)
    }

    /// Merge fragment group `index` into its primary item
    ///
    /// The group is consumed. The merged item's verdict and mode are
    /// recomputed as if it had arrived in that shape.
    pub fn merge_fragment_group(&mut self, index: usize) -> IngestResult<Uuid> {
        let group = self
            .fragment_groups
            .get(index)
            .cloned()
            .ok_or(IngestError::UnknownFragmentGroup(index))?;

        let primary = self
            .item_for_batch_index(group.primary_index)
            .map(|i| i.id)
            .ok_or(IngestError::UnknownFragmentGroup(index))?;
        let secondaries: Vec<Uuid> = group
            .duplicate_indices
            .iter()
            .filter_map(|&idx| self.item_for_batch_index(idx).map(|i| i.id))
            .collect();

        let revision = self.bump_revision();
        let items = std::mem::take(&mut self.items);
        self.items = match reducers::apply_merge(items.clone(), primary, &secondaries, revision) {
            Ok(merged) => merged,
            Err(e) => {
                self.items = items;
                return Err(e);
            }
        };
        self.fragment_groups.remove(index);

        let pos = self.position(primary)?;
        self.refresh_verdict(pos);
        let item = &self.items[pos];
        if item.mode != ImportMode::Attachment {
            let mode = reducers::initial_mode(item);
            if mode != item.mode && mode != ImportMode::Attachment {
                let revision = self.bump_revision();
                let item = self.items[pos].clone();
                self.items[pos] = reducers::apply_mode_change(item, mode, None, revision);
            }
        }

        info!(
            primary = %primary,
            merged = secondaries.len(),
            reason = %group.reason,
            "Fragment group merged"
        );
        Ok(primary)
    }

    /// Drop a suggested fragment group without merging
    pub fn dismiss_fragment_group(&mut self, index: usize) -> IngestResult<FragmentGroup> {
        if index >= self.fragment_groups.len() {
            return Err(IngestError::UnknownFragmentGroup(index));
        }
        Ok(self.fragment_groups.remove(index))
    }

    /// Extraction conflicts on the item or on anything merged into it
    pub fn conflicts_for(&self, id: Uuid) -> Vec<&FieldConflict> {
        let Some(item) = self.item(id) else {
            return Vec::new();
        };
        let indices: Vec<usize> = std::iter::once(item.batch_index)
            .chain(item.merged_from.iter().filter_map(|m| self.origins.get(m).copied()))
            .collect();
        self.conflicts
            .iter()
            .filter(|c| indices.contains(&c.candidate_index))
            .filter(|c| !item.original_values.contains_key(&c.field))
            .collect()
    }

    /// Registry id a parent reference points at before anything is written
    ///
    /// A pending parent that will be created fresh has no attachments yet.
    fn registry_parent_id(&self, parent: &ParentRef) -> Option<String> {
        match parent {
            ParentRef::Resolved(id) => Some(id.clone()),
            ParentRef::PendingItem(pending) => {
                let parent = self.item(*pending)?;
                if parent.mode == ImportMode::New && parent.selected {
                    return None;
                }
                parent.verdict.matched_record_id.clone()
            }
        }
    }

    /// Snapshot for an attachment duplicate check, if one is possible
    pub fn attachment_probe(&self, id: Uuid) -> Option<AttachmentProbe> {
        let item = self.item(id)?;
        let state = item.attachment.as_ref()?;
        let parent_id = self.registry_parent_id(state.parent.as_ref()?)?;
        let (name, serial_number) = match_keys(&state.fields, &item.record);
        Some(AttachmentProbe {
            item_id: id,
            parent_id,
            name,
            serial_number,
            revision: state.revision,
        })
    }

    /// Store the result of an attachment duplicate check
    ///
    /// Results for a revision older than the item's current one are dropped,
    /// so the newest check always wins. Returns whether it was applied.
    pub fn apply_attachment_verdict(
        &mut self,
        probe: &AttachmentProbe,
        verdict: AttachmentVerdict,
    ) -> bool {
        let Some(state) = self
            .items
            .iter_mut()
            .find(|i| i.id == probe.item_id)
            .and_then(|i| i.attachment.as_mut())
        else {
            return false;
        };
        if state.revision != probe.revision {
            debug!(
                item_id = %probe.item_id,
                probe = probe.revision,
                current = state.revision,
                "Stale attachment verdict dropped"
            );
            return false;
        }

        state.action = if verdict.existing().is_some() {
            AttachmentAction::Skip
        } else {
            AttachmentAction::Create
        };
        state.verdict = verdict;
        true
    }

    /// Probe, check against the store and apply in one call
    pub async fn refresh_attachment_verdict(
        &mut self,
        id: Uuid,
        store: &dyn RecordStore,
    ) -> IngestResult<AttachmentVerdict> {
        let Some(probe) = self.attachment_probe(id) else {
            self.attachment_state_mut(id)?.verdict = AttachmentVerdict::None;
            return Ok(AttachmentVerdict::None);
        };
        let verdict = AttachmentMatcher::new(store).check(&probe).await?;
        self.apply_attachment_verdict(&probe, verdict.clone());
        Ok(verdict)
    }

    /// Refuse a commit that cannot succeed as a whole
    pub fn validate_for_commit(&self) -> IngestResult<()> {
        if self.selected_items().next().is_none() {
            return Err(IngestError::NothingSelected);
        }
        if let Some(item) = self.selected_items().find(|i| !i.is_resolved()) {
            return Err(IngestError::UnresolvedParent {
                item: item.display_name(),
            });
        }
        Ok(())
    }
}

/// Attribute each found field to the first document the item was read from
fn seed_field_sources(item: &mut ImportSessionItem, summaries: &[DocumentSummary]) {
    for summary in summaries {
        let from_item = item
            .record
            .source_files
            .iter()
            .any(|f| f.file_name == summary.file_name);
        if !from_item {
            continue;
        }
        for field in &summary.fields_found {
            if item.record.get(*field).is_none() {
                continue;
            }
            item.field_sources.entry(*field).or_insert_with(|| FieldSource {
                item_id: item.id,
                file_name: Some(summary.file_name.clone()),
            });
        }
    }
}
