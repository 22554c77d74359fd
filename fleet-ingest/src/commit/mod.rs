//! Commit executor
//!
//! Writes a validated session to the record store in three ordered passes:
//!
//! 1. **Primary pass**: create `new` assets, backfill `update_existing` ones,
//!    and map each item's session id to the real asset id
//! 2. **Attachment pass**: resolve each attachment's parent through that map
//!    and write it according to its attachment action
//! 3. **Document pass**: upload source files to the owning asset, never the
//!    same (owner, file name) twice and never a file the owner already has
//!
//! Each store call is awaited in order. A failing call is recorded against
//! its item and the pass moves on. Once the primary pass starts the run goes
//! through all three passes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Datelike;
use fleet_common::time;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::CommitOptions;
use crate::error::IngestResult;
use crate::models::{
    AssetPatch, AssetPayload, AttachmentAction, AttachmentState, CommitSummary, ImportMode,
    ImportSessionItem, OutcomeKind, ParentRef,
};
use crate::services::attachment_matcher::match_keys;
use crate::services::find_duplicate_attachment;
use crate::services::normalize::parse_date;
use crate::session::ImportSession;
use crate::store::RecordStore;

/// Financing type written when the candidate carries none
pub const DEFAULT_FINANCING_TYPE: &str = "owned";

/// Purchase condition written when the candidate carries none
pub const DEFAULT_PURCHASE_CONDITION: &str = "new";

/// Build the full create payload for a `new` item
///
/// Year falls back to the purchase date's year, then the current year.
/// Purchase date falls back to today. Missing amounts are written as 0.
pub fn build_asset_payload(item: &ImportSessionItem) -> AssetPayload {
    let record = &item.record;
    let year = record
        .year
        .or_else(|| {
            record
                .purchase_date
                .as_deref()
                .and_then(parse_date)
                .map(|d| d.year())
        })
        .unwrap_or_else(time::current_year);
    let purchase_date = record
        .purchase_date
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| time::iso_date(time::today()));
    let non_blank = |v: &Option<String>, default: &str| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    };

    AssetPayload {
        make: record.make.trim().to_string(),
        model: record.model.trim().to_string(),
        year,
        serial_number: record.serial_number.clone().filter(|s| !s.trim().is_empty()),
        purchase_date,
        purchase_price: record.purchase_price.unwrap_or(0.0),
        sales_tax: record.sales_tax.unwrap_or(0.0),
        freight_setup: record.freight_setup.unwrap_or(0.0),
        financing_type: non_blank(&record.financing_type, DEFAULT_FINANCING_TYPE),
        deposit_amount: record.deposit_amount.unwrap_or(0.0),
        financed_amount: record.financed_amount.unwrap_or(0.0),
        monthly_payment: record.monthly_payment.unwrap_or(0.0),
        finance_term_months: record.finance_term_months.unwrap_or(0),
        buyout_amount: record.buyout_amount.unwrap_or(0.0),
        purchase_condition: non_blank(
            &record.hints.purchase_condition,
            DEFAULT_PURCHASE_CONDITION,
        ),
        category: item.category.clone(),
        notes: Some(record.notes.trim().to_string()).filter(|n| !n.is_empty()),
    }
}

/// Patch of the backfills the caller left enabled
pub fn build_asset_patch(item: &ImportSessionItem) -> AssetPatch {
    AssetPatch {
        fields: item
            .verdict
            .applied_fields()
            .map(|d| (d.field, d.candidate_value.clone()))
            .collect(),
    }
}

/// Ids produced by the earlier passes of one run
#[derive(Default)]
struct RunState {
    /// Session item id → asset id it was written to
    assets: HashMap<Uuid, String>,
    /// Attachment item id → asset id that owns its documents
    attachment_owners: HashMap<Uuid, String>,
}

/// Drives one commit run against a record store
pub struct CommitExecutor {
    store: Arc<dyn RecordStore>,
    options: CommitOptions,
}

impl CommitExecutor {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            options: CommitOptions::default(),
        }
    }

    pub fn with_options(store: Arc<dyn RecordStore>, options: CommitOptions) -> Self {
        Self { store, options }
    }

    /// Commit every selected item of `session`
    ///
    /// Refuses before any store call when nothing is selected or a selected
    /// attachment has no parent. Store failures never make this return Err.
    pub async fn commit(&self, session: &ImportSession) -> IngestResult<CommitSummary> {
        session.validate_for_commit()?;

        let mut summary = CommitSummary::new();
        let mut run = RunState::default();

        info!(
            selected = session.selected_items().count(),
            attach_documents = self.options.attach_documents,
            "Commit started"
        );

        for item in session.selected_items().filter(|i| i.is_asset_write()) {
            self.write_asset(item, &mut run, &mut summary).await;
        }

        for item in session
            .selected_items()
            .filter(|i| i.mode == ImportMode::Attachment)
        {
            self.write_attachment(session, item, &mut run, &mut summary)
                .await;
        }

        if self.options.attach_documents {
            self.upload_documents(session, &run, &mut summary).await;
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            attached = summary.attached,
            skipped = summary.skipped,
            documents = summary.documents_uploaded,
            failed = summary.failure_count(),
            status = ?summary.status(),
            "Commit finished"
        );
        Ok(summary)
    }

    async fn write_asset(
        &self,
        item: &ImportSessionItem,
        run: &mut RunState,
        summary: &mut CommitSummary,
    ) {
        let name = item.display_name();

        match item.mode {
            ImportMode::UpdateExisting => {
                let Some(asset_id) = item.verdict.matched_record_id.clone() else {
                    fail(summary, item.id, &name, "no matched registry record to update");
                    return;
                };
                let patch = build_asset_patch(item);
                if patch.is_empty() {
                    debug!(item_id = %item.id, asset_id = %asset_id, "Nothing to backfill");
                    run.assets.insert(item.id, asset_id);
                    summary.record(
                        item.id,
                        name,
                        OutcomeKind::Skipped {
                            reason: "no fields to backfill".to_string(),
                        },
                    );
                    return;
                }

                match self.store.update_asset(&asset_id, &patch).await {
                    Ok(()) => {
                        info!(
                            item_id = %item.id,
                            asset_id = %asset_id,
                            fields = patch.fields.len(),
                            "Asset updated"
                        );
                        run.assets.insert(item.id, asset_id.clone());
                        summary.record(
                            item.id,
                            name,
                            OutcomeKind::Updated {
                                asset_id,
                                fields: patch.fields.len(),
                            },
                        );
                    }
                    Err(e) => fail(summary, item.id, &name, e),
                }
            }
            ImportMode::New => {
                let payload = build_asset_payload(item);
                match self.store.create_asset(&payload).await {
                    Ok(asset_id) => {
                        info!(item_id = %item.id, asset_id = %asset_id, "Asset created");
                        run.assets.insert(item.id, asset_id.clone());
                        summary.record(item.id, name, OutcomeKind::Created { asset_id });
                    }
                    Err(e) => fail(summary, item.id, &name, e),
                }
            }
            ImportMode::Skip | ImportMode::Attachment => {}
        }
    }

    /// Real asset id for an attachment's parent, once the primary pass is done
    ///
    /// A pending parent that was not due to be created in this run falls back
    /// to the registry record it matched. A selected `new` parent whose create
    /// failed has no id.
    fn resolve_parent(
        &self,
        session: &ImportSession,
        parent: Option<&ParentRef>,
        run: &RunState,
    ) -> Option<String> {
        match parent? {
            ParentRef::Resolved(id) => Some(id.clone()),
            ParentRef::PendingItem(pending) => {
                if let Some(id) = run.assets.get(pending) {
                    return Some(id.clone());
                }
                let parent = session.item(*pending)?;
                if parent.selected && parent.mode == ImportMode::New {
                    return None;
                }
                parent.verdict.matched_record_id.clone()
            }
        }
    }

    async fn write_attachment(
        &self,
        session: &ImportSession,
        item: &ImportSessionItem,
        run: &mut RunState,
        summary: &mut CommitSummary,
    ) {
        let name = item.display_name();
        let Some(state) = item.attachment.as_ref() else {
            fail(summary, item.id, &name, "attachment fields missing");
            return;
        };
        let Some(parent_id) = self.resolve_parent(session, state.parent.as_ref(), run) else {
            fail(summary, item.id, &name, "parent asset was not written");
            return;
        };
        run.attachment_owners.insert(item.id, parent_id.clone());

        match state.action {
            AttachmentAction::Skip => {
                debug!(
                    item_id = %item.id,
                    parent_id = %parent_id,
                    "Attachment skipped by choice"
                );
                summary.record(
                    item.id,
                    name,
                    OutcomeKind::Skipped {
                        reason: "attachment skipped".to_string(),
                    },
                );
            }
            AttachmentAction::UpdateExisting => {
                let Some(existing) = state.verdict.existing() else {
                    fail(summary, item.id, &name, "no existing attachment to update");
                    return;
                };
                let payload = state.fields.to_payload();
                match self.store.update_attachment(&existing.id, &payload).await {
                    Ok(()) => {
                        info!(
                            item_id = %item.id,
                            attachment_id = %existing.id,
                            "Attachment updated"
                        );
                        summary.record(
                            item.id,
                            name,
                            OutcomeKind::AttachmentUpdated {
                                attachment_id: existing.id.clone(),
                            },
                        );
                    }
                    Err(e) => fail(summary, item.id, &name, e),
                }
            }
            AttachmentAction::ImportAnyway => {
                self.create_attachment(item, state, &parent_id, summary).await;
            }
            AttachmentAction::Create => {
                let existing = match self.store.list_attachments(&parent_id).await {
                    Ok(existing) => existing,
                    Err(e) => {
                        fail(summary, item.id, &name, e);
                        return;
                    }
                };
                let (match_name, serial) = match_keys(&state.fields, &item.record);
                let duplicate =
                    find_duplicate_attachment(&match_name, serial.as_deref(), &existing);
                if let Some(dup) = duplicate {
                    warn!(
                        item_id = %item.id,
                        parent_id = %parent_id,
                        existing_id = %dup.id,
                        "Duplicate attachment found at commit, skipping"
                    );
                    summary.record(
                        item.id,
                        name,
                        OutcomeKind::Skipped {
                            reason: format!("duplicate of existing attachment '{}'", dup.name),
                        },
                    );
                    return;
                }
                self.create_attachment(item, state, &parent_id, summary).await;
            }
        }
    }

    async fn create_attachment(
        &self,
        item: &ImportSessionItem,
        state: &AttachmentState,
        parent_id: &str,
        summary: &mut CommitSummary,
    ) {
        let name = item.display_name();
        let payload = state.fields.to_payload();
        match self.store.create_attachment(parent_id, &payload).await {
            Ok(attachment_id) => {
                info!(
                    item_id = %item.id,
                    parent_id = %parent_id,
                    attachment_id = %attachment_id,
                    "Attachment created"
                );
                summary.record(
                    item.id,
                    name,
                    OutcomeKind::Attached {
                        parent_id: parent_id.to_string(),
                        attachment_id,
                    },
                );
            }
            Err(e) => fail(summary, item.id, &name, e),
        }
    }

    async fn upload_documents(
        &self,
        session: &ImportSession,
        run: &RunState,
        summary: &mut CommitSummary,
    ) {
        let mut known: HashMap<String, HashSet<String>> = HashMap::new();
        let mut uploaded: HashSet<(String, String)> = HashSet::new();

        for item in session.selected_items() {
            let owner = match item.mode {
                ImportMode::New | ImportMode::UpdateExisting => run.assets.get(&item.id),
                ImportMode::Attachment => run.attachment_owners.get(&item.id),
                ImportMode::Skip => None,
            };
            let Some(owner) = owner else {
                continue;
            };
            if item.record.source_files.is_empty() {
                continue;
            }

            if !known.contains_key(owner) {
                match self.store.list_documents(owner).await {
                    Ok(docs) => {
                        known.insert(
                            owner.clone(),
                            docs.into_iter().map(|d| d.file_name).collect(),
                        );
                    }
                    Err(e) => {
                        fail(summary, item.id, &item.display_name(), e);
                        continue;
                    }
                }
            }

            for file in &item.record.source_files {
                let key = (owner.clone(), file.file_name.clone());
                let already_stored = known
                    .get(owner)
                    .is_some_and(|names| names.contains(&file.file_name));
                if already_stored || uploaded.contains(&key) {
                    debug!(owner_id = %owner, file = %file.file_name, "Document already present");
                    continue;
                }

                match self.store.upload_document(owner, file).await {
                    Ok(()) => {
                        debug!(owner_id = %owner, file = %file.file_name, "Document uploaded");
                        uploaded.insert(key);
                        summary.record(
                            item.id,
                            item.display_name(),
                            OutcomeKind::DocumentUploaded {
                                owner_id: owner.clone(),
                                file_name: file.file_name.clone(),
                            },
                        );
                    }
                    Err(e) => fail(
                        summary,
                        item.id,
                        &format!("{} ({})", item.display_name(), file.file_name),
                        e,
                    ),
                }
            }
        }
    }
}

fn fail(summary: &mut CommitSummary, item_id: Uuid, name: &str, error: impl ToString) {
    let error = error.to_string();
    warn!(item_id = %item_id, name = %name, error = %error, "Commit step failed");
    summary.record(item_id, name, OutcomeKind::Failed { error });
}
