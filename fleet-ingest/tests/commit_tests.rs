//! Commit executor against the in-memory store
//!
//! Covers pass ordering, parent resolution, the attachment safety net,
//! document de-duplication and per-item failure isolation.

mod helpers;

use std::sync::Arc;

use fleet_ingest::models::{
    AssetField, AttachmentAction, CandidateRecord, ImportMode, OutcomeKind, ParentRef,
    SummaryStatus,
};
use fleet_ingest::{CommitExecutor, CommitOptions, ImportSession, IngestError, MatchPolicy};
use helpers::*;

fn session_over(store: &MemoryStore, candidates: Vec<CandidateRecord>) -> ImportSession {
    ImportSession::start(batch(candidates), store.assets(), MatchPolicy::default())
}

/// Registry Cat 305 with serial only, candidate bringing a price for it
fn cat_update() -> (MemoryStore, CandidateRecord) {
    let mut existing = registry("a1", "Cat", "305");
    existing.serial_number = Some("SER-1".to_string());
    let mut record = candidate("CAT", "305");
    record.serial_number = Some("ser1".to_string());
    record.purchase_price = Some(52000.0);
    (MemoryStore::with_assets(vec![existing]), record)
}

#[tokio::test]
async fn test_one_failure_one_update_is_partial() {
    let (store, update) = cat_update();
    store.fail_on(Op::CreateAsset, "Bobcat");
    let store = Arc::new(store);
    let session = session_over(&store, vec![update, candidate("Bobcat", "S650")]);

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.created, 0);
    assert_eq!(summary.success_count(), 1);
    assert_eq!(summary.failure_count(), 1);
    assert_eq!(summary.status(), SummaryStatus::Partial);
    assert_eq!(summary.title(), "Partial Import");
    assert_eq!(summary.failures[0].name, "Bobcat S650");
    assert!(summary.message().contains("Failed: Bobcat S650"));

    assert_eq!(store.asset("a1").unwrap().purchase_price, Some(52000.0));
}

#[tokio::test]
async fn test_everything_failing_is_import_failed() {
    let store = MemoryStore::new();
    store.fail_on(Op::CreateAsset, "Bobcat");
    let store = Arc::new(store);
    let session = session_over(&store, vec![candidate("Bobcat", "S650")]);

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.status(), SummaryStatus::AllFailed);
    assert_eq!(summary.title(), "Import Failed");
}

#[tokio::test]
async fn test_validation_blocks_before_any_store_call() {
    let store = Arc::new(MemoryStore::new());
    let session = session_over(
        &store,
        vec![
            candidate("Bobcat", "S650"),
            attachment_candidate("Bobcat", "Pallet Forks", None),
        ],
    );

    let err = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::UnresolvedParent { .. }));
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_pending_parent_maps_to_created_asset() {
    let store = Arc::new(MemoryStore::new());
    let session = session_over(
        &store,
        vec![
            with_files(candidate("Bobcat", "S650"), &["invoice.pdf"]),
            with_files(
                attachment_candidate("Bobcat", "Pallet Forks", Some(0)),
                &["invoice.pdf"],
            ),
        ],
    );

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.attached, 1);
    assert_eq!(summary.status(), SummaryStatus::AllSucceeded);

    let asset_id = store.assets()[0].id.clone();
    let attachments = store.attachments();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].parent_id, asset_id);
    assert_eq!(attachments[0].name, "Bobcat Pallet Forks");

    // shared file goes to the shared owner once
    assert_eq!(summary.documents_uploaded, 1);
    assert_eq!(store.call_count(Op::UploadDocument), 1);
    assert_eq!(store.call_count(Op::ListDocuments), 1);
    assert_eq!(store.documents(), vec![(asset_id, "invoice.pdf".to_string())]);
}

#[tokio::test]
async fn test_passes_run_in_order() {
    let store = Arc::new(MemoryStore::new());
    // attachment listed before its parent in the batch
    let session = session_over(
        &store,
        vec![
            with_files(
                attachment_candidate("Bobcat", "Pallet Forks", Some(1)),
                &["forks.pdf"],
            ),
            candidate("Bobcat", "S650"),
        ],
    );

    CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    let ops: Vec<Op> = store.calls().into_iter().map(|(op, _)| op).collect();
    assert_eq!(
        ops,
        vec![
            Op::CreateAsset,
            Op::ListAttachments,
            Op::CreateAttachment,
            Op::ListDocuments,
            Op::UploadDocument,
        ]
    );
}

#[tokio::test]
async fn test_skipped_pending_parent_falls_back_to_matched_asset() {
    let mut existing = registry("a1", "Deere", "333G");
    existing.serial_number = Some("D-9".to_string());
    let store = Arc::new(MemoryStore::with_assets(vec![existing]));

    let mut parent = candidate("Deere", "333G");
    parent.serial_number = Some("d9".to_string());
    let session = session_over(
        &store,
        vec![parent, attachment_candidate("Deere", "Thumb", Some(0))],
    );
    assert_eq!(session.items()[0].mode, ImportMode::Skip);

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.created, 0);
    assert_eq!(summary.attached, 1);
    assert_eq!(store.attachments()[0].parent_id, "a1");
}

#[tokio::test]
async fn test_attachment_of_failed_parent_fails() {
    let store = MemoryStore::new();
    store.fail_on(Op::CreateAsset, "Bobcat");
    let store = Arc::new(store);
    let session = session_over(
        &store,
        vec![
            candidate("Bobcat", "S650"),
            attachment_candidate("Bobcat", "Pallet Forks", Some(0)),
        ],
    );

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.failure_count(), 2);
    assert_eq!(summary.failures[1].name, "Bobcat Pallet Forks");
    assert_eq!(summary.failures[1].error, "parent asset was not written");
    assert_eq!(store.call_count(Op::CreateAttachment), 0);
}

#[tokio::test]
async fn test_failed_new_parent_never_falls_back_to_its_potential_match() {
    let mut other = registry("other-machine", "Bobcat", "S650");
    other.year = Some(2019);
    let store = MemoryStore::with_assets(vec![other]);
    store.fail_on(Op::CreateAsset, "Bobcat");
    let store = Arc::new(store);

    let mut parent = candidate("Bobcat", "S650");
    parent.year = Some(2019);
    let session = session_over(
        &store,
        vec![parent, attachment_candidate("Bobcat", "Forks", Some(0))],
    );
    let parent = &session.items()[0];
    assert_eq!(parent.mode, ImportMode::New);
    assert_eq!(
        parent.verdict.matched_record_id.as_deref(),
        Some("other-machine")
    );

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.attached, 0);
    assert_eq!(summary.failure_count(), 2);
    assert_eq!(summary.failures[1].name, "Bobcat Forks");
    assert_eq!(summary.failures[1].error, "parent asset was not written");
    assert!(store.attachments().is_empty());
    assert_eq!(store.call_count(Op::ListAttachments), 0);
}

fn thumb_session(store: &MemoryStore) -> (ImportSession, uuid::Uuid) {
    let mut session = session_over(
        store,
        vec![attachment_candidate("Cat", "Hydraulic Thumb", None)],
    );
    let id = session.items()[0].id;
    session
        .set_parent(id, Some(ParentRef::Resolved("a1".to_string())))
        .unwrap();
    (session, id)
}

fn store_with_thumb() -> Arc<MemoryStore> {
    let store = MemoryStore::with_assets(vec![registry("a1", "Cat", "305")]);
    store.add_attachment("a1", "att-9", "Hydraulic Thumb");
    Arc::new(store)
}

#[tokio::test]
async fn test_commit_time_duplicate_is_skipped() {
    let store = store_with_thumb();
    // no verdict refresh: the executor's own check must catch it
    let (session, _) = thumb_session(&store);

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.status(), SummaryStatus::AllSucceeded);
    let expected = "duplicate of existing attachment 'Hydraulic Thumb'";
    assert!(matches!(
        &summary.outcomes[0].kind,
        OutcomeKind::Skipped { reason } if reason == expected
    ));
    assert_eq!(store.call_count(Op::CreateAttachment), 0);
}

#[tokio::test]
async fn test_import_anyway_bypasses_duplicate_check() {
    let store = store_with_thumb();
    let (mut session, id) = thumb_session(&store);
    session
        .set_attachment_action(id, AttachmentAction::ImportAnyway)
        .unwrap();

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.attached, 1);
    assert_eq!(store.attachments().len(), 2);
    assert_eq!(store.call_count(Op::ListAttachments), 0);
}

#[tokio::test]
async fn test_update_existing_attachment() {
    let store = store_with_thumb();
    let (mut session, id) = thumb_session(&store);
    session
        .refresh_attachment_verdict(id, store.as_ref())
        .await
        .unwrap();
    session
        .set_attachment_action(id, AttachmentAction::UpdateExisting)
        .unwrap();

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.attached, 1);
    let attachments = store.attachments();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].id, "att-9");
    assert_eq!(attachments[0].name, "Cat Hydraulic Thumb");
}

#[tokio::test]
async fn test_chosen_skip_is_a_soft_success() {
    let store = store_with_thumb();
    let (mut session, id) = thumb_session(&store);
    session
        .refresh_attachment_verdict(id, store.as_ref())
        .await
        .unwrap();
    assert_eq!(
        session.item(id).unwrap().attachment.as_ref().unwrap().action,
        AttachmentAction::Skip
    );

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.title(), "Import Complete");
}

#[tokio::test]
async fn test_documents_already_on_owner_are_not_uploaded() {
    let (store, update) = cat_update();
    store.add_document("a1", "invoice.pdf");
    let store = Arc::new(store);
    let session = session_over(
        &store,
        vec![with_files(update, &["invoice.pdf", "loan.pdf"])],
    );

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.documents_uploaded, 1);
    assert_eq!(
        store.calls().last(),
        Some(&(Op::UploadDocument, "loan.pdf".to_string()))
    );
}

#[tokio::test]
async fn test_document_pass_can_be_disabled() {
    let store = Arc::new(MemoryStore::new());
    let session = session_over(
        &store,
        vec![with_files(candidate("Bobcat", "S650"), &["invoice.pdf"])],
    );

    let summary = CommitExecutor::with_options(
        store.clone(),
        CommitOptions {
            attach_documents: false,
        },
    )
    .commit(&session)
    .await
    .unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(store.call_count(Op::ListDocuments), 0);
    assert_eq!(store.call_count(Op::UploadDocument), 0);
}

#[tokio::test]
async fn test_failed_upload_does_not_stop_the_pass() {
    let store = MemoryStore::new();
    store.fail_on(Op::UploadDocument, "invoice.pdf");
    let store = Arc::new(store);
    let session = session_over(
        &store,
        vec![with_files(
            candidate("Bobcat", "S650"),
            &["invoice.pdf", "manual.pdf"],
        )],
    );

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.documents_uploaded, 1);
    assert_eq!(summary.failures[0].name, "Bobcat S650 (invoice.pdf)");
    assert_eq!(summary.status(), SummaryStatus::Partial);
}

#[tokio::test]
async fn test_vetoed_backfill_skips_update_but_keeps_documents() {
    let (store, update) = cat_update();
    let store = Arc::new(store);
    let mut session = session_over(&store, vec![with_files(update, &["invoice.pdf"])]);
    let id = session.items()[0].id;
    session
        .set_field_apply(id, AssetField::PurchasePrice, false)
        .unwrap();

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.updated, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(store.call_count(Op::UpdateAsset), 0);
    assert_eq!(store.asset("a1").unwrap().purchase_price, None);
    assert_eq!(
        store.documents(),
        vec![("a1".to_string(), "invoice.pdf".to_string())]
    );
}

#[tokio::test]
async fn test_deselected_items_are_not_written() {
    let store = Arc::new(MemoryStore::new());
    let mut session = session_over(
        &store,
        vec![candidate("Bobcat", "S650"), candidate("Kubota", "SVL75")],
    );
    let kubota = session.items()[1].id;
    session.toggle_select(kubota).unwrap();

    let summary = CommitExecutor::new(store.clone())
        .commit(&session)
        .await
        .unwrap();

    assert_eq!(summary.created, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(store.assets().len(), 1);
    assert_eq!(store.assets()[0].make, "Bobcat");
}
