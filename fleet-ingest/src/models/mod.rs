//! Data models for fleet-ingest
//!
//! - Candidate records and the extraction batch envelope
//! - Registry records and store payloads
//! - Duplicate verdicts and backfill diffs
//! - Session items and commit results

pub mod candidate;
pub mod fields;
pub mod import_result;
pub mod registry;
pub mod session_item;
pub mod verdict;

pub use candidate::{
    AiHints, CandidateRecord, Confidence, DocumentSummary, ExtractionBatch, FieldConflict,
    SourceFile, SuggestedType,
};
pub use fields::{AssetField, FieldKind, FieldValue};
pub use import_result::{CommitOutcome, CommitSummary, ItemFailure, OutcomeKind, SummaryStatus};
pub use registry::{
    AssetPatch, AssetPayload, Attachment, AttachmentPayload, DocumentRef, RegistryRecord,
};
pub use session_item::{
    AttachmentAction, AttachmentFields, AttachmentState, FieldSource, ImportMode,
    ImportSessionItem, ParentRef,
};
pub use verdict::{AttachmentVerdict, DuplicateStatus, DuplicateVerdict, FieldDiff, MatchReason};
