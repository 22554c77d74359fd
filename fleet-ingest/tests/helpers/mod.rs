//! Shared test helpers for fleet-ingest integration tests
//!
//! - MemoryStore: in-memory record store with failure injection
//! - Builders for candidates, registry records and batches

#![allow(dead_code)]

pub mod memory_store;

pub use memory_store::{MemoryStore, Op};

use fleet_ingest::models::{
    CandidateRecord, DocumentSummary, ExtractionBatch, RegistryRecord, SourceFile, SuggestedType,
};

pub fn candidate(make: &str, model: &str) -> CandidateRecord {
    CandidateRecord::new(make, model)
}

pub fn with_files(mut record: CandidateRecord, files: &[&str]) -> CandidateRecord {
    record.source_files = files.iter().map(|f| SourceFile::named(*f)).collect();
    record
}

/// Candidate the extractor flagged as an attachment of batch item `parent_index`
pub fn attachment_candidate(
    make: &str,
    model: &str,
    parent_index: Option<usize>,
) -> CandidateRecord {
    let mut record = CandidateRecord::new(make, model);
    record.hints.suggested_type = Some(SuggestedType::Attachment);
    record.hints.suggested_parent_index = parent_index;
    record
}

pub fn registry(id: &str, make: &str, model: &str) -> RegistryRecord {
    RegistryRecord::new(id, make, model)
}

pub fn batch(candidates: Vec<CandidateRecord>) -> ExtractionBatch {
    ExtractionBatch::new(candidates)
}

pub fn summary(file_name: &str, fields: &[fleet_ingest::models::AssetField]) -> DocumentSummary {
    DocumentSummary {
        file_name: file_name.to_string(),
        fields_found: fields.to_vec(),
    }
}
