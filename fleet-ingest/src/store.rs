//! Record store seam
//!
//! The fleet registry, attachment registry and document registry are owned
//! by the caller. The reconciliation core reaches them only through this
//! trait; every call may fail and every call is awaited in order.

use async_trait::async_trait;
use fleet_common::Result;

use crate::models::{
    AssetPatch, AssetPayload, Attachment, AttachmentPayload, DocumentRef, RegistryRecord,
    SourceFile,
};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All registry assets, in store order
    async fn list_assets(&self) -> Result<Vec<RegistryRecord>>;

    /// Create an asset, returning its id
    async fn create_asset(&self, payload: &AssetPayload) -> Result<String>;

    /// Write only the fields in `patch`
    async fn update_asset(&self, id: &str, patch: &AssetPatch) -> Result<()>;

    async fn list_attachments(&self, parent_id: &str) -> Result<Vec<Attachment>>;

    /// Create an attachment under `parent_id`, returning its id
    async fn create_attachment(&self, parent_id: &str, payload: &AttachmentPayload)
        -> Result<String>;

    async fn update_attachment(&self, id: &str, payload: &AttachmentPayload) -> Result<()>;

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<DocumentRef>>;

    async fn upload_document(&self, owner_id: &str, file: &SourceFile) -> Result<()>;
}
