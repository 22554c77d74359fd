//! In-memory `RecordStore` with call recording and failure injection

use async_trait::async_trait;
use fleet_common::{Error, Result};
use fleet_ingest::models::{
    AssetPatch, AssetPayload, Attachment, AttachmentPayload, DocumentRef, RegistryRecord,
    SourceFile,
};
use fleet_ingest::RecordStore;
use std::collections::HashSet;
use std::sync::Mutex;

/// Store operation, for failure injection and call inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListAssets,
    CreateAsset,
    UpdateAsset,
    ListAttachments,
    CreateAttachment,
    UpdateAttachment,
    ListDocuments,
    UploadDocument,
}

#[derive(Default)]
struct Inner {
    assets: Vec<RegistryRecord>,
    attachments: Vec<Attachment>,
    /// (owner id, file name)
    documents: Vec<(String, String)>,
    calls: Vec<(Op, String)>,
    /// (op, key) pairs that fail; key is make, id or file name
    failures: HashSet<(Op, String)>,
    next_id: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets(assets: Vec<RegistryRecord>) -> Self {
        let store = Self::new();
        store.inner.lock().unwrap().assets = assets;
        store
    }

    pub fn add_attachment(&self, parent_id: &str, id: &str, name: &str) {
        self.inner.lock().unwrap().attachments.push(Attachment {
            id: id.to_string(),
            parent_id: parent_id.to_string(),
            name: name.to_string(),
            ..Default::default()
        });
    }

    pub fn add_document(&self, owner_id: &str, file_name: &str) {
        self.inner
            .lock()
            .unwrap()
            .documents
            .push((owner_id.to_string(), file_name.to_string()));
    }

    /// Make `op` fail whenever it is called with `key`
    pub fn fail_on(&self, op: Op, key: &str) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .insert((op, key.to_string()));
    }

    pub fn calls(&self) -> Vec<(Op, String)> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, op: Op) -> usize {
        self.calls().iter().filter(|(o, _)| *o == op).count()
    }

    pub fn assets(&self) -> Vec<RegistryRecord> {
        self.inner.lock().unwrap().assets.clone()
    }

    pub fn asset(&self, id: &str) -> Option<RegistryRecord> {
        self.assets().into_iter().find(|a| a.id == id)
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        self.inner.lock().unwrap().attachments.clone()
    }

    pub fn documents(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().documents.clone()
    }

    fn enter(&self, op: Op, key: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push((op, key.to_string()));
        if inner.failures.contains(&(op, key.to_string())) {
            return Err(Error::Internal(format!("injected failure: {op:?} {key}")));
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        format!("{prefix}-{}", inner.next_id)
    }
}

fn apply_patch(record: &mut RegistryRecord, patch: &AssetPatch) {
    use fleet_ingest::models::AssetField as F;
    for (field, value) in &patch.fields {
        let text = Some(value.clone().into_text());
        let number = value.as_f64();
        let integer = value.as_i64().and_then(|n| i32::try_from(n).ok());
        match field {
            F::Make => record.make = value.clone().into_text(),
            F::Model => record.model = value.clone().into_text(),
            F::Year => record.year = integer,
            F::SerialNumber => record.serial_number = text,
            F::PurchaseDate => record.purchase_date = text,
            F::PurchasePrice => record.purchase_price = number,
            F::SalesTax => record.sales_tax = number,
            F::FreightSetup => record.freight_setup = number,
            F::FinancingType => record.financing_type = text,
            F::DepositAmount => record.deposit_amount = number,
            F::FinancedAmount => record.financed_amount = number,
            F::MonthlyPayment => record.monthly_payment = number,
            F::FinanceTermMonths => record.finance_term_months = integer,
            F::BuyoutAmount => record.buyout_amount = number,
            F::PurchaseCondition => record.purchase_condition = text,
            F::Category => record.category = text,
            F::Notes => record.notes = text,
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list_assets(&self) -> Result<Vec<RegistryRecord>> {
        self.enter(Op::ListAssets, "")?;
        Ok(self.assets())
    }

    async fn create_asset(&self, payload: &AssetPayload) -> Result<String> {
        self.enter(Op::CreateAsset, &payload.make)?;
        let id = self.next_id("asset");
        let record = RegistryRecord {
            id: id.clone(),
            make: payload.make.clone(),
            model: payload.model.clone(),
            year: Some(payload.year),
            serial_number: payload.serial_number.clone(),
            purchase_date: Some(payload.purchase_date.clone()),
            purchase_price: Some(payload.purchase_price),
            financing_type: Some(payload.financing_type.clone()),
            monthly_payment: Some(payload.monthly_payment),
            purchase_condition: Some(payload.purchase_condition.clone()),
            category: payload.category.clone(),
            notes: payload.notes.clone(),
            ..Default::default()
        };
        self.inner.lock().unwrap().assets.push(record);
        Ok(id)
    }

    async fn update_asset(&self, id: &str, patch: &AssetPatch) -> Result<()> {
        self.enter(Op::UpdateAsset, id)?;
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .assets
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("asset {id}")))?;
        apply_patch(record, patch);
        Ok(())
    }

    async fn list_attachments(&self, parent_id: &str) -> Result<Vec<Attachment>> {
        self.enter(Op::ListAttachments, parent_id)?;
        Ok(self
            .attachments()
            .into_iter()
            .filter(|a| a.parent_id == parent_id)
            .collect())
    }

    async fn create_attachment(
        &self,
        parent_id: &str,
        payload: &AttachmentPayload,
    ) -> Result<String> {
        self.enter(Op::CreateAttachment, &payload.name)?;
        let id = self.next_id("att");
        self.inner.lock().unwrap().attachments.push(Attachment {
            id: id.clone(),
            parent_id: parent_id.to_string(),
            name: payload.name.clone(),
            value: payload.value,
            serial_number: payload.serial_number.clone(),
            description: payload.description.clone(),
        });
        Ok(id)
    }

    async fn update_attachment(&self, id: &str, payload: &AttachmentPayload) -> Result<()> {
        self.enter(Op::UpdateAttachment, id)?;
        let mut inner = self.inner.lock().unwrap();
        let attachment = inner
            .attachments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::NotFound(format!("attachment {id}")))?;
        attachment.name = payload.name.clone();
        attachment.value = payload.value;
        attachment.serial_number = payload.serial_number.clone();
        attachment.description = payload.description.clone();
        Ok(())
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<DocumentRef>> {
        self.enter(Op::ListDocuments, owner_id)?;
        Ok(self
            .documents()
            .into_iter()
            .filter(|(owner, _)| owner == owner_id)
            .map(|(_, file_name)| DocumentRef { file_name })
            .collect())
    }

    async fn upload_document(&self, owner_id: &str, file: &SourceFile) -> Result<()> {
        self.enter(Op::UploadDocument, &file.file_name)?;
        self.add_document(owner_id, &file.file_name);
        Ok(())
    }
}

