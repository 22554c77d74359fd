//! `RecordStore` over SQLite

use async_trait::async_trait;
use fleet_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    AssetPatch, AssetPayload, Attachment, AttachmentPayload, DocumentRef, FieldKind,
    RegistryRecord, SourceFile,
};
use crate::store::RecordStore;

const ASSET_COLUMNS: &str = "id, make, model, year, serial_number, purchase_date, \
     purchase_price, sales_tax, freight_setup, financing_type, deposit_amount, \
     financed_amount, monthly_payment, finance_term_months, buyout_amount, \
     purchase_condition, category, notes";

pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Wrap a pool whose tables already exist (see `db::init_tables`)
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn registry_from_row(row: &SqliteRow) -> RegistryRecord {
    RegistryRecord {
        id: row.get("id"),
        make: row.get("make"),
        model: row.get("model"),
        year: row.get("year"),
        serial_number: row.get("serial_number"),
        purchase_date: row.get("purchase_date"),
        purchase_price: row.get("purchase_price"),
        sales_tax: row.get("sales_tax"),
        freight_setup: row.get("freight_setup"),
        financing_type: row.get("financing_type"),
        deposit_amount: row.get("deposit_amount"),
        financed_amount: row.get("financed_amount"),
        monthly_payment: row.get("monthly_payment"),
        finance_term_months: row.get("finance_term_months"),
        buyout_amount: row.get("buyout_amount"),
        purchase_condition: row.get("purchase_condition"),
        category: row.get("category"),
        notes: row.get("notes"),
    }
}

fn attachment_from_row(row: &SqliteRow) -> Attachment {
    Attachment {
        id: row.get("id"),
        parent_id: row.get("parent_id"),
        name: row.get("name"),
        value: row.get("value"),
        serial_number: row.get("serial_number"),
        description: row.get("description"),
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn list_assets(&self) -> Result<Vec<RegistryRecord>> {
        let sql = format!("SELECT {ASSET_COLUMNS} FROM assets ORDER BY created_at, rowid");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(registry_from_row).collect())
    }

    async fn create_asset(&self, payload: &AssetPayload) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO assets (
                id, make, model, year, serial_number, purchase_date,
                purchase_price, sales_tax, freight_setup, financing_type, deposit_amount,
                financed_amount, monthly_payment, finance_term_months, buyout_amount,
                purchase_condition, category, notes
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&payload.make)
        .bind(&payload.model)
        .bind(payload.year)
        .bind(&payload.serial_number)
        .bind(&payload.purchase_date)
        .bind(payload.purchase_price)
        .bind(payload.sales_tax)
        .bind(payload.freight_setup)
        .bind(&payload.financing_type)
        .bind(payload.deposit_amount)
        .bind(payload.financed_amount)
        .bind(payload.monthly_payment)
        .bind(payload.finance_term_months)
        .bind(payload.buyout_amount)
        .bind(&payload.purchase_condition)
        .bind(&payload.category)
        .bind(&payload.notes)
        .execute(&self.pool)
        .await?;

        debug!(asset_id = %id, "Inserted asset");
        Ok(id)
    }

    async fn update_asset(&self, id: &str, patch: &AssetPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }

        let assignments = patch
            .fields
            .iter()
            .map(|(field, _)| format!("{} = ?", field.column()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE assets SET {assignments}, updated_at = CURRENT_TIMESTAMP WHERE id = ?"
        );

        let mut query = sqlx::query(&sql);
        for (field, value) in &patch.fields {
            query = match field.kind() {
                FieldKind::Text => query.bind(value.clone().into_text()),
                FieldKind::Money => query.bind(value.as_f64()),
                FieldKind::Integer => query.bind(value.as_i64()),
            };
        }
        let result = query.bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("asset {id}")));
        }
        debug!(asset_id = %id, fields = patch.fields.len(), "Updated asset");
        Ok(())
    }

    async fn list_attachments(&self, parent_id: &str) -> Result<Vec<Attachment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, parent_id, name, value, serial_number, description
            FROM attachments
            WHERE parent_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(attachment_from_row).collect())
    }

    async fn create_attachment(
        &self,
        parent_id: &str,
        payload: &AttachmentPayload,
    ) -> Result<String> {
        if payload.name.trim().is_empty() {
            return Err(Error::InvalidInput("attachment name is empty".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO attachments (id, parent_id, name, value, serial_number, description)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(parent_id)
        .bind(&payload.name)
        .bind(payload.value)
        .bind(&payload.serial_number)
        .bind(&payload.description)
        .execute(&self.pool)
        .await?;

        debug!(attachment_id = %id, parent_id = %parent_id, "Inserted attachment");
        Ok(id)
    }

    async fn update_attachment(&self, id: &str, payload: &AttachmentPayload) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE attachments
            SET name = ?, value = ?, serial_number = ?, description = ?
            WHERE id = ?
            "#,
        )
        .bind(&payload.name)
        .bind(payload.value)
        .bind(&payload.serial_number)
        .bind(&payload.description)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("attachment {id}")));
        }
        Ok(())
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<DocumentRef>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT file_name FROM documents WHERE owner_id = ? ORDER BY uploaded_at, rowid",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names
            .into_iter()
            .map(|file_name| DocumentRef { file_name })
            .collect())
    }

    async fn upload_document(&self, owner_id: &str, file: &SourceFile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, owner_id, file_name, path, content_type)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(owner_id)
        .bind(&file.file_name)
        .bind(&file.path)
        .bind(&file.content_type)
        .execute(&self.pool)
        .await?;

        debug!(owner_id = %owner_id, file = %file.file_name, "Recorded document");
        Ok(())
    }
}
