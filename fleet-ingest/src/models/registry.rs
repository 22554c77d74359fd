//! Registry-side records and write payloads
//!
//! These mirror what the caller's record store holds. The reconciliation core
//! only reads them; writes go through `RecordStore`.

use serde::{Deserialize, Serialize};

use super::candidate::display_name;
use super::fields::{integer_value, number_value, text_value, AssetField, FieldValue};

/// An asset already present in the fleet registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRecord {
    pub id: String,
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub purchase_date: Option<String>,
    #[serde(default)]
    pub purchase_price: Option<f64>,
    #[serde(default)]
    pub sales_tax: Option<f64>,
    #[serde(default)]
    pub freight_setup: Option<f64>,
    #[serde(default)]
    pub financing_type: Option<String>,
    #[serde(default)]
    pub deposit_amount: Option<f64>,
    #[serde(default)]
    pub financed_amount: Option<f64>,
    #[serde(default)]
    pub monthly_payment: Option<f64>,
    #[serde(default)]
    pub finance_term_months: Option<i32>,
    #[serde(default)]
    pub buyout_amount: Option<f64>,
    #[serde(default)]
    pub purchase_condition: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RegistryRecord {
    pub fn new(id: impl Into<String>, make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            make: make.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn display_name(&self) -> String {
        display_name(self.year, &self.make, &self.model)
    }

    /// Read a field in its store shape
    pub fn get(&self, field: AssetField) -> Option<FieldValue> {
        match field {
            AssetField::Make => Some(FieldValue::Text(self.make.clone())),
            AssetField::Model => Some(FieldValue::Text(self.model.clone())),
            AssetField::Year => integer_value(self.year),
            AssetField::SerialNumber => text_value(&self.serial_number),
            AssetField::PurchaseDate => text_value(&self.purchase_date),
            AssetField::PurchasePrice => number_value(self.purchase_price),
            AssetField::SalesTax => number_value(self.sales_tax),
            AssetField::FreightSetup => number_value(self.freight_setup),
            AssetField::FinancingType => text_value(&self.financing_type),
            AssetField::DepositAmount => number_value(self.deposit_amount),
            AssetField::FinancedAmount => number_value(self.financed_amount),
            AssetField::MonthlyPayment => number_value(self.monthly_payment),
            AssetField::FinanceTermMonths => integer_value(self.finance_term_months),
            AssetField::BuyoutAmount => number_value(self.buyout_amount),
            AssetField::PurchaseCondition => text_value(&self.purchase_condition),
            AssetField::Category => text_value(&self.category),
            AssetField::Notes => text_value(&self.notes),
        }
    }
}

/// A sub-component registered under a parent asset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub parent_id: String,
    pub name: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A document already filed against an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub file_name: String,
}

/// Full payload for creating an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPayload {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub serial_number: Option<String>,
    pub purchase_date: String,
    pub purchase_price: f64,
    pub sales_tax: f64,
    pub freight_setup: f64,
    pub financing_type: String,
    pub deposit_amount: f64,
    pub financed_amount: f64,
    pub monthly_payment: f64,
    pub finance_term_months: i32,
    pub buyout_amount: f64,
    pub purchase_condition: String,
    pub category: Option<String>,
    pub notes: Option<String>,
}

/// Partial update: only the listed fields are written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetPatch {
    pub fields: Vec<(AssetField, FieldValue)>,
}

impl AssetPatch {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, field: AssetField) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v)
    }
}

/// Payload for creating or updating an attachment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentPayload {
    pub name: String,
    pub value: Option<f64>,
    pub serial_number: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_get_reads_all_money_fields() {
        let mut record = RegistryRecord::new("a1", "Cat", "305 CR");
        record.purchase_price = Some(0.0);
        record.buyout_amount = Some(1.0);
        assert_eq!(
            record.get(AssetField::PurchasePrice),
            Some(FieldValue::Number(0.0))
        );
        assert_eq!(
            record.get(AssetField::BuyoutAmount),
            Some(FieldValue::Number(1.0))
        );
        assert_eq!(record.get(AssetField::SalesTax), None);
    }

    #[test]
    fn test_patch_lookup() {
        let patch = AssetPatch {
            fields: vec![(AssetField::SerialNumber, FieldValue::from("X1"))],
        };
        assert_eq!(
            patch.get(AssetField::SerialNumber),
            Some(&FieldValue::from("X1"))
        );
        assert!(patch.get(AssetField::Year).is_none());
    }
}
