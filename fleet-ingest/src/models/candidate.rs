//! Candidate records produced by the extraction collaborator
//!
//! A candidate is one machine-extracted description of a piece of equipment.
//! Candidates are never mutated once received; sessions work on clones.

use serde::{Deserialize, Serialize};

use super::fields::{integer_value, number_value, text_value, AssetField, FieldKind, FieldValue};
use crate::error::{IngestError, IngestResult};

/// Extraction confidence tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    #[default]
    Medium,
    High,
}

/// What the extractor believes the record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestedType {
    Asset,
    Attachment,
}

/// Optional extractor hints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiHints {
    #[serde(default)]
    pub suggested_type: Option<SuggestedType>,
    /// Index into the same batch of the suggested parent asset
    #[serde(default)]
    pub suggested_parent_index: Option<usize>,
    #[serde(default)]
    pub suggested_category: Option<String>,
    #[serde(default)]
    pub purchase_condition: Option<String>,
}

/// Reference to a source document a candidate was extracted from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub file_name: String,
    /// Where the caller staged the file, if anywhere
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl SourceFile {
    pub fn named(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            path: None,
            content_type: None,
        }
    }
}

/// One extracted equipment description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    #[serde(default)]
    pub make: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default, alias = "vin")]
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
    pub confidence: Confidence,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub source_files: Vec<SourceFile>,
    /// Indices of the batch documents this record was read from
    #[serde(default)]
    pub source_document_indices: Vec<usize>,
    #[serde(default)]
    pub hints: AiHints,
}

impl CandidateRecord {
    pub fn new(make: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// "{year} {make} {model}" with missing parts dropped
    pub fn display_name(&self) -> String {
        display_name(self.year, &self.make, &self.model)
    }

    pub fn is_attachment_hint(&self) -> bool {
        self.hints.suggested_type == Some(SuggestedType::Attachment)
    }

    /// Read a field in its store shape
    pub fn get(&self, field: AssetField) -> Option<FieldValue> {
        match field {
            AssetField::Make => non_blank(&self.make),
            AssetField::Model => non_blank(&self.model),
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
            AssetField::PurchaseCondition => text_value(&self.hints.purchase_condition),
            AssetField::Category => text_value(&self.hints.suggested_category),
            AssetField::Notes => non_blank(&self.notes),
        }
    }

    /// Overwrite a field, coercing the value into the field's shape
    pub fn set(&mut self, field: AssetField, value: Option<FieldValue>) -> IngestResult<()> {
        let value = match value {
            Some(v) => Some(v.clone().coerce(field).ok_or_else(|| {
                IngestError::InvalidField {
                    field,
                    value: v.to_string(),
                }
            })?),
            None => None,
        };
        let text = value.clone().map(FieldValue::into_text);
        let number = value.as_ref().and_then(FieldValue::as_f64);
        let integer = match value.as_ref().and_then(FieldValue::as_i64) {
            Some(n) if field.kind() == FieldKind::Integer => {
                Some(i32::try_from(n).map_err(|_| IngestError::InvalidField {
                    field,
                    value: n.to_string(),
                })?)
            }
            _ => None,
        };

        match field {
            AssetField::Make => self.make = text.unwrap_or_default(),
            AssetField::Model => self.model = text.unwrap_or_default(),
            AssetField::Year => self.year = integer,
            AssetField::SerialNumber => self.serial_number = text,
            AssetField::PurchaseDate => self.purchase_date = text,
            AssetField::PurchasePrice => self.purchase_price = number,
            AssetField::SalesTax => self.sales_tax = number,
            AssetField::FreightSetup => self.freight_setup = number,
            AssetField::FinancingType => self.financing_type = text,
            AssetField::DepositAmount => self.deposit_amount = number,
            AssetField::FinancedAmount => self.financed_amount = number,
            AssetField::MonthlyPayment => self.monthly_payment = number,
            AssetField::FinanceTermMonths => self.finance_term_months = integer,
            AssetField::BuyoutAmount => self.buyout_amount = number,
            AssetField::PurchaseCondition => self.hints.purchase_condition = text,
            AssetField::Category => self.hints.suggested_category = text,
            AssetField::Notes => self.notes = text.unwrap_or_default(),
        }
        Ok(())
    }

    /// Carries purchase-side paperwork (a bill of sale or invoice)
    pub fn has_purchase_data(&self) -> bool {
        is_positive(self.purchase_price)
    }

    /// Carries financing-side paperwork (a loan or lease agreement)
    pub fn has_financing_data(&self) -> bool {
        is_positive(self.monthly_payment)
            || is_positive(self.financed_amount)
            || is_positive(self.deposit_amount)
            || is_positive(self.buyout_amount)
            || self.finance_term_months.is_some_and(|t| t > 0)
    }
}

pub(crate) fn display_name(year: Option<i32>, make: &str, model: &str) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if let Some(y) = year {
        parts.push(y.to_string());
    }
    for part in [make.trim(), model.trim()] {
        if !part.is_empty() {
            parts.push(part.to_string());
        }
    }
    parts.join(" ")
}

fn non_blank(s: &str) -> Option<FieldValue> {
    if s.trim().is_empty() {
        None
    } else {
        Some(FieldValue::Text(s.to_string()))
    }
}

fn is_positive(value: Option<f64>) -> bool {
    value.is_some_and(|v| v > 0.0)
}

/// Per-document summary from the extraction collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub file_name: String,
    /// Fields the extractor found in this document
    #[serde(default)]
    pub fields_found: Vec<AssetField>,
}

/// A field on which the source documents disagree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConflict {
    /// Batch index of the candidate the conflict belongs to
    pub candidate_index: usize,
    pub field: AssetField,
    pub values: Vec<FieldValue>,
    /// Source file name for each entry in `values`
    #[serde(default)]
    pub value_sources: Vec<String>,
}

/// Everything one extraction run hands over
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionBatch {
    pub candidates: Vec<CandidateRecord>,
    #[serde(default)]
    pub document_summaries: Vec<DocumentSummary>,
    #[serde(default)]
    pub conflicts: Vec<FieldConflict>,
}

impl ExtractionBatch {
    pub fn new(candidates: Vec<CandidateRecord>) -> Self {
        Self {
            candidates,
            ..Default::default()
        }
    }
}
