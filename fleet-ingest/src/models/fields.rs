//! Asset field identifiers and loosely-typed field values
//!
//! Candidate and registry records share one field vocabulary so that diffing,
//! merging, editing and store patches can all address a field by name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage shape of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text (make, serial, dates kept as entered)
    Text,
    /// Currency amount
    Money,
    /// Whole number (year, term in months)
    Integer,
}

/// Every asset field the reconciliation core can read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetField {
    Make,
    Model,
    Year,
    SerialNumber,
    PurchaseDate,
    PurchasePrice,
    SalesTax,
    FreightSetup,
    FinancingType,
    DepositAmount,
    FinancedAmount,
    MonthlyPayment,
    FinanceTermMonths,
    BuyoutAmount,
    PurchaseCondition,
    Category,
    Notes,
}

impl AssetField {
    /// All fields, in display order
    pub const ALL: [AssetField; 17] = [
        AssetField::Make,
        AssetField::Model,
        AssetField::Year,
        AssetField::SerialNumber,
        AssetField::PurchaseDate,
        AssetField::PurchasePrice,
        AssetField::SalesTax,
        AssetField::FreightSetup,
        AssetField::FinancingType,
        AssetField::DepositAmount,
        AssetField::FinancedAmount,
        AssetField::MonthlyPayment,
        AssetField::FinanceTermMonths,
        AssetField::BuyoutAmount,
        AssetField::PurchaseCondition,
        AssetField::Category,
        AssetField::Notes,
    ];

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Self::Make => "Make",
            Self::Model => "Model",
            Self::Year => "Year",
            Self::SerialNumber => "Serial/VIN",
            Self::PurchaseDate => "Purchase Date",
            Self::PurchasePrice => "Purchase Price",
            Self::SalesTax => "Sales Tax",
            Self::FreightSetup => "Freight/Setup",
            Self::FinancingType => "Financing Type",
            Self::DepositAmount => "Deposit",
            Self::FinancedAmount => "Financed Amount",
            Self::MonthlyPayment => "Monthly Payment",
            Self::FinanceTermMonths => "Term (months)",
            Self::BuyoutAmount => "Buyout",
            Self::PurchaseCondition => "Purchase Condition",
            Self::Category => "Category",
            Self::Notes => "Notes",
        }
    }

    /// Column name in the SQLite store
    pub fn column(self) -> &'static str {
        match self {
            Self::Make => "make",
            Self::Model => "model",
            Self::Year => "year",
            Self::SerialNumber => "serial_number",
            Self::PurchaseDate => "purchase_date",
            Self::PurchasePrice => "purchase_price",
            Self::SalesTax => "sales_tax",
            Self::FreightSetup => "freight_setup",
            Self::FinancingType => "financing_type",
            Self::DepositAmount => "deposit_amount",
            Self::FinancedAmount => "financed_amount",
            Self::MonthlyPayment => "monthly_payment",
            Self::FinanceTermMonths => "finance_term_months",
            Self::BuyoutAmount => "buyout_amount",
            Self::PurchaseCondition => "purchase_condition",
            Self::Category => "category",
            Self::Notes => "notes",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::Year | Self::FinanceTermMonths => FieldKind::Integer,
            Self::PurchasePrice
            | Self::SalesTax
            | Self::FreightSetup
            | Self::DepositAmount
            | Self::FinancedAmount
            | Self::MonthlyPayment
            | Self::BuyoutAmount => FieldKind::Money,
            _ => FieldKind::Text,
        }
    }

    /// Fields whose edit invalidates the registry duplicate verdict
    pub fn is_match_relevant(self) -> bool {
        matches!(
            self,
            Self::Make
                | Self::Model
                | Self::Year
                | Self::SerialNumber
                | Self::PurchaseDate
                | Self::PurchasePrice
        )
    }
}

impl fmt::Display for AssetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A field value as exchanged with callers and the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().replace(|c: char| c == ',' || c == '$', "").parse().ok(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n.round() as i64)
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => format_number(n),
        }
    }

    /// Coerce into the storage shape of `field`, `None` if it does not fit
    pub fn coerce(self, field: AssetField) -> Option<FieldValue> {
        match field.kind() {
            FieldKind::Text => Some(FieldValue::Text(self.into_text())),
            FieldKind::Money => self.as_f64().map(FieldValue::Number),
            FieldKind::Integer => self.as_i64().map(|n| FieldValue::Number(n as f64)),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => f.write_str(&format_number(*n)),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        Self::Number(n as f64)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

pub(crate) fn text_value(value: &Option<String>) -> Option<FieldValue> {
    value.as_ref().map(|s| FieldValue::Text(s.clone()))
}

pub(crate) fn number_value(value: Option<f64>) -> Option<FieldValue> {
    value.map(FieldValue::Number)
}

pub(crate) fn integer_value<T: Into<i64>>(value: Option<T>) -> Option<FieldValue> {
    value.map(|n| FieldValue::Number(Into::<i64>::into(n) as f64))
}
