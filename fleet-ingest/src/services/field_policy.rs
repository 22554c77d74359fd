//! Field reconciliation diff
//!
//! Decides which registry fields may be backfilled from a candidate. A field
//! is backfillable only when the registry value is empty under that field's
//! policy and the candidate carries a value. Nothing already filled is ever
//! overwritten.

use crate::models::{AssetField, CandidateRecord, FieldDiff, FieldValue, RegistryRecord};

/// When a stored value counts as "not filled in"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyRule {
    /// Missing or whitespace-only
    Blank,
    /// Missing, whitespace-only, or numerically zero
    BlankOrZero,
}

/// Backfill policy for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    pub field: AssetField,
    pub empty_rule: EmptyRule,
}

const fn policy(field: AssetField, empty_rule: EmptyRule) -> FieldPolicy {
    FieldPolicy { field, empty_rule }
}

/// Fields eligible for backfill, in diff order
///
/// Registries created by earlier imports store 0 for unknown amounts and
/// terms, so those fields treat zero as empty. Financing type defaults to
/// "owned" and that literal is a real value, never a placeholder.
pub const BACKFILL_POLICY: &[FieldPolicy] = &[
    policy(AssetField::SerialNumber, EmptyRule::Blank),
    policy(AssetField::PurchaseDate, EmptyRule::Blank),
    policy(AssetField::PurchasePrice, EmptyRule::BlankOrZero),
    policy(AssetField::SalesTax, EmptyRule::BlankOrZero),
    policy(AssetField::FreightSetup, EmptyRule::BlankOrZero),
    policy(AssetField::FinancingType, EmptyRule::Blank),
    policy(AssetField::DepositAmount, EmptyRule::BlankOrZero),
    policy(AssetField::FinancedAmount, EmptyRule::BlankOrZero),
    policy(AssetField::MonthlyPayment, EmptyRule::BlankOrZero),
    policy(AssetField::FinanceTermMonths, EmptyRule::BlankOrZero),
    policy(AssetField::BuyoutAmount, EmptyRule::BlankOrZero),
    policy(AssetField::PurchaseCondition, EmptyRule::Blank),
];

/// Policy for `field`, if it takes part in backfill at all
pub fn policy_for(field: AssetField) -> Option<&'static FieldPolicy> {
    BACKFILL_POLICY.iter().find(|p| p.field == field)
}

/// Whether `value` is empty under `rule`
pub fn is_empty_value(value: Option<&FieldValue>, rule: EmptyRule) -> bool {
    match value {
        None => true,
        Some(FieldValue::Text(s)) => {
            let s = s.trim();
            s.is_empty() || (rule == EmptyRule::BlankOrZero && s.parse::<f64>() == Ok(0.0))
        }
        Some(FieldValue::Number(n)) => rule == EmptyRule::BlankOrZero && *n == 0.0,
    }
}

/// Backfillable fields of `existing` using the built-in policy table
pub fn backfillable_fields(
    existing: &RegistryRecord,
    candidate: &CandidateRecord,
) -> Vec<FieldDiff> {
    backfillable_fields_with(BACKFILL_POLICY, existing, candidate)
}

/// Backfillable fields of `existing` under an explicit policy table
pub fn backfillable_fields_with(
    policies: &[FieldPolicy],
    existing: &RegistryRecord,
    candidate: &CandidateRecord,
) -> Vec<FieldDiff> {
    policies
        .iter()
        .filter_map(|p| {
            let existing_value = existing.get(p.field);
            if !is_empty_value(existing_value.as_ref(), p.empty_rule) {
                return None;
            }
            let candidate_value = candidate.get(p.field)?;
            if is_empty_value(Some(&candidate_value), p.empty_rule) {
                return None;
            }
            Some(FieldDiff {
                field: p.field,
                label: p.field.label().to_string(),
                existing_value,
                candidate_value,
                will_apply: true,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_price_is_backfillable_owned_is_not() {
        let mut existing = RegistryRecord::new("a1", "Cat", "305");
        existing.purchase_price = Some(0.0);
        existing.financing_type = Some("owned".to_string());

        let mut candidate = CandidateRecord::new("Cat", "305");
        candidate.purchase_price = Some(52000.0);
        candidate.financing_type = Some("financed".to_string());

        let diffs = backfillable_fields(&existing, &candidate);
        let fields: Vec<AssetField> = diffs.iter().map(|d| d.field).collect();

        assert_eq!(fields, vec![AssetField::PurchasePrice]);
        assert_eq!(diffs[0].existing_value, Some(FieldValue::Number(0.0)));
        assert_eq!(diffs[0].candidate_value, FieldValue::Number(52000.0));
        assert!(diffs[0].will_apply);
        assert_eq!(diffs[0].label, "Purchase Price");
    }

    #[test]
    fn test_filled_fields_are_never_overwritten() {
        let mut existing = RegistryRecord::new("a1", "Cat", "305");
        existing.serial_number = Some("SER1".to_string());
        existing.sales_tax = Some(1200.0);

        let mut candidate = CandidateRecord::new("Cat", "305");
        candidate.serial_number = Some("SER2".to_string());
        candidate.sales_tax = Some(900.0);

        assert!(backfillable_fields(&existing, &candidate).is_empty());
    }

    #[test]
    fn test_blank_string_counts_as_empty() {
        let mut existing = RegistryRecord::new("a1", "Cat", "305");
        existing.serial_number = Some("   ".to_string());

        let mut candidate = CandidateRecord::new("Cat", "305");
        candidate.serial_number = Some("ABC123".to_string());

        let diffs = backfillable_fields(&existing, &candidate);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, AssetField::SerialNumber);
    }

    #[test]
    fn test_candidate_zero_amount_is_not_a_value() {
        let existing = RegistryRecord::new("a1", "Cat", "305");
        let mut candidate = CandidateRecord::new("Cat", "305");
        candidate.monthly_payment = Some(0.0);
        candidate.finance_term_months = Some(0);

        assert!(backfillable_fields(&existing, &candidate).is_empty());
    }

    #[test]
    fn test_purchase_condition_comes_from_hints() {
        let existing = RegistryRecord::new("a1", "Cat", "305");
        let mut candidate = CandidateRecord::new("Cat", "305");
        candidate.hints.purchase_condition = Some("used".to_string());

        let diffs = backfillable_fields(&existing, &candidate);
        assert_eq!(diffs[0].field, AssetField::PurchaseCondition);
    }

    #[test]
    fn test_policy_table_only_zero_rules_money_and_term() {
        for p in BACKFILL_POLICY {
            let zero_is_empty = p.empty_rule == EmptyRule::BlankOrZero;
            let numeric = p.field.kind() != crate::models::FieldKind::Text;
            assert_eq!(zero_is_empty, numeric, "{:?}", p.field);
        }
        assert!(policy_for(AssetField::Make).is_none());
    }
}
