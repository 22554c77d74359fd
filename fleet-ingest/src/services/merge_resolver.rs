//! Fragment merge
//!
//! Collapses a secondary candidate into a primary one, field by field. The
//! primary wins wherever it carries a real value; the secondary only fills
//! gaps. Applied left to right across a fragment group.

use std::collections::HashSet;

use crate::models::{
    AiHints, AssetField, CandidateRecord, FieldSource, FieldValue, ImportSessionItem,
};

/// Separator placed between notes of merged fragments
pub const NOTES_SEPARATOR: &str = " | ";

/// Financing type that means "no financing recorded"
const OWNED: &str = "owned";

fn pick_text(p: &Option<String>, s: &Option<String>) -> Option<String> {
    match p {
        Some(v) if !v.trim().is_empty() => p.clone(),
        _ => s.clone(),
    }
}

fn pick_string(p: &str, s: &str) -> String {
    if p.trim().is_empty() {
        s.to_string()
    } else {
        p.to_string()
    }
}

fn pick_number(p: Option<f64>, s: Option<f64>) -> Option<f64> {
    match p {
        Some(v) if v != 0.0 => p,
        _ => s.or(p),
    }
}

fn pick_integer(p: Option<i32>, s: Option<i32>) -> Option<i32> {
    match p {
        Some(v) if v != 0 => p,
        _ => s.or(p),
    }
}

/// Prefer a real financing arrangement over the "owned" default
fn pick_financing(p: &Option<String>, s: &Option<String>) -> Option<String> {
    let is_real = |v: &Option<String>| {
        v.as_deref()
            .is_some_and(|t| !t.trim().is_empty() && !t.trim().eq_ignore_ascii_case(OWNED))
    };
    if is_real(p) {
        p.clone()
    } else if is_real(s) {
        s.clone()
    } else {
        pick_text(p, s)
    }
}

fn merge_notes(p: &str, s: &str) -> String {
    let p = p.trim();
    let s = s.trim();
    if s.is_empty() || p == s || p.split(NOTES_SEPARATOR).any(|n| n == s) {
        p.to_string()
    } else if p.is_empty() {
        s.to_string()
    } else {
        format!("{p}{NOTES_SEPARATOR}{s}")
    }
}

/// Merge `secondary` into `primary`
///
/// Merging a record into itself yields the same record.
pub fn merge_candidates(primary: &CandidateRecord, secondary: &CandidateRecord) -> CandidateRecord {
    let mut source_files = primary.source_files.clone();
    for file in &secondary.source_files {
        if !source_files.iter().any(|f| f.file_name == file.file_name) {
            source_files.push(file.clone());
        }
    }

    let mut source_document_indices = primary.source_document_indices.clone();
    for idx in &secondary.source_document_indices {
        if !source_document_indices.contains(idx) {
            source_document_indices.push(*idx);
        }
    }

    let hints = AiHints {
        suggested_type: primary.hints.suggested_type.or(secondary.hints.suggested_type),
        suggested_parent_index: primary
            .hints
            .suggested_parent_index
            .or(secondary.hints.suggested_parent_index),
        suggested_category: pick_text(
            &primary.hints.suggested_category,
            &secondary.hints.suggested_category,
        ),
        purchase_condition: pick_text(
            &primary.hints.purchase_condition,
            &secondary.hints.purchase_condition,
        ),
    };

    CandidateRecord {
        make: pick_string(&primary.make, &secondary.make),
        model: pick_string(&primary.model, &secondary.model),
        year: pick_integer(primary.year, secondary.year),
        serial_number: pick_text(&primary.serial_number, &secondary.serial_number),
        purchase_date: pick_text(&primary.purchase_date, &secondary.purchase_date),
        purchase_price: pick_number(primary.purchase_price, secondary.purchase_price),
        sales_tax: pick_number(primary.sales_tax, secondary.sales_tax),
        freight_setup: pick_number(primary.freight_setup, secondary.freight_setup),
        financing_type: pick_financing(&primary.financing_type, &secondary.financing_type),
        deposit_amount: pick_number(primary.deposit_amount, secondary.deposit_amount),
        financed_amount: pick_number(primary.financed_amount, secondary.financed_amount),
        monthly_payment: pick_number(primary.monthly_payment, secondary.monthly_payment),
        finance_term_months: pick_integer(
            primary.finance_term_months,
            secondary.finance_term_months,
        ),
        buyout_amount: pick_number(primary.buyout_amount, secondary.buyout_amount),
        confidence: primary.confidence.max(secondary.confidence),
        notes: merge_notes(&primary.notes, &secondary.notes),
        source_files,
        source_document_indices,
        hints,
    }
}

fn is_filled(value: Option<FieldValue>) -> bool {
    match value {
        None => false,
        Some(FieldValue::Text(s)) => !s.trim().is_empty(),
        Some(FieldValue::Number(n)) => n != 0.0,
    }
}

/// Merge session item `secondary` into `primary`
///
/// Keeps the primary's id, mode and selection. Records the secondary (and
/// anything it had absorbed) in `merged_from`, and notes every field whose
/// value now comes from the secondary in `field_sources`.
pub fn merge_items(
    primary: &ImportSessionItem,
    secondary: &ImportSessionItem,
) -> ImportSessionItem {
    let mut merged = primary.clone();
    merged.record = merge_candidates(&primary.record, &secondary.record);

    if primary.id != secondary.id {
        let mut seen: HashSet<_> = merged.merged_from.iter().copied().collect();
        seen.insert(primary.id);
        for id in std::iter::once(secondary.id).chain(secondary.merged_from.iter().copied()) {
            if seen.insert(id) {
                merged.merged_from.push(id);
            }
        }

        let fallback_file = secondary.record.source_files.first().map(|f| f.file_name.clone());
        for field in AssetField::ALL {
            let value = merged.record.get(field);
            if !is_filled(value.clone())
                || value == primary.record.get(field)
                || value != secondary.record.get(field)
            {
                continue;
            }
            let source = secondary
                .field_sources
                .get(&field)
                .cloned()
                .unwrap_or_else(|| FieldSource {
                    item_id: secondary.id,
                    file_name: fallback_file.clone(),
                });
            merged.field_sources.insert(field, source);
        }
    }

    if merged.category.is_none() {
        merged.category = secondary.category.clone();
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, SourceFile};

    fn purchase_fragment() -> CandidateRecord {
        let mut c = CandidateRecord::new("Bobcat", "S650");
        c.purchase_price = Some(45000.0);
        c.financing_type = Some("owned".to_string());
        c.confidence = Confidence::Low;
        c.notes = "bill of sale".to_string();
        c.source_files = vec![SourceFile::named("invoice.pdf")];
        c.source_document_indices = vec![0];
        c
    }

    fn loan_fragment() -> CandidateRecord {
        let mut c = CandidateRecord::new("Bobcat", "");
        c.year = Some(2021);
        c.purchase_price = Some(0.0);
        c.monthly_payment = Some(900.0);
        c.financing_type = Some("loan".to_string());
        c.confidence = Confidence::High;
        c.notes = "loan agreement".to_string();
        c.source_files = vec![
            SourceFile::named("loan.pdf"),
            SourceFile::named("invoice.pdf"),
        ];
        c.source_document_indices = vec![1, 0];
        c
    }

    #[test]
    fn test_primary_wins_secondary_fills_gaps() {
        let merged = merge_candidates(&purchase_fragment(), &loan_fragment());

        assert_eq!(merged.model, "S650");
        assert_eq!(merged.year, Some(2021));
        assert_eq!(merged.purchase_price, Some(45000.0));
        assert_eq!(merged.monthly_payment, Some(900.0));
    }

    #[test]
    fn test_financing_prefers_non_owned() {
        let merged = merge_candidates(&purchase_fragment(), &loan_fragment());
        assert_eq!(merged.financing_type.as_deref(), Some("loan"));

        let mut p = purchase_fragment();
        p.financing_type = Some("lease".to_string());
        let merged = merge_candidates(&p, &loan_fragment());
        assert_eq!(merged.financing_type.as_deref(), Some("lease"));
    }

    #[test]
    fn test_collections_notes_and_confidence() {
        let merged = merge_candidates(&purchase_fragment(), &loan_fragment());

        let names: Vec<&str> = merged
            .source_files
            .iter()
            .map(|f| f.file_name.as_str())
            .collect();
        assert_eq!(names, vec!["invoice.pdf", "loan.pdf"]);
        assert_eq!(merged.source_document_indices, vec![0, 1]);
        assert_eq!(merged.notes, "bill of sale | loan agreement");
        assert_eq!(merged.confidence, Confidence::High);
    }

    #[test]
    fn test_empty_notes_are_skipped() {
        let mut s = loan_fragment();
        s.notes = "  ".to_string();
        let merged = merge_candidates(&purchase_fragment(), &s);
        assert_eq!(merged.notes, "bill of sale");
    }

    #[test]
    fn test_merging_into_itself_is_identity() {
        let a = merge_candidates(&purchase_fragment(), &loan_fragment());
        assert_eq!(merge_candidates(&a, &a), a);

        let item = ImportSessionItem::new(0, a);
        assert_eq!(merge_items(&item, &item), item);
    }

    #[test]
    fn test_merge_items_tracks_provenance() {
        let primary = ImportSessionItem::new(0, purchase_fragment());
        let secondary = ImportSessionItem::new(1, loan_fragment());

        let merged = merge_items(&primary, &secondary);

        assert_eq!(merged.id, primary.id);
        assert_eq!(merged.merged_from, vec![secondary.id]);
        let source = &merged.field_sources[&AssetField::MonthlyPayment];
        assert_eq!(source.item_id, secondary.id);
        assert_eq!(source.file_name.as_deref(), Some("loan.pdf"));
        assert_eq!(
            merged.field_sources[&AssetField::FinancingType].item_id,
            secondary.id
        );
        assert!(!merged.field_sources.contains_key(&AssetField::PurchasePrice));
    }

    #[test]
    fn test_merge_items_left_to_right_accumulates() {
        let a = ImportSessionItem::new(0, purchase_fragment());
        let b = ImportSessionItem::new(1, loan_fragment());
        let mut c_record = CandidateRecord::new("Bobcat", "S650");
        c_record.serial_number = Some("SN-9".to_string());
        let c = ImportSessionItem::new(2, c_record);

        let merged = merge_items(&merge_items(&a, &b), &c);
        assert_eq!(merged.merged_from, vec![b.id, c.id]);
        assert_eq!(merged.record.serial_number.as_deref(), Some("SN-9"));
    }
}
