//! Registry duplicate detection
//!
//! Classifies one candidate against the existing fleet registry as a new
//! asset, an exact duplicate (same serial) or a potential duplicate (same
//! make/model plus one weaker signal).

use tracing::debug;

use super::field_policy::backfillable_fields;
use super::fuzzy_matcher::models_match;
use super::normalize::{days_between, normalize_serial};
use crate::config::MatchPolicy;
use crate::models::{
    CandidateRecord, DuplicateStatus, DuplicateVerdict, MatchReason, RegistryRecord,
};

/// Registry duplicate detector
pub struct DuplicateDetector {
    policy: MatchPolicy,
}

impl DuplicateDetector {
    /// Create detector with the built-in thresholds
    pub fn new() -> Self {
        Self {
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// Classify `candidate` against `registry`
    ///
    /// **Algorithm:**
    /// Walk registry records in store order. For each record try, in order:
    /// 1. normalized serials equal and non-empty → exact / serial
    /// 2. make+model match and years equal → potential / year
    /// 3. make+model match and prices within tolerance → potential / price
    /// 4. make+model match and dates within window → potential / date
    ///
    /// The first record that hits any rule ends the walk. No hit → none.
    pub fn detect(
        &self,
        candidate: &CandidateRecord,
        registry: &[RegistryRecord],
    ) -> DuplicateVerdict {
        for record in registry {
            if let Some((status, reason)) = self.classify(candidate, record) {
                let verdict = DuplicateVerdict {
                    status,
                    reason: Some(reason),
                    matched_record_id: Some(record.id.clone()),
                    matched_display_name: Some(record.display_name()),
                    matched_date: record.purchase_date.clone(),
                    backfillable_fields: backfillable_fields(record, candidate),
                };
                debug!(
                    candidate = %candidate.display_name(),
                    matched_id = %record.id,
                    status = ?status,
                    reason = %reason,
                    backfill = verdict.backfillable_fields.len(),
                    "Registry duplicate found"
                );
                return verdict;
            }
        }

        debug!(candidate = %candidate.display_name(), "No registry duplicate");
        DuplicateVerdict::none()
    }

    fn classify(
        &self,
        candidate: &CandidateRecord,
        record: &RegistryRecord,
    ) -> Option<(DuplicateStatus, MatchReason)> {
        let serial_a = normalize_serial(candidate.serial_number.as_deref());
        let serial_b = normalize_serial(record.serial_number.as_deref());
        if !serial_a.is_empty() && serial_a == serial_b {
            return Some((DuplicateStatus::Exact, MatchReason::Serial));
        }

        if !models_match(&candidate.make, &candidate.model, &record.make, &record.model) {
            return None;
        }

        if candidate.year.is_some() && candidate.year == record.year {
            return Some((DuplicateStatus::Potential, MatchReason::Year));
        }

        if self.prices_close(candidate.purchase_price, record.purchase_price) {
            return Some((DuplicateStatus::Potential, MatchReason::Price));
        }

        let days = days_between(
            candidate.purchase_date.as_deref(),
            record.purchase_date.as_deref(),
        );
        if days.is_some_and(|d| d <= self.policy.registry_date_window_days) {
            return Some((DuplicateStatus::Potential, MatchReason::Date));
        }

        None
    }

    /// Both present and within `price_tolerance` of the existing price
    fn prices_close(&self, candidate: Option<f64>, existing: Option<f64>) -> bool {
        match (candidate, existing) {
            (Some(c), Some(e)) if c > 0.0 && e > 0.0 => {
                (c - e).abs() / e <= self.policy.price_tolerance
            }
            _ => false,
        }
    }
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}
