//! Batch fragment grouping
//!
//! One physical machine often arrives as several candidates because its
//! paperwork was split across documents (bill of sale, loan agreement,
//! delivery ticket). This module finds candidates within one batch that
//! likely describe the same machine.
//!
//! Grouping is greedy and pairwise: each earlier candidate claims every later
//! unclaimed candidate it matches, and claimed candidates are never
//! reconsidered. Chains (A~B, B~C, A≁C) are therefore not closed transitively.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use super::fuzzy_matcher::models_match;
use super::normalize::{days_between, normalize_key, normalize_serial};
use crate::config::MatchPolicy;
use crate::models::CandidateRecord;

/// Why a candidate was judged a fragment of another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentReason {
    SameSerial,
    ComplementaryDocuments,
    SimilarDates,
    SharedSourceDocument,
}

impl fmt::Display for FragmentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SameSerial => "same serial/VIN",
            Self::ComplementaryDocuments => "complementary documents",
            Self::SimilarDates => "same make/model with similar dates",
            Self::SharedSourceDocument => "likely fragments of same item",
        };
        f.write_str(s)
    }
}

/// Candidates of one batch believed to be one physical asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FragmentGroup {
    pub primary_index: usize,
    pub duplicate_indices: Vec<usize>,
    /// Distinct pair reasons, first-seen order
    pub reasons: Vec<FragmentReason>,
    /// `reasons` joined for display
    pub reason: String,
}

impl FragmentGroup {
    fn new(primary_index: usize, fragments: Vec<(usize, FragmentReason)>) -> Self {
        let mut reasons: Vec<FragmentReason> = Vec::new();
        for (_, reason) in &fragments {
            if !reasons.contains(reason) {
                reasons.push(*reason);
            }
        }
        let reason = reasons
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            primary_index,
            duplicate_indices: fragments.into_iter().map(|(j, _)| j).collect(),
            reasons,
            reason,
        }
    }

    /// Every batch index in the group, primary first
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(self.primary_index).chain(self.duplicate_indices.iter().copied())
    }
}

/// Pairwise signals between two candidates
struct PairSignals {
    model_match: bool,
    serial_match: bool,
    same_make_shared_document: bool,
    year_compatible: bool,
    date_compatible: bool,
    complementary: bool,
}

/// Fragment grouper
pub struct FragmentGrouper {
    policy: MatchPolicy,
}

impl FragmentGrouper {
    pub fn new() -> Self {
        Self {
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// Group fragments of `candidates`
    ///
    /// Each index appears in at most one group, never twice in the same one.
    pub fn group(&self, candidates: &[CandidateRecord]) -> Vec<FragmentGroup> {
        let mut consumed = vec![false; candidates.len()];
        let mut groups = Vec::new();

        for i in 0..candidates.len() {
            if consumed[i] {
                continue;
            }

            let mut fragments = Vec::new();
            for j in (i + 1)..candidates.len() {
                if consumed[j] {
                    continue;
                }
                if let Some(reason) = self.classify(&candidates[i], &candidates[j]) {
                    consumed[j] = true;
                    fragments.push((j, reason));
                }
            }

            if !fragments.is_empty() {
                consumed[i] = true;
                let group = FragmentGroup::new(i, fragments);
                debug!(
                    primary = group.primary_index,
                    fragments = ?group.duplicate_indices,
                    reason = %group.reason,
                    "Fragment group found"
                );
                groups.push(group);
            }
        }

        groups
    }

    fn classify(&self, a: &CandidateRecord, b: &CandidateRecord) -> Option<FragmentReason> {
        let s = self.signals(a, b);

        if s.serial_match {
            Some(FragmentReason::SameSerial)
        } else if s.model_match && s.year_compatible && s.date_compatible && s.complementary {
            Some(FragmentReason::ComplementaryDocuments)
        } else if s.model_match && s.year_compatible && s.date_compatible {
            Some(FragmentReason::SimilarDates)
        } else if s.same_make_shared_document && s.year_compatible {
            Some(FragmentReason::SharedSourceDocument)
        } else {
            None
        }
    }

    fn signals(&self, a: &CandidateRecord, b: &CandidateRecord) -> PairSignals {
        let serial_a = normalize_serial(a.serial_number.as_deref());
        let serial_b = normalize_serial(b.serial_number.as_deref());

        let make_a = normalize_key(&a.make);
        let shared_document = {
            let docs_a: HashSet<usize> = a.source_document_indices.iter().copied().collect();
            b.source_document_indices.iter().any(|d| docs_a.contains(d))
        };

        let year_compatible = match (a.year, b.year) {
            (Some(ya), Some(yb)) => ya == yb,
            _ => true,
        };

        let date_compatible = match (a.purchase_date.as_deref(), b.purchase_date.as_deref()) {
            (Some(da), Some(db)) => match days_between(Some(da), Some(db)) {
                Some(days) => days <= self.policy.fragment_date_window_days,
                // an unparseable date is treated like a missing one
                None => true,
            },
            _ => true,
        };

        let complementary = (a.has_purchase_data()
            && !a.has_financing_data()
            && b.has_financing_data()
            && !b.has_purchase_data())
            || (b.has_purchase_data()
                && !b.has_financing_data()
                && a.has_financing_data()
                && !a.has_purchase_data());

        PairSignals {
            model_match: models_match(&a.make, &a.model, &b.make, &b.model),
            serial_match: !serial_a.is_empty() && serial_a == serial_b,
            same_make_shared_document: !make_a.is_empty()
                && make_a == normalize_key(&b.make)
                && shared_document,
            year_compatible,
            date_compatible,
            complementary,
        }
    }
}

impl Default for FragmentGrouper {
    fn default() -> Self {
        Self::new()
    }
}

/// Group fragments with the built-in thresholds
pub fn group_fragments(candidates: &[CandidateRecord]) -> Vec<FragmentGroup> {
    FragmentGrouper::new().group(candidates)
}
