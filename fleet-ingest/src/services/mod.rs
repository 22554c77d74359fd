//! Reconciliation services
//!
//! Pure matching, grouping and merging logic. Nothing here returns an error;
//! unparseable or missing input degrades to "no match". The only store read
//! is `AttachmentMatcher::check`.

pub mod attachment_matcher;
pub mod duplicate_detector;
pub mod field_policy;
pub mod fragment_grouper;
pub mod fuzzy_matcher;
pub mod merge_resolver;
pub mod normalize;

pub use attachment_matcher::{find_duplicate_attachment, AttachmentMatcher, AttachmentProbe};
pub use duplicate_detector::DuplicateDetector;
pub use field_policy::{backfillable_fields, EmptyRule, FieldPolicy, BACKFILL_POLICY};
pub use fragment_grouper::{group_fragments, FragmentGroup, FragmentGrouper, FragmentReason};
pub use fuzzy_matcher::{attachment_name_matches, models_match};
pub use merge_resolver::{merge_candidates, merge_items};
