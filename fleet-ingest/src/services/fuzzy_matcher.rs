//! Fuzzy make/model and attachment-name matching

use std::collections::BTreeSet;

use super::normalize::{normalize_key, normalize_serial, tokenize_name};
use crate::models::Attachment;

/// Shortest normalized make/model considered at all
const MIN_KEY_LEN: usize = 2;

/// Shortest string allowed to match by containment
const MIN_CONTAINED_LEN: usize = 3;

/// Token overlap that always counts as the same attachment
const MIN_SHARED_TOKENS: usize = 2;

/// Share of the smaller token set that must overlap otherwise
const MIN_OVERLAP_RATIO: f64 = 0.66;

/// Exact, or one contains the other and the contained side is long enough
fn keys_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    (a.len() >= MIN_CONTAINED_LEN && b.contains(a))
        || (b.len() >= MIN_CONTAINED_LEN && a.contains(b))
}

/// Whether two make/model pairs name the same kind of machine
///
/// Both makes and both models must match by equality or containment
/// ("305" vs "305 CR"). Any key shorter than two characters never matches;
/// rejecting on every side keeps the test symmetric.
pub fn models_match(make_a: &str, model_a: &str, make_b: &str, model_b: &str) -> bool {
    let make_a = normalize_key(make_a);
    let model_a = normalize_key(model_a);
    let make_b = normalize_key(make_b);
    let model_b = normalize_key(model_b);

    if [&make_a, &model_a, &make_b, &model_b]
        .iter()
        .any(|k| k.len() < MIN_KEY_LEN)
    {
        return false;
    }

    keys_match(&make_a, &make_b) && keys_match(&model_a, &model_b)
}

/// Whether a candidate attachment name/serial refers to an existing attachment
///
/// **Algorithm:**
/// 1. Both serials present and equal after normalization → match
/// 2. Otherwise compare name token sets: ≥2 shared tokens, or shared tokens
///    ≥ 66% of the smaller set
/// 3. An empty token set on either side never matches
pub fn attachment_name_matches(name: &str, serial: Option<&str>, existing: &Attachment) -> bool {
    let serial_a = normalize_serial(serial);
    let serial_b = normalize_serial(existing.serial_number.as_deref());
    if !serial_a.is_empty() && !serial_b.is_empty() && serial_a == serial_b {
        return true;
    }

    let tokens_a: BTreeSet<String> = tokenize_name(name).into_iter().collect();
    let tokens_b: BTreeSet<String> = tokenize_name(&existing.name).into_iter().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return false;
    }

    let shared = tokens_a.intersection(&tokens_b).count();
    let smaller = tokens_a.len().min(tokens_b.len());

    shared >= MIN_SHARED_TOKENS || (shared as f64 / smaller as f64) >= MIN_OVERLAP_RATIO
}
