//! Relevance derivation: aggregates per-criterion verdicts into one outcome.
//!
//! The rule is strict and not configurable:
//! 1. No criteria, or a criterion without a verdict → indeterminate (`None`)
//! 2. Any verdict false → not relevant
//! 3. Otherwise → relevant

use std::collections::BTreeMap;

/// Derive overall relevance as the logical AND of the verdicts for `criteria`.
pub fn derive_relevance<'a>(
    verdicts: &BTreeMap<String, bool>,
    criteria: impl IntoIterator<Item = &'a str>,
) -> Option<bool> {
    let mut relevant = true;
    let mut seen = 0;
    for name in criteria {
        relevant &= *verdicts.get(name)?;
        seen += 1;
    }
    (seen > 0).then_some(relevant)
}

/// Criteria without a verdict, in the order given.
pub fn missing_verdicts<'a>(
    verdicts: &BTreeMap<String, bool>,
    criteria: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    criteria
        .into_iter()
        .filter(|name| !verdicts.contains_key(*name))
        .map(str::to_string)
        .collect()
}

/// Keep only verdicts for known criteria.
///
/// Returns the retained map and the names that were dropped.
pub fn retain_known<'a, V>(
    values: BTreeMap<String, V>,
    known: impl IntoIterator<Item = &'a str>,
) -> (BTreeMap<String, V>, Vec<String>) {
    let known: Vec<&str> = known.into_iter().collect();
    let mut kept = BTreeMap::new();
    let mut dropped = Vec::new();

    for (name, value) in values {
        if known.contains(&name.as_str()) {
            kept.insert(name, value);
        } else {
            dropped.push(name);
        }
    }

    (kept, dropped)
}
