//! Confidence scoring and match selection.
//!
//! Everything here is a pure function over plain candidate records so the
//! selector can be exercised without a store or a network.

use crate::domain::model::{LookupResult, ResultKind};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Added to an airport's raw similarity when surfacing its metro area.
pub const METRO_BONUS: f64 = 0.05;

/// Candidates within this distance of the winner are reported as alternatives.
pub const TIE_EPSILON: f64 = 0.05;

/// Smallest confidence ever produced by the scorer.
pub const MIN_CONFIDENCE: f64 = 0.01;

/// Above the knee, scores are compressed towards 1.0 instead of clipped.
const KNEE: f64 = 0.9;

/// Map a raw similarity score monotonically into (0, 1].
///
/// Identity up to `KNEE`, then an exponential approach to 1.0 with slope 1
/// at the knee, so boosted inputs (`s + METRO_BONUS`) stay ordered and
/// below 1.0.
pub fn calculate_confidence(similarity: f64) -> f64 {
    if !similarity.is_finite() {
        return if similarity == f64::INFINITY { 1.0 } else { MIN_CONFIDENCE };
    }
    if similarity <= KNEE {
        return similarity.max(MIN_CONFIDENCE);
    }

    let headroom = 1.0 - KNEE;
    let excess = similarity - KNEE;
    (KNEE + headroom * (1.0 - (-excess / headroom).exp())).min(1.0)
}

/// Similarity of a normalized query against one stored name, in [0, 1].
pub fn similarity(query: &str, candidate: &str) -> f64 {
    let candidate = candidate.trim().to_lowercase();
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if query == candidate {
        return 1.0;
    }

    strsim::jaro_winkler(query, &candidate).max(word_containment(query, &candidate))
}

/// Score for the query appearing as whole words inside a longer name,
/// e.g. "heathrow" in "london heathrow airport".
fn word_containment(query: &str, candidate: &str) -> f64 {
    let at_boundary = |idx: usize| {
        idx == 0
            || !candidate[..idx]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric)
    };

    let found = candidate
        .match_indices(query)
        .any(|(idx, m)| at_boundary(idx) && {
            let end = idx + m.len();
            end == candidate.len()
                || !candidate[end..]
                    .chars()
                    .next()
                    .is_some_and(char::is_alphanumeric)
        });

    if !found {
        return 0.0;
    }

    let coverage = query.chars().count() as f64 / candidate.chars().count() as f64;
    0.8 + 0.15 * coverage
}

fn compare_candidates(a: &LookupResult, b: &LookupResult) -> Ordering {
    b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(Ordering::Equal)
        .then_with(|| match (a.kind, b.kind) {
            (ResultKind::Metro, ResultKind::Airport) => Ordering::Less,
            (ResultKind::Airport, ResultKind::Metro) => Ordering::Greater,
            _ => Ordering::Equal,
        })
        .then_with(|| b.passenger_count.unwrap_or(0).cmp(&a.passenger_count.unwrap_or(0)))
        .then_with(|| a.name.chars().count().cmp(&b.name.chars().count()))
        .then_with(|| a.iata_code.cmp(&b.iata_code))
}

/// Pick the winning candidate and attach its near-tie alternatives.
pub fn select_best_match(
    mut candidates: Vec<LookupResult>,
    original_query: &str,
    max_results: usize,
) -> Option<LookupResult> {
    if candidates.is_empty() {
        return None;
    }

    candidates.sort_by(compare_candidates);

    // same code may be reached through several names; keep its best score
    let mut seen = HashSet::new();
    candidates.retain(|c| seen.insert((c.kind, c.iata_code.clone())));

    let mut ranked = candidates.into_iter();
    let mut best = ranked.next()?;
    let top = best.confidence;

    best.alternatives = ranked
        .filter(|c| top - c.confidence <= TIE_EPSILON + 1e-9)
        .take(max_results)
        .map(|mut c| {
            c.alternatives.clear();
            c
        })
        .collect();

    tracing::debug!(
        "Selected {} ({:.3}) for '{}' with {} alternative(s)",
        best.iata_code,
        best.confidence,
        original_query,
        best.alternatives.len()
    );

    Some(best)
}
