//! Match policy for provider search results.
//!
//! Only containment and case-insensitive equality are considered. There is
//! no similarity scoring.

use crate::provider::CatalogItem;

/// What to do with a set of search candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDecision {
    /// Candidate at this index has exactly the searched name (ignoring case).
    Exact(usize),
    /// Take the first candidate.
    Best,
    /// No candidate is a confident match.
    Ambiguous,
    /// The search returned nothing.
    NoCandidates,
}

/// Decide which candidate, if any, matches `search_term`.
///
/// 1. Any candidate whose name equals the term ignoring case.
/// 2. Otherwise the first candidate, if it is the only one or its name
///    contains the term ignoring case.
/// 3. Otherwise ambiguous.
pub fn select_match(search_term: &str, candidates: &[CatalogItem]) -> MatchDecision {
    if candidates.is_empty() {
        return MatchDecision::NoCandidates;
    }

    let term = search_term.to_lowercase();

    if let Some(idx) = candidates
        .iter()
        .position(|c| c.name.to_lowercase() == term)
    {
        return MatchDecision::Exact(idx);
    }

    if candidates.len() == 1 || candidates[0].name.to_lowercase().contains(&term) {
        return MatchDecision::Best;
    }

    MatchDecision::Ambiguous
}
