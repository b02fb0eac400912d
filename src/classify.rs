//! Confidence classification of ranked candidates.

use crate::config::MatchConfig;
use crate::models::{Classification, MatchCandidate};

/// Decide how an entry proceeds from its ranked candidates.
///
/// The top-ranked candidate is auto-matched when its overall similarity
/// clears `auto_match_threshold`; any other non-empty list goes to review.
pub fn classify(mut candidates: Vec<MatchCandidate>, config: &MatchConfig) -> Classification {
    let top = candidates.first().map(|best| best.overall_similarity);
    match top {
        None => Classification::Unmatched,
        Some(overall) if overall >= config.auto_match_threshold => {
            Classification::AutoMatched(candidates.swap_remove(0))
        }
        Some(_) => Classification::NeedsReview(candidates),
    }
}
