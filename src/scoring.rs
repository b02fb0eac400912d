//! Scoring functions for catalog matching.
//!
//! This module contains the scoring pieces the matcher combines:
//! - Normalized edit-distance similarity
//! - Alias max-over and search tag boosts per component
//! - Match reason derivation
//! - Candidate filter and ranking

use crate::config::MatchConfig;
use crate::models::{MatchCandidate, MatchReason};

// ============================================================================
// String Similarity
// ============================================================================

/// Similarity between two normalized strings (0.0 to 1.0).
/// `(maxLen - levenshtein) / maxLen` over chars; exact match short-circuits.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let dist = strsim::levenshtein(a, b);
    (max_len - dist.min(max_len)) as f64 / max_len as f64
}

/// Best similarity of `term` against any of `variants` (canonical + aliases).
pub fn best_similarity(term: &str, variants: &[String]) -> f64 {
    let mut best: f64 = 0.0;
    for variant in variants {
        let sim = similarity(term, variant);
        if sim >= 1.0 {
            return 1.0;
        }
        if sim > best {
            best = sim;
        }
    }
    best
}

// ============================================================================
// Search Tag Boost
// ============================================================================

/// How a song's search tags relate to a normalized term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagHit {
    None,
    Partial,
    Exact,
}

/// Compare normalized tags against a normalized term.
/// Empty terms never hit; every string contains the empty string.
pub fn tag_hit(term: &str, tags: &[String]) -> TagHit {
    if term.is_empty() {
        return TagHit::None;
    }
    let mut hit = TagHit::None;
    for tag in tags.iter().filter(|t| !t.is_empty()) {
        if tag == term {
            return TagHit::Exact;
        }
        if tag.contains(term) || term.contains(tag.as_str()) {
            hit = TagHit::Partial;
        }
    }
    hit
}

/// Apply a tag hit to a component similarity.
pub fn apply_tag_boost(sim: f64, hit: TagHit, config: &MatchConfig) -> f64 {
    match hit {
        TagHit::Exact => 1.0,
        TagHit::Partial => sim.max(config.tag_partial_floor),
        TagHit::None => sim,
    }
}

// ============================================================================
// Component Scores
// ============================================================================

/// Title/artist similarities for one (entry, song) pair, after tag boosts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentScores {
    pub title: f64,
    pub artist: f64,
    pub overall: f64,
    pub title_tag: TagHit,
    pub artist_tag: TagHit,
}

impl ComponentScores {
    pub fn new(
        title: f64,
        artist: f64,
        title_tag: TagHit,
        artist_tag: TagHit,
        config: &MatchConfig,
    ) -> Self {
        let title = apply_tag_boost(title, title_tag, config);
        let artist = apply_tag_boost(artist, artist_tag, config);
        Self {
            title,
            artist,
            overall: config.title_weight * title + config.artist_weight * artist,
            title_tag,
            artist_tag,
        }
    }

    /// Asymmetric candidate filter: titles are the primary discriminator, so a
    /// strong artist match alone never promotes an unrelated title.
    pub fn is_candidate(&self, config: &MatchConfig) -> bool {
        self.title >= config.title_floor
            && (self.overall >= config.overall_floor
                || self.title >= config.strong_title
                || (self.artist >= config.strong_artist && self.title >= config.loose_title))
    }

    /// Operator-facing reason, strongest signal first.
    pub fn reason(&self, config: &MatchConfig) -> MatchReason {
        let tag_exact = self.title_tag == TagHit::Exact || self.artist_tag == TagHit::Exact;
        let tag_partial =
            self.title_tag == TagHit::Partial || self.artist_tag == TagHit::Partial;

        if tag_exact {
            MatchReason::ExactTag
        } else if self.title >= 1.0 && self.artist >= 1.0 {
            MatchReason::ExactTitleArtist
        } else if self.title >= 1.0 {
            MatchReason::ExactTitle
        } else if self.artist >= config.strong_artist && self.title >= config.loose_title {
            MatchReason::ArtistLooseTitle
        } else if tag_partial {
            MatchReason::TagPartial
        } else {
            MatchReason::Partial
        }
    }
}

// ============================================================================
// Ranking
// ============================================================================

/// Whether `a` ranks ahead of `b`: a title gap beyond `tie_gap` wins
/// outright, otherwise overall similarity decides.
pub fn ranks_ahead(a: &MatchCandidate, b: &MatchCandidate, tie_gap: f64) -> bool {
    if (a.title_similarity - b.title_similarity).abs() > tie_gap {
        a.title_similarity > b.title_similarity
    } else {
        a.overall_similarity > b.overall_similarity
    }
}

/// Rank candidates and keep the top `config.max_candidates`.
///
/// The gap rule is not transitive, so a plain `sort_by` cannot be used. A
/// total pre-sort (title, then overall) followed by a stable insertion pass
/// under the gap rule gives a deterministic order.
pub fn rank_candidates(
    mut candidates: Vec<MatchCandidate>,
    config: &MatchConfig,
) -> Vec<MatchCandidate> {
    candidates.sort_by(|a, b| {
        b.title_similarity
            .total_cmp(&a.title_similarity)
            .then_with(|| b.overall_similarity.total_cmp(&a.overall_similarity))
            .then_with(|| a.song_id.cmp(&b.song_id))
    });

    for i in 1..candidates.len() {
        let mut j = i;
        while j > 0 && ranks_ahead(&candidates[j], &candidates[j - 1], config.title_tie_gap) {
            candidates.swap(j, j - 1);
            j -= 1;
        }
    }

    candidates.truncate(config.max_candidates);
    candidates
}

// ============================================================================
// TESTS
// ============================================================================
