//! Fuzzy matching of timeline entries against a song catalog.
//!
//! The catalog is normalized once into a `PreparedCatalog`; each entry is
//! then scored against every prepared song. Entries are independent, so
//! `match_all` shards them across rayon workers and collects in entry order.

use rayon::prelude::*;

use crate::classify::classify;
use crate::config::MatchConfig;
use crate::models::{CatalogSong, MatchCandidate, MatchResult, TimestampEntry};
use crate::normalize::{normalize, normalize_all};
use crate::scoring::{best_similarity, rank_candidates, tag_hit, ComponentScores};

// ============================================================================
// Prepared Catalog
// ============================================================================

/// Catalog song with every comparable string pre-normalized.
#[derive(Debug, Clone)]
pub struct PreparedSong<'a> {
    pub song: &'a CatalogSong,
    pub title_variants: Vec<String>,  // canonical title first, then aliases
    pub artist_variants: Vec<String>, // canonical artist first, then aliases
    pub tags: Vec<String>,
}

impl<'a> PreparedSong<'a> {
    pub fn new(song: &'a CatalogSong) -> Self {
        let mut title_variants = vec![normalize(&song.title)];
        title_variants.extend(normalize_all(&song.aliases.title_aliases));
        let mut artist_variants = vec![normalize(&song.artist)];
        artist_variants.extend(normalize_all(&song.aliases.artist_aliases));

        Self {
            song,
            title_variants,
            artist_variants,
            tags: normalize_all(&song.search_tags),
        }
    }
}

/// Read-only, normalized view of a caller-owned catalog snapshot.
#[derive(Debug, Clone)]
pub struct PreparedCatalog<'a> {
    songs: Vec<PreparedSong<'a>>,
}

impl<'a> PreparedCatalog<'a> {
    pub fn new(catalog: &'a [CatalogSong]) -> Self {
        Self {
            songs: catalog.iter().map(PreparedSong::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

// ============================================================================
// Matcher
// ============================================================================

pub struct Matcher<'a> {
    catalog: PreparedCatalog<'a>,
    config: &'a MatchConfig,
}

impl<'a> Matcher<'a> {
    pub fn new(catalog: &'a [CatalogSong], config: &'a MatchConfig) -> Self {
        Self {
            catalog: PreparedCatalog::new(catalog),
            config,
        }
    }

    pub fn catalog_len(&self) -> usize {
        self.catalog.len()
    }

    /// Score one catalog song against normalized entry terms.
    fn score_song(&self, title_norm: &str, artist_norm: &str, song: &PreparedSong) -> ComponentScores {
        ComponentScores::new(
            best_similarity(title_norm, &song.title_variants),
            best_similarity(artist_norm, &song.artist_variants),
            tag_hit(title_norm, &song.tags),
            tag_hit(artist_norm, &song.tags),
            self.config,
        )
    }

    /// Ranked candidates (at most `max_candidates`) for one entry.
    pub fn find_candidates(&self, entry: &TimestampEntry) -> Vec<MatchCandidate> {
        let title_norm = normalize(&entry.title);
        let artist_norm = normalize(&entry.artist);

        let candidates: Vec<MatchCandidate> = self
            .catalog
            .songs
            .iter()
            .filter_map(|prepared| {
                let scores = self.score_song(&title_norm, &artist_norm, prepared);
                if !scores.is_candidate(self.config) {
                    return None;
                }
                Some(MatchCandidate {
                    song_id: prepared.song.id.clone(),
                    title: prepared.song.title.clone(),
                    artist: prepared.song.artist.clone(),
                    overall_similarity: scores.overall,
                    title_similarity: scores.title,
                    artist_similarity: scores.artist,
                    reason: scores.reason(self.config),
                })
            })
            .collect();

        rank_candidates(candidates, self.config)
    }

    /// Match and classify one entry.
    pub fn match_entry(&self, entry: TimestampEntry) -> MatchResult {
        let candidates = self.find_candidates(&entry);
        let classification = classify(candidates, self.config);
        log::debug!(
            "{} {} - {}: {}",
            entry.raw_time,
            entry.artist,
            entry.title,
            classification.label()
        );
        MatchResult {
            entry,
            classification,
        }
    }

    /// Match all entries in parallel; output order equals input order.
    pub fn match_all(&self, entries: Vec<TimestampEntry>) -> Vec<MatchResult> {
        entries
            .into_par_iter()
            .map(|entry| self.match_entry(entry))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_entries;
    use crate::models::{Classification, MatchReason, SongAliases};

    fn song(id: &str, title: &str, artist: &str) -> CatalogSong {
        CatalogSong {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.to_string(),
            aliases: SongAliases::default(),
            search_tags: vec![],
        }
    }

    fn entry(artist: &str, title: &str) -> TimestampEntry {
        TimestampEntry {
            raw_time: "0:00".into(),
            start_seconds: 0,
            end_seconds: None,
            artist: artist.into(),
            title: title.into(),
        }
    }

    fn catalog() -> Vec<CatalogSong> {
        let mut dance = song("s3", "Dance Monkey", "Tones And I");
        dance.aliases.title_aliases = vec!["댄스 몽키".into()];
        dance.aliases.artist_aliases = vec!["톤즈 앤 아이".into()];
        vec![
            song("s1", "난춘", "새소년"),
            song("s2", "청춘만화", "이무진"),
            dance,
            song("s4", "신호등", "이무진"),
        ]
    }

    #[test]
    fn test_scenario_auto_match() {
        let config = MatchConfig::default();
        let catalog = catalog();
        let matcher = Matcher::new(&catalog, &config);

        let entries = extract_entries("9:57 새소년 - 난춘\n14:08 이무진 - 청춘만화");
        let results = matcher.match_all(entries);
        assert_eq!(results.len(), 2);

        match &results[0].classification {
            Classification::AutoMatched(c) => {
                assert_eq!(c.song_id, "s1");
                assert_eq!(c.overall_similarity, 1.0);
                assert_eq!(c.reason, MatchReason::ExactTitleArtist);
            }
            other => panic!("expected auto match, got {:?}", other),
        }
        assert_eq!(results[0].entry.start_seconds, 597);
        match &results[1].classification {
            Classification::AutoMatched(c) => assert_eq!(c.song_id, "s2"),
            other => panic!("expected auto match, got {:?}", other),
        }
    }

    #[test]
    fn test_normalized_identity_is_exact() {
        let config = MatchConfig::default();
        let catalog = catalog();
        let matcher = Matcher::new(&catalog, &config);

        let result = matcher.match_entry(entry("tones   and -i", "DANCE monkey"));
        match result.classification {
            Classification::AutoMatched(c) => {
                assert_eq!(c.song_id, "s3");
                assert_eq!(c.overall_similarity, 1.0);
            }
            other => panic!("expected auto match, got {:?}", other),
        }
    }

    #[test]
    fn test_alias_match() {
        let config = MatchConfig::default();
        let catalog = catalog();
        let matcher = Matcher::new(&catalog, &config);

        let candidates = matcher.find_candidates(&entry("톤즈앤아이", "댄스몽키"));
        assert_eq!(candidates[0].song_id, "s3");
        assert_eq!(candidates[0].title_similarity, 1.0);
        assert_eq!(candidates[0].artist_similarity, 1.0);
    }

    #[test]
    fn test_typo_needs_review() {
        let config = MatchConfig::default();
        let catalog = catalog();
        let matcher = Matcher::new(&catalog, &config);

        // One syllable off in the title: 0.75 title, 1.0 artist -> 0.825 overall
        let result = matcher.match_entry(entry("이무진", "청춘만하"));
        match result.classification {
            Classification::NeedsReview(cands) => {
                assert_eq!(cands[0].song_id, "s2");
                assert!((cands[0].overall_similarity - 0.825).abs() < 1e-9);
                assert_eq!(cands[0].reason, MatchReason::ArtistLooseTitle);
            }
            other => panic!("expected review, got {:?}", other),
        }
    }

    #[test]
    fn test_artist_alone_does_not_promote() {
        let config = MatchConfig::default();
        let catalog = catalog();
        let matcher = Matcher::new(&catalog, &config);

        // Right artist, unrelated title
        let result = matcher.match_entry(entry("이무진", "에피소드"));
        assert_eq!(result.classification, Classification::Unmatched);
    }

    #[test]
    fn test_exact_tag_promotes() {
        let config = MatchConfig::default();
        let mut catalog = catalog();
        catalog[0].search_tags = vec!["Nan Chun".into()];
        let matcher = Matcher::new(&catalog, &config);

        let candidates = matcher.find_candidates(&entry("Se So Neon", "nanchun"));
        assert_eq!(candidates[0].song_id, "s1");
        assert_eq!(candidates[0].title_similarity, 1.0);
        assert_eq!(candidates[0].reason, MatchReason::ExactTag);
    }

    #[test]
    fn test_partial_tag_floor() {
        let config = MatchConfig::default();
        let mut catalog = catalog();
        catalog[1].search_tags = vec!["청춘만화 (2022)".into()];
        let matcher = Matcher::new(&catalog, &config);

        let candidates = matcher.find_candidates(&entry("someone", "청춘"));
        assert_eq!(candidates[0].song_id, "s2");
        assert_eq!(candidates[0].title_similarity, 0.8);
        assert_eq!(candidates[0].reason, MatchReason::TagPartial);
    }

    #[test]
    fn test_empty_catalog_unmatched() {
        let config = MatchConfig::default();
        let catalog: Vec<CatalogSong> = vec![];
        let matcher = Matcher::new(&catalog, &config);
        assert_eq!(matcher.catalog_len(), 0);

        let result = matcher.match_entry(entry("새소년", "난춘"));
        assert_eq!(result.classification, Classification::Unmatched);
    }

    #[test]
    fn test_candidates_capped() {
        let config = MatchConfig::default();
        let catalog: Vec<CatalogSong> = (0..10)
            .map(|i| song(&format!("v{}", i), &format!("난춘 {}", i), "새소년"))
            .collect();
        let matcher = Matcher::new(&catalog, &config);

        let candidates = matcher.find_candidates(&entry("새소년", "난춘 1"));
        assert_eq!(candidates.len(), 5);
        assert_eq!(candidates[0].song_id, "v1");
    }
}
