//! Core data models for timestamp import.
//!
//! This module contains the struct definitions and enums that flow through
//! the extract → match → classify → dedup → package pipeline.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Timeline Models
// ============================================================================

/// One parsed timestamp + label unit from a comment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampEntry {
    pub raw_time: String, // Time token exactly as written, e.g. "1:02:03"
    pub start_seconds: u32,
    pub end_seconds: Option<u32>, // Start of the next entry; None for the last one
    pub artist: String,
    pub title: String,
}

impl TimestampEntry {
    /// Length of the clip in seconds, if it has a well-formed end.
    pub fn duration(&self) -> Option<u32> {
        self.end_seconds
            .and_then(|end| end.checked_sub(self.start_seconds))
            .filter(|d| *d > 0)
    }
}

// ============================================================================
// Catalog Models
// ============================================================================

/// Alternate spellings a song is known under.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SongAliases {
    pub title_aliases: Vec<String>,
    pub artist_aliases: Vec<String>,
}

/// Reference song from the caller's catalog snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSong {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub aliases: SongAliases,
    #[serde(default)]
    pub search_tags: Vec<String>,
}

// ============================================================================
// Matching Models
// ============================================================================

/// Which signal made a song a candidate. Shown to operators, never used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    ExactTag,
    ExactTitleArtist,
    ExactTitle,
    ArtistLooseTitle,
    TagPartial,
    Partial,
}

impl MatchReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchReason::ExactTag => "exact_tag",
            MatchReason::ExactTitleArtist => "exact_title_artist",
            MatchReason::ExactTitle => "exact_title",
            MatchReason::ArtistLooseTitle => "artist_loose_title",
            MatchReason::TagPartial => "tag_partial",
            MatchReason::Partial => "partial",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            MatchReason::ExactTag => "search tag matches exactly",
            MatchReason::ExactTitleArtist => "title and artist match exactly",
            MatchReason::ExactTitle => "title matches exactly",
            MatchReason::ArtistLooseTitle => "artist matches, title is close",
            MatchReason::TagPartial => "search tag partially matches",
            MatchReason::Partial => "partial title/artist similarity",
        }
    }
}

/// Catalog song proposed for a timeline entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub song_id: String,
    pub title: String,
    pub artist: String,
    pub overall_similarity: f64, // 0.0 to 1.0
    pub title_similarity: f64,
    pub artist_similarity: f64,
    pub reason: MatchReason,
}

/// Confidence bucket for one entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Classification {
    Unmatched,
    AutoMatched(MatchCandidate),
    NeedsReview(Vec<MatchCandidate>),
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Unmatched => "unmatched",
            Classification::AutoMatched(_) => "auto_matched",
            Classification::NeedsReview(_) => "needs_review",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub entry: TimestampEntry,
    pub classification: Classification,
}

/// Operator decision for an entry that was not auto-matched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Song(String),
    NoMatch,
}

// ============================================================================
// Clip Models
// ============================================================================

/// Minimal projection of an already-stored clip, used for dedup only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingClipRef {
    pub video_id: String,
    pub start_seconds: u32,
}

/// Insertable clip; the only artifact that crosses into storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRecord {
    pub song_id: String,
    pub video_url: String,
    pub sung_date: NaiveDate,
    pub description: String,
    pub start_seconds: u32,
    pub end_seconds: Option<u32>,
}

/// Outcome of a completed batch run.
///
/// `total == uploaded + duplicates + failed` holds for every report built by
/// the packager.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: u32,
    pub uploaded: u32,
    pub duplicates: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

impl BatchReport {
    pub fn is_consistent(&self) -> bool {
        self.total == self.uploaded + self.duplicates + self.failed
    }
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-run matching statistics, printed or written as JSON.
#[derive(Default, Debug, Clone, Serialize)]
pub struct MatchingStats {
    pub lines_read: usize,
    pub entries_parsed: usize,
    pub catalog_songs: usize,

    pub auto_matched: usize,
    pub needs_review: usize,
    pub unmatched: usize,

    // Reason of the top candidate, keyed by snake_case reason name
    pub top_reasons: FxHashMap<String, usize>,

    pub elapsed_seconds: f64,
}

impl MatchingStats {
    /// Record the classification of one entry.
    pub fn record(&mut self, classification: &Classification) {
        let top = match classification {
            Classification::Unmatched => {
                self.unmatched += 1;
                None
            }
            Classification::AutoMatched(c) => {
                self.auto_matched += 1;
                Some(c.reason)
            }
            Classification::NeedsReview(cands) => {
                self.needs_review += 1;
                cands.first().map(|c| c.reason)
            }
        };
        if let Some(reason) = top {
            *self
                .top_reasons
                .entry(reason.as_str().to_string())
                .or_default() += 1;
        }
    }

    /// Auto-match rate as a percentage of parsed entries
    pub fn auto_match_rate(&self) -> f64 {
        if self.entries_parsed == 0 {
            0.0
        } else {
            100.0 * self.auto_matched as f64 / self.entries_parsed as f64
        }
    }

    /// Log stats to stderr in JSON format
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }

    /// Write stats to a JSON file
    pub fn write_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
