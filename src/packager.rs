//! Batch packaging and run report aggregation.
//!
//! Per entry the packager walks
//! `Classified -> (manual resolution) -> Matched -> Duplicate | Valid -> Uploaded | Failed`.
//! Entries left unmatched never enter the batch.
//!
//! Candidate lists of entries awaiting review live in a keyed cache owned by
//! the packager. A resolution (song or no match) evicts the entry; a
//! retraction puts its candidates back.
//!
//! ## Key Invariant
//!
//! Every matched entry ends in exactly one of duplicate, uploaded or failed,
//! so `report.total == report.uploaded + report.duplicates + report.failed`.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::dedup::Deduplicator;
use crate::error::{ResolveError, ValidationError};
use crate::models::{
    BatchReport, Classification, ClipRecord, MatchCandidate, MatchResult, Resolution,
    TimestampEntry,
};
use crate::video::video_key;

// ============================================================================
// Entry State
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum EntryState {
    /// Auto-matched by the classifier
    Auto(String),
    /// Waiting for an operator decision; candidates are in the review cache
    Pending,
    /// Operator picked a song
    Resolved(String),
    /// No match, either classified so or decided by the operator
    Unmatched,
}

impl EntryState {
    fn song_id(&self) -> Option<&str> {
        match self {
            EntryState::Auto(id) | EntryState::Resolved(id) => Some(id),
            EntryState::Pending | EntryState::Unmatched => None,
        }
    }
}

/// Entry awaiting review, as presented to an operator pick-list.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewItem<'a> {
    pub index: usize,
    pub entry: &'a TimestampEntry,
    pub candidates: &'a [MatchCandidate],
}

/// Where the clips of this run go.
#[derive(Debug, Clone)]
pub struct BatchTarget {
    pub video_url: String,
    pub sung_date: NaiveDate,
    /// Applied to every record; None or blank falls back to an attribution line
    pub description: Option<String>,
}

/// Attribution written when the caller supplies no description.
pub fn default_description(entry: &TimestampEntry) -> String {
    format!(
        "{} - {} (auto-imported from timestamp {})",
        entry.artist, entry.title, entry.raw_time
    )
}

// ============================================================================
// Packager
// ============================================================================

pub struct Packager {
    results: Vec<MatchResult>,
    states: Vec<EntryState>,
    review_cache: FxHashMap<usize, Vec<MatchCandidate>>,
}

impl Packager {
    pub fn new(results: Vec<MatchResult>) -> Self {
        let mut review_cache = FxHashMap::default();
        let states = results
            .iter()
            .enumerate()
            .map(|(index, result)| match &result.classification {
                Classification::AutoMatched(c) => EntryState::Auto(c.song_id.clone()),
                Classification::NeedsReview(cands) => {
                    review_cache.insert(index, cands.clone());
                    EntryState::Pending
                }
                Classification::Unmatched => EntryState::Unmatched,
            })
            .collect();

        Self {
            results,
            states,
            review_cache,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Cached candidates of an entry still awaiting review.
    pub fn candidates(&self, index: usize) -> Option<&[MatchCandidate]> {
        self.review_cache.get(&index).map(Vec::as_slice)
    }

    /// Entries awaiting review, in entry order.
    pub fn pending_reviews(&self) -> Vec<ReviewItem<'_>> {
        let mut indices: Vec<usize> = self.review_cache.keys().copied().collect();
        indices.sort_unstable();
        indices
            .into_iter()
            .map(|index| ReviewItem {
                index,
                entry: &self.results[index].entry,
                candidates: &self.review_cache[&index],
            })
            .collect()
    }

    /// Song chosen for an entry, whether auto-matched or resolved.
    pub fn matched_song(&self, index: usize) -> Option<&str> {
        self.states.get(index).and_then(EntryState::song_id)
    }

    /// Apply an operator decision. Evicts the entry from the review cache.
    pub fn resolve(&mut self, index: usize, resolution: Resolution) -> Result<(), ResolveError> {
        let state = self
            .states
            .get_mut(index)
            .ok_or(ResolveError::UnknownEntry(index))?;
        if matches!(state, EntryState::Auto(_)) {
            return Err(ResolveError::AlreadyAutoMatched(index));
        }

        *state = match resolution {
            Resolution::Song(song_id) => EntryState::Resolved(song_id),
            Resolution::NoMatch => EntryState::Unmatched,
        };
        self.review_cache.remove(&index);
        Ok(())
    }

    /// Undo a match (auto or manual) and put the entry back into review with
    /// its original candidates. Entries that never had candidates become
    /// plain unmatched.
    pub fn retract(&mut self, index: usize) -> Result<(), ResolveError> {
        let result = self
            .results
            .get(index)
            .ok_or(ResolveError::UnknownEntry(index))?;

        let candidates = match &result.classification {
            Classification::AutoMatched(c) => vec![c.clone()],
            Classification::NeedsReview(cands) => cands.clone(),
            Classification::Unmatched => vec![],
        };

        if candidates.is_empty() {
            self.states[index] = EntryState::Unmatched;
            self.review_cache.remove(&index);
        } else {
            self.states[index] = EntryState::Pending;
            self.review_cache.insert(index, candidates);
        }
        Ok(())
    }

    /// Offer every pending entry to `decide`; a `Some` answer resolves it.
    /// Returns the number of entries resolved.
    pub fn resolve_with<F>(&mut self, mut decide: F) -> usize
    where
        F: FnMut(usize, &TimestampEntry, &[MatchCandidate]) -> Option<Resolution>,
    {
        let mut indices: Vec<usize> = self.review_cache.keys().copied().collect();
        indices.sort_unstable();

        let mut resolved = 0;
        for index in indices {
            let decision = match self.review_cache.get(&index) {
                Some(cands) => decide(index, &self.results[index].entry, cands),
                None => None,
            };
            if let Some(resolution) = decision {
                if self.resolve(index, resolution).is_ok() {
                    resolved += 1;
                }
            }
        }
        resolved
    }

    /// Validate, deduplicate and build insertable records for every matched entry.
    pub fn prepare(&self, target: &BatchTarget, dedup: &Deduplicator) -> PreparedBatch {
        let video_id = video_key(&target.video_url);
        let description = target
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());

        let mut batch = PreparedBatch::default();

        for (index, state) in self.states.iter().enumerate() {
            let Some(song_id) = state.song_id() else {
                continue;
            };
            let entry = &self.results[index].entry;
            batch.total += 1;

            if let Err(err) = validate(index, entry, song_id, video_id.as_deref()) {
                log::warn!("{}", err);
                batch.invalid.push(err);
                continue;
            }
            let video_id = video_id.as_deref().unwrap_or_default();

            if let Some(existing_start) = dedup.find_conflict(video_id, entry.start_seconds) {
                log::debug!(
                    "entry {} ({}) duplicates existing clip at {}s",
                    index,
                    entry.raw_time,
                    existing_start
                );
                batch.duplicates.push(DuplicateClip {
                    index,
                    start_seconds: entry.start_seconds,
                    existing_start_seconds: existing_start,
                });
                continue;
            }

            batch.records.push(ClipRecord {
                song_id: song_id.trim().to_string(),
                video_url: target.video_url.clone(),
                sung_date: target.sung_date,
                description: description
                    .map(str::to_string)
                    .unwrap_or_else(|| default_description(entry)),
                start_seconds: entry.start_seconds,
                end_seconds: entry.end_seconds,
            });
            batch.record_sources.push((index, entry.raw_time.clone()));
        }

        log::info!(
            "prepared batch: {} matched, {} insertable, {} duplicates, {} invalid",
            batch.total,
            batch.records.len(),
            batch.duplicates.len(),
            batch.invalid.len()
        );
        batch
    }
}

/// Per-entry checks run before dedup.
fn validate(
    index: usize,
    entry: &TimestampEntry,
    song_id: &str,
    video_id: Option<&str>,
) -> Result<(), ValidationError> {
    if song_id.trim().is_empty() {
        return Err(ValidationError::MissingSongId {
            index,
            raw_time: entry.raw_time.clone(),
        });
    }
    if let Some(end) = entry.end_seconds {
        if end <= entry.start_seconds {
            return Err(ValidationError::InvalidRange {
                index,
                raw_time: entry.raw_time.clone(),
                start: entry.start_seconds,
                end,
            });
        }
    }
    if video_id.is_none() {
        return Err(ValidationError::UnknownVideo {
            index,
            raw_time: entry.raw_time.clone(),
        });
    }
    Ok(())
}

// ============================================================================
// Prepared Batch
// ============================================================================

/// Matched entry excluded because the clip already exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateClip {
    pub index: usize,
    pub start_seconds: u32,
    pub existing_start_seconds: u32,
}

/// Result of `Packager::prepare`: the insert payload plus everything that
/// was kept out of it.
#[derive(Debug, Clone, Default)]
pub struct PreparedBatch {
    pub total: u32,
    pub records: Vec<ClipRecord>,
    /// (entry index, raw time) for each record, same order as `records`
    pub record_sources: Vec<(usize, String)>,
    pub duplicates: Vec<DuplicateClip>,
    pub invalid: Vec<ValidationError>,
}

impl PreparedBatch {
    /// Fold the storage call's per-record outcomes into the run report.
    ///
    /// `outcomes[i]` belongs to `records[i]`. Records the store reported
    /// nothing for are counted as failed.
    pub fn finalize(self, outcomes: Vec<Result<(), String>>) -> BatchReport {
        let mut report = BatchReport {
            total: self.total,
            duplicates: self.duplicates.len() as u32,
            failed: self.invalid.len() as u32,
            errors: self.invalid.iter().map(ToString::to_string).collect(),
            ..Default::default()
        };

        let mut outcomes = outcomes.into_iter();
        for (index, raw_time) in &self.record_sources {
            match outcomes.next() {
                Some(Ok(())) => report.uploaded += 1,
                Some(Err(message)) => {
                    report.failed += 1;
                    report
                        .errors
                        .push(format!("entry {} ({}): upload failed: {}", index, raw_time, message));
                }
                None => {
                    report.failed += 1;
                    report
                        .errors
                        .push(format!("entry {} ({}): no upload outcome reported", index, raw_time));
                }
            }
        }

        debug_assert!(report.is_consistent());
        report
    }

    /// Report for a run whose storage call never happened (e.g. dry run or
    /// nothing to insert): every record counts as failed with `reason`.
    pub fn abandon(self, reason: &str) -> BatchReport {
        let count = self.records.len();
        self.finalize(vec![Err(reason.to_string()); count])
    }
}

// ============================================================================
// TESTS
// ============================================================================
