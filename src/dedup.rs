//! Duplicate detection against already-stored clips.
//!
//! A candidate clip duplicates an existing one when both are on the same
//! video and their start times differ by at most the dedup window. The
//! window absorbs re-transcription drift between independent timestamp
//! sources for the same moment.
//!
//! The index must be built from the complete existing-clip set of the video.
//! A paginated subset produces false negatives.

use rustc_hash::FxHashMap;

use crate::models::ExistingClipRef;

/// Existing clip starts grouped by video id, sorted for range probes.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    starts_by_video: FxHashMap<String, Vec<u32>>,
    window_secs: u32,
}

impl Deduplicator {
    pub fn new(existing: &[ExistingClipRef], window_secs: u32) -> Self {
        let mut starts_by_video: FxHashMap<String, Vec<u32>> = FxHashMap::default();
        for clip in existing {
            starts_by_video
                .entry(clip.video_id.clone())
                .or_default()
                .push(clip.start_seconds);
        }
        for starts in starts_by_video.values_mut() {
            starts.sort_unstable();
            starts.dedup();
        }
        Self {
            starts_by_video,
            window_secs,
        }
    }

    pub fn window_secs(&self) -> u32 {
        self.window_secs
    }

    /// Number of distinct (video, start) pairs indexed
    pub fn len(&self) -> usize {
        self.starts_by_video.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.starts_by_video.is_empty()
    }

    /// The existing start closest to `start_seconds` within the window, if any.
    pub fn find_conflict(&self, video_id: &str, start_seconds: u32) -> Option<u32> {
        let starts = self.starts_by_video.get(video_id)?;
        let lo = start_seconds.saturating_sub(self.window_secs);
        let hi = start_seconds.saturating_add(self.window_secs);

        // First existing start >= lo; every start in [lo, hi] follows it
        let from = starts.partition_point(|s| *s < lo);
        starts[from..]
            .iter()
            .take_while(|s| **s <= hi)
            .min_by_key(|s| s.abs_diff(start_seconds))
            .copied()
    }

    pub fn is_duplicate(&self, video_id: &str, start_seconds: u32) -> bool {
        self.find_conflict(video_id, start_seconds).is_some()
    }
}
