//! Video URL helpers.
//!
//! Clips are stored against a full video URL but deduplicated by video id,
//! so every URL form a streaming platform hands out must reduce to the same id.

use once_cell::sync::Lazy;
use regex::Regex;

/// Bare 11-character video id
pub static BARE_VIDEO_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap());

/// Id carried in a URL: `watch?v=`, `youtu.be/`, `/live/`, `/shorts/`, `/embed/`
pub static URL_VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/live/|/shorts/|/embed/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)")
        .unwrap()
});

/// Extract the video id from a URL or a bare id.
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    if BARE_VIDEO_ID.is_match(url) {
        return Some(url.to_string());
    }
    URL_VIDEO_ID
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Key clips of a target are stored and deduplicated under.
///
/// Recognized URL forms reduce to their video id; any other non-blank target
/// is an opaque identifier and is used as-is after trimming.
pub fn video_key(target: &str) -> Option<String> {
    extract_video_id(target).or_else(|| {
        let target = target.trim();
        (!target.is_empty()).then(|| target.to_string())
    })
}

/// Canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Watch URL that starts playback at `seconds`.
pub fn timestamped_url(video_id: &str, seconds: u32) -> String {
    format!("{}&t={}s", watch_url(video_id), seconds)
}
