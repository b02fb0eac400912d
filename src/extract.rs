//! Timestamp extraction from free-text comments.
//!
//! One candidate event per line: `<time> <artist> - <title>`. Lines that do
//! not fit are noise and are dropped without error.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::TimestampEntry;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Time token: "9:57", "14:08", "1:02:03", "01:02:03".
/// Group 1 is the whole token; groups 2-3 are m:ss, 2-4 are h:mm:ss.
/// Guarded by non-digits rather than `\b` so text may touch the token
/// ("9:57새소년").
pub static TIME_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\D)((\d{1,2}):(\d{2})(?::(\d{2}))?)(?:\D|$)").unwrap());

/// Dash-like separators between artist and title
const SEPARATORS: [char; 2] = ['-', '–'];

/// Leftovers of bracketed or piped time tokens: "[9:57]", "(9:57)", "9:57 |"
fn is_token_debris(c: char) -> bool {
    c.is_whitespace() || matches!(c, ']' | ')' | '|' | '.' | ':')
}

// ============================================================================
// TIME CONVERSION
// ============================================================================

/// Convert a time token match to seconds. Returns None when a two-digit
/// component is not a valid minute/second value.
fn token_to_seconds(caps: &regex::Captures) -> Option<u32> {
    let first: u32 = caps.get(2)?.as_str().parse().ok()?;
    let second: u32 = caps.get(3)?.as_str().parse().ok()?;
    match caps.get(4) {
        Some(third) => {
            let third: u32 = third.as_str().parse().ok()?;
            if second >= 60 || third >= 60 {
                return None;
            }
            Some(first * 3600 + second * 60 + third)
        }
        None => {
            if second >= 60 {
                return None;
            }
            Some(first * 60 + second)
        }
    }
}

/// Parse a bare time token ("9:57", "1:02:03") to seconds.
pub fn parse_time(token: &str) -> Option<u32> {
    let caps = TIME_TOKEN.captures(token.trim())?;
    if caps.get(1)?.as_str() != token.trim() {
        return None;
    }
    token_to_seconds(&caps)
}

/// Render seconds as "m:ss" or "h:mm:ss" for operator-facing output.
pub fn format_timestamp(seconds: u32) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Parse one line into an entry without an end time.
pub fn parse_line(line: &str) -> Option<TimestampEntry> {
    let caps = TIME_TOKEN.captures(line)?;
    let token = caps.get(1)?;
    let start_seconds = token_to_seconds(&caps)?;

    let rest = line[token.end()..].trim_start_matches(is_token_debris);
    let (artist, title) = rest.split_once(SEPARATORS)?;
    let artist = artist.trim();
    let title = title.trim();
    if title.is_empty() {
        return None;
    }

    Some(TimestampEntry {
        raw_time: token.as_str().to_string(),
        start_seconds,
        end_seconds: None,
        artist: artist.to_string(),
        title: title.to_string(),
    })
}

/// Extract ordered entries from a text blob and chain end times.
///
/// Input order is trusted as chronology: entry i ends where entry i+1
/// starts, the last entry has no end.
pub fn extract_entries(text: &str) -> Vec<TimestampEntry> {
    let mut entries: Vec<TimestampEntry> = text.lines().filter_map(parse_line).collect();

    let starts: Vec<u32> = entries.iter().map(|e| e.start_seconds).collect();
    for (entry, next_start) in entries.iter_mut().zip(starts.iter().skip(1)) {
        entry.end_seconds = Some(*next_start);
    }

    log::debug!(
        "extracted {} entries from {} lines",
        entries.len(),
        text.lines().count()
    );
    entries
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_line_scenario() {
        let entries = extract_entries("9:57 새소년 - 난춘\n14:08 이무진 - 청춘만화");
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].raw_time, "9:57");
        assert_eq!(entries[0].start_seconds, 597);
        assert_eq!(entries[0].end_seconds, Some(848));
        assert_eq!(entries[0].artist, "새소년");
        assert_eq!(entries[0].title, "난춘");

        assert_eq!(entries[1].start_seconds, 848);
        assert_eq!(entries[1].end_seconds, None);
        assert_eq!(entries[1].artist, "이무진");
        assert_eq!(entries[1].title, "청춘만화");
    }

    #[test]
    fn test_hour_tokens() {
        let entry = parse_line("1:02:03 Tones And I - Dance Monkey").unwrap();
        assert_eq!(entry.start_seconds, 3723);
        assert_eq!(entry.artist, "Tones And I");
        assert_eq!(entry.title, "Dance Monkey");

        let entry = parse_line("01:00:00 IU - 밤편지").unwrap();
        assert_eq!(entry.start_seconds, 3600);
    }

    #[test]
    fn test_manual_conversion_matches() {
        for (token, expected) in [("0:00", 0), ("0:59", 59), ("59:59", 3599), ("10:00:01", 36001)] {
            let line = format!("{} Artist - Title", token);
            assert_eq!(parse_line(&line).unwrap().start_seconds, expected, "{}", token);
            assert_eq!(parse_time(token), Some(expected));
        }
    }

    #[test]
    fn test_first_separator_splits() {
        let entry = parse_line("3:15 Artist – Title - Live Version").unwrap();
        assert_eq!(entry.artist, "Artist");
        assert_eq!(entry.title, "Title - Live Version");
    }

    #[test]
    fn test_noise_lines_dropped() {
        let text = "\
오늘 방송 최고였어요
9:57 새소년 - 난춘
노래 너무 좋다 12:30
13:00 just chatting no separator
14:08 이무진 - 청춘만화
";
        let entries = extract_entries(text);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].end_seconds, Some(848));
    }

    #[test]
    fn test_invalid_components_dropped() {
        assert!(parse_line("9:75 Artist - Title").is_none());
        assert!(parse_line("1:60:00 Artist - Title").is_none());
        assert!(parse_line("123:45 Artist - Title").is_none());
        assert!(parse_line("9:57 Artist -   ").is_none());
    }

    #[test]
    fn test_bracketed_tokens() {
        let entry = parse_line("[9:57] 새소년 - 난춘").unwrap();
        assert_eq!(entry.start_seconds, 597);
        assert_eq!(entry.artist, "새소년");

        let entry = parse_line("1. 14:08 | 이무진 - 청춘만화").unwrap();
        assert_eq!(entry.start_seconds, 848);
        assert_eq!(entry.artist, "이무진");
    }

    #[test]
    fn test_label_touching_token() {
        let entry = parse_line("9:57새소년 - 난춘").unwrap();
        assert_eq!(entry.start_seconds, 597);
        assert_eq!(entry.artist, "새소년");
        assert_eq!(entry.title, "난춘");

        let entry = parse_line("곡1:02:03아이유 - 밤편지").unwrap();
        assert_eq!(entry.start_seconds, 3723);
        assert_eq!(entry.artist, "아이유");
    }

    #[test]
    fn test_order_is_trusted() {
        let entries = extract_entries("10:00 A - x\n5:00 B - y\n20:00 C - z");
        assert_eq!(entries[0].end_seconds, Some(300));
        assert_eq!(entries[1].end_seconds, Some(1200));
        assert_eq!(entries[2].end_seconds, None);
    }

    #[test]
    fn test_crlf_input() {
        let entries = extract_entries("0:30 A - x\r\n1:30 B - y\r\n");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].title, "y");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(597), "9:57");
        assert_eq!(format_timestamp(5), "0:05");
        assert_eq!(format_timestamp(3723), "1:02:03");
    }
}
