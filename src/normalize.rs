//! Canonical form of titles, artists, aliases and tags for comparison.
//!
//! CRITICAL: the matcher compares catalog strings normalized once per run
//! against entry strings normalized per entry. Both must go through
//! `normalize` or scores silently drop.

use unicode_normalization::UnicodeNormalization;

/// Punctuation removed outright: hyphen, underscore, period, middle dot, comma.
const STRIPPED_PUNCTUATION: [char; 5] = ['-', '_', '.', '·', ','];

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Fold a full-width ASCII variant (U+FF01..U+FF5E) to its half-width form
/// and the ideographic space to a plain space.
pub fn fold_full_width(c: char) -> char {
    match c {
        '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
        '\u{3000}' => ' ',
        _ => c,
    }
}

/// Characters kept after normalization: letters and digits of any script,
/// which covers Hangul syllables, Kana and CJK ideographs.
fn is_kept(c: char) -> bool {
    c.is_alphanumeric() && !STRIPPED_PUNCTUATION.contains(&c)
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize a string for similarity comparison.
///
/// Lower-cases, removes whitespace and punctuation, keeps local-script
/// letters, and folds full-width alphanumerics. NFC composition makes
/// decomposed Hangul jamo compare equal to precomposed syllables.
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(s: &str) -> String {
    let folded: String = s.chars().map(fold_full_width).collect();
    // Compose again once separators are gone: jamo split by a space or
    // hyphen only become adjacent after filtering
    folded
        .to_lowercase()
        .nfc()
        .filter(|c| is_kept(*c))
        .nfc()
        .collect()
}

/// Normalize each string, dropping the ones that normalize to nothing.
pub fn normalize_all<'a, I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    items
        .into_iter()
        .map(|s| normalize(s))
        .filter(|s| !s.is_empty())
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_whitespace_punctuation_insensitive() {
        assert_eq!(normalize("Tones And I"), normalize("tones   and -i"));
        assert_eq!(normalize("Tones And I"), "tonesandi");
        assert_eq!(normalize("A.B_C,D·E-F"), "abcdef");
    }

    #[test]
    fn test_idempotent() {
        for s in [
            "Tones And I",
            "새소년 - 난춘",
            "ＡＢＣ　１２３",
            "Beyoncé (Live!)",
            "  ",
            "Ｒｏｃｋ＆Ｒｏｌｌ",
            "İstanbul",
            "\u{1102} \u{1161}",
            "\u{1102}-\u{1161}\u{11AB}",
        ] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_full_width_fold() {
        assert_eq!(normalize("ＡＢＣ１２３"), "abc123");
        assert_eq!(normalize("ＢＴＳ　－　Ｄｙｎａｍｉｔｅ"), "btsdynamite");
    }

    #[test]
    fn test_local_script_kept() {
        assert_eq!(normalize("새소년"), "새소년");
        assert_eq!(normalize("난춘 (亂春)"), "난춘亂春");
        assert_eq!(normalize("アイドル!"), "アイドル");
    }

    #[test]
    fn test_symbols_stripped() {
        assert_eq!(normalize("Rock & Roll!!"), "rockroll");
        assert_eq!(normalize("♥ Love ♥"), "love");
        assert_eq!(normalize("'Don't'"), "dont");
    }

    #[test]
    fn test_decomposed_hangul_composes() {
        let decomposed: String = "난춘".nfd().collect();
        assert_ne!(decomposed, "난춘");
        assert_eq!(normalize(&decomposed), "난춘");
    }

    #[test]
    fn test_split_jamo_compose_after_strip() {
        assert_eq!(normalize("\u{1102} \u{1161}"), "나");
        assert_eq!(normalize("\u{1102}-\u{1161}\u{11AB}"), "난");
    }

    #[test]
    fn test_normalize_all_skips_empty() {
        let items = vec!["Hello".to_string(), "---".to_string(), "세계".to_string()];
        assert_eq!(normalize_all(&items), vec!["hello", "세계"]);
    }
}
