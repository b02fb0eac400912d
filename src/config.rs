//! Tunable matching thresholds.
//!
//! Every constant the matcher, classifier and deduplicator compare against
//! lives here so integrators can retune without recompiling. Values are
//! empirically chosen; the defaults reproduce historical behavior.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Auto-match threshold on overall similarity
pub const AUTO_MATCH_THRESHOLD: f64 = 0.95;

/// Maximum start-time offset for two clips to be the same event
pub const DEDUP_WINDOW_SECS: u32 = 30;

/// Candidates kept per entry after ranking
pub const MAX_CANDIDATES: usize = 5;

/// Pause between external search calls
pub const SEARCH_DELAY_MS: u64 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Overall similarity at or above which the top candidate is applied without review
    pub auto_match_threshold: f64,

    /// Candidate filter: title similarity floor that always applies
    pub title_floor: f64,
    /// Candidate filter: overall similarity that admits a candidate
    pub overall_floor: f64,
    /// Candidate filter: title similarity that admits a candidate on its own
    pub strong_title: f64,
    /// Candidate filter: artist similarity that admits a candidate with a loose title
    pub strong_artist: f64,
    /// Title similarity required alongside a strong artist match
    pub loose_title: f64,

    /// Floor applied when a search tag contains or is contained by the term
    pub tag_partial_floor: f64,

    /// Overall similarity weights (must sum to 1)
    pub title_weight: f64,
    pub artist_weight: f64,

    pub max_candidates: usize,
    /// Title gap beyond which title similarity alone decides ranking
    pub title_tie_gap: f64,

    pub dedup_window_secs: u32,
    pub search_delay_ms: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            auto_match_threshold: AUTO_MATCH_THRESHOLD,
            title_floor: 0.6,
            overall_floor: 0.7,
            strong_title: 0.8,
            strong_artist: 0.9,
            loose_title: 0.3,
            tag_partial_floor: 0.8,
            title_weight: 0.7,
            artist_weight: 0.3,
            max_candidates: MAX_CANDIDATES,
            title_tie_gap: 0.1,
            dedup_window_secs: DEDUP_WINDOW_SECS,
            search_delay_ms: SEARCH_DELAY_MS,
        }
    }
}

impl MatchConfig {
    /// Parse a TOML document; keys that are absent keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: MatchConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn search_delay(&self) -> Duration {
        Duration::from_millis(self.search_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit_fields = [
            ("auto_match_threshold", self.auto_match_threshold),
            ("title_floor", self.title_floor),
            ("overall_floor", self.overall_floor),
            ("strong_title", self.strong_title),
            ("strong_artist", self.strong_artist),
            ("loose_title", self.loose_title),
            ("tag_partial_floor", self.tag_partial_floor),
            ("title_weight", self.title_weight),
            ("artist_weight", self.artist_weight),
            ("title_tie_gap", self.title_tie_gap),
        ];
        for (field, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    message: "must be within [0, 1]",
                });
            }
        }

        let weight_sum = self.title_weight + self.artist_weight;
        if (weight_sum - 1.0).abs() > 1e-9 {
            return Err(ConfigError::OutOfRange {
                field: "title_weight + artist_weight",
                value: weight_sum,
                message: "weights must sum to 1",
            });
        }

        if self.max_candidates == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_candidates",
                value: 0.0,
                message: "at least one candidate must be kept",
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.auto_match_threshold, 0.95);
        assert_eq!(config.dedup_window_secs, 30);
        assert_eq!(config.max_candidates, 5);
        assert_eq!(config.search_delay(), Duration::from_millis(200));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MatchConfig::from_toml_str("auto_match_threshold = 0.9\ndedup_window_secs = 45\n")
            .unwrap();
        assert_eq!(config.auto_match_threshold, 0.9);
        assert_eq!(config.dedup_window_secs, 45);
        assert_eq!(config.title_floor, 0.6);
        assert_eq!(config.tag_partial_floor, 0.8);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = MatchConfig::from_toml_str("title_floor = 1.5").unwrap_err();
        assert!(err.to_string().contains("title_floor"));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let err = MatchConfig::from_toml_str("title_weight = 0.5").unwrap_err();
        assert!(err.to_string().contains("sum to 1"));

        let config =
            MatchConfig::from_toml_str("title_weight = 0.6\nartist_weight = 0.4").unwrap();
        assert_eq!(config.title_weight, 0.6);
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            MatchConfig::from_toml_str("title_floor = \"high\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
