use thiserror::Error;

/// Reason a matched entry was kept out of the batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("entry {index} ({raw_time}): resolved match has no song id")]
    MissingSongId { index: usize, raw_time: String },
    #[error("entry {index} ({raw_time}): end {end}s is not after start {start}s")]
    InvalidRange {
        index: usize,
        raw_time: String,
        start: u32,
        end: u32,
    },
    #[error("entry {index} ({raw_time}): target video is blank")]
    UnknownVideo { index: usize, raw_time: String },
}

/// Failure of one external search lookup.
///
/// `QuotaExhausted` is kept apart from other service failures because it
/// stops every further lookup in the run. "No result" is not an error at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("search quota exhausted")]
    QuotaExhausted,
    #[error("search service error: {0}")]
    Service(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error while reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{field} = {value} is out of range: {message}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        message: &'static str,
    },
}

impl ConfigError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Manual resolution addressed an entry the packager does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no entry at index {0}")]
    UnknownEntry(usize),
    #[error("entry {0} was auto-matched; retract it before resolving manually")]
    AlreadyAutoMatched(usize),
}
