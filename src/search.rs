//! Quota-aware external search for auto-filling missing song links.
//!
//! Lookups run one at a time with a fixed pause between calls. A
//! `QuotaExhausted` answer ends the run early: results gathered so far are
//! kept and the remaining requests are reported back untouched so the caller
//! can resume in the next quota period. There is no automatic retry.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::SearchError;

/// One song that needs a link, with the query to search for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRequest {
    pub song_id: String,
    pub query: String,
}

impl LinkRequest {
    /// Query built from artist and title, the way operators type it.
    pub fn for_song(song_id: &str, artist: &str, title: &str) -> Self {
        Self {
            song_id: song_id.to_string(),
            query: format!("{} {}", artist.trim(), title.trim()),
        }
    }
}

/// A search hit: the link and the title the service returned for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
}

/// External search service. `Ok(None)` means "no result", which is not an error.
pub trait SearchProvider {
    fn search(&mut self, query: &str) -> Result<Option<SearchHit>, SearchError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    /// Stopped on the quota signal; `remaining` requests were never issued
    QuotaExhausted { remaining: usize },
    /// Stopped by the caller between two lookups
    Cancelled { remaining: usize },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkFillRun {
    pub found: Vec<(String, SearchHit)>,
    pub not_found: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Requests not attempted, in their original order
    pub unprocessed: Vec<LinkRequest>,
    pub status: Option<RunStatus>,
}

impl LinkFillRun {
    pub fn completed(&self) -> usize {
        self.found.len() + self.not_found.len() + self.failed.len()
    }

    pub fn is_partial(&self) -> bool {
        !matches!(self.status, Some(RunStatus::Completed))
    }
}

/// Issue lookups sequentially, pausing `delay` between calls.
///
/// `cancel` is checked before each lookup, never during one.
pub fn fill_missing_links<P: SearchProvider>(
    requests: Vec<LinkRequest>,
    provider: &mut P,
    delay: Duration,
    cancel: &AtomicBool,
) -> LinkFillRun {
    let mut run = LinkFillRun::default();
    let total = requests.len();
    let mut pending = requests.into_iter();
    let mut first = true;

    while let Some(request) = pending.next() {
        if cancel.load(Ordering::Relaxed) {
            run.unprocessed.push(request);
            run.unprocessed.extend(pending);
            log::info!("link search cancelled after {}/{} lookups", run.completed(), total);
            run.status = Some(RunStatus::Cancelled {
                remaining: run.unprocessed.len(),
            });
            return run;
        }

        if !first && !delay.is_zero() {
            std::thread::sleep(delay);
        }
        first = false;

        match provider.search(&request.query) {
            Ok(Some(hit)) => run.found.push((request.song_id, hit)),
            Ok(None) => run.not_found.push(request.song_id),
            Err(SearchError::QuotaExhausted) => {
                run.unprocessed.push(request);
                run.unprocessed.extend(pending);
                log::warn!(
                    "search quota exhausted after {}/{} lookups; {} left for the next quota period",
                    run.completed(),
                    total,
                    run.unprocessed.len()
                );
                run.status = Some(RunStatus::QuotaExhausted {
                    remaining: run.unprocessed.len(),
                });
                return run;
            }
            Err(err @ SearchError::Service(_)) => {
                log::warn!("search for {:?} failed: {}", request.query, err);
                run.failed.push((request.song_id, err.to_string()));
            }
        }
    }

    run.status = Some(RunStatus::Completed);
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays scripted answers and records every query it receives.
    struct ScriptedProvider {
        answers: VecDeque<Result<Option<SearchHit>, SearchError>>,
        queries: Vec<String>,
    }

    impl ScriptedProvider {
        fn new(answers: Vec<Result<Option<SearchHit>, SearchError>>) -> Self {
            Self {
                answers: answers.into(),
                queries: vec![],
            }
        }
    }

    impl SearchProvider for ScriptedProvider {
        fn search(&mut self, query: &str) -> Result<Option<SearchHit>, SearchError> {
            self.queries.push(query.to_string());
            self.answers.pop_front().unwrap_or(Ok(None))
        }
    }

    fn hit(n: usize) -> SearchHit {
        SearchHit {
            url: format!("https://youtu.be/video{:06}", n),
            title: format!("hit {}", n),
        }
    }

    fn requests(n: usize) -> Vec<LinkRequest> {
        (0..n)
            .map(|i| LinkRequest::for_song(&format!("s{}", i), "artist", &format!("title {}", i)))
            .collect()
    }

    #[test]
    fn test_quota_exhausted_keeps_completed() {
        let mut provider = ScriptedProvider::new(vec![
            Ok(Some(hit(0))),
            Ok(Some(hit(1))),
            Ok(Some(hit(2))),
            Err(SearchError::QuotaExhausted),
        ]);
        let cancel = AtomicBool::new(false);
        let run = fill_missing_links(requests(10), &mut provider, Duration::ZERO, &cancel);

        assert_eq!(run.found.len(), 3);
        assert_eq!(run.completed(), 3);
        assert_eq!(run.status, Some(RunStatus::QuotaExhausted { remaining: 7 }));
        assert!(run.is_partial());
        assert_eq!(run.unprocessed[0].song_id, "s3");
        // No lookup after the quota signal
        assert_eq!(provider.queries.len(), 4);
    }

    #[test]
    fn test_no_result_is_not_an_error() {
        let mut provider = ScriptedProvider::new(vec![Ok(None), Ok(Some(hit(1)))]);
        let cancel = AtomicBool::new(false);
        let run = fill_missing_links(requests(2), &mut provider, Duration::ZERO, &cancel);

        assert_eq!(run.not_found, vec!["s0".to_string()]);
        assert_eq!(run.found[0].0, "s1");
        assert_eq!(run.status, Some(RunStatus::Completed));
        assert!(!run.is_partial());
    }

    #[test]
    fn test_service_error_continues() {
        let mut provider = ScriptedProvider::new(vec![
            Err(SearchError::Service("timeout".into())),
            Ok(Some(hit(1))),
        ]);
        let cancel = AtomicBool::new(false);
        let run = fill_missing_links(requests(2), &mut provider, Duration::ZERO, &cancel);

        assert_eq!(run.failed.len(), 1);
        assert!(run.failed[0].1.contains("timeout"));
        assert_eq!(run.found.len(), 1);
        assert_eq!(run.status, Some(RunStatus::Completed));
    }

    #[test]
    fn test_cancel_before_start() {
        let mut provider = ScriptedProvider::new(vec![]);
        let cancel = AtomicBool::new(true);
        let run = fill_missing_links(requests(3), &mut provider, Duration::ZERO, &cancel);

        assert!(provider.queries.is_empty());
        assert_eq!(run.status, Some(RunStatus::Cancelled { remaining: 3 }));
    }

    #[test]
    fn test_query_format() {
        let req = LinkRequest::for_song("s1", " 새소년 ", "난춘 ");
        assert_eq!(req.query, "새소년 난춘");
    }
}
