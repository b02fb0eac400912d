//! End-to-end wiring: text in, match results and batch reports out.
//!
//! The storage call is the only blocking step. It sits behind `ClipStore`
//! and can run on a dedicated uploader thread that receives batches over a
//! channel and answers each with its `BatchReport`.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Instant;

use crate::config::MatchConfig;
use crate::extract::extract_entries;
use crate::matcher::Matcher;
use crate::models::{BatchReport, CatalogSong, ClipRecord, MatchResult, MatchingStats};
use crate::packager::PreparedBatch;

// ============================================================================
// Storage Boundary
// ============================================================================

/// Bulk insert of clip records.
///
/// Returns one outcome per record, in record order. A rejected record must
/// not abort the others.
pub trait ClipStore {
    fn insert_clips(&mut self, records: &[ClipRecord]) -> Vec<Result<(), String>>;
}

/// Insert a prepared batch and build its report.
pub fn upload<S: ClipStore + ?Sized>(store: &mut S, batch: PreparedBatch) -> BatchReport {
    let outcomes = if batch.records.is_empty() {
        vec![]
    } else {
        store.insert_clips(&batch.records)
    };
    let report = batch.finalize(outcomes);
    log::info!(
        "batch done: {} total, {} uploaded, {} duplicates, {} failed",
        report.total,
        report.uploaded,
        report.duplicates,
        report.failed
    );
    report
}

// ============================================================================
// Uploader Worker
// ============================================================================

/// A batch to insert plus where to send its report.
pub struct UploadRequest {
    pub batch: PreparedBatch,
    pub reply: Sender<BatchReport>,
}

impl UploadRequest {
    /// Request paired with the receiver its report arrives on.
    pub fn new(batch: PreparedBatch) -> (Self, Receiver<BatchReport>) {
        let (reply, rx) = bounded(1);
        (Self { batch, reply }, rx)
    }
}

/// Handle to a running uploader thread.
pub struct Uploader<S> {
    requests: Sender<UploadRequest>,
    handle: JoinHandle<S>,
}

impl<S: ClipStore + Send + 'static> Uploader<S> {
    /// Move `store` onto its own thread and serve upload requests until every
    /// sender is dropped.
    pub fn spawn(mut store: S) -> Self {
        let (requests, rx): (Sender<UploadRequest>, Receiver<UploadRequest>) = unbounded();
        let handle = std::thread::spawn(move || {
            for request in rx.iter() {
                let report = upload(&mut store, request.batch);
                // The caller may have stopped waiting; the insert already happened
                let _ = request.reply.send(report);
            }
            store
        });
        Self { requests, handle }
    }

    /// Channel that triggers uploads; cloneable for callers elsewhere.
    pub fn sender(&self) -> Sender<UploadRequest> {
        self.requests.clone()
    }

    /// Submit a batch and wait for its report. None if the worker is gone.
    pub fn submit(&self, batch: PreparedBatch) -> Option<BatchReport> {
        let (request, reply) = UploadRequest::new(batch);
        self.requests.send(request).ok()?;
        reply.recv().ok()
    }

    /// Stop accepting requests and hand the store back.
    pub fn shutdown(self) -> std::thread::Result<S> {
        drop(self.requests);
        self.handle.join()
    }
}

// ============================================================================
// Matching Run
// ============================================================================

/// Extract, match and classify a comment blob against a catalog snapshot.
pub fn run_matching(
    text: &str,
    catalog: &[CatalogSong],
    config: &MatchConfig,
) -> (Vec<MatchResult>, MatchingStats) {
    let start = Instant::now();
    let entries = extract_entries(text);

    let mut stats = MatchingStats {
        lines_read: text.lines().count(),
        entries_parsed: entries.len(),
        catalog_songs: catalog.len(),
        ..Default::default()
    };

    let matcher = Matcher::new(catalog, config);
    let results = matcher.match_all(entries);
    for result in &results {
        stats.record(&result.classification);
    }
    stats.elapsed_seconds = start.elapsed().as_secs_f64();

    log::info!(
        "matched {} entries: {} auto, {} review, {} unmatched",
        stats.entries_parsed,
        stats.auto_matched,
        stats.needs_review,
        stats.unmatched
    );
    (results, stats)
}

// ============================================================================
// TESTS
// ============================================================================
