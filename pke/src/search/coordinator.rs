use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

use super::request::SearchRequest;
use super::scanner::LineScanner;
use super::walker::{FileWalker, WalkOutcome};
use crate::cancel::{CancellationToken, RunGuard};
use crate::errors::{SearchError, SearchResult};
use crate::metrics::SearchMetrics;
use crate::results::{SearchHit, SearchOutcome, SearchSummary};

const WORKER_NAME: &str = "pke-search";

/// One accepted search: a validated request bound to its cancellation token.
///
/// Creating a session performs every check that can fail the search as a whole, so once
/// a session exists, [`SearchSession::run`] always ends by firing the completion callback.
#[derive(Debug)]
pub struct SearchSession {
    key: String,
    walker: FileWalker,
    scanner: LineScanner,
    token: CancellationToken,
    metrics: SearchMetrics,
    guard: RunGuard,
}

impl SearchSession {
    /// Validates `request` and claims `token`.
    ///
    /// Fails with [`SearchError::InvalidRoot`] if a path is missing and with
    /// [`SearchError::SessionActive`] if another session holds the token.
    pub fn new(request: &SearchRequest, token: &CancellationToken) -> SearchResult<Self> {
        let metrics = SearchMetrics::new();
        let walker = FileWalker::from_request(request)?.with_metrics(metrics.clone());
        let guard = token.acquire()?;

        Ok(Self {
            key: request.key().to_string(),
            walker,
            scanner: LineScanner::from_request(request),
            token: token.clone(),
            metrics,
            guard,
        })
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Runs the search to the end, streaming each file's hits to `on_hits`.
    ///
    /// `on_complete` fires exactly once after the last `on_hits` call, whether the walk
    /// completed, was cancelled, or was stopped by a fault. The token is released just
    /// before, so the completion handler may start a new session.
    pub fn run<R, C>(self, mut on_hits: R, on_complete: C) -> SearchSummary
    where
        R: FnMut(&Path, Vec<SearchHit>),
        C: FnOnce(),
    {
        let SearchSession {
            key,
            walker,
            scanner,
            token,
            metrics,
            guard,
        } = self;

        info!(
            "Starting search for '{}' in {} root(s)",
            key,
            walker.roots().len()
        );

        let walked = panic::catch_unwind(AssertUnwindSafe(|| {
            walker.walk(&token, |path| match scanner.scan_file(path) {
                Ok(hits) => {
                    metrics.record_hits(hits.len());
                    if !hits.is_empty() {
                        debug!("Found {} hits in {}", hits.len(), path.display());
                        on_hits(path, hits);
                    }
                }
                Err(e) if e.is_decode_error() => {
                    warn!("Skipping undecodable file {}: {}", path.display(), e);
                    metrics.record_decode_error();
                }
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", path.display(), e);
                    metrics.record_io_error();
                }
            })
        }));

        let outcome = match walked {
            Ok(WalkOutcome::Completed) => SearchOutcome::Completed,
            Ok(WalkOutcome::Cancelled) => SearchOutcome::Cancelled,
            Err(payload) => {
                error!("Search aborted by internal fault: {}", panic_message(&*payload));
                SearchOutcome::Faulted
            }
        };

        metrics.log_stats();
        let summary = SearchSummary {
            outcome,
            stats: metrics.get_stats(),
        };
        info!(
            "Search {}: {} hits in {} files",
            outcome, summary.stats.total_hits, summary.stats.files_with_hits
        );

        drop(guard);
        on_complete();
        summary
    }
}

/// Runs a search on the calling thread.
///
/// Request errors are returned before any callback fires. Otherwise `on_hits` is called
/// once per file with hits, in traversal order, and `on_complete` exactly once at the end.
pub fn run<R, C>(
    request: &SearchRequest,
    token: &CancellationToken,
    on_hits: R,
    on_complete: C,
) -> SearchResult<SearchSummary>
where
    R: FnMut(&Path, Vec<SearchHit>),
    C: FnOnce(),
{
    let session = SearchSession::new(request, token)?;
    Ok(session.run(on_hits, on_complete))
}

/// Runs a search on a dedicated worker thread.
///
/// Validation happens on the calling thread, so request errors are still returned
/// synchronously. Both callbacks execute on the worker.
pub fn spawn<R, C>(
    request: &SearchRequest,
    token: &CancellationToken,
    on_hits: R,
    on_complete: C,
) -> SearchResult<JoinHandle<SearchSummary>>
where
    R: FnMut(&Path, Vec<SearchHit>) + Send + 'static,
    C: FnOnce() + Send + 'static,
{
    let session = SearchSession::new(request, token)?;
    spawn_worker(move || session.run(on_hits, on_complete))
}

/// Starts `job` on a named worker thread
pub(crate) fn spawn_worker<F>(job: F) -> SearchResult<JoinHandle<SearchSummary>>
where
    F: FnOnce() -> SearchSummary + Send + 'static,
{
    thread::Builder::new()
        .name(WORKER_NAME.to_string())
        .spawn(job)
        .map_err(SearchError::IoError)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
