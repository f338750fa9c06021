use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;
use tracing::debug;

use super::coordinator::{spawn_worker, SearchSession};
use super::request::SearchRequest;
use crate::cancel::CancellationToken;
use crate::errors::{SearchError, SearchResult};
use crate::results::{FileHits, SearchSummary};

/// Messages produced by a streamed search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    /// All hits for one file
    Hits(FileHits),
    /// Always the last event of a search
    Complete(SearchSummary),
}

/// Consumer side of a search running on a worker thread.
///
/// Iterating yields zero or more [`SearchEvent::Hits`] followed by exactly one
/// [`SearchEvent::Complete`], then ends. Dropping the handle early cancels the search the
/// next time the worker has hits to deliver.
#[derive(Debug)]
pub struct SearchHandle {
    rx: Receiver<SearchEvent>,
    token: CancellationToken,
    worker: Option<JoinHandle<SearchSummary>>,
    finished: bool,
}

impl SearchHandle {
    /// Requests cancellation; the iterator still ends with `Complete`
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Waits for the worker and returns its summary. Undelivered events are discarded.
    pub fn join(mut self) -> SearchResult<SearchSummary> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| SearchError::internal("search worker already joined"))?;
        worker
            .join()
            .map_err(|_| SearchError::internal("search worker panicked"))
    }
}

impl Iterator for SearchHandle {
    type Item = SearchEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.rx.recv() {
            Ok(event) => {
                if matches!(event, SearchEvent::Complete(_)) {
                    self.finished = true;
                }
                Some(event)
            }
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }
}

/// Starts a search on a worker thread and returns a handle to consume its events.
///
/// Request errors are returned here, before the worker starts.
pub fn stream(request: &SearchRequest, token: &CancellationToken) -> SearchResult<SearchHandle> {
    let session = SearchSession::new(request, token)?;
    let (tx, rx) = mpsc::channel();
    let canceller = token.clone();

    let worker = spawn_worker(move || {
        let hits_tx = tx.clone();
        let summary = session.run(
            move |path, hits| {
                let event = SearchEvent::Hits(FileHits {
                    path: path.to_path_buf(),
                    hits,
                });
                if hits_tx.send(event).is_err() {
                    debug!("Search handle dropped, cancelling");
                    canceller.cancel();
                }
            },
            || {},
        );
        // `Complete` carries the summary, so it is sent once `run` has returned
        let _ = tx.send(SearchEvent::Complete(summary));
        summary
    })?;

    Ok(SearchHandle {
        rx,
        token: token.clone(),
        worker: Some(worker),
        finished: false,
    })
}
