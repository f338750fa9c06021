/// Result types produced by a search.
///
/// Hits are created once by the scanner and handed to the consumer by value; nothing in
/// the core keeps a reference to them afterwards, so a consumer is free to move them into
/// its own state (a UI model, a channel, a `Vec`) without cloning.
use std::fmt;
use std::path::PathBuf;

use crate::metrics::SearchStats;

/// One matching line in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// The file the line was read from
    pub file_path: PathBuf,
    /// 1-based line number
    pub line_number: usize,
    /// Bounded window of tokens around the first occurrence, with the key marked
    pub snippet: String,
}

/// All hits for a single file, in ascending line order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHits {
    pub path: PathBuf,
    pub hits: Vec<SearchHit>,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The walk visited every included file
    Completed,
    /// The token was triggered before the walk finished
    Cancelled,
    /// An unexpected fault stopped the walk
    Faulted,
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Completed => write!(f, "completed"),
            SearchOutcome::Cancelled => write!(f, "cancelled"),
            SearchOutcome::Faulted => write!(f, "faulted"),
        }
    }
}

/// Summary of a finished session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSummary {
    pub outcome: SearchOutcome,
    pub stats: SearchStats,
}

impl SearchSummary {
    pub fn total_hits(&self) -> u64 {
        self.stats.total_hits
    }

    pub fn files_with_hits(&self) -> u64 {
        self.stats.files_with_hits
    }
}
