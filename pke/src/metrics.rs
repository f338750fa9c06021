use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

/// Tracks traversal and scanning counters for one search session
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    // Traversal metrics
    dirs_entered: Arc<AtomicU64>,
    subtrees_pruned: Arc<AtomicU64>,
    files_filtered: Arc<AtomicU64>,

    // Scanning metrics
    files_visited: Arc<AtomicU64>,
    files_with_hits: Arc<AtomicU64>,
    total_hits: Arc<AtomicU64>,

    // Error metrics
    io_errors: Arc<AtomicU64>,
    decode_errors: Arc<AtomicU64>,
}

impl SearchMetrics {
    /// Creates a new SearchMetrics instance
    pub fn new() -> Self {
        Self {
            dirs_entered: Arc::new(AtomicU64::new(0)),
            subtrees_pruned: Arc::new(AtomicU64::new(0)),
            files_filtered: Arc::new(AtomicU64::new(0)),
            files_visited: Arc::new(AtomicU64::new(0)),
            files_with_hits: Arc::new(AtomicU64::new(0)),
            total_hits: Arc::new(AtomicU64::new(0)),
            io_errors: Arc::new(AtomicU64::new(0)),
            decode_errors: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_dir_entered(&self) {
        self.dirs_entered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pruned(&self) {
        self.subtrees_pruned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_filtered(&self) {
        self.files_filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file_visited(&self) {
        self.files_visited.fetch_add(1, Ordering::Relaxed);
    }

    /// Records the hits produced by one file
    pub fn record_hits(&self, count: usize) {
        if count > 0 {
            self.files_with_hits.fetch_add(1, Ordering::Relaxed);
            self.total_hits.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn record_io_error(&self) {
        self.io_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets a snapshot of the counters
    pub fn get_stats(&self) -> SearchStats {
        SearchStats {
            dirs_entered: self.dirs_entered.load(Ordering::Relaxed),
            subtrees_pruned: self.subtrees_pruned.load(Ordering::Relaxed),
            files_filtered: self.files_filtered.load(Ordering::Relaxed),
            files_visited: self.files_visited.load(Ordering::Relaxed),
            files_with_hits: self.files_with_hits.load(Ordering::Relaxed),
            total_hits: self.total_hits.load(Ordering::Relaxed),
            io_errors: self.io_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats:\n\
             Directories entered: {}\n\
             Subtrees pruned: {}\n\
             Files filtered by extension: {}\n\
             Files scanned: {}\n\
             Hits (files/lines): {}/{}\n\
             Errors (io/decode): {}/{}",
            stats.dirs_entered,
            stats.subtrees_pruned,
            stats.files_filtered,
            stats.files_visited,
            stats.files_with_hits,
            stats.total_hits,
            stats.io_errors,
            stats.decode_errors
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`SearchMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub dirs_entered: u64,
    pub subtrees_pruned: u64,
    pub files_filtered: u64,
    pub files_visited: u64,
    pub files_with_hits: u64,
    pub total_hits: u64,
    pub io_errors: u64,
    pub decode_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_tracking() {
        let metrics = SearchMetrics::new();

        metrics.record_dir_entered();
        metrics.record_dir_entered();
        metrics.record_pruned();
        metrics.record_filtered();

        let stats = metrics.get_stats();
        assert_eq!(stats.dirs_entered, 2);
        assert_eq!(stats.subtrees_pruned, 1);
        assert_eq!(stats.files_filtered, 1);
    }

    #[test]
    fn test_hit_tracking() {
        let metrics = SearchMetrics::new();

        metrics.record_file_visited();
        metrics.record_hits(3);
        metrics.record_file_visited();
        metrics.record_hits(0); // A file without hits does not count as a file with hits

        let stats = metrics.get_stats();
        assert_eq!(stats.files_visited, 2);
        assert_eq!(stats.files_with_hits, 1);
        assert_eq!(stats.total_hits, 3);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = SearchMetrics::new();
        let clone = metrics.clone();

        clone.record_io_error();
        clone.record_decode_error();
        clone.record_decode_error();

        let stats = metrics.get_stats();
        assert_eq!(stats.io_errors, 1);
        assert_eq!(stats.decode_errors, 2);
    }
}
