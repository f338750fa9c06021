use std::fs::{self, DirEntry};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

use super::request::SearchRequest;
use crate::cancel::CancellationToken;
use crate::errors::{unify_path, SearchError, SearchResult};
use crate::filters::{is_excluded, is_extension_included, narrow_to, ExtensionFilter};
use crate::metrics::SearchMetrics;

/// How a walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Completed,
    Cancelled,
}

/// Exclusions still relevant at the current depth of one walk.
///
/// Both lists only ever hold paths strictly inside the directory being walked.
#[derive(Debug)]
struct TraversalState<'w> {
    excludes: Vec<&'w Path>,
    /// Other include roots; they are walked on their own turn
    nested_roots: Vec<&'w Path>,
}

impl<'w> TraversalState<'w> {
    fn descend(&self, dir: &Path) -> Self {
        Self {
            excludes: narrow_to(&self.excludes, dir),
            nested_roots: narrow_to(&self.nested_roots, dir),
        }
    }
}

/// Depth-first, pre-order enumeration of the files a request covers
#[derive(Debug, Clone)]
pub struct FileWalker {
    roots: Vec<PathBuf>,
    excludes: Vec<PathBuf>,
    include_exts: ExtensionFilter,
    metrics: SearchMetrics,
}

impl FileWalker {
    /// Resolves the roots and exclusions to absolute paths.
    ///
    /// Fails with [`SearchError::InvalidRoot`] naming the first path that does not exist.
    pub fn new(
        include_paths: &[PathBuf],
        include_exts: ExtensionFilter,
        exclude_paths: &[PathBuf],
    ) -> SearchResult<Self> {
        let resolve = |paths: &[PathBuf]| -> SearchResult<Vec<PathBuf>> {
            let mut resolved: Vec<PathBuf> = Vec::with_capacity(paths.len());
            for path in paths {
                if !path.exists() {
                    return Err(SearchError::invalid_root(path));
                }
                let unified = unify_path(path);
                if !resolved.contains(&unified) {
                    resolved.push(unified);
                }
            }
            Ok(resolved)
        };

        Ok(Self {
            roots: resolve(include_paths)?,
            excludes: resolve(exclude_paths)?,
            include_exts,
            metrics: SearchMetrics::new(),
        })
    }

    pub fn from_request(request: &SearchRequest) -> SearchResult<Self> {
        Self::new(
            request.include_paths(),
            request.include_exts().clone(),
            request.exclude_paths(),
        )
    }

    /// Shares `metrics` with the caller instead of a private set of counters
    pub fn with_metrics(mut self, metrics: SearchMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Calls `visit` for every accepted file until done or until `cancel` is triggered.
    ///
    /// The token is polled before each root, each directory entry and each descent.
    pub fn walk<F>(&self, cancel: &CancellationToken, mut visit: F) -> WalkOutcome
    where
        F: FnMut(&Path),
    {
        for root in &self.roots {
            if cancel.is_cancelled() {
                debug!("Walk cancelled before root {}", root.display());
                return WalkOutcome::Cancelled;
            }

            if root.is_dir() {
                let state = TraversalState {
                    excludes: self.excludes.iter().map(PathBuf::as_path).collect(),
                    nested_roots: self
                        .roots
                        .iter()
                        .filter(|other| *other != root)
                        .map(PathBuf::as_path)
                        .collect(),
                }
                .descend(root);

                self.metrics.record_dir_entered();
                if self.walk_dir(root, &state, cancel, &mut visit) == WalkOutcome::Cancelled {
                    return WalkOutcome::Cancelled;
                }
            } else if root.is_file() {
                // Explicitly included file: no exclusion or extension check
                trace!("Visiting root file: {}", root.display());
                self.metrics.record_file_visited();
                visit(root);
            } else {
                // FIFOs and devices could block the worker indefinitely
                warn!("Skipping root that is not a file or directory: {}", root.display());
                self.metrics.record_filtered();
            }
        }
        WalkOutcome::Completed
    }

    fn walk_dir<F>(
        &self,
        dir: &Path,
        state: &TraversalState<'_>,
        cancel: &CancellationToken,
        visit: &mut F,
    ) -> WalkOutcome
    where
        F: FnMut(&Path),
    {
        debug!("Walking directory: {}", dir.display());
        let entries = match self.read_sorted(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot read directory {}: {}", dir.display(), e);
                self.metrics.record_io_error();
                return WalkOutcome::Completed;
            }
        };

        for entry in entries {
            if cancel.is_cancelled() {
                return WalkOutcome::Cancelled;
            }

            let path = entry.path();
            if is_excluded(&path, &state.excludes) {
                debug!("Pruning excluded path: {}", path.display());
                self.metrics.record_pruned();
                continue;
            }
            if state.nested_roots.contains(&path.as_path()) {
                trace!("Deferring nested include root: {}", path.display());
                continue;
            }

            match self.classify(&entry) {
                Some(EntryKind::Dir) => {
                    self.metrics.record_dir_entered();
                    let child = state.descend(&path);
                    if self.walk_dir(&path, &child, cancel, visit) == WalkOutcome::Cancelled {
                        return WalkOutcome::Cancelled;
                    }
                }
                Some(EntryKind::File) => {
                    if is_extension_included(&path, &self.include_exts) {
                        self.metrics.record_file_visited();
                        visit(&path);
                    } else {
                        trace!("Filtered by extension: {}", path.display());
                        self.metrics.record_filtered();
                    }
                }
                None => {}
            }
        }
        WalkOutcome::Completed
    }

    /// Directory entries in file-name order. Unreadable entries are logged and skipped.
    fn read_sorted(&self, dir: &Path) -> SearchResult<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| SearchError::from_io(dir, e))? {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    self.metrics.record_io_error();
                }
            }
        }
        entries.sort_by_key(DirEntry::file_name);
        Ok(entries)
    }

    fn classify(&self, entry: &DirEntry) -> Option<EntryKind> {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(e) => {
                warn!("Cannot stat {}: {}", path.display(), e);
                self.metrics.record_io_error();
                return None;
            }
        };

        if file_type.is_dir() {
            Some(EntryKind::Dir)
        } else if file_type.is_file() {
            Some(EntryKind::File)
        } else if file_type.is_symlink() {
            // Links to files are scanned, links to directories are not followed
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => Some(EntryKind::File),
                Ok(_) => {
                    trace!("Not following directory link: {}", path.display());
                    None
                }
                Err(e) => {
                    warn!("Broken link {}: {}", path.display(), e);
                    self.metrics.record_io_error();
                    None
                }
            }
        } else {
            None
        }
    }
}

enum EntryKind {
    Dir,
    File,
}
