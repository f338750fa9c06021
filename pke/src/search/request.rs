use std::path::{Path, PathBuf};

use crate::config::{EncodingMode, DEFAULT_SNIPPET_WIDTH};
use crate::errors::{SearchError, SearchResult};
use crate::filters::ExtensionFilter;

/// An immutable description of one search.
///
/// Construction checks what can be checked without touching the filesystem: the key is
/// non-empty and at least one include path is given. Whether the paths exist is checked
/// by the walker right before traversal, since the filesystem can change in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    key: String,
    include_paths: Vec<PathBuf>,
    include_exts: ExtensionFilter,
    exclude_paths: Vec<PathBuf>,
    snippet_width: usize,
    encoding_mode: EncodingMode,
}

impl SearchRequest {
    pub fn new(
        key: impl Into<String>,
        include_paths: impl IntoIterator<Item = impl Into<PathBuf>>,
        include_exts: ExtensionFilter,
        exclude_paths: impl IntoIterator<Item = impl Into<PathBuf>>,
    ) -> SearchResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(SearchError::invalid_pattern("search key must not be empty"));
        }

        // Ordered set: keep the first occurrence of each root
        let mut roots: Vec<PathBuf> = Vec::new();
        for path in include_paths {
            let path = path.into();
            if !roots.contains(&path) {
                roots.push(path);
            }
        }
        if roots.is_empty() {
            return Err(SearchError::config_error(
                "at least one include path is required",
            ));
        }

        let mut excludes: Vec<PathBuf> = Vec::new();
        for path in exclude_paths {
            let path = path.into();
            if !excludes.contains(&path) {
                excludes.push(path);
            }
        }

        Ok(Self {
            key,
            include_paths: roots,
            include_exts,
            exclude_paths: excludes,
            snippet_width: DEFAULT_SNIPPET_WIDTH,
            encoding_mode: EncodingMode::default(),
        })
    }

    /// Sets the snippet window size in tokens (at least 1)
    pub fn with_snippet_width(mut self, width: usize) -> Self {
        self.snippet_width = width.max(1);
        self
    }

    pub fn with_encoding_mode(mut self, mode: EncodingMode) -> Self {
        self.encoding_mode = mode;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include_paths
    }

    pub fn include_exts(&self) -> &ExtensionFilter {
        &self.include_exts
    }

    pub fn exclude_paths(&self) -> &[PathBuf] {
        &self.exclude_paths
    }

    pub fn snippet_width(&self) -> usize {
        self.snippet_width
    }

    pub fn encoding_mode(&self) -> EncodingMode {
        self.encoding_mode
    }

    /// First include or exclude path that does not exist, if any
    pub fn first_missing_path(&self) -> Option<&Path> {
        self.include_paths
            .iter()
            .chain(self.exclude_paths.iter())
            .map(PathBuf::as_path)
            .find(|p| !p.exists())
    }
}
