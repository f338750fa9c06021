/// Error types for the search engine core.
///
/// # Error Taxonomy
///
/// Errors fall into two groups, and callers only ever see the first one:
///
/// 1. **Request errors** are detected before any traversal starts and are returned
///    synchronously from [`crate::search::run`] and friends:
///    ```rust,ignore
///    match run(&request, &token, on_hits, on_complete) {
///        Ok(summary) => // Hits were streamed, completion fired,
///        Err(SearchError::InvalidRoot(path)) => // Nothing ran, no callback fired,
///        Err(e) => // Empty key, empty include set, token already in use
///    }
///    ```
///
/// 2. **Per-entry and per-file errors** happen during traversal. They are logged with
///    `tracing` and counted in [`crate::metrics::SearchMetrics`], then the walk moves on
///    to the next entry. I/O failures and decode failures keep distinct variants so the
///    log shows which one hit a file.
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Invalid root: {0} does not exist")]
    InvalidRoot(PathBuf),
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("A search session is already running on this cancellation token")]
    SessionActive,
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid UTF-8 in file {path} at line {line_number}: {source}")]
    EncodingError {
        path: PathBuf,
        line_number: usize,
        source: std::string::FromUtf8Error,
    },
}

/// Canonicalize the path and strip UNC prefixes so that
/// comparisons on Windows are consistent.
pub fn unify_path(original: &Path) -> PathBuf {
    let canonical = original
        .canonicalize()
        .unwrap_or_else(|_| original.to_path_buf());
    strip_unc_prefix(&canonical)
}

/// Strips the Windows UNC prefix (\\?\) from a path if present
fn strip_unc_prefix(p: &Path) -> PathBuf {
    let s = p.display().to_string();
    if let Some(stripped) = s.strip_prefix(r"\\?\") {
        PathBuf::from(stripped)
    } else {
        p.to_path_buf()
    }
}

impl SearchError {
    pub fn invalid_root(path: impl Into<PathBuf>) -> Self {
        Self::InvalidRoot(path.into())
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn encoding_error(
        path: impl Into<PathBuf>,
        line_number: usize,
        source: std::string::FromUtf8Error,
    ) -> Self {
        let path = path.into();
        let unified = unify_path(&path);
        Self::EncodingError {
            path: unified,
            line_number,
            source,
        }
    }

    /// Maps an `io::Error` raised while touching `path` onto the matching variant.
    pub fn from_io(path: &Path, e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(e),
        }
    }

    /// True for failures to interpret file content as text.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::EncodingError { .. })
    }
}
