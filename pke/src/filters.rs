/// Path filtering for the walker.
///
/// Two pure predicates decide whether a candidate entry takes part in a search:
///
/// 1. [`is_excluded`] checks an entry against the exclude subtrees that are still in play
///    at the current depth of the walk.
/// 2. [`is_extension_included`] checks a leaf file against the requested extensions.
///
/// Both work on normalized absolute paths, so callers resolve relative input first
/// (see [`crate::errors::unify_path`]). Ancestor checks use [`Path::starts_with`], which
/// compares whole components: `/root/sub` is an ancestor of `/root/sub/a.txt` but not of
/// `/root/subway.txt`.
use std::collections::BTreeSet;
use std::path::Path;

/// Which file extensions a search accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtensionFilter {
    /// Match every file regardless of extension
    #[default]
    All,
    /// Match only files whose extension, including the leading `.`, is in the set.
    /// The empty string matches files without an extension.
    Only(BTreeSet<String>),
}

impl ExtensionFilter {
    /// Builds a filter from user-supplied extensions.
    ///
    /// A missing leading `.` is added, so `rs` and `.rs` are equivalent. Matching is
    /// case-sensitive.
    pub fn from_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = extensions
            .into_iter()
            .map(|e| {
                let e = e.as_ref().trim();
                if e.is_empty() || e.starts_with('.') {
                    e.to_string()
                } else {
                    format!(".{}", e)
                }
            })
            .collect();
        ExtensionFilter::Only(set)
    }

    pub fn is_match_all(&self) -> bool {
        matches!(self, ExtensionFilter::All)
    }
}

impl From<Option<Vec<String>>> for ExtensionFilter {
    fn from(extensions: Option<Vec<String>>) -> Self {
        match extensions {
            None => ExtensionFilter::All,
            Some(exts) => ExtensionFilter::from_extensions(exts),
        }
    }
}

/// Extension of `path` including the leading separator, or `""` when there is none.
pub fn extension_of(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy()),
        None => String::new(),
    }
}

/// True iff `entry` is a member of `exclude_set` or lies below one of its members
pub fn is_excluded<P: AsRef<Path>>(entry: &Path, exclude_set: &[P]) -> bool {
    exclude_set.iter().any(|ex| entry.starts_with(ex.as_ref()))
}

/// True if the leaf file `entry` passes the extension filter.
///
/// Only meaningful for files; the walker never calls this for directories.
pub fn is_extension_included(entry: &Path, include_exts: &ExtensionFilter) -> bool {
    match include_exts {
        ExtensionFilter::All => true,
        ExtensionFilter::Only(exts) => exts.contains(&extension_of(entry)),
    }
}

/// Members of `exclude_set` lying strictly inside `dir`.
///
/// Exclusions equal to or above `dir` can never match anything below it, so they are
/// dropped before descending.
pub fn narrow_to<'a>(exclude_set: &[&'a Path], dir: &Path) -> Vec<&'a Path> {
    exclude_set
        .iter()
        .copied()
        .filter(|ex| ex.starts_with(dir) && *ex != dir)
        .collect()
}
