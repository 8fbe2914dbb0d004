//! Input path filters
//!
//! A `Filters` set restricts which project files take part in a generation
//! pass. Each entry is either an exact file path or a directory prefix,
//! relative to the project root. An empty set accepts every path.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

/// Allow-list of input paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    paths: BTreeSet<PathBuf>,
}

impl Filters {
    /// Create an empty filter set (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter set from a list of paths
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let paths = paths
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| !p.as_os_str().is_empty())
            .collect();
        Self { paths }
    }

    /// Add a path to the allow-list
    pub fn insert(&mut self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        if !path.as_os_str().is_empty() {
            self.paths.insert(path);
        }
    }

    /// Whether no paths were configured
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Iterate over the configured paths in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Check whether `path` is selected by this filter set
    ///
    /// A path matches when it equals an entry or lives below an entry.
    /// Matching is component-wise, so `deploy/crd` does not select
    /// `deploy/crds/foo.yaml`.
    pub fn matches(&self, path: impl AsRef<Path>) -> bool {
        if self.paths.is_empty() {
            return true;
        }
        let path = normalize(path.as_ref());
        self.paths.iter().any(|allowed| path.starts_with(allowed))
    }
}

impl<P: AsRef<Path>> FromIterator<P> for Filters {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::from_paths(iter)
    }
}

/// Drop `.` components and trailing separators so `./deploy/` equals `deploy`
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
