//! Read access to project files
//!
//! Generators never touch the filesystem directly. They read through a
//! `ManifestSource`, which allows:
//! - `DiskSource`: real files below a project root
//! - `MemorySource`: in-memory files for tests
//!
//! All paths handed to a source are relative to its root.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

/// Trait for project file access
pub trait ManifestSource: Send + Sync {
    /// Read the contents of a file
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Check if a file exists
    fn exists(&self, path: &Path) -> bool;

    /// List all files below `dir`, recursively, sorted by path
    ///
    /// A missing directory yields an empty list.
    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Read the contents of a file as UTF-8 text
    fn read_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| CoreError::FileAccess {
            path: path.display().to_string(),
            message: format!("file is not valid UTF-8: {}", e),
        })
    }
}

/// Filesystem-backed source rooted at a project directory
#[derive(Debug, Clone)]
pub struct DiskSource {
    root: PathBuf,
}

impl DiskSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project root this source reads from
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ManifestSource for DiskSource {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(self.root.join(path)).map_err(|e| CoreError::FileAccess {
            path: path.display().to_string(),
            message: format!("failed to read file: {}", e),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.root.join(path).is_file()
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let start = self.root.join(dir);
        if !start.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&start).follow_links(true) {
            let entry = entry.map_err(|e| CoreError::FileAccess {
                path: dir.display().to_string(),
                message: format!("failed to walk directory: {}", e),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            // absolute input dirs stay absolute
            let path = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path());
            files.push(path.to_path_buf());
        }

        // Sort for deterministic output
        files.sort();
        Ok(files)
    }
}

/// In-memory source for testing
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    /// Add multiple text files at once
    pub fn with_files<'a>(mut self, files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        for (path, content) in files {
            self.insert(path, content);
        }
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }
}

impl ManifestSource for MemorySource {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| CoreError::FileAccess {
                path: path.display().to_string(),
                message: "file not found".to_string(),
            })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn list(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(self
            .files
            .keys()
            .filter(|path| path.starts_with(dir))
            .cloned()
            .collect())
    }
}
