//! The generator contract shared by all catalog generators
//!
//! Generation is split in two layers. `Generator::generate` is pure: it
//! reads inputs through a `ManifestSource` and returns the files it would
//! produce. `Generator::write` is the thin I/O adapter that puts them on
//! disk. Callers producing several artifacts should generate all of them
//! first and only then call `write_files`, so a failure never leaves a
//! half-updated catalog behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};

/// Generated files keyed by file name
pub type FileMap = BTreeMap<String, Vec<u8>>;

/// Something that produces catalog files
pub trait Generator {
    /// Produce files in memory without writing anything
    fn generate(&self) -> Result<FileMap>;

    /// Directory the generated files belong in
    fn output_dir(&self) -> PathBuf;

    /// Generate and write files to `output_dir`, returning the written paths
    fn write(&self) -> Result<Vec<PathBuf>> {
        let files = self.generate()?;
        write_files(&self.output_dir(), &files)
    }
}

/// Write `files` below `dir`, creating it if needed
pub fn write_files(dir: &Path, files: &FileMap) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|source| CatalogError::Write {
        path: dir.display().to_string(),
        source,
    })?;

    let mut written = Vec::with_capacity(files.len());
    for (name, content) in files {
        let path = dir.join(name);
        std::fs::write(&path, content).map_err(|source| CatalogError::Write {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "wrote file");
        written.push(path);
    }
    Ok(written)
}
