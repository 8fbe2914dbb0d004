//! Copying CRD manifests into a version bundle

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bundlegen_core::{Config, ManifestLoader, ManifestSet, ManifestSource};
use semver::Version;

use crate::error::{CatalogError, Result};
use crate::generator::{FileMap, Generator};

/// Files defining CRDs, keyed by file name
///
/// A file is copied whole, including any other documents it holds.
pub fn crd_bundle_files(config: &Config, source: Arc<dyn ManifestSource>) -> Result<FileMap> {
    let input = |source| CatalogError::Input {
        operator: config.operator_name.clone(),
        source,
    };
    let files = ManifestLoader::new(source).load(config).map_err(input)?;
    let manifests = ManifestSet::from_files(&files).map_err(input)?;

    let crd_files: BTreeSet<&Path> = manifests
        .crds
        .iter()
        .map(|crd| crd.source_file.as_path())
        .collect();

    let mut bundle = FileMap::new();
    for path in crd_files {
        let (Some(name), Some(content)) = (path.file_name(), files.get(path)) else {
            continue;
        };
        let name = name.to_string_lossy().into_owned();
        if bundle.contains_key(&name) {
            tracing::warn!(path = %path.display(), "skipping CRD file with duplicate name");
            continue;
        }
        bundle.insert(name, content.clone());
    }
    Ok(bundle)
}

/// Writes the project's CRD manifests next to a version's CSV
pub struct CrdBundleGenerator {
    config: Config,
    version: Version,
    source: Arc<dyn ManifestSource>,
}

impl CrdBundleGenerator {
    pub fn new(config: Config, version: Version, source: Arc<dyn ManifestSource>) -> Self {
        Self {
            config,
            version,
            source,
        }
    }
}

impl Generator for CrdBundleGenerator {
    fn generate(&self) -> Result<FileMap> {
        crd_bundle_files(&self.config, Arc::clone(&self.source))
    }

    fn output_dir(&self) -> PathBuf {
        self.config.output_catalog_dir().join(self.version.to_string())
    }
}
