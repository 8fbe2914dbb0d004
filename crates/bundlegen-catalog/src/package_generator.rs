//! PackageManifest generator

use std::path::PathBuf;
use std::sync::Arc;

use bundlegen_core::{Config, ManifestSource};
use semver::Version;

use crate::csv::csv_name;
use crate::error::{CatalogError, Result};
use crate::generator::{FileMap, Generator};
use crate::package::{DEFAULT_CHANNEL, PackageManifest, package_file_name};
use crate::validate::validate_package_manifest;

/// Points a channel of the operator's package manifest at a CSV version
pub struct PackageManifestGenerator {
    config: Config,
    csv_version: String,
    channel: String,
    is_default: bool,
    source: Arc<dyn ManifestSource>,
    existing_manifest_dir: PathBuf,
}

impl PackageManifestGenerator {
    /// An empty `channel` selects `DEFAULT_CHANNEL`
    pub fn new(
        config: Config,
        csv_version: impl Into<String>,
        channel: impl Into<String>,
        is_default: bool,
        source: Arc<dyn ManifestSource>,
    ) -> Self {
        let channel = channel.into();
        let channel = if channel.trim().is_empty() {
            DEFAULT_CHANNEL.to_string()
        } else {
            channel
        };
        Self {
            existing_manifest_dir: config.catalog_dir(),
            config,
            csv_version: csv_version.into(),
            channel,
            is_default,
            source,
        }
    }

    /// Read the existing manifest from `dir` instead of the catalog directory
    pub fn with_existing_manifest_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.existing_manifest_dir = dir.into();
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn file_name(&self) -> String {
        package_file_name(&self.config.operator_name)
    }

    fn version(&self) -> Result<Version> {
        Version::parse(self.csv_version.trim_start_matches('v')).map_err(|e| {
            CatalogError::InvalidVersion {
                operator: self.config.operator_name.clone(),
                version: self.csv_version.clone(),
                message: e.to_string(),
            }
        })
    }

    /// Load the manifest currently on disk, if any
    pub fn load_existing(&self) -> Result<Option<PackageManifest>> {
        let path = self.existing_manifest_dir.join(self.file_name());
        if !self.source.exists(&path) {
            tracing::debug!(path = %path.display(), "no existing package manifest");
            return Ok(None);
        }

        let invalid = |message: String| CatalogError::InvalidPackageManifest {
            path: path.display().to_string(),
            message,
        };
        let text = self
            .source
            .read_string(&path)
            .map_err(|e| invalid(e.to_string()))?;
        let manifest =
            PackageManifest::from_yaml(&text).map_err(|e| invalid(e.to_string()))?;
        tracing::debug!(
            path = %path.display(),
            channels = manifest.channels.len(),
            "loaded package manifest"
        );
        Ok(Some(manifest))
    }

    /// Build the updated package manifest
    pub fn build(&self) -> Result<PackageManifest> {
        self.config.validate().map_err(|source| CatalogError::Input {
            operator: self.config.operator_name.clone(),
            source,
        })?;

        let operator = &self.config.operator_name;
        let current_csv = csv_name(operator, &self.version()?);

        let mut manifest = self.load_existing()?.unwrap_or_default();
        manifest.package_name = operator.clone();
        manifest.set_channel(&self.channel, current_csv);

        if self.is_default || manifest.default_channel.is_empty() {
            manifest.default_channel = self.channel.clone();
        }
        manifest.sort_channels();

        validate_package_manifest(Some(&manifest)).map_err(|source| CatalogError::Validation {
            operator: operator.clone(),
            channel: self.channel.clone(),
            source,
        })?;
        Ok(manifest)
    }
}

impl Generator for PackageManifestGenerator {
    fn generate(&self) -> Result<FileMap> {
        let manifest = self.build()?;
        let yaml = manifest.to_yaml().map_err(|e| CatalogError::Generation {
            operator: self.config.operator_name.clone(),
            version: self.csv_version.clone(),
            message: e.to_string(),
        })?;

        let mut files = FileMap::new();
        files.insert(self.file_name(), yaml.into_bytes());
        Ok(files)
    }

    fn output_dir(&self) -> PathBuf {
        self.config.output_catalog_dir()
    }
}

impl std::fmt::Debug for PackageManifestGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageManifestGenerator")
            .field("operator", &self.config.operator_name)
            .field("csv_version", &self.csv_version)
            .field("channel", &self.channel)
            .field("is_default", &self.is_default)
            .field("existing_manifest_dir", &self.existing_manifest_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use bundlegen_core::MemorySource;

    const OPERATOR: &str = "memcached-operator";
    const PACKAGE_PATH: &str =
        "deploy/olm-catalog/memcached-operator/memcached-operator.package.yaml";

    const EXISTING: &str = "channels:
- currentCSV: memcached-operator.v0.0.2
  name: alpha
defaultChannel: alpha
packageName: memcached-operator
";

    fn generator(
        source: MemorySource,
        channel: &str,
        is_default: bool,
    ) -> PackageManifestGenerator {
        let config = Config::new(OPERATOR);
        PackageManifestGenerator::new(config, "0.0.3", channel, is_default, Arc::new(source))
    }

    fn with_package(content: impl Into<Vec<u8>>) -> MemorySource {
        MemorySource::new().with_file(PACKAGE_PATH, content)
    }

    fn generated(g: &PackageManifestGenerator) -> String {
        let files = g.generate().unwrap();
        String::from_utf8(files[&g.file_name()].clone()).unwrap()
    }

    #[test]
    fn test_generate_adds_default_channel() {
        let g = generator(with_package(EXISTING), "stable", true);

        insta::assert_snapshot!(generated(&g), @r"
        channels:
        - currentCSV: memcached-operator.v0.0.2
          name: alpha
        - currentCSV: memcached-operator.v0.0.3
          name: stable
        defaultChannel: stable
        packageName: memcached-operator
        ");
    }

    #[test]
    fn test_first_generation() {
        let g = generator(MemorySource::new(), "alpha", false);
        let pm = g.build().unwrap();

        assert_eq!(
            pm,
            PackageManifest::new(OPERATOR, "alpha", &Version::new(0, 0, 3))
        );
    }

    #[test]
    fn test_empty_channel_means_alpha() {
        let g = generator(MemorySource::new(), "", false);
        assert_eq!(g.channel(), "alpha");
        assert_eq!(g.build().unwrap().default_channel, "alpha");
    }

    #[test]
    fn test_generation_is_idempotent() {
        let g = generator(with_package(EXISTING), "stable", true);
        let once = g.generate().unwrap();

        let rerun = generator(with_package(once[&g.file_name()].clone()), "stable", true);
        assert_eq!(rerun.generate().unwrap(), once);
    }

    #[test]
    fn test_new_channel_keeps_others() {
        let g = generator(with_package(EXISTING), "beta", false);
        let pm = g.build().unwrap();

        assert_eq!(pm.channels.len(), 2);
        assert_eq!(
            pm.channel("alpha").unwrap().current_csv,
            "memcached-operator.v0.0.2"
        );
        assert_eq!(
            pm.channel("beta").unwrap().current_csv,
            "memcached-operator.v0.0.3"
        );
        assert_eq!(pm.default_channel, "alpha");
    }

    #[test]
    fn test_promote_existing_channel() {
        let g = generator(with_package(EXISTING), "alpha", false);
        let pm = g.build().unwrap();

        assert_eq!(pm.channels.len(), 1);
        assert_eq!(pm.channels[0].current_csv, "memcached-operator.v0.0.3");
    }

    #[test]
    fn test_existing_without_default_adopts_channel() {
        let existing = "channels:
- currentCSV: memcached-operator.v0.0.1
  name: alpha
packageName: memcached-operator
";
        let g = generator(with_package(existing), "stable", false);
        assert_eq!(g.build().unwrap().default_channel, "stable");
    }

    #[test]
    fn test_existing_manifest_dir_override() {
        let source =
            MemorySource::new().with_file("testdata/memcached-operator.package.yaml", EXISTING);
        let g = generator(source, "stable", true).with_existing_manifest_dir("testdata");
        assert_eq!(g.build().unwrap().channels.len(), 2);
    }

    #[test]
    fn test_broken_existing_manifest_fails_validation() {
        let existing = "channels:
- currentCSV: ''
  name: beta
defaultChannel: beta
packageName: memcached-operator
";
        let g = generator(with_package(existing), "stable", false);

        match g.generate() {
            Err(CatalogError::Validation { channel, source, .. }) => {
                assert_eq!(channel, "stable");
                assert_eq!(
                    source,
                    ValidationError::ChannelMissingCsv {
                        channel: "beta".to_string()
                    }
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_unparsable_existing_manifest() {
        let g = generator(with_package("channels: {"), "alpha", false);
        let err = g.generate().unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPackageManifest { .. }));
    }

    #[test]
    fn test_invalid_version() {
        let config = Config::new(OPERATOR);
        let source = Arc::new(MemorySource::new());
        let g = PackageManifestGenerator::new(config, "latest", "alpha", false, source);
        let result = g.generate();
        assert!(matches!(result, Err(CatalogError::InvalidVersion { .. })));
    }

    #[test]
    fn test_output_dir() {
        let config = Config::new(OPERATOR).with_output_dir("out");
        let source = Arc::new(MemorySource::new());
        let g = PackageManifestGenerator::new(config, "0.0.3", "alpha", false, source);
        assert_eq!(
            g.output_dir(),
            PathBuf::from("out/olm-catalog/memcached-operator")
        );
    }
}
