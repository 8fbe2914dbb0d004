//! CSV generator
//!
//! Produces `<operator>.v<version>.clusterserviceversion.yaml` by merging
//! the nearest prior CSV of the bundle history with fields derived from the
//! current manifests.
//!
//! Base CSV selection, first match wins:
//! 1. the `from_version` bundle, when given and present
//! 2. the highest bundle version not greater than the target
//! 3. a hand-written template in the `scratch` directory
//! 4. nothing: the CSV is generated from scratch

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bundlegen_core::{Config, ManifestLoader, ManifestSet, ManifestSource};
use semver::Version;

use crate::csv::{ClusterServiceVersion, csv_file_name};
use crate::error::{CatalogError, Result};
use crate::generator::{FileMap, Generator};
use crate::merge::{DerivedFields, merge};

/// Directory holding a CSV template used before any version exists
pub const SCRATCH_BUNDLE_DIR: &str = "scratch";

const CSV_FILE_SUFFIX: &str = ".clusterserviceversion.yaml";

/// Where the base CSV came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseOrigin {
    Version(Version),
    Scratch,
}

/// A prior CSV selected as merge base
#[derive(Debug, Clone)]
pub struct BaseCsv {
    pub origin: BaseOrigin,
    pub path: PathBuf,
    pub csv: ClusterServiceVersion,
}

/// Generates the CSV for one operator version
pub struct CsvGenerator {
    config: Config,
    csv_version: String,
    from_version: Option<String>,
    source: Arc<dyn ManifestSource>,
}

impl CsvGenerator {
    /// Create a generator for `csv_version`
    ///
    /// An empty `from_version` is treated as absent.
    pub fn new(
        config: Config,
        csv_version: impl Into<String>,
        from_version: Option<String>,
        source: Arc<dyn ManifestSource>,
    ) -> Self {
        Self {
            config,
            csv_version: csv_version.into(),
            from_version: from_version.filter(|v| !v.trim().is_empty()),
            source,
        }
    }

    fn parse_version(&self, version: &str) -> Result<Version> {
        let raw = version.trim_start_matches('v');
        Version::parse(raw).map_err(|e| CatalogError::InvalidVersion {
            operator: self.config.operator_name.clone(),
            version: version.to_string(),
            message: e.to_string(),
        })
    }

    /// The target version
    pub fn version(&self) -> Result<Version> {
        self.parse_version(&self.csv_version)
    }

    /// File name of the generated CSV
    pub fn file_name(&self) -> Result<String> {
        Ok(csv_file_name(&self.config.operator_name, &self.version()?))
    }

    /// Select and load the base CSV for `target`
    pub fn find_base(&self, target: &Version) -> Result<Option<BaseCsv>> {
        let operator = &self.config.operator_name;
        let catalog_dir = self.config.catalog_dir();

        if let Some(from) = &self.from_version {
            let from = self.parse_version(from)?;
            let path = catalog_dir
                .join(from.to_string())
                .join(csv_file_name(operator, &from));
            if self.source.exists(&path) {
                tracing::debug!(path = %path.display(), "using requested base CSV");
                return self.load_base(path, BaseOrigin::Version(from)).map(Some);
            }
            tracing::warn!(
                version = %from,
                "no CSV found for --from-version, falling back to latest bundle"
            );
        }

        let files = self
            .source
            .list(&catalog_dir)
            .map_err(|source| CatalogError::Input {
                operator: operator.clone(),
                source,
            })?;

        let latest = files
            .iter()
            .filter_map(|path| {
                let version = bundle_version(&catalog_dir, path)?;
                let expected = csv_file_name(operator, &version);
                let is_csv = path.file_name().is_some_and(|name| name == expected.as_str());
                (is_csv && &version <= target).then_some((version, path))
            })
            .max_by(|(a, _), (b, _)| a.cmp(b));

        if let Some((version, path)) = latest {
            tracing::debug!(path = %path.display(), "using latest bundle as base CSV");
            return self.load_base(path.clone(), BaseOrigin::Version(version)).map(Some);
        }

        let scratch_dir = catalog_dir.join(SCRATCH_BUNDLE_DIR);
        let template = files.iter().find(|path| {
            path.parent() == Some(scratch_dir.as_path())
                && path.to_string_lossy().ends_with(CSV_FILE_SUFFIX)
        });
        if let Some(path) = template {
            tracing::debug!(path = %path.display(), "using scratch template as base CSV");
            let mut base = self.load_base(path.clone(), BaseOrigin::Scratch)?;
            // a template is not a released version
            base.csv.spec.version = None;
            base.csv.spec.replaces = None;
            return Ok(Some(base));
        }

        tracing::debug!(operator = %operator, "no prior CSV, generating from scratch");
        Ok(None)
    }

    fn load_base(&self, path: PathBuf, origin: BaseOrigin) -> Result<BaseCsv> {
        let invalid = |message: String| CatalogError::InvalidBaseCsv {
            path: path.display().to_string(),
            message,
        };
        let text = self
            .source
            .read_string(&path)
            .map_err(|e| invalid(e.to_string()))?;
        let csv = ClusterServiceVersion::from_yaml(&text)
            .map_err(|e| invalid(e.to_string()))?;
        Ok(BaseCsv { origin, path, csv })
    }

    /// Load and classify the current input manifests
    pub fn load_manifests(&self) -> Result<ManifestSet> {
        let input = |source| CatalogError::Input {
            operator: self.config.operator_name.clone(),
            source,
        };
        let files = ManifestLoader::new(Arc::clone(&self.source))
            .load(&self.config)
            .map_err(input)?;
        ManifestSet::from_files(&files).map_err(input)
    }

    /// Build the CSV document
    pub fn build(&self) -> Result<ClusterServiceVersion> {
        self.config.validate().map_err(|source| CatalogError::Input {
            operator: self.config.operator_name.clone(),
            source,
        })?;

        let version = self.version()?;
        let manifests = self.load_manifests()?;
        let derived = DerivedFields::from_manifests(&manifests).map_err(|e| {
            CatalogError::Generation {
                operator: self.config.operator_name.clone(),
                version: version.to_string(),
                message: format!("failed to encode example resources: {}", e),
            }
        })?;
        let base = self.find_base(&version)?;

        Ok(merge(
            base.as_ref().map(|b| &b.csv),
            &derived,
            &self.config.operator_name,
            &version,
        ))
    }
}

/// Version of the bundle directory `path` sits in, if it is one
fn bundle_version(catalog_dir: &Path, path: &Path) -> Option<Version> {
    let dir = path.parent()?;
    if dir.parent()? != catalog_dir {
        return None;
    }
    Version::parse(&dir.file_name()?.to_string_lossy()).ok()
}

impl Generator for CsvGenerator {
    fn generate(&self) -> Result<FileMap> {
        let csv = self.build()?;
        let version = self.version()?;
        let yaml = csv.to_yaml().map_err(|e| CatalogError::Generation {
            operator: self.config.operator_name.clone(),
            version: version.to_string(),
            message: e.to_string(),
        })?;

        let mut files = FileMap::new();
        files.insert(self.file_name()?, yaml.into_bytes());
        Ok(files)
    }

    fn output_dir(&self) -> PathBuf {
        let bundle = self
            .version()
            .map(|v| v.to_string())
            .unwrap_or_else(|_| self.csv_version.clone());
        self.config.output_catalog_dir().join(bundle)
    }
}

impl std::fmt::Debug for CsvGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvGenerator")
            .field("operator", &self.config.operator_name)
            .field("csv_version", &self.csv_version)
            .field("from_version", &self.from_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlegen_core::{Filters, MemorySource};

    const OPERATOR: &str = "memcached-operator";

    const CRD: &str = r#"apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: memcacheds.cache.example.com
spec:
  group: cache.example.com
  names:
    kind: Memcached
  scope: Namespaced
  versions:
  - name: v1alpha1
    served: true
    storage: true
"#;

    const DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: memcached-operator
spec:
  selector:
    matchLabels:
      name: memcached-operator
  template:
    spec:
      serviceAccountName: memcached-operator
      containers:
      - name: memcached-operator
        image: quay.io/example/memcached-operator:v0.0.3
"#;

    const CSV_0_0_2: &str = r#"apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: memcached-operator.v0.0.2
  namespace: placeholder
spec:
  version: 0.0.2
  displayName: Memcached Operator
  icon:
  - base64data: aWNvbg==
    mediatype: image/png
  install:
    strategy: deployment
    spec:
      deployments:
      - name: memcached-operator
        spec:
          selector:
            matchLabels:
              name: memcached-operator
          template:
            spec:
              containers:
              - name: memcached-operator
                image: quay.io/example/memcached-operator:v0.0.2
"#;

    const CSV_0_0_1: &str = r#"apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: memcached-operator.v0.0.1
spec:
  version: 0.0.1
  displayName: Old Name
"#;

    fn catalog_path(version: &str) -> String {
        format!(
            "deploy/olm-catalog/{0}/{1}/{0}.v{1}.clusterserviceversion.yaml",
            OPERATOR, version
        )
    }

    fn project() -> MemorySource {
        MemorySource::new()
            .with_file("deploy/crds/cache_v1alpha1_memcached_crd.yaml", CRD)
            .with_file("deploy/operator.yaml", DEPLOYMENT)
            .with_file(catalog_path("0.0.1"), CSV_0_0_1)
            .with_file(catalog_path("0.0.2"), CSV_0_0_2)
    }

    fn generator(source: MemorySource, version: &str, from: Option<&str>) -> CsvGenerator {
        CsvGenerator::new(
            Config::new(OPERATOR),
            version,
            from.map(String::from),
            Arc::new(source),
        )
    }

    #[test]
    fn test_generate_file_name_and_content() {
        let g = generator(project(), "0.0.3", None);
        let files = g.generate().unwrap();

        let name = "memcached-operator.v0.0.3.clusterserviceversion.yaml";
        assert_eq!(files.len(), 1);
        let text = std::str::from_utf8(&files[name]).unwrap();
        let csv = ClusterServiceVersion::from_yaml(text).unwrap();
        assert_eq!(csv.metadata.name, "memcached-operator.v0.0.3");
        assert_eq!(csv.spec.version.as_deref(), Some("0.0.3"));
        assert_eq!(
            csv.spec.replaces.as_deref(),
            Some("memcached-operator.v0.0.2")
        );
        assert_eq!(csv.spec.extra["displayName"], "Memcached Operator");
        assert_eq!(csv.metadata.extra["namespace"], "placeholder");
        assert_eq!(csv.spec.customresourcedefinitions.owned.len(), 1);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let g = generator(project(), "0.0.3", None);
        assert_eq!(g.generate().unwrap(), g.generate().unwrap());
    }

    #[test]
    fn test_latest_prior_version_is_base() {
        let g = generator(project(), "0.0.3", None);
        let base = g.find_base(&Version::new(0, 0, 3)).unwrap().unwrap();
        assert_eq!(base.origin, BaseOrigin::Version(Version::new(0, 0, 2)));
    }

    #[test]
    fn test_newer_bundles_are_not_a_base() {
        let g = generator(project(), "0.0.1", None);
        let base = g.find_base(&Version::new(0, 0, 1)).unwrap().unwrap();
        assert_eq!(base.origin, BaseOrigin::Version(Version::new(0, 0, 1)));

        let base = g.find_base(&Version::new(0, 0, 0)).unwrap();
        assert!(base.is_none());
    }

    #[test]
    fn test_from_version_selects_base() {
        let g = generator(project(), "0.0.3", Some("0.0.1"));
        let csv = g.build().unwrap();
        assert_eq!(
            csv.spec.replaces.as_deref(),
            Some("memcached-operator.v0.0.1")
        );
        assert_eq!(csv.spec.extra["displayName"], "Old Name");
    }

    #[test]
    fn test_missing_from_version_falls_back() {
        let g = generator(project(), "0.0.3", Some("0.0.9"));
        let csv = g.build().unwrap();
        assert_eq!(
            csv.spec.replaces.as_deref(),
            Some("memcached-operator.v0.0.2")
        );
    }

    #[test]
    fn test_empty_from_version_is_ignored() {
        let g = generator(project(), "0.0.3", Some(""));
        assert!(g.build().is_ok());
    }

    #[test]
    fn test_regenerate_in_place() {
        let g = generator(project(), "0.0.2", Some("0.0.2"));
        let csv = g.build().unwrap();

        assert_eq!(csv.metadata.name, "memcached-operator.v0.0.2");
        assert!(csv.spec.replaces.is_none());
        let install = csv.spec.install.unwrap();
        let pod = install.spec.deployments[0].spec.template.spec.clone().unwrap();
        assert_eq!(
            pod.containers[0].image.as_deref(),
            Some("quay.io/example/memcached-operator:v0.0.3")
        );
    }

    #[test]
    fn test_scratch_generation_without_inputs() {
        let g = generator(MemorySource::new(), "0.1.0", None);
        let files = g.generate().unwrap();
        let name = "memcached-operator.v0.1.0.clusterserviceversion.yaml";
        let yaml = String::from_utf8(files[name].clone()).unwrap();

        insta::assert_snapshot!(yaml, @r"
        apiVersion: operators.coreos.com/v1alpha1
        kind: ClusterServiceVersion
        metadata:
          name: memcached-operator.v0.1.0
        spec:
          version: 0.1.0
        ");
    }

    #[test]
    fn test_scratch_template_is_base() {
        let path = "deploy/olm-catalog/memcached-operator/scratch";
        let template = r#"
apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: template
spec:
  version: 9.9.9
  replaces: nothing
  provider:
    name: Example
"#;
        let source = MemorySource::new().with_file(
            format!("{path}/memcached-operator.clusterserviceversion.yaml"),
            template,
        );
        let g = generator(source, "0.1.0", None);
        let base = g.find_base(&Version::new(0, 1, 0)).unwrap().unwrap();
        assert_eq!(base.origin, BaseOrigin::Scratch);

        let csv = g.build().unwrap();
        assert!(csv.spec.replaces.is_none());
        assert_eq!(csv.spec.extra["provider"]["name"], "Example");
    }

    #[test]
    fn test_filters_limit_derived_fields() {
        let filters = Filters::from_paths(["deploy/operator.yaml"]);
        let config = Config::new(OPERATOR).with_filters(filters);
        let g = CsvGenerator::new(config, "0.0.3", None, Arc::new(project()));
        let csv = g.build().unwrap();

        assert!(csv.spec.customresourcedefinitions.owned.is_empty());
        assert!(csv.spec.install.is_some());
    }

    #[test]
    fn test_invalid_target_version() {
        let g = generator(project(), "not-a-version", None);
        let result = g.generate();
        assert!(matches!(result, Err(CatalogError::InvalidVersion { .. })));
    }

    #[test]
    fn test_unparsable_base_csv() {
        let source = project().with_file(catalog_path("0.0.2"), "spec: [unterminated");
        let g = generator(source, "0.0.3", None);
        let err = g.generate().unwrap_err();
        match err {
            CatalogError::InvalidBaseCsv { path, .. } => {
                assert!(path.ends_with("v0.0.2.clusterserviceversion.yaml"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_base_with_numeric_quantities() {
        let base = CSV_0_0_2.replace(
            "                image: quay.io/example/memcached-operator:v0.0.2\n",
            "                image: quay.io/example/memcached-operator:v0.0.2
                resources:
                  requests:
                    cpu: 1
",
        );
        let source = project().with_file(catalog_path("0.0.2"), base);
        let g = generator(source, "0.0.3", None);

        let csv = g.build().unwrap();
        assert_eq!(
            csv.spec.replaces.as_deref(),
            Some("memcached-operator.v0.0.2")
        );
    }

    #[test]
    fn test_malformed_input_manifest() {
        let source = project().with_file("deploy/role.yaml", "kind: Role\nrules: {");
        let g = generator(source, "0.0.3", None);
        assert!(matches!(g.generate(), Err(CatalogError::Input { .. })));
    }

    #[test]
    fn test_output_dir() {
        let config = Config::new(OPERATOR).with_output_dir("/tmp/out");
        let g = CsvGenerator::new(config, "v0.0.3", None, Arc::new(MemorySource::new()));
        assert_eq!(
            g.output_dir(),
            PathBuf::from("/tmp/out/olm-catalog/memcached-operator/0.0.3")
        );
    }
}
