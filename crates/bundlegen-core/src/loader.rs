//! Manifest collection
//!
//! Resolves a `Config` into the set of input files that take part in a
//! generation pass: every YAML/JSON file below the deploy and APIs
//! directories that passes the configured `Filters`. The bundle history
//! under `<deploy>/olm-catalog` is never treated as input.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, OLM_CATALOG_DIR};
use crate::error::Result;
use crate::source::ManifestSource;

/// Input files keyed by their path relative to the project root
pub type InputFiles = BTreeMap<PathBuf, Vec<u8>>;

/// Loads input manifests through a `ManifestSource`
#[derive(Clone)]
pub struct ManifestLoader {
    source: Arc<dyn ManifestSource>,
}

impl ManifestLoader {
    pub fn new(source: Arc<dyn ManifestSource>) -> Self {
        Self { source }
    }

    /// Collect the input files selected by `config`
    pub fn load(&self, config: &Config) -> Result<InputFiles> {
        let deploy_dir = config.deploy_dir();
        let catalog_dir = deploy_dir.join(OLM_CATALOG_DIR);

        let mut roots = vec![deploy_dir, config.apis_dir()];
        roots.dedup();

        let mut files = InputFiles::new();
        for root in &roots {
            for path in self.source.list(root)? {
                if path.starts_with(&catalog_dir) || !is_manifest_file(&path) {
                    continue;
                }
                if !config.filters.matches(&path) {
                    tracing::debug!(path = %path.display(), "excluded by filters");
                    continue;
                }
                let content = self.source.read(&path)?;
                files.insert(path, content);
            }
        }

        tracing::debug!(count = files.len(), "collected input manifests");
        Ok(files)
    }
}

impl std::fmt::Debug for ManifestLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestLoader").finish_non_exhaustive()
    }
}

fn is_manifest_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| matches!(ext.as_str(), "yaml" | "yml" | "json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{APIS_DIR_KEY, DEPLOY_DIR_KEY};
    use crate::filter::Filters;
    use crate::source::MemorySource;

    fn project() -> Arc<dyn ManifestSource> {
        Arc::new(MemorySource::new().with_files([
            ("deploy/operator.yaml", "kind: Deployment"),
            ("deploy/role.yaml", "kind: Role"),
            ("deploy/crds/cache_crd.yaml", "kind: CustomResourceDefinition"),
            ("deploy/crds/README.md", "# docs"),
            (
                concat!(
                    "deploy/olm-catalog/memcached-operator/0.0.1/",
                    "memcached-operator.v0.0.1.clusterserviceversion.yaml"
                ),
                "kind: ClusterServiceVersion",
            ),
            ("pkg/apis/cache/v1alpha1/memcached_types.go", "package v1alpha1"),
            ("pkg/apis/cache/v1alpha1/sample.json", "{}"),
            ("other/ignored.yaml", "kind: Role"),
        ]))
    }

    #[test]
    fn test_load_all_inputs() {
        let loader = ManifestLoader::new(project());
        let files = loader.load(&Config::new("memcached-operator")).unwrap();

        let paths: Vec<_> = files.keys().cloned().collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("deploy/crds/cache_crd.yaml"),
                PathBuf::from("deploy/operator.yaml"),
                PathBuf::from("deploy/role.yaml"),
                PathBuf::from("pkg/apis/cache/v1alpha1/sample.json"),
            ]
        );
    }

    #[test]
    fn test_load_respects_filters() {
        let loader = ManifestLoader::new(project());
        let config = Config::new("memcached-operator")
            .with_filters(Filters::from_paths(["deploy/crds", "deploy/operator.yaml"]));

        let files = loader.load(&config).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.contains_key(Path::new("deploy/crds/cache_crd.yaml")));
        assert!(files.contains_key(Path::new("deploy/operator.yaml")));
    }

    #[test]
    fn test_load_with_overridden_inputs() {
        let source = Arc::new(MemorySource::new().with_files([
            ("config/rbac/role.yaml", "kind: Role"),
            ("config/olm-catalog/op/op.package.yaml", "packageName: op"),
            ("api/v1/sample.yaml", "kind: Memcached"),
            ("deploy/role.yaml", "kind: Role"),
        ]));
        let config = Config::new("op")
            .with_input(DEPLOY_DIR_KEY, "config")
            .with_input(APIS_DIR_KEY, "api");

        let files = ManifestLoader::new(source).load(&config).unwrap();
        let paths: Vec<_> = files.keys().cloned().collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("api/v1/sample.yaml"),
                PathBuf::from("config/rbac/role.yaml"),
            ]
        );
    }
}
