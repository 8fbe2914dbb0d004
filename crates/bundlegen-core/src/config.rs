//! Generation configuration
//!
//! A `Config` describes a single generation pass: which operator is being
//! packaged, where its manifests live, which of them to include and where the
//! catalog bundle is written. It is built once by the caller and only read by
//! the generators.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::filter::Filters;

/// Input key for the directory holding deployment manifests
pub const DEPLOY_DIR_KEY: &str = "deploy";

/// Input key for the directory holding API definitions
pub const APIS_DIR_KEY: &str = "apis";

/// Name of the catalog directory below the deploy (or output) directory
pub const OLM_CATALOG_DIR: &str = "olm-catalog";

/// Project layout conventions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    /// `deploy/` for manifests, `pkg/apis/` for API types
    #[default]
    OperatorSdk,
    /// `config/` for manifests, `api/` for API types
    Kubebuilder,
}

impl Layout {
    /// Default deploy directory for this layout
    pub fn deploy_dir(self) -> &'static str {
        match self {
            Layout::OperatorSdk => "deploy",
            Layout::Kubebuilder => "config",
        }
    }

    /// Default APIs directory for this layout
    pub fn apis_dir(self) -> &'static str {
        match self {
            Layout::OperatorSdk => "pkg/apis",
            Layout::Kubebuilder => "api",
        }
    }
}

/// Configuration for a generation pass
#[derive(Debug, Clone)]
pub struct Config {
    /// Operator name, used for file names and as the package name
    pub operator_name: String,

    /// Project root all input paths are relative to
    pub project_root: PathBuf,

    /// Named input directory overrides (`DEPLOY_DIR_KEY`, `APIS_DIR_KEY`)
    pub inputs: BTreeMap<String, PathBuf>,

    /// Input files to include; empty includes everything
    pub filters: Filters,

    /// Destination root; the catalog is written below `<output_dir>/olm-catalog`
    pub output_dir: Option<PathBuf>,

    /// Layout used to resolve inputs that are not overridden
    pub layout: Layout,
}

impl Config {
    /// Create a config for the operator-sdk layout rooted at the current directory
    pub fn new(operator_name: impl Into<String>) -> Self {
        Self {
            operator_name: operator_name.into(),
            project_root: PathBuf::from("."),
            inputs: BTreeMap::new(),
            filters: Filters::new(),
            output_dir: None,
            layout: Layout::OperatorSdk,
        }
    }

    /// Create a config for a Kubebuilder project
    ///
    /// Only files below `config/` take part in generation.
    pub fn kubebuilder(operator_name: impl Into<String>) -> Self {
        let layout = Layout::Kubebuilder;
        Self {
            layout,
            filters: Filters::from_paths([layout.deploy_dir()]),
            ..Self::new(operator_name)
        }
    }

    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self
    }

    pub fn with_input(mut self, key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.inputs.insert(key.into(), path.into());
        self
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Look up a named input override
    pub fn input(&self, key: &str) -> Option<&Path> {
        self.inputs.get(key).map(PathBuf::as_path)
    }

    /// Deploy directory, relative to the project root
    pub fn deploy_dir(&self) -> PathBuf {
        self.input(DEPLOY_DIR_KEY)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(self.layout.deploy_dir()))
    }

    /// APIs directory, relative to the project root
    pub fn apis_dir(&self) -> PathBuf {
        self.input(APIS_DIR_KEY)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(self.layout.apis_dir()))
    }

    /// Directory holding this operator's existing bundle history,
    /// relative to the project root
    pub fn catalog_dir(&self) -> PathBuf {
        self.deploy_dir()
            .join(OLM_CATALOG_DIR)
            .join(&self.operator_name)
    }

    /// Directory generated files are written to
    pub fn output_catalog_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.join(OLM_CATALOG_DIR).join(&self.operator_name),
            None => self.project_root.join(self.catalog_dir()),
        }
    }

    /// Check the config is usable for generation
    pub fn validate(&self) -> Result<()> {
        if self.operator_name.trim().is_empty() {
            return Err(CoreError::InvalidConfig {
                message: "operator name must not be empty".to_string(),
            });
        }
        let name = self.operator_name.as_str();
        if name.contains(['/', '\\']) || matches!(name, "." | "..") {
            return Err(CoreError::InvalidConfig {
                message: format!(
                    "operator name '{}' must be a single path component",
                    self.operator_name
                ),
            });
        }
        Ok(())
    }
}
