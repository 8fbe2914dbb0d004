//! ClusterServiceVersion document model
//!
//! Only the fields the generator reasons about are typed. Everything else
//! a human put into a CSV (icon, maintainers, links, install modes, ...)
//! is kept in the flattened `extra` maps and written back untouched.

use std::collections::BTreeMap;

use bundlegen_core::normalize_quantities;
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::rbac::v1::PolicyRule;
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// API version of generated CSVs
pub const CSV_API_VERSION: &str = "operators.coreos.com/v1alpha1";

/// Kind of generated CSVs
pub const CSV_KIND: &str = "ClusterServiceVersion";

/// Annotation holding example custom resources as a JSON array
pub const ALM_EXAMPLES_ANNOTATION: &str = "alm-examples";

/// Install strategy name for deployment-based operators
pub const DEPLOYMENT_STRATEGY: &str = "deployment";

/// CSV name for an operator version, e.g. `memcached-operator.v0.0.3`
pub fn csv_name(operator_name: &str, version: &Version) -> String {
    format!("{}.v{}", operator_name, version)
}

/// CSV file name for an operator version
pub fn csv_file_name(operator_name: &str, version: &Version) -> String {
    format!(
        "{}.clusterserviceversion.yaml",
        csv_name(operator_name, version)
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServiceVersion {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: CsvMetadata,
    #[serde(default)]
    pub spec: CsvSpec,
}

impl Default for ClusterServiceVersion {
    fn default() -> Self {
        Self {
            api_version: CSV_API_VERSION.to_string(),
            kind: CSV_KIND.to_string(),
            metadata: CsvMetadata::default(),
            spec: CsvSpec::default(),
        }
    }
}

impl ClusterServiceVersion {
    /// Parse a CSV from YAML
    ///
    /// Numeric resource quantities in the install strategy are accepted.
    pub fn from_yaml(yaml: &str) -> Result<Self, DocumentError> {
        let mut value: Value = serde_yaml::from_str(yaml)?;
        if let Some(install) = value.pointer_mut("/spec/install") {
            normalize_quantities(install);
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize with keys sorted at every level
    ///
    /// Going through `serde_json::Value` orders map keys, so output is
    /// byte-identical for equal documents.
    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        let value = serde_json::to_value(self)?;
        Ok(serde_yaml::to_string(&value)?)
    }
}

/// Failure while converting a CSV between YAML and its model
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// namespace, labels and anything else
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsvSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Name of the CSV this one upgrades from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install: Option<InstallStrategy>,

    #[serde(default, skip_serializing_if = "CrdDescriptions::is_empty")]
    pub customresourcedefinitions: CrdDescriptions,

    /// Human-authored content: description, icon, maintainers, ...
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallStrategy {
    pub strategy: String,
    #[serde(default)]
    pub spec: StrategyDetailsDeployment,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDetailsDeployment {
    #[serde(default)]
    pub deployments: Vec<StrategyDeploymentSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<StrategyDeploymentPermissions>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_permissions: Vec<StrategyDeploymentPermissions>,
}

impl StrategyDetailsDeployment {
    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
            && self.permissions.is_empty()
            && self.cluster_permissions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDeploymentSpec {
    pub name: String,
    #[serde(default)]
    pub spec: DeploymentSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDeploymentPermissions {
    pub service_account_name: String,
    #[serde(default)]
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrdDescriptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owned: Vec<CrdDescription>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<CrdDescription>,
}

impl CrdDescriptions {
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty() && self.required.is_empty()
    }
}

/// An owned or required CRD entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdDescription {
    pub name: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Descriptors and resources
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
