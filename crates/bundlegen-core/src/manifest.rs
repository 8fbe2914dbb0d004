//! Kubernetes manifest classification
//!
//! Splits input files into YAML documents and sorts them by kind. Workload
//! and RBAC objects are decoded into `k8s-openapi` types; CRDs are kept as
//! dynamic JSON so both `apiextensions.k8s.io/v1` and `v1beta1` shapes load.
//! Documents of any other kind that belong to the API group of a loaded CRD
//! are kept as custom resource examples.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::loader::InputFiles;

/// Manifests found in the current inputs, grouped by kind
#[derive(Debug, Clone, Default)]
pub struct ManifestSet {
    pub crds: Vec<CrdManifest>,
    pub deployments: Vec<Deployment>,
    pub roles: Vec<Role>,
    pub cluster_roles: Vec<ClusterRole>,
    pub role_bindings: Vec<RoleBinding>,
    pub cluster_role_bindings: Vec<ClusterRoleBinding>,
    pub service_accounts: Vec<ServiceAccount>,
    /// Example instances of the loaded CRDs
    pub custom_resources: Vec<Value>,
}

/// A CustomResourceDefinition reduced to what a bundle needs
#[derive(Debug, Clone, PartialEq)]
pub struct CrdManifest {
    /// CRD name (metadata.name), e.g. `memcacheds.cache.example.com`
    pub name: String,
    /// API group
    pub group: String,
    /// Kind of the custom resource
    pub kind: String,
    /// Versions in declaration order
    pub versions: Vec<CrdVersion>,
    /// File the CRD was read from
    pub source_file: PathBuf,
}

/// A single CRD version
#[derive(Debug, Clone, PartialEq)]
pub struct CrdVersion {
    pub name: String,
    pub served: bool,
    /// Top-level schema description, if the CRD carries one
    pub description: Option<String>,
}

impl CrdManifest {
    /// Versions that the API server serves
    pub fn served_versions(&self) -> impl Iterator<Item = &CrdVersion> {
        self.versions.iter().filter(|v| v.served)
    }

    /// Parse a CRD document
    pub fn parse(value: &Value, source_file: &Path) -> Result<Self> {
        let invalid = |message: &str| CoreError::InvalidManifest {
            path: source_file.display().to_string(),
            message: message.to_string(),
        };

        let name = value
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("CRD is missing 'metadata.name'"))?
            .to_string();

        let spec = value
            .get("spec")
            .ok_or_else(|| invalid("CRD is missing 'spec'"))?;

        let group = spec
            .get("group")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("CRD is missing 'spec.group'"))?
            .to_string();

        let kind = spec
            .pointer("/names/kind")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("CRD is missing 'spec.names.kind'"))?
            .to_string();

        // v1beta1 may carry a shared schema under spec.validation
        let shared_description = schema_description(spec.pointer("/validation/openAPIV3Schema"));

        let mut versions: Vec<CrdVersion> = spec
            .get("versions")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| {
                        let name = v.get("name").and_then(Value::as_str)?;
                        Some(CrdVersion {
                            name: name.to_string(),
                            served: v.get("served").and_then(Value::as_bool).unwrap_or(true),
                            description: schema_description(
                                v.pointer("/schema/openAPIV3Schema"),
                            )
                            .or_else(|| shared_description.clone()),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        if versions.is_empty() {
            // v1beta1 single-version form
            if let Some(version) = spec.get("version").and_then(Value::as_str) {
                versions.push(CrdVersion {
                    name: version.to_string(),
                    served: true,
                    description: shared_description,
                });
            }
        }

        if versions.is_empty() {
            return Err(invalid("CRD declares no versions"));
        }

        Ok(Self {
            name,
            group,
            kind,
            versions,
            source_file: source_file.to_path_buf(),
        })
    }
}

fn schema_description(schema: Option<&Value>) -> Option<String> {
    schema
        .and_then(|s| s.get("description"))
        .and_then(Value::as_str)
        .map(String::from)
}

impl ManifestSet {
    /// Parse and classify every document in `files`
    pub fn from_files(files: &InputFiles) -> Result<Self> {
        let mut set = Self::default();
        let mut unknown: Vec<Value> = Vec::new();

        for (path, bytes) in files {
            let text = std::str::from_utf8(bytes).map_err(|e| CoreError::InvalidManifest {
                path: path.display().to_string(),
                message: format!("not valid UTF-8: {}", e),
            })?;

            for doc in parse_documents(text, path)? {
                set.classify(doc, path, &mut unknown)?;
            }
        }

        let groups = set.crd_groups();
        set.custom_resources = unknown
            .into_iter()
            .filter(|doc| {
                doc.get("apiVersion")
                    .and_then(Value::as_str)
                    .and_then(|api_version| api_version.split_once('/'))
                    .is_some_and(|(group, _)| groups.contains(group))
            })
            .collect();

        Ok(set)
    }

    /// API groups of all loaded CRDs
    pub fn crd_groups(&self) -> BTreeSet<&str> {
        self.crds.iter().map(|crd| crd.group.as_str()).collect()
    }

    /// Whether no manifest of interest was found
    pub fn is_empty(&self) -> bool {
        self.crds.is_empty()
            && self.deployments.is_empty()
            && self.roles.is_empty()
            && self.cluster_roles.is_empty()
            && self.role_bindings.is_empty()
            && self.cluster_role_bindings.is_empty()
            && self.service_accounts.is_empty()
            && self.custom_resources.is_empty()
    }

    fn classify(&mut self, doc: Value, path: &Path, unknown: &mut Vec<Value>) -> Result<()> {
        let Some(kind) = doc.get("kind").and_then(Value::as_str).map(String::from) else {
            tracing::debug!(path = %path.display(), "skipping document without kind");
            return Ok(());
        };

        match kind.as_str() {
            "CustomResourceDefinition" => self.crds.push(CrdManifest::parse(&doc, path)?),
            "Deployment" => self.deployments.push(decode(doc, path, &kind)?),
            "Role" => self.roles.push(decode(doc, path, &kind)?),
            "ClusterRole" => self.cluster_roles.push(decode(doc, path, &kind)?),
            "RoleBinding" => self.role_bindings.push(decode(doc, path, &kind)?),
            "ClusterRoleBinding" => self.cluster_role_bindings.push(decode(doc, path, &kind)?),
            "ServiceAccount" => self.service_accounts.push(decode(doc, path, &kind)?),
            _ => unknown.push(doc),
        }
        Ok(())
    }
}

/// Split a multi-document YAML file, dropping empty documents
fn parse_documents(text: &str, path: &Path) -> Result<Vec<Value>> {
    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let value = Value::deserialize(document).map_err(|e| CoreError::InvalidManifest {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if !value.is_null() {
            docs.push(value);
        }
    }
    Ok(docs)
}

/// Resource maps whose values are quantities
const QUANTITY_MAPS: [&str; 3] = ["limits", "requests", "overhead"];

/// Rewrite numeric resource quantities such as `cpu: 1` as strings
///
/// The API server accepts plain numbers for quantities, `k8s-openapi`'s
/// `Quantity` only decodes from strings.
pub fn normalize_quantities(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                match child {
                    Value::Object(quantities) if QUANTITY_MAPS.contains(&key.as_str()) => {
                        for quantity in quantities.values_mut() {
                            if let Value::Number(n) = quantity {
                                let text = n.to_string();
                                *quantity = Value::String(text);
                            }
                        }
                    }
                    other => normalize_quantities(other),
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(normalize_quantities),
        _ => {}
    }
}

fn decode<T: DeserializeOwned>(mut doc: Value, path: &Path, kind: &str) -> Result<T> {
    normalize_quantities(&mut doc);
    serde_json::from_value(doc).map_err(|e| CoreError::InvalidManifest {
        path: path.display().to_string(),
        message: format!("invalid {}: {}", kind, e),
    })
}
