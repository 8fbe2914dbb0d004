//! Deriving CSV fields from manifests and overlaying them on a base CSV
//!
//! The merge rule: current manifests own every machine-derivable field
//! (install strategy, owned CRDs, example CRs); the base CSV owns
//! everything else. Both steps are pure functions over values.

use std::collections::{BTreeMap, BTreeSet};

use bundlegen_core::ManifestSet;
use k8s_openapi::api::rbac::v1::{PolicyRule, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use semver::Version;

use crate::csv::{
    ALM_EXAMPLES_ANNOTATION, ClusterServiceVersion, CrdDescription, DEPLOYMENT_STRATEGY,
    InstallStrategy, StrategyDeploymentPermissions, StrategyDeploymentSpec,
    StrategyDetailsDeployment, csv_name,
};

/// CSV fields computed from the current manifests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedFields {
    /// `None` when no deployment or RBAC manifest was found
    pub install: Option<InstallStrategy>,
    pub owned_crds: Vec<CrdDescription>,
    /// JSON array of example custom resources
    pub alm_examples: Option<String>,
}

impl DerivedFields {
    /// Compute derived fields from a manifest set
    pub fn from_manifests(set: &ManifestSet) -> Result<Self, serde_json::Error> {
        let alm_examples = if set.custom_resources.is_empty() {
            None
        } else {
            Some(serde_json::to_string_pretty(&set.custom_resources)?)
        };

        Ok(Self {
            install: derive_install(set),
            owned_crds: derive_owned_crds(set),
            alm_examples,
        })
    }
}

fn derive_install(set: &ManifestSet) -> Option<InstallStrategy> {
    let deployments = set
        .deployments
        .iter()
        .map(|d| StrategyDeploymentSpec {
            name: d.metadata.name.clone().unwrap_or_default(),
            spec: d.spec.clone().unwrap_or_default(),
        })
        .collect();

    let roles = set
        .roles
        .iter()
        .map(|r| named_rules(&r.metadata, r.rules.as_deref()));
    let role_subjects = set
        .role_bindings
        .iter()
        .map(|b| binding(&b.role_ref, b.subjects.as_deref()));
    let permissions = collect_permissions(roles, "Role", role_subjects.collect());

    let cluster_roles = set
        .cluster_roles
        .iter()
        .map(|r| named_rules(&r.metadata, r.rules.as_deref()));
    let cluster_subjects = set
        .cluster_role_bindings
        .iter()
        .map(|b| binding(&b.role_ref, b.subjects.as_deref()));
    let cluster_permissions =
        collect_permissions(cluster_roles, "ClusterRole", cluster_subjects.collect());

    let spec = StrategyDetailsDeployment {
        deployments,
        permissions,
        cluster_permissions,
    };

    if spec.is_empty() {
        None
    } else {
        Some(InstallStrategy {
            strategy: DEPLOYMENT_STRATEGY.to_string(),
            spec,
        })
    }
}

type Binding<'a> = (&'a str, &'a str, Option<&'a [Subject]>);
type NamedRules<'a> = (&'a str, Option<&'a [PolicyRule]>);

fn binding<'a>(role_ref: &'a RoleRef, subjects: Option<&'a [Subject]>) -> Binding<'a> {
    (role_ref.kind.as_str(), role_ref.name.as_str(), subjects)
}

fn named_rules<'a>(metadata: &'a ObjectMeta, rules: Option<&'a [PolicyRule]>) -> NamedRules<'a> {
    (metadata.name.as_deref().unwrap_or_default(), rules)
}

/// Group role rules by the service accounts bound to each role
///
/// A role without a binding is attributed to a service account of the
/// same name. Rules for a service account bound to several roles are
/// concatenated in role order; each role counts once per account.
fn collect_permissions<'a>(
    roles: impl Iterator<Item = NamedRules<'a>>,
    role_kind: &str,
    bindings: Vec<Binding<'a>>,
) -> Vec<StrategyDeploymentPermissions> {
    let mut by_account: BTreeMap<String, Vec<PolicyRule>> = BTreeMap::new();

    for (role_name, rules) in roles {
        let mut accounts: BTreeSet<&str> = bindings
            .iter()
            .filter(|(kind, name, _)| *kind == role_kind && *name == role_name)
            .flat_map(|(_, _, subjects)| subjects.unwrap_or_default())
            .filter(|s| s.kind == "ServiceAccount")
            .map(|s| s.name.as_str())
            .collect();
        if accounts.is_empty() {
            accounts.insert(role_name);
        }

        for account in accounts {
            by_account
                .entry(account.to_string())
                .or_default()
                .extend(rules.unwrap_or_default().iter().cloned());
        }
    }

    by_account
        .into_iter()
        .map(|(service_account_name, rules)| StrategyDeploymentPermissions {
            service_account_name,
            rules,
        })
        .collect()
}

fn derive_owned_crds(set: &ManifestSet) -> Vec<CrdDescription> {
    let mut owned: Vec<CrdDescription> = set
        .crds
        .iter()
        .flat_map(|crd| {
            crd.served_versions().map(move |version| CrdDescription {
                name: crd.name.clone(),
                version: version.name.clone(),
                kind: crd.kind.clone(),
                display_name: Some(crd.kind.clone()),
                description: version.description.clone(),
                extra: BTreeMap::new(),
            })
        })
        .collect();

    owned.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
    owned.dedup_by(|a, b| a.name == b.name && a.version == b.version);
    owned
}

/// Overlay `derived` onto `base`, producing the CSV for `version`
///
/// With no base the result carries only identity and derived fields.
/// `spec.replaces` points at the base whenever the base is a different
/// released version; in-place regeneration keeps the base's value.
pub fn merge(
    base: Option<&ClusterServiceVersion>,
    derived: &DerivedFields,
    operator_name: &str,
    version: &Version,
) -> ClusterServiceVersion {
    let mut csv = base.cloned().unwrap_or_default();
    let name = csv_name(operator_name, version);

    csv.api_version = crate::csv::CSV_API_VERSION.to_string();
    csv.kind = crate::csv::CSV_KIND.to_string();

    if let Some(base) = base {
        let base_version = base
            .spec
            .version
            .as_deref()
            .and_then(|v| Version::parse(v).ok());
        if base_version.is_some_and(|v| &v != version) && !base.metadata.name.is_empty() {
            csv.spec.replaces = Some(base.metadata.name.clone());
        }
    }

    csv.metadata.name = name;
    csv.spec.version = Some(version.to_string());
    csv.spec.install = derived.install.clone();

    let base_owned = base
        .map(|b| b.spec.customresourcedefinitions.owned.as_slice())
        .unwrap_or_default();
    csv.spec.customresourcedefinitions.owned = overlay_owned(base_owned, &derived.owned_crds);

    if let Some(examples) = &derived.alm_examples {
        csv.metadata
            .annotations
            .insert(ALM_EXAMPLES_ANNOTATION.to_string(), examples.clone());
    }

    csv
}

/// Keep the set of owned CRDs from `derived`, with human-authored fields
/// taken from the matching base entry
fn overlay_owned(base: &[CrdDescription], derived: &[CrdDescription]) -> Vec<CrdDescription> {
    derived
        .iter()
        .map(|d| {
            match base
                .iter()
                .find(|b| b.name == d.name && b.version == d.version)
            {
                Some(b) => CrdDescription {
                    name: d.name.clone(),
                    version: d.version.clone(),
                    kind: d.kind.clone(),
                    display_name: b.display_name.clone().or_else(|| d.display_name.clone()),
                    description: b.description.clone().or_else(|| d.description.clone()),
                    extra: b.extra.clone(),
                },
                None => d.clone(),
            }
        })
        .collect()
}
