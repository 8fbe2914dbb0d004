//! bundlegen Catalog - OLM bundle metadata generation
//!
//! This crate turns a project's manifests and its bundle history into
//! catalog files:
//! - `CsvGenerator`: the next `ClusterServiceVersion`, merged from the prior one
//! - `PackageManifestGenerator`: the channel to CSV index
//! - `CrdBundleGenerator`: CRD manifests copied into a version bundle
//! - `validate_package_manifest`: structural checks run before emission
//!
//! Every generator returns its files in memory; see `Generator`.

pub mod bundle;
pub mod csv;
pub mod csv_generator;
pub mod error;
pub mod generator;
pub mod merge;
pub mod package;
pub mod package_generator;
pub mod validate;

pub use bundle::{CrdBundleGenerator, crd_bundle_files};
pub use csv::{ClusterServiceVersion, CrdDescription, InstallStrategy, csv_file_name, csv_name};
pub use csv_generator::{BaseCsv, BaseOrigin, CsvGenerator, SCRATCH_BUNDLE_DIR};
pub use error::{CatalogError, Result, ValidationError};
pub use generator::{FileMap, Generator, write_files};
pub use merge::{DerivedFields, merge};
pub use package::{DEFAULT_CHANNEL, PackageChannel, PackageManifest, package_file_name};
pub use package_generator::PackageManifestGenerator;
pub use validate::validate_package_manifest;
