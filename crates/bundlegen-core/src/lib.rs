//! bundlegen Core - configuration and manifest loading for operator bundles
//!
//! This crate provides the inputs side of bundle generation:
//! - `Config`: one generation pass (operator name, input dirs, filters, output)
//! - `Filters`: allow-list selecting which project files participate
//! - `ManifestSource`: file access, on disk or in memory
//! - `ManifestLoader`: resolves a config into input files
//! - `ManifestSet`: input documents classified by Kubernetes kind

pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod manifest;
pub mod source;

pub use config::{APIS_DIR_KEY, Config, DEPLOY_DIR_KEY, Layout, OLM_CATALOG_DIR};
pub use error::{CoreError, Result};
pub use filter::Filters;
pub use loader::{InputFiles, ManifestLoader};
pub use manifest::{CrdManifest, CrdVersion, ManifestSet, normalize_quantities};
pub use source::{DiskSource, ManifestSource, MemorySource};
