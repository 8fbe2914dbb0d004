//! Catalog generation errors

use bundlegen_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised while generating catalog files
#[derive(Error, Debug, Diagnostic)]
pub enum CatalogError {
    /// Input manifests could not be read or parsed
    #[error("Failed to load input manifests for {operator}: {source}")]
    #[diagnostic(code(bundlegen::catalog::input))]
    Input {
        operator: String,
        #[source]
        source: CoreError,
    },

    #[error("Invalid version '{version}' for {operator}: {message}")]
    #[diagnostic(
        code(bundlegen::catalog::version),
        help("versions must be valid semver, e.g. 0.1.0")
    )]
    InvalidVersion {
        operator: String,
        version: String,
        message: String,
    },

    #[error("Failed to parse base CSV {path}: {message}")]
    #[diagnostic(code(bundlegen::catalog::base_csv))]
    InvalidBaseCsv { path: String, message: String },

    #[error("Failed to parse package manifest {path}: {message}")]
    #[diagnostic(code(bundlegen::catalog::package_manifest))]
    InvalidPackageManifest { path: String, message: String },

    #[error("Failed to generate {operator} v{version}: {message}")]
    #[diagnostic(code(bundlegen::catalog::generation))]
    Generation {
        operator: String,
        version: String,
        message: String,
    },

    #[error("Invalid package manifest for {operator} (channel '{channel}'): {source}")]
    #[diagnostic(code(bundlegen::catalog::validation))]
    Validation {
        operator: String,
        channel: String,
        #[source]
        source: ValidationError,
    },

    #[error("Failed to write {path}: {source}")]
    #[diagnostic(code(bundlegen::catalog::write))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Structural problems in a PackageManifest
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("package manifest is missing")]
    #[diagnostic(code(bundlegen::validation::missing_manifest))]
    MissingManifest,

    #[error("package manifest has no channels")]
    #[diagnostic(code(bundlegen::validation::empty_channels))]
    EmptyChannels,

    #[error("channel '{channel}' has no current CSV")]
    #[diagnostic(code(bundlegen::validation::channel_missing_csv))]
    ChannelMissingCsv { channel: String },

    #[error("channel '{channel}' is declared more than once")]
    #[diagnostic(code(bundlegen::validation::duplicate_channel))]
    DuplicateChannel { channel: String },

    #[error("default channel '{default_channel}' does not match any channel")]
    #[diagnostic(
        code(bundlegen::validation::default_channel),
        help("pass --default-channel to make the generated channel the default")
    )]
    DefaultChannelMismatch { default_channel: String },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
