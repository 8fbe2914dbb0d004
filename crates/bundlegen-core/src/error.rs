//! Core error types

use thiserror::Error;

/// Errors raised while reading and classifying input manifests
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Cannot access {path}: {message}")]
    FileAccess { path: String, message: String },

    #[error("Failed to parse manifest {path}: {message}")]
    InvalidManifest { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
