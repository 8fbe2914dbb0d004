//! CLI error types with exit code handling
//!
//! Library errors are flattened into a `CliError` whose variant decides
//! the process exit code.

use bundlegen_catalog::CatalogError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Generated package manifest is structurally invalid
    #[error("Validation failed: {message}")]
    #[diagnostic(code(bundlegen::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Flags, versions or project files are unusable
    #[error("Invalid input: {message}")]
    #[diagnostic(code(bundlegen::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("IO error: {message}")]
    #[diagnostic(code(bundlegen::cli::io))]
    Io { message: String },

    #[error("{message}")]
    #[diagnostic(code(bundlegen::cli::error))]
    Other { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Input { .. } => exit_codes::INPUT_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Other { .. } => exit_codes::ERROR,
        }
    }

    /// Create an input error with help text
    pub fn input_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<CatalogError> for CliError {
    fn from(err: CatalogError) -> Self {
        let help = err.help().map(|h| h.to_string());
        let message = match &err {
            CatalogError::Validation { source, .. } => {
                let help = source.help().map(|h| h.to_string()).or(help);
                return CliError::Validation {
                    message: err.to_string(),
                    help,
                };
            }
            _ => err.to_string(),
        };

        match err {
            CatalogError::Write { .. } => CliError::Io { message },
            CatalogError::Generation { .. } => CliError::Other { message },
            _ => CliError::Input { message, help },
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
