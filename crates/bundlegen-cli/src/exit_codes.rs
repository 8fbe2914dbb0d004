//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - the package manifest broke a structural invariant
pub const VALIDATION_ERROR: i32 = 2;

/// Input error - bad flags, versions, manifests or base files
pub const INPUT_ERROR: i32 = 4;

/// IO error - output could not be written
pub const IO_ERROR: i32 = 5;
