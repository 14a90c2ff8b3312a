//! Error types for flomod-dat

use crate::unit::UnitType;

/// Result type for flomod-dat operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in flomod-dat operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Lookup by name/type failed where presence was required
    #[error("Unit not found: {name}")]
    NotFound { name: String },

    /// A record that must be unique in the collection already exists
    #[error("Unit already exists: {name} ({unit_type:?})")]
    AlreadyExists { name: String, unit_type: UnitType },

    /// Structurally invalid input passed to a typed API
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// No handler registered for a record type
    #[error("No handler registered for record type {unit_type:?}")]
    NoHandler { unit_type: UnitType },

    /// A record block could not be parsed
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Filesystem error from flomod-fs
    #[error(transparent)]
    Fs(#[from] flomod_fs::Error),
}
