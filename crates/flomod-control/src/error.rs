//! Error types for flomod-control

use std::path::PathBuf;

/// Result type for flomod-control operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in flomod-control operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Lookup by handle failed where presence was required
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Duplicate insertion of an existing handle
    #[error("Already exists: {what}")]
    AlreadyExists { what: String },

    /// Structurally invalid input passed to a typed API
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Root update against a path that is not an existing directory
    #[error("Invalid path: {path} is not an existing directory")]
    InvalidPath { path: PathBuf },

    /// A control-file line could not be parsed
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Filesystem error from flomod-fs
    #[error(transparent)]
    Fs(#[from] flomod_fs::Error),
}
