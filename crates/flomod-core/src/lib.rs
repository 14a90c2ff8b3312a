//! Shared vocabulary for the flomod workspace
//!
//! Provides the identity, scoping, and path types used by both the data-file
//! (`flomod-dat`) and control-file (`flomod-control`) models:
//!
//! - [`ids`] — opaque uuid-backed handles for parts, logic blocks, and
//!   source-file provenance
//! - [`scope`] — scenario/event value sets used to filter conditional content
//! - [`path`] — root + relative path resolution for file-reference commands
//! - [`logging`] — tracing subscriber initialisation helper

pub mod ids;
pub mod logging;
pub mod path;
pub mod scope;

pub use ids::{FileId, LogicId, PartId};
pub use path::PathInfo;
pub use scope::{Scope, ScopeKey};
