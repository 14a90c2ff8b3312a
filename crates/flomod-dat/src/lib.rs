//! Unit-record data file model for flomod
//!
//! A data file is an ordered sequence of typed fixed-format records
//! ("units"): a header, comments, river cross-sections, and a trailing
//! initial-conditions table. This crate provides:
//!
//! - [`UnitRecord`] — one typed record with header fields and optional
//!   tabular row data
//! - [`Registry`] — type tag → parse/format strategy table; adding a record
//!   type is a registry entry, not a new hierarchy
//! - [`UnitCollection`] — the ordered container with name/type/category
//!   lookup and node-count / initial-conditions synchronization
//! - [`DatFile`] — whole-file load/save through `flomod-fs`

pub mod collection;
pub mod error;
pub mod file;
pub mod handlers;
pub mod registry;
pub mod unit;

pub use collection::{AddOptions, UnitCollection};
pub use error::{Error, Result};
pub use file::DatFile;
pub use registry::{RecordHandler, Registry};
pub use unit::{FieldValue, RowData, UnitCategory, UnitRecord, UnitType};
