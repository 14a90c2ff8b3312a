//! Line-oriented file I/O for flomod
//!
//! The document model treats files as ordered lists of lines. This crate is
//! the single I/O boundary: reading a file into lines and writing lines back
//! atomically. All errors carry the offending path.

pub mod error;
pub mod io;

pub use error::{Error, Result};
pub use io::{read_lines, write_lines};
