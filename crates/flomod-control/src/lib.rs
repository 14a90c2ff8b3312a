//! Structural model of line-oriented control files.
//!
//! A control file is a sequence of command lines (`Command == value`),
//! some of which reference further files, gated by nestable
//! `If`/`Else`/`Define` conditional blocks. [`ControlFile`] flattens a main
//! file and everything it includes into one [`PartSequence`] plus a
//! [`LogicSet`], supports positional edits and scoped queries, and renders
//! every participating file back out in canonical form.

pub mod control;
pub mod error;
pub mod logic;
pub mod parser;
pub mod part;
pub mod sequence;

pub use control::{Anchor, ContainsQuery, ControlFile, ModelFile, ModelFileKind};
pub use error::{Error, Result};
pub use logic::{LogicBlock, LogicKind, LogicSet, PartRemoval};
pub use parser::{parse_lines, ParsedFile};
pub use part::{KindFilter, Part, PartKind};
pub use sequence::{FetchFilter, PartSequence, Position};
