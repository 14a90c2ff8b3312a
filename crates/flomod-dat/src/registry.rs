//! Record-type registry: type tag → parse/format strategy.
//!
//! The collection never interprets record text itself; it dispatches through
//! a [`Registry`] mapping each [`UnitType`] to a [`RecordHandler`]. Adding a
//! record type is a registry entry.

use crate::error::{Error, Result};
use crate::handlers::{
    CommentHandler, HeaderHandler, InitialConditionsHandler, RiverHandler, UnknownHandler,
};
use crate::unit::{UnitRecord, UnitType};
use std::collections::BTreeMap;

/// Parse/format strategy for one record type.
///
/// `parse` consumes lines starting at `offset` and returns the next unread
/// offset together with the typed record. `format` produces the record's
/// canonical text lines; for well-formed blocks the two are byte-exact
/// inverses.
pub trait RecordHandler {
    fn parse(
        &self,
        lines: &[String],
        offset: usize,
        record_index: usize,
    ) -> Result<(usize, UnitRecord)>;

    fn format(&self, record: &UnitRecord) -> Vec<String>;
}

/// Table of record handlers keyed by unit type.
pub struct Registry {
    handlers: BTreeMap<UnitType, Box<dyn RecordHandler>>,
}

impl Registry {
    /// An empty registry with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// A registry seeded with the built-in handlers.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(UnitType::Header, Box::new(HeaderHandler));
        registry.register(UnitType::Comment, Box::new(CommentHandler));
        registry.register(
            UnitType::InitialConditions,
            Box::new(InitialConditionsHandler),
        );
        registry.register(UnitType::River, Box::new(RiverHandler));
        registry.register(UnitType::Unknown, Box::new(UnknownHandler));
        registry
    }

    /// Register (or replace) the handler for a type.
    pub fn register(&mut self, unit_type: UnitType, handler: Box<dyn RecordHandler>) {
        self.handlers.insert(unit_type, handler);
    }

    /// Look up the handler for a type.
    pub fn handler(&self, unit_type: UnitType) -> Option<&dyn RecordHandler> {
        self.handlers.get(&unit_type).map(|h| h.as_ref())
    }

    /// Identify the record type beginning at a line, if any.
    ///
    /// The header record is positional (always first) and is not detected
    /// here; lines matching no keyword fall through to `None` and are
    /// treated as [`UnitType::Unknown`] content by the loader.
    pub fn detect(&self, line: &str) -> Option<UnitType> {
        detect_keyword(line).filter(|t| self.handlers.contains_key(t))
    }

    /// Parse one record of `unit_type` starting at `offset`.
    pub fn parse_record(
        &self,
        lines: &[String],
        offset: usize,
        unit_type: UnitType,
        record_index: usize,
    ) -> Result<(usize, UnitRecord)> {
        let handler = self
            .handler(unit_type)
            .ok_or(Error::NoHandler { unit_type })?;
        handler.parse(lines, offset, record_index)
    }

    /// Format one record through its handler.
    pub fn format_record(&self, record: &UnitRecord) -> Result<Vec<String>> {
        let handler = self.handler(record.unit_type()).ok_or(Error::NoHandler {
            unit_type: record.unit_type(),
        })?;
        Ok(handler.format(record))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Keyword scan shared by the built-in handlers to find record boundaries.
pub(crate) fn detect_keyword(line: &str) -> Option<UnitType> {
    let upper = line.trim_start().to_uppercase();
    if upper.starts_with("INITIAL CONDITIONS") {
        Some(UnitType::InitialConditions)
    } else if upper.starts_with("COMMENT") {
        Some(UnitType::Comment)
    } else if upper.starts_with("RIVER") {
        Some(UnitType::River)
    } else {
        None
    }
}

/// True when a line begins a new built-in record block.
pub(crate) fn is_keyword(line: &str) -> bool {
    detect_keyword(line).is_some()
}
