//! Whole-file load/save for unit collections.

use crate::collection::UnitCollection;
use crate::error::Result;
use crate::registry::Registry;
use crate::unit::UnitType;
use std::path::Path;

/// A data file on disk: a [`UnitCollection`] plus its load/save boundary.
#[derive(Debug)]
pub struct DatFile {
    pub collection: UnitCollection,
}

impl DatFile {
    /// Parse a data file into a collection.
    ///
    /// The first block is the positional header record (unless the file
    /// opens directly with a keyword); subsequent blocks are dispatched by
    /// keyword through the registry, with unrecognized runs preserved as
    /// Unknown records.
    pub fn load(path: impl AsRef<Path>, registry: &Registry) -> Result<Self> {
        let path = path.as_ref();
        let lines = flomod_fs::read_lines(path)?;
        let mut collection = UnitCollection::new(path);

        let mut offset = 0;
        let mut record_index = 0;
        if !lines.is_empty() && registry.detect(&lines[0]).is_none() {
            let (next, header) =
                registry.parse_record(&lines, 0, UnitType::Header, record_index)?;
            collection.push_raw(header);
            offset = next;
            record_index += 1;
        }

        while offset < lines.len() {
            let unit_type = registry.detect(&lines[offset]).unwrap_or(UnitType::Unknown);
            let (next, record) =
                registry.parse_record(&lines, offset, unit_type, record_index)?;
            tracing::debug!(?unit_type, name = %record.name(), offset, "loaded unit");
            collection.push_raw(record);
            offset = next;
            record_index += 1;
        }

        Ok(Self { collection })
    }

    /// Write the collection back to its path in record order.
    pub fn save(&self, registry: &Registry) -> Result<()> {
        let lines = self.collection.printable_contents(registry)?;
        flomod_fs::write_lines(self.collection.path(), &lines)?;
        Ok(())
    }
}
