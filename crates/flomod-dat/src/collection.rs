//! The ordered [`UnitCollection`] with node-count bookkeeping.

use crate::error::{Error, Result};
use crate::handlers::IC_COLUMN_HEADER;
use crate::registry::Registry;
use crate::unit::{FieldValue, RowData, UnitCategory, UnitRecord, UnitType, fields, rows};
use std::path::{Path, PathBuf};

/// Options for [`UnitCollection::add_unit`].
///
/// `ics` supplies default initial-conditions values for the rows the new
/// record contributes; a fresh empty map is built per call, never shared.
#[derive(Debug, Clone)]
pub struct AddOptions {
    /// Insertion index; `None` appends (before the IC record, if present).
    pub index: Option<usize>,
    /// Maintain the header node count and IC rows for `has_ics` records.
    pub update_node_count: bool,
    /// Default values for the IC rows added on behalf of the record.
    pub ics: RowData,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            index: None,
            update_node_count: true,
            ics: RowData::new(),
        }
    }
}

/// Ordered, exclusively-owned collection of unit records.
///
/// Maintains three invariants under mutation: at most one Header and one
/// InitialConditions record; every `has_ics` record has one synchronized IC
/// row per label key; the header node count equals the number of
/// synchronized rows.
#[derive(Debug, Clone, Default)]
pub struct UnitCollection {
    path: PathBuf,
    units: Vec<UnitRecord>,
}

impl UnitCollection {
    /// Create an empty collection for the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            units: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UnitRecord> {
        self.units.iter()
    }

    pub fn get(&self, index: usize) -> Option<&UnitRecord> {
        self.units.get(index)
    }

    /// Append a record without any bookkeeping (loader use only).
    pub(crate) fn push_raw(&mut self, record: UnitRecord) {
        self.units.push(record);
    }

    /// Add a record to the collection.
    ///
    /// The effective index is forced to at-or-before the InitialConditions
    /// record (it is always last) and index 0 is coerced to 1 (the header is
    /// always first). When `update_node_count` is set and the record carries
    /// initial conditions, one IC row per label key is appended (defaulted
    /// from `opts.ics` with the record's label injected) and the header node
    /// count is incremented per row.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` when adding a second Header or InitialConditions
    /// record.
    pub fn add_unit(&mut self, record: UnitRecord, opts: AddOptions) -> Result<()> {
        if matches!(
            record.unit_type(),
            UnitType::Header | UnitType::InitialConditions
        ) && self.index_of_type(record.unit_type()).is_some()
        {
            return Err(Error::AlreadyExists {
                name: record.name().to_string(),
                unit_type: record.unit_type(),
            });
        }

        let ic_index = self.index_of_type(UnitType::InitialConditions);
        let labels: Vec<String> = if opts.update_node_count && record.has_ics() {
            record
                .ic_label_keys()
                .iter()
                .filter_map(|key| record.fields.get(key).map(|v| v.label()))
                .collect()
        } else {
            Vec::new()
        };

        // New units always go in front of the IC record
        let mut index = opts.index;
        match ic_index {
            Some(ic) => {
                if index.is_none() || index.is_some_and(|i| i >= ic) {
                    index = Some(ic);
                }
            }
            None => {
                if index.is_some_and(|i| i > self.units.len()) {
                    index = None;
                }
            }
        }

        match index {
            None => self.units.push(record),
            Some(mut i) => {
                if i == 0 {
                    i = 1; // below the header
                }
                let i = i.min(self.units.len());
                self.units.insert(i, record);
            }
        }

        if !labels.is_empty() {
            let added = self.append_ic_rows(&labels, &opts.ics);
            self.bump_node_count(added as i64);
        }
        Ok(())
    }

    /// Remove the first record matching `(name, unit_type)`.
    ///
    /// When `update_node_count` is set and the record carried initial
    /// conditions, its IC rows are deleted by label (tolerating absence) and
    /// the node count is decremented per row removed. Returns whether a
    /// record was removed.
    pub fn remove_unit(&mut self, name: &str, unit_type: UnitType, update_node_count: bool) -> bool {
        let Some(index) = self
            .units
            .iter()
            .position(|u| u.name() == name && u.unit_type() == unit_type)
        else {
            return false;
        };
        let removed = self.units.remove(index);

        if update_node_count && removed.has_ics() {
            let labels: Vec<String> = removed
                .ic_label_keys()
                .iter()
                .filter_map(|key| removed.fields.get(key).map(|v| v.label()))
                .collect();
            let mut deleted = 0i64;
            if let Some(ic) = self.get_unit_of_type_mut(UnitType::InitialConditions) {
                for label in &labels {
                    if ic.remove_row_where(rows::LABEL, label) {
                        deleted += 1;
                    } else {
                        tracing::warn!(unit = %removed.name(), label = %label,
                            "no initial conditions row found for removed unit");
                    }
                }
            }
            self.bump_node_count(-deleted);
        }
        true
    }

    /// First record matching by name, optionally narrowed to an exact type.
    pub fn get_unit(&self, name: &str, unit_type: Option<UnitType>) -> Option<&UnitRecord> {
        self.units
            .iter()
            .find(|u| u.name() == name && unit_type.is_none_or(|t| u.unit_type() == t))
    }

    /// Mutable variant of [`get_unit`](Self::get_unit).
    pub fn get_unit_mut(
        &mut self,
        name: &str,
        unit_type: Option<UnitType>,
    ) -> Option<&mut UnitRecord> {
        self.units
            .iter_mut()
            .find(|u| u.name() == name && unit_type.is_none_or(|t| u.unit_type() == t))
    }

    /// Replace the first record whose name matches the given one.
    ///
    /// Returns false (leaving the collection unchanged) when no name matches.
    pub fn set_unit(&mut self, record: UnitRecord, unit_type: Option<UnitType>) -> bool {
        let found = self.units.iter().position(|u| {
            u.name() == record.name() && unit_type.is_none_or(|t| u.unit_type() == t)
        });
        match found {
            Some(i) => {
                self.units[i] = record;
                true
            }
            None => false,
        }
    }

    /// Index of the first record matching `(name, type)`, `None` if absent.
    pub fn get_index(&self, name: &str, unit_type: Option<UnitType>) -> Option<usize> {
        self.units
            .iter()
            .position(|u| u.name() == name && unit_type.is_none_or(|t| u.unit_type() == t))
    }

    /// Index of the first record of a type.
    pub fn index_of_type(&self, unit_type: UnitType) -> Option<usize> {
        self.units.iter().position(|u| u.unit_type() == unit_type)
    }

    /// First record of a type.
    pub fn get_unit_of_type(&self, unit_type: UnitType) -> Option<&UnitRecord> {
        self.units.iter().find(|u| u.unit_type() == unit_type)
    }

    /// Mutable first record of a type.
    pub fn get_unit_of_type_mut(&mut self, unit_type: UnitType) -> Option<&mut UnitRecord> {
        self.units.iter_mut().find(|u| u.unit_type() == unit_type)
    }

    /// All records in any of the given categories, in collection order.
    pub fn units_by_category(&self, keys: &[UnitCategory]) -> Vec<&UnitRecord> {
        self.units
            .iter()
            .filter(|u| keys.contains(&u.category()))
            .collect()
    }

    /// All records of any of the given types, in collection order.
    pub fn units_by_type(&self, keys: &[UnitType]) -> Vec<&UnitRecord> {
        self.units
            .iter()
            .filter(|u| keys.contains(&u.unit_type()))
            .collect()
    }

    /// The header's node count (0 when no header is present).
    pub fn node_count(&self) -> i64 {
        self.get_unit_of_type(UnitType::Header)
            .and_then(|h| h.fields.get(fields::NODE_COUNT))
            .and_then(|v| v.as_int())
            .unwrap_or(0)
    }

    /// Formatted text lines for every record, in collection order.
    pub fn printable_contents(&self, registry: &Registry) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for unit in &self.units {
            tracing::debug!(unit_type = ?unit.unit_type(), name = %unit.name(),
                "formatting unit");
            out.extend(registry.format_record(unit)?);
        }
        Ok(out)
    }

    /// Factory: a freshly initialised data file with Header, a generation
    /// comment, and an empty InitialConditions record, then each given
    /// record appended through [`add_unit`](Self::add_unit).
    pub fn initialised_dat(
        path: impl Into<PathBuf>,
        records: Vec<UnitRecord>,
    ) -> Result<Self> {
        let mut collection = Self::new(path);

        let mut header = UnitRecord::new("Header", UnitType::Header);
        header
            .fields
            .insert(fields::TITLE.to_string(), FieldValue::Text(String::new()));
        header.fields.insert(
            fields::REVISION.to_string(),
            FieldValue::Text("#REVISION#1".to_string()),
        );
        header
            .fields
            .insert(fields::NODE_COUNT.to_string(), FieldValue::Int(0));
        header.fields.insert(
            fields::TAIL.to_string(),
            FieldValue::Text("     0.750     0.900     0.100     0.001        12SI".to_string()),
        );
        for line in [
            "    10.000     0.010     0.010     0.700     0.100     0.700     0.000",
            "RAD FILE",
            "",
            "END GENERAL",
        ] {
            let mut row = RowData::new();
            row.insert(rows::TEXT.to_string(), FieldValue::Text(line.to_string()));
            header.add_row(row);
        }

        let mut comment = UnitRecord::new("Comment", UnitType::Comment);
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M");
        let mut row = RowData::new();
        row.insert(
            rows::TEXT.to_string(),
            FieldValue::Text(format!("Created by flomod on {stamp}")),
        );
        comment.add_row(row);

        let mut ic = UnitRecord::new("Initial Conditions", UnitType::InitialConditions);
        ic.fields.insert(
            fields::COLUMN_HEADER.to_string(),
            FieldValue::Text(IC_COLUMN_HEADER.to_string()),
        );

        let no_count = |c: &mut Self, u| {
            c.add_unit(
                u,
                AddOptions {
                    update_node_count: false,
                    ..Default::default()
                },
            )
        };
        no_count(&mut collection, header)?;
        no_count(&mut collection, comment)?;
        no_count(&mut collection, ic)?;

        for record in records {
            collection.add_unit(record, AddOptions::default())?;
        }
        Ok(collection)
    }

    fn append_ic_rows(&mut self, labels: &[String], defaults: &RowData) -> usize {
        let Some(ic) = self.get_unit_of_type_mut(UnitType::InitialConditions) else {
            tracing::warn!("no initial conditions record; skipping row sync");
            return 0;
        };
        for label in labels {
            let mut row = defaults.clone();
            row.insert(rows::LABEL.to_string(), FieldValue::Text(label.clone()));
            ic.add_row(row);
        }
        labels.len()
    }

    fn bump_node_count(&mut self, delta: i64) {
        let Some(header) = self.get_unit_of_type_mut(UnitType::Header) else {
            tracing::warn!("no header record; skipping node count update");
            return;
        };
        let current = header
            .fields
            .get(fields::NODE_COUNT)
            .and_then(|v| v.as_int())
            .unwrap_or(0);
        header.fields.insert(
            fields::NODE_COUNT.to_string(),
            FieldValue::Int(current + delta),
        );
    }
}

impl std::ops::Index<usize> for UnitCollection {
    type Output = UnitRecord;

    fn index(&self, index: usize) -> &UnitRecord {
        &self.units[index]
    }
}

impl<'a> IntoIterator for &'a UnitCollection {
    type Item = &'a UnitRecord;
    type IntoIter = std::slice::Iter<'a, UnitRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn river(name: &str) -> UnitRecord {
        UnitRecord::new(name, UnitType::River)
    }

    #[test]
    fn initialised_dat_seeds_structure() {
        let dat = UnitCollection::initialised_dat("fake/path/file.dat", Vec::new()).unwrap();
        assert_eq!(dat[0].unit_type(), UnitType::Header);
        assert_eq!(dat[1].unit_type(), UnitType::Comment);
        assert_eq!(dat[2].unit_type(), UnitType::InitialConditions);
    }

    #[test]
    fn initialised_dat_places_given_units_before_ic() {
        let dat = UnitCollection::initialised_dat(
            "file.dat",
            vec![river("River1"), river("River2")],
        )
        .unwrap();
        assert_eq!(dat[0].unit_type(), UnitType::Header);
        assert_eq!(dat[1].unit_type(), UnitType::Comment);
        assert_eq!(dat[2].unit_type(), UnitType::River);
        assert_eq!(dat[3].unit_type(), UnitType::River);
        assert_eq!(dat[4].unit_type(), UnitType::InitialConditions);
    }

    #[test]
    fn add_unit_updates_initial_conditions_and_node_count() {
        let mut dat = UnitCollection::initialised_dat("file.dat", Vec::new()).unwrap();
        let mut ics = RowData::new();
        ics.insert(rows::ELEVATION.to_string(), FieldValue::Num(10.0));
        ics.insert(rows::FLOW.to_string(), FieldValue::Num(3.0));
        dat.add_unit(
            river("1.067"),
            AddOptions {
                ics,
                ..Default::default()
            },
        )
        .unwrap();

        let ic = dat.get_unit_of_type(UnitType::InitialConditions).unwrap();
        assert_eq!(ic.rows.len(), 1);
        assert_eq!(ic.rows[0].get(rows::LABEL).unwrap().as_text(), Some("1.067"));
        assert_eq!(ic.rows[0].get(rows::FLOW).unwrap().as_num(), Some(3.0));
        assert_eq!(ic.rows[0].get(rows::ELEVATION).unwrap().as_num(), Some(10.0));
        assert_eq!(dat.node_count(), 1);
    }

    #[test]
    fn second_header_is_rejected() {
        let mut dat = UnitCollection::initialised_dat("file.dat", Vec::new()).unwrap();
        let err = dat
            .add_unit(
                UnitRecord::new("Header", UnitType::Header),
                AddOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
    }

    #[test]
    fn index_zero_is_coerced_below_header() {
        let mut dat = UnitCollection::initialised_dat("file.dat", Vec::new()).unwrap();
        dat.add_unit(
            river("r"),
            AddOptions {
                index: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(dat[0].unit_type(), UnitType::Header);
        assert_eq!(dat[1].unit_type(), UnitType::River);
    }

    #[test]
    fn remove_unit_syncs_ic_rows_and_node_count() {
        let mut dat = UnitCollection::initialised_dat(
            "file.dat",
            vec![river("1.067"), river("1.068")],
        )
        .unwrap();
        assert_eq!(dat.node_count(), 2);

        assert!(dat.remove_unit("1.067", UnitType::River, true));
        let ic = dat.get_unit_of_type(UnitType::InitialConditions).unwrap();
        assert_eq!(ic.rows.len(), 1);
        assert_eq!(ic.rows[0].get(rows::LABEL).unwrap().as_text(), Some("1.068"));
        assert_eq!(dat.node_count(), 1);

        assert!(dat.remove_unit("1.068", UnitType::River, true));
        assert_eq!(dat.node_count(), 0);
        assert!(!dat.remove_unit("1.067", UnitType::River, true));
    }

    #[test]
    fn get_index_sentinel_contract() {
        let dat = UnitCollection::initialised_dat("file.dat", vec![river("1.067")]).unwrap();
        assert_eq!(dat.get_index("nope", None), None);
        let i = dat.get_index("1.067", Some(UnitType::River)).unwrap();
        assert_eq!(dat[i].name(), "1.067");
    }

    #[test]
    fn get_unit_narrows_by_type() {
        let mut dat = UnitCollection::new("file.dat");
        let mut other = UnitRecord::new("1.067", UnitType::Unknown);
        other.fields.insert("marker".into(), FieldValue::Int(1));
        dat.add_unit(other, AddOptions::default()).unwrap();
        dat.add_unit(river("1.067"), AddOptions::default()).unwrap();

        let by_type = dat.get_unit("1.067", Some(UnitType::River)).unwrap();
        assert_eq!(by_type.unit_type(), UnitType::River);
        let first = dat.get_unit("1.067", None).unwrap();
        assert_eq!(first.unit_type(), UnitType::Unknown);
    }

    #[test]
    fn set_unit_replaces_first_name_match() {
        let mut dat = UnitCollection::initialised_dat("file.dat", vec![river("1.067")]).unwrap();
        let mut replacement = river("1.067");
        replacement.fields.insert("flag".into(), FieldValue::Int(7));
        assert!(dat.set_unit(replacement, Some(UnitType::River)));
        let unit = dat.get_unit("1.067", Some(UnitType::River)).unwrap();
        assert_eq!(unit.fields.get("flag").unwrap().as_int(), Some(7));

        assert!(!dat.set_unit(river("absent"), None));
    }

    #[test]
    fn category_and_type_queries() {
        let dat = UnitCollection::initialised_dat(
            "file.dat",
            vec![river("a"), river("b")],
        )
        .unwrap();
        assert_eq!(dat.units_by_category(&[UnitCategory::River]).len(), 2);
        assert_eq!(dat.units_by_category(&[UnitCategory::Meta]).len(), 3);
        assert!(dat.units_by_category(&[UnitCategory::Boundary]).is_empty());
        assert_eq!(dat.units_by_type(&[UnitType::Header]).len(), 1);
    }
}
