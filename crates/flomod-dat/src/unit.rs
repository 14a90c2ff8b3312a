//! The [`UnitRecord`] type and its field/row vocabulary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known field keys used by the built-in record handlers.
pub mod fields {
    /// Title line of a record (verbatim).
    pub const TITLE: &str = "title";
    /// Revision marker line of the header (verbatim).
    pub const REVISION: &str = "revision";
    /// Node count maintained by the collection.
    pub const NODE_COUNT: &str = "node_count";
    /// Verbatim remainder of the header count line.
    pub const TAIL: &str = "tail";
    /// Verbatim `SECTION` line of a river record.
    pub const SECTION_LINE: &str = "section_line";
    /// Verbatim spill/distance line of a river record.
    pub const SPILL: &str = "spill";
    /// The label value a record contributes to the initial-conditions table.
    pub const LABEL: &str = "label";
    /// Verbatim column-header line of the initial-conditions record.
    pub const COLUMN_HEADER: &str = "column_header";
}

/// Well-known row keys used by the built-in record handlers.
pub mod rows {
    pub const CHAINAGE: &str = "chainage";
    pub const ELEVATION: &str = "elevation";
    pub const ROUGHNESS: &str = "roughness";
    /// Verbatim remainder of a river row line.
    pub const TAIL: &str = "tail";
    /// Verbatim text line (comments, unknown records).
    pub const TEXT: &str = "text";
    pub const LABEL: &str = "label";
    pub const FLOW: &str = "flow";
    pub const STAGE: &str = "stage";
    pub const FROUDE: &str = "froude";
    pub const VELOCITY: &str = "velocity";
    pub const UMODE: &str = "umode";
    pub const USTATE: &str = "ustate";
}

/// A single field or row value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Num(f64),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            FieldValue::Num(n) => Some(*n),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Render as a plain label string (used for IC row matching).
    pub fn label(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Num(n) => n.to_string(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Num(n)
    }
}

/// One row of tabular record data.
pub type RowData = BTreeMap<String, FieldValue>;

/// The type of a unit record.
///
/// The catalogue is open-ended: the built-ins below cover the structural
/// records plus river sections; anything else round-trips as `Unknown`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum UnitType {
    Header,
    Comment,
    InitialConditions,
    River,
    Unknown,
}

impl UnitType {
    /// The category this type belongs to.
    pub fn category(self) -> UnitCategory {
        match self {
            UnitType::Header | UnitType::Comment | UnitType::InitialConditions => {
                UnitCategory::Meta
            }
            UnitType::River => UnitCategory::River,
            UnitType::Unknown => UnitCategory::Unknown,
        }
    }
}

/// Broad grouping of unit types (e.g. all bridge variants share a category).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum UnitCategory {
    Meta,
    River,
    Boundary,
    Unknown,
}

/// A single typed data record.
///
/// Identity is `(name, unit_type)`: names need not be unique across the
/// collection but are unique within a type. Header fields live in `fields`;
/// tabular data (cross-section rows, comment lines, IC rows) lives in `rows`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    name: String,
    unit_type: UnitType,
    category: UnitCategory,
    pub fields: BTreeMap<String, FieldValue>,
    pub rows: Vec<RowData>,
    ic_label_keys: Vec<String>,
    has_ics: bool,
}

impl UnitRecord {
    /// Create an empty record of the given type.
    ///
    /// `has_ics` and the IC label keys are derived from the type: river
    /// sections contribute one initial-conditions row keyed by their label.
    pub fn new(name: impl Into<String>, unit_type: UnitType) -> Self {
        let name = name.into();
        let (has_ics, ic_label_keys) = match unit_type {
            UnitType::River => (true, vec![fields::LABEL.to_string()]),
            _ => (false, Vec::new()),
        };
        let mut record = Self {
            name: name.clone(),
            unit_type,
            category: unit_type.category(),
            fields: BTreeMap::new(),
            rows: Vec::new(),
            ic_label_keys,
            has_ics,
        };
        if has_ics {
            record
                .fields
                .insert(fields::LABEL.to_string(), FieldValue::Text(name));
        }
        record
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the record, keeping the IC label field in step.
    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        if self.has_ics {
            self.fields
                .insert(fields::LABEL.to_string(), FieldValue::Text(name.clone()));
        }
        self.name = name;
    }

    pub fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    pub fn category(&self) -> UnitCategory {
        self.category
    }

    /// Whether this record contributes rows to the initial-conditions table.
    pub fn has_ics(&self) -> bool {
        self.has_ics
    }

    /// The field keys whose values each get an initial-conditions row.
    pub fn ic_label_keys(&self) -> &[String] {
        &self.ic_label_keys
    }

    /// Append a data row.
    pub fn add_row(&mut self, row: RowData) {
        self.rows.push(row);
    }

    /// Insert a data row at `index` (appends when out of range).
    pub fn insert_row(&mut self, index: usize, row: RowData) {
        if index >= self.rows.len() {
            self.rows.push(row);
        } else {
            self.rows.insert(index, row);
        }
    }

    /// Remove the first row whose `key` value renders to `label`.
    pub fn remove_row_where(&mut self, key: &str, label: &str) -> bool {
        let found = self
            .rows
            .iter()
            .position(|row| row.get(key).map(|v| v.label()).as_deref() == Some(label));
        match found {
            Some(i) => {
                self.rows.remove(i);
                true
            }
            None => false,
        }
    }

    /// All values under `key`, one per row that has it.
    pub fn row_values(&self, key: &str) -> Vec<&FieldValue> {
        self.rows.iter().filter_map(|row| row.get(key)).collect()
    }
}
