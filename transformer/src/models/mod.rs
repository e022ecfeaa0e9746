//! Domain models for the reading report.
//!
//! - [`CellValue`] - a decoded spreadsheet cell
//! - [`SourceRecord`] - one source data row keyed by column name
//! - [`OutputSchema`] - ordered output columns with their value rules
//! - [`OutputRecord`] - one output row, one value per schema column

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{SchemaError, SchemaResult};

// =============================================================================
// Report constants
// =============================================================================

/// Physician shown when none is supplied.
pub const DEFAULT_PHYSICIAN: &str = "TBD";

/// Fixed billing value written in every row.
pub const UNIT_VALUE: f64 = 999.0;

/// Name of the single output worksheet.
pub const DEFAULT_SHEET_NAME: &str = "Transformed";

/// Column filled from the physician argument.
pub const PHYSICIAN_COLUMN: &str = "Medico que realiza lectura";

/// Column filled with [`UNIT_VALUE`].
pub const UNIT_VALUE_COLUMN: &str = "Valor unitario";

/// Output columns of the reading report, in output order.
pub const REPORT_COLUMNS: [&str; 14] = [
    "Nombre del paciente",
    "Número de documento",
    "Estudios",
    PHYSICIAN_COLUMN,
    "Fecha de la lectura",
    "Hora del dictado",
    "Modalidad",
    "Prioridad",
    "Estado",
    "Edad",
    "Procedencia",
    "Caso crítico",
    "Sede",
    UNIT_VALUE_COLUMN,
];

// =============================================================================
// Cells
// =============================================================================

/// A decoded cell value.
///
/// Blank cells decode to [`CellValue::Empty`], never to a missing entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Spreadsheet truthiness: empty text, `0`, NaN, `false` and blanks are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Empty => false,
            CellValue::Bool(b) => *b,
            CellValue::Number(n) => *n != 0.0 && !n.is_nan(),
            CellValue::Text(s) => !s.is_empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Length of the displayed text, in characters.
    pub fn display_len(&self) -> usize {
        match self {
            CellValue::Text(s) => s.chars().count(),
            other => other.to_string().chars().count(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

// =============================================================================
// Records
// =============================================================================

/// One source data row, keyed by the names of the header row.
///
/// Keys keep source order. Keys whose cell is missing from a short row are
/// absent rather than empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRecord {
    fields: Vec<(String, CellValue)>,
}

impl SourceRecord {
    /// Pair column names with cells positionally.
    ///
    /// Extra cells beyond the name vector are dropped; names past the end of
    /// the row get no entry. A name past the end also clears an earlier cell
    /// under the same name, since the later header position is the one read.
    pub fn zip(columns: &[String], cells: &[CellValue]) -> Self {
        let mut fields: Vec<(String, CellValue)> = Vec::with_capacity(cells.len());
        for (idx, name) in columns.iter().enumerate() {
            match cells.get(idx) {
                Some(cell) => fields.push((name.clone(), cell.clone())),
                None => fields.retain(|(n, _)| n != name),
            }
        }
        Self { fields }
    }

    /// Look up a column. A repeated name resolves to its right-most cell.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .rev()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One output row: exactly one value per schema column, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    fields: Vec<(String, CellValue)>,
}

impl OutputRecord {
    pub(crate) fn new(fields: Vec<(String, CellValue)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Values in column order.
    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    /// Column names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// =============================================================================
// Output schema
// =============================================================================

/// How an output column gets its value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnRule {
    /// Source value with the same column name when truthy, else empty.
    #[default]
    Source,
    /// The reading physician argument, or [`DEFAULT_PHYSICIAN`].
    Physician,
    /// The same value in every row.
    Constant { value: CellValue },
}

/// A named output column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(default)]
    pub rule: ColumnRule,
}

impl ColumnDef {
    pub fn source(name: impl Into<String>) -> Self {
        Self { name: name.into(), rule: ColumnRule::Source }
    }

    pub fn physician(name: impl Into<String>) -> Self {
        Self { name: name.into(), rule: ColumnRule::Physician }
    }

    pub fn constant(name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        Self {
            name: name.into(),
            rule: ColumnRule::Constant { value: value.into() },
        }
    }
}

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

/// Ordered output columns plus the output sheet name.
///
/// Column count, header text and the autofilter bound all derive from
/// `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSchema {
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    pub columns: Vec<ColumnDef>,
}

impl OutputSchema {
    /// The 14-column reading report.
    pub fn report() -> Self {
        let columns = REPORT_COLUMNS
            .iter()
            .map(|&name| match name {
                PHYSICIAN_COLUMN => ColumnDef::physician(name),
                UNIT_VALUE_COLUMN => ColumnDef::constant(name, UNIT_VALUE),
                _ => ColumnDef::source(name),
            })
            .collect();

        Self {
            sheet_name: default_sheet_name(),
            columns,
        }
    }

    /// Parse a schema document, checking it against the schema format first.
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        let document: serde_json::Value = serde_json::from_str(json)?;
        crate::validation::validate_output_schema(&document).map_err(SchemaError::Invalid)?;
        let schema: OutputSchema = serde_json::from_value(document)?;
        schema.check()?;
        Ok(schema)
    }

    /// Load a schema document from disk.
    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> SchemaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject schemas that cannot produce well-formed records.
    pub fn check(&self) -> SchemaResult<()> {
        if self.columns.is_empty() {
            return Err(SchemaError::Empty);
        }
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(SchemaError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Header row text: column names in uppercase.
    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.to_uppercase()).collect()
    }
}

impl Default for OutputSchema {
    fn default() -> Self {
        Self::report()
    }
}
