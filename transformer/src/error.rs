//! Error types for the report transformation pipeline.
//!
//! - [`SheetError`] - reading the source spreadsheet
//! - [`SchemaError`] - loading or checking an output schema
//! - [`WriteError`] - serializing the transformed sheet
//! - [`PipelineError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across stage boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Ingestion Errors
// =============================================================================

/// Errors while reading the source spreadsheet.
#[derive(Debug, Error)]
pub enum SheetError {
    /// The file could not be opened as a spreadsheet container.
    #[error("Cannot open spreadsheet '{}': {message}", path.display())]
    Open { path: PathBuf, message: String },

    /// The workbook contains no worksheet.
    #[error("Workbook has no sheets")]
    NoSheets,

    /// The first sheet could not be decoded.
    #[error("Cannot read sheet '{sheet}': {message}")]
    Read { sheet: String, message: String },

    /// The sheet ends before the column-name row.
    #[error("Sheet has {rows} row(s); expected a banner row followed by a header row")]
    MissingHeaderRow { rows: usize },

    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV source.
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors while loading an output schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A schema needs at least one column.
    #[error("Output schema has no columns")]
    Empty,

    /// Column names are the keys of an output record.
    #[error("Duplicate output column: {0}")]
    DuplicateColumn(String),

    /// The schema document does not match the schema format.
    #[error("Invalid output schema: {}", .0.join("; "))]
    Invalid(Vec<String>),

    /// JSON error.
    #[error("Schema JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("Schema IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Serialization Errors
// =============================================================================

/// Errors while writing the transformed sheet.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Workbook construction or save failed.
    #[error("Excel writer error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// CSV writer error.
    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("Write IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The temporary file could not replace the destination.
    #[error("Cannot move temporary file to '{}': {message}", path.display())]
    Persist { path: PathBuf, message: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::transform`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source spreadsheet error.
    #[error("Read error: {0}")]
    Sheet(#[from] SheetError),

    /// Output schema error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Output error.
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    /// No candidate spreadsheet in a downloads directory.
    #[error("No spreadsheet found in {}", .0.display())]
    NoSpreadsheetFound(PathBuf),

    /// IO error outside the read/write stages (renames, directory scans).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for ingestion.
pub type SheetResult<T> = Result<T, SheetError>;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for serialization.
pub type WriteResult<T> = Result<T, WriteError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let sheet_err = SheetError::MissingHeaderRow { rows: 1 };
        let pipeline_err: PipelineError = sheet_err.into();
        let msg = pipeline_err.to_string();
        assert!(msg.starts_with("Read error"));
        assert!(msg.contains("1 row(s)"));

        let schema_err = SchemaError::DuplicateColumn("Sede".into());
        let pipeline_err: PipelineError = schema_err.into();
        assert!(pipeline_err.to_string().contains("Sede"));
    }

    #[test]
    fn test_open_error_mentions_path() {
        let err = SheetError::Open {
            path: PathBuf::from("downloads/report.xlsx"),
            message: "not a zip".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("downloads/report.xlsx"));
        assert!(msg.contains("not a zip"));
    }

    #[test]
    fn test_invalid_schema_joins_messages() {
        let err = SchemaError::Invalid(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Invalid output schema: a; b");
    }
}
