//! # Risreport - RIS portal export to reading report
//!
//! Risreport takes the spreadsheet a RIS portal exports (a banner row, a
//! header row, then one row per study) and rewrites it as the fixed
//! 14-column reading report.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Portal XLSX │────▶│   Parser    │────▶│  Transform  │────▶│   Writer    │
//! │  (or CSV)   │     │  (RawSheet) │     │  (schema)   │     │  (*-r.xlsx) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use risreport::transform;
//! use std::path::Path;
//!
//! let output = transform(Path::new("downloads/report.xlsx"), Some("Dr. Ruiz")).unwrap();
//! println!("Written to {}", output.display());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, records and the output schema
//! - [`parser`] - Spreadsheet and CSV ingestion
//! - [`transform`] - Projection, pipeline and batch runs
//! - [`writer`] - Output workbook, widths, autofilter, output path
//! - [`validation`] - JSON Schema check for custom output schemas
//! - [`downloads`] - Download-folder helpers
//! - [`config`] - Environment settings
//! - [`logs`] - Progress logs

// Core modules
pub mod error;
pub mod models;

// Stages
pub mod parser;
pub mod transform;
pub mod writer;

pub mod validation;

pub mod downloads;

pub mod config;
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{PipelineError, SchemaError, SheetError, WriteError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CellValue,
    ColumnDef,
    ColumnRule,
    OutputRecord,
    OutputSchema,
    SourceRecord,
    DEFAULT_PHYSICIAN,
    REPORT_COLUMNS,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{read_sheet, read_csv_bytes, RawSheet, SourceFormat};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    transform,
    transform_with_options,
    transform_sheet,
    transform_dir,
    project,
    resolve_physician,
    TransformOptions,
    TransformReport,
    BatchOutcome,
};

// =============================================================================
// Re-exports - Writer
// =============================================================================

pub use writer::{
    output_path,
    output_target,
    write_sheet,
    OutputFormat,
    TransformedSheet,
    WriteMode,
};

// =============================================================================
// Re-exports - Downloads & config
// =============================================================================

pub use downloads::{latest_spreadsheet, rename_download, report_file_name};
pub use config::Settings;
