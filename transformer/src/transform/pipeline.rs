//! High-level pipeline API: read, project, write.
//!
//! # Example
//!
//! ```rust,ignore
//! use risreport::transform;
//! use std::path::Path;
//!
//! let output = transform(Path::new("downloads/ddavila-leidos-2025-07-22.xlsx"), Some("Dr. Ruiz"))?;
//! assert!(output.ends_with("ddavila-leidos-2025-07-22-r.xlsx"));
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::projection::{project_all, resolve_physician};
use crate::config::Settings;
use crate::error::{PipelineResult, SheetResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::OutputSchema;
use crate::parser::{read_sheet, RawSheet};
use crate::writer::{output_target, write_sheet, OutputFormat, TransformedSheet, WriteMode};

/// Options for a transformation run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformOptions {
    /// Reading physician; `None` or empty means `TBD`
    pub physician: Option<String>,

    /// Output columns and sheet name
    pub schema: OutputSchema,

    /// Direct or temp-file-then-rename write
    pub write_mode: WriteMode,
}

impl TransformOptions {
    /// Options from environment settings, loading the custom schema if one is set.
    pub fn from_settings(settings: &Settings) -> PipelineResult<Self> {
        let schema = match settings.schema_path {
            Some(ref path) => OutputSchema::load(path)?,
            None => OutputSchema::report(),
        };
        Ok(Self {
            physician: Some(settings.physician.clone()),
            schema,
            write_mode: settings.write_mode,
        })
    }

    pub fn with_physician(mut self, physician: impl Into<String>) -> Self {
        self.physician = Some(physician.into());
        self
    }
}

/// Summary of one transformation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub sheet_name: String,
    pub physician: String,
    /// Output header row
    pub columns: Vec<String>,
    /// Data rows written
    pub rows: usize,
    /// Source columns no output column reads from
    pub unused_source_columns: Vec<String>,
    /// Output columns with no matching source column
    pub missing_source_columns: Vec<String>,
    pub autofilter: String,
    pub widths: Vec<usize>,
}

/// Transform `source` with the default report schema and return the output path.
pub fn transform(source: &Path, physician: Option<&str>) -> PipelineResult<PathBuf> {
    let options = TransformOptions {
        physician: physician.map(str::to_string),
        ..TransformOptions::default()
    };
    Ok(transform_with_options(source, &options)?.output)
}

/// Transform an already-read sheet in memory.
pub fn transform_sheet(
    raw: &RawSheet,
    schema: &OutputSchema,
    physician: Option<&str>,
) -> SheetResult<TransformedSheet> {
    let records = raw.records()?;
    let physician = resolve_physician(physician);
    Ok(TransformedSheet::new(schema, project_all(&records, schema, &physician)))
}

/// Full pipeline with explicit options.
pub fn transform_with_options(
    source: &Path,
    options: &TransformOptions,
) -> PipelineResult<TransformReport> {
    log_info(format!("📖 Reading {}", source.display()));
    let raw = read_sheet(source)?;
    log_success(format!("Sheet \"{}\": {} rows", raw.name, raw.row_count()));

    let source_columns = raw.column_names()?;
    let (unused, missing) = column_coverage(&source_columns, &options.schema);
    log_info(format!("📋 Source has {} columns", source_columns.len()));
    if !missing.is_empty() {
        log_warning(format!("{} output column(s) not in source, left empty:", missing.len()));
        for name in &missing {
            log_info_indent(name, 1);
        }
    }

    let physician = resolve_physician(options.physician.as_deref());
    log_info(format!("⚙️  Projecting onto {} columns (physician: {})", options.schema.len(), physician));
    let sheet = transform_sheet(&raw, &options.schema, Some(physician.as_str()))?;
    log_success(format!("{} records", sheet.records.len()));

    let (output, format) = output_target(source);
    match format {
        OutputFormat::Csv => log_warning("CSV output: column widths and autofilter are not kept"),
        OutputFormat::Xlsx if output.extension() != source.extension() => log_warning(format!(
            "Cannot write {} files, writing xlsx instead",
            source
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default()
        )),
        OutputFormat::Xlsx => {}
    }

    write_sheet(&sheet, &output, format, options.write_mode)?;
    log_success(format!("💾 Transformed file written to: {}", output.display()));

    Ok(TransformReport {
        source: source.to_path_buf(),
        output,
        format,
        sheet_name: sheet.sheet_name.clone(),
        physician,
        columns: sheet.headers(),
        rows: sheet.records.len(),
        unused_source_columns: unused,
        missing_source_columns: missing,
        autofilter: sheet.autofilter(),
        widths: sheet.widths,
    })
}

/// Source columns nothing reads, and schema source-columns the sheet lacks.
fn column_coverage(source_columns: &[String], schema: &OutputSchema) -> (Vec<String>, Vec<String>) {
    use crate::models::ColumnRule;

    let wanted: Vec<&str> = schema
        .columns
        .iter()
        .filter(|c| c.rule == ColumnRule::Source)
        .map(|c| c.name.as_str())
        .collect();

    let unused = source_columns
        .iter()
        .filter(|c| !c.is_empty() && !wanted.contains(&c.as_str()))
        .cloned()
        .collect();
    let missing = wanted
        .iter()
        .filter(|w| !source_columns.iter().any(|c| c.as_str() == **w))
        .map(|w| w.to_string())
        .collect();

    (unused, missing)
}
