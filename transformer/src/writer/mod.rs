//! Serialization of the transformed sheet.
//!
//! Builds the output worksheet (uppercase header row, one row per record,
//! column widths, autofilter over header and data) and writes it next to the
//! source as `<base>-r<ext>`.

use rust_xlsxwriter::{Workbook, XlsxError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{WriteError, WriteResult};
use crate::models::{CellValue, OutputRecord, OutputSchema};
use crate::parser::SourceFormat;

/// Inserted between the base name and the extension of the output file
pub const OUTPUT_SUFFIX: &str = "-r";

/// Added to the widest cell of each column
pub const WIDTH_PADDING: usize = 2;

/// How the output file reaches its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Write straight to the destination path.
    #[default]
    Direct,
    /// Write a temporary file in the destination directory, then rename it
    /// over the destination.
    Atomic,
}

/// Container written for the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Xlsx,
    Csv,
}

/// `<dir>/<base>-r<ext>`, the suffix going before the final extension only.
pub fn output_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, OUTPUT_SUFFIX),
    };
    source.with_file_name(name)
}

/// Destination path and container for a source file.
///
/// Formats that cannot be written as-is (xlsm, xls, xlsb, ods) are written
/// as xlsx. The writer emits no macro-enabled package, so an `-r.xlsm` would
/// not open.
pub fn output_target(source: &Path) -> (PathBuf, OutputFormat) {
    match SourceFormat::from_path(source) {
        SourceFormat::Xlsx => (output_path(source), OutputFormat::Xlsx),
        SourceFormat::Csv => (output_path(source), OutputFormat::Csv),
        SourceFormat::OtherSpreadsheet => {
            (output_path(&source.with_extension("xlsx")), OutputFormat::Xlsx)
        }
    }
}

/// Spreadsheet column letters: 0 → `A`, 13 → `N`, 26 → `AA`.
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).to_string()
}

/// Autofilter range over the header row and `records` data rows.
pub fn autofilter_ref(columns: usize, records: usize) -> String {
    format!(
        "A1:{}{}",
        column_letter(columns.saturating_sub(1)),
        records + 1
    )
}

/// Display width per column: widest of the name and every cell, plus padding.
pub fn column_widths(names: &[String], records: &[OutputRecord]) -> Vec<usize> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let widest_cell = records
                .iter()
                .filter_map(|r| r.values().nth(i))
                .map(CellValue::display_len)
                .max()
                .unwrap_or(0);
            name.chars().count().max(widest_cell) + WIDTH_PADDING
        })
        .collect()
}

/// The output artifact, built once and written once.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedSheet {
    pub sheet_name: String,
    /// Schema column names, in order
    pub columns: Vec<String>,
    pub records: Vec<OutputRecord>,
    pub widths: Vec<usize>,
}

impl TransformedSheet {
    pub fn new(schema: &OutputSchema, records: Vec<OutputRecord>) -> Self {
        let columns: Vec<String> = schema.names().map(str::to_string).collect();
        let widths = column_widths(&columns, &records);
        Self {
            sheet_name: schema.sheet_name.clone(),
            columns,
            records,
            widths,
        }
    }

    /// Header row text.
    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.to_uppercase()).collect()
    }

    pub fn autofilter(&self) -> String {
        autofilter_ref(self.columns.len(), self.records.len())
    }

    /// Build the xlsx workbook for this sheet.
    pub fn to_workbook(&self) -> WriteResult<Workbook> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        for (col, header) in self.headers().iter().enumerate() {
            worksheet.write_string(0, col_num(col)?, header)?;
        }

        for (i, record) in self.records.iter().enumerate() {
            let row = row_num(i + 1)?;
            for (col, value) in record.values().enumerate() {
                let col = col_num(col)?;
                match value {
                    CellValue::Empty => {}
                    CellValue::Text(s) if s.is_empty() => {}
                    CellValue::Text(s) => {
                        worksheet.write_string(row, col, s)?;
                    }
                    CellValue::Number(n) => {
                        worksheet.write_number(row, col, *n)?;
                    }
                    CellValue::Bool(b) => {
                        worksheet.write_boolean(row, col, *b)?;
                    }
                }
            }
        }

        for (col, width) in self.widths.iter().enumerate() {
            worksheet.set_column_width(col_num(col)?, *width as f64)?;
        }

        let last_col = col_num(self.columns.len().saturating_sub(1))?;
        worksheet.autofilter(0, 0, row_num(self.records.len())?, last_col)?;

        Ok(workbook)
    }

    /// Header plus rows as CSV bytes. Widths and autofilter have no CSV form.
    pub fn to_csv(&self) -> WriteResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.headers())?;
        for record in &self.records {
            writer.write_record(record.values().map(|v| v.to_string()))?;
        }
        writer.into_inner().map_err(|e| WriteError::Io(e.into_error()))
    }
}

fn col_num(index: usize) -> WriteResult<u16> {
    u16::try_from(index).map_err(|_| WriteError::Xlsx(XlsxError::RowColumnLimitError))
}

fn row_num(index: usize) -> WriteResult<u32> {
    u32::try_from(index).map_err(|_| WriteError::Xlsx(XlsxError::RowColumnLimitError))
}

/// Write the sheet to `path`.
pub fn write_sheet(
    sheet: &TransformedSheet,
    path: &Path,
    format: OutputFormat,
    mode: WriteMode,
) -> WriteResult<()> {
    match (format, mode) {
        (OutputFormat::Xlsx, WriteMode::Direct) => {
            let mut workbook = sheet.to_workbook()?;
            workbook.save(path)?;
            Ok(())
        }
        (OutputFormat::Xlsx, WriteMode::Atomic) => {
            let mut workbook = sheet.to_workbook()?;
            let bytes = workbook.save_to_buffer()?;
            write_atomic(path, &bytes)
        }
        (OutputFormat::Csv, WriteMode::Direct) => {
            fs::write(path, sheet.to_csv()?)?;
            Ok(())
        }
        (OutputFormat::Csv, WriteMode::Atomic) => write_atomic(path, &sheet.to_csv()?),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> WriteResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| WriteError::Persist {
        path: path.to_path_buf(),
        message: e.error.to_string(),
    })?;
    Ok(())
}
