//! Source spreadsheet ingestion.
//!
//! Reads the first sheet of a workbook (or a CSV export) into a [`RawSheet`]:
//! a row-major grid anchored at A1 where blank cells are [`CellValue::Empty`].
//! Row 0 is the portal's banner, row 1 the column names, rows 2.. the data.

use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};

use crate::error::{SheetError, SheetResult};
use crate::models::{CellValue, SourceRecord};

/// Index of the row holding column names
pub const HEADER_ROW: usize = 1;

/// Index of the first data row
pub const FIRST_DATA_ROW: usize = 2;

/// A decoded worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSheet {
    /// Name of the sheet that was read
    pub name: String,
    /// Row-major cells, starting at A1
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { name: name.into(), rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// The discarded title row, if any.
    pub fn banner(&self) -> Option<&[CellValue]> {
        self.rows.first().map(|r| r.as_slice())
    }

    /// Names from the header row.
    pub fn column_names(&self) -> SheetResult<Vec<String>> {
        let header = self
            .rows
            .get(HEADER_ROW)
            .ok_or(SheetError::MissingHeaderRow { rows: self.rows.len() })?;
        Ok(header.iter().map(|c| c.to_string()).collect())
    }

    /// Rows after the header row.
    pub fn data_rows(&self) -> &[Vec<CellValue>] {
        self.rows.get(FIRST_DATA_ROW..).unwrap_or(&[])
    }

    /// One [`SourceRecord`] per data row.
    pub fn records(&self) -> SheetResult<Vec<SourceRecord>> {
        let columns = self.column_names()?;
        Ok(self
            .data_rows()
            .iter()
            .map(|row| SourceRecord::zip(&columns, row))
            .collect())
    }
}

/// Kind of source container, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Xlsx,
    Csv,
    /// Readable but not writable as-is (xlsm, xls, xlsb, ods, ...)
    OtherSpreadsheet,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => SourceFormat::Xlsx,
            "csv" => SourceFormat::Csv,
            _ => SourceFormat::OtherSpreadsheet,
        }
    }
}

/// Read the first sheet of a spreadsheet file.
///
/// CSV files are decoded with encoding and delimiter auto-detection; every
/// other extension goes through calamine.
pub fn read_sheet<P: AsRef<Path>>(path: P) -> SheetResult<RawSheet> {
    let path = path.as_ref();
    match SourceFormat::from_path(path) {
        SourceFormat::Csv => {
            let bytes = std::fs::read(path)?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Sheet1");
            read_csv_bytes(&bytes, name)
        }
        _ => read_workbook(path),
    }
}

fn read_workbook(path: &Path) -> SheetResult<RawSheet> {
    let mut workbook = open_workbook_auto(path).map_err(|e| SheetError::Open {
        path: PathBuf::from(path),
        message: e.to_string(),
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(SheetError::NoSheets)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SheetError::Read {
            sheet: sheet_name.clone(),
            message: e.to_string(),
        })?;

    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    let width = if range.is_empty() { 0 } else { start_col + range.width() };

    let mut rows: Vec<Vec<CellValue>> = Vec::with_capacity(start_row + range.height());
    rows.extend((0..start_row).map(|_| vec![CellValue::Empty; width]));
    for source_row in range.rows() {
        let mut row = vec![CellValue::Empty; start_col];
        row.extend(source_row.iter().map(decode_cell));
        rows.push(row);
    }

    Ok(RawSheet::new(sheet_name, rows))
}

/// Convert a calamine cell. Dates keep their serial number.
pub fn decode_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        other => CellValue::Text(other.to_string()),
    }
}

// =============================================================================
// CSV sources
// =============================================================================

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.to_string(),
            // Fallback: UTF-8 with lossy conversion
            None => String::from_utf8_lossy(bytes).to_string(),
        },
    };
    decoded.trim_start_matches('\u{feff}').to_string()
}

/// Lines sampled for delimiter detection. The banner line alone usually has
/// no separator at all.
const DELIMITER_SAMPLE_LINES: usize = 5;

/// Detect the delimiter by counting occurrences in the first few lines
pub fn detect_delimiter(content: &str) -> char {
    let sample: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(DELIMITER_SAMPLE_LINES)
        .collect();

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count: usize = sample.iter().map(|line| line.matches(sep).count()).sum();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Type a CSV field the way a spreadsheet application would on import.
///
/// Finite numbers become [`CellValue::Number`], `TRUE`/`FALSE` (any case)
/// become [`CellValue::Bool`], anything else stays text.
pub fn decode_csv_field(field: &str) -> CellValue {
    if field.is_empty() {
        return CellValue::Empty;
    }
    if field.eq_ignore_ascii_case("true") {
        return CellValue::Bool(true);
    }
    if field.eq_ignore_ascii_case("false") {
        return CellValue::Bool(false);
    }
    match field.parse::<f64>() {
        Ok(n) if n.is_finite() => CellValue::Number(n),
        _ => CellValue::Text(field.to_string()),
    }
}

/// Parse CSV bytes into a grid, typing each field with [`decode_csv_field`].
pub fn read_csv_bytes(bytes: &[u8], name: &str) -> SheetResult<RawSheet> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter as u8)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(decode_csv_field).collect());
    }

    Ok(RawSheet::new(name, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    fn sheet(rows: &[&[&str]]) -> RawSheet {
        RawSheet::new(
            "Sheet1",
            rows.iter()
                .map(|r| r.iter().map(|&c| CellValue::from(c)).collect())
                .collect(),
        )
    }

    #[test]
    fn test_header_and_data_split() {
        let raw = sheet(&[&["Reporte"], &["a", "b"], &["1", "2"], &["3", "4"]]);
        assert_eq!(raw.column_names().unwrap(), vec!["a", "b"]);
        assert_eq!(raw.data_rows().len(), 2);

        let records = raw.records().unwrap();
        assert_eq!(records[1].get("b"), Some(&CellValue::from("4")));
    }

    #[test]
    fn test_header_only_has_no_records() {
        let raw = sheet(&[&["Reporte"], &["a", "b"]]);
        assert!(raw.records().unwrap().is_empty());
    }

    #[test]
    fn test_missing_header_row() {
        let raw = sheet(&[&["Reporte"]]);
        let err = raw.records().unwrap_err();
        assert!(matches!(err, SheetError::MissingHeaderRow { rows: 1 }));
    }

    #[test]
    fn test_source_format() {
        assert_eq!(SourceFormat::from_path(Path::new("r.XLSX")), SourceFormat::Xlsx);
        assert_eq!(SourceFormat::from_path(Path::new("r.csv")), SourceFormat::Csv);
        assert_eq!(SourceFormat::from_path(Path::new("r.xls")), SourceFormat::OtherSpreadsheet);
        assert_eq!(SourceFormat::from_path(Path::new("r.xlsm")), SourceFormat::OtherSpreadsheet);
    }

    #[test]
    fn test_read_xlsx_keeps_blank_cells_and_types() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("export.xlsx");

        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.write_string(0, 0, "Estudios leídos").unwrap();
        ws.write_string(1, 0, "Nombre del paciente").unwrap();
        ws.write_string(1, 1, "Edad").unwrap();
        ws.write_string(1, 2, "Sede").unwrap();
        ws.write_string(2, 0, "Ana").unwrap();
        ws.write_number(2, 1, 42).unwrap();
        workbook.save(&path).unwrap();

        let raw = read_sheet(&path).unwrap();
        assert_eq!(raw.row_count(), 3);
        assert_eq!(raw.rows[2].len(), 3);
        assert_eq!(raw.rows[2][1], CellValue::Number(42.0));
        assert_eq!(raw.rows[2][2], CellValue::Empty);
    }

    #[test]
    fn test_read_xlsx_pads_to_a1() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("offset.xlsx");

        let mut workbook = Workbook::new();
        let ws = workbook.add_worksheet();
        ws.write_string(1, 1, "a").unwrap();
        ws.write_string(2, 1, "1").unwrap();
        workbook.save(&path).unwrap();

        let raw = read_sheet(&path).unwrap();
        assert_eq!(raw.row_count(), 3);
        assert_eq!(raw.rows[0], vec![CellValue::Empty, CellValue::Empty]);
        assert_eq!(raw.column_names().unwrap(), vec!["", "a"]);
        assert_eq!(raw.data_rows()[0][1], CellValue::from("1"));
    }

    #[test]
    fn test_only_first_sheet_is_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("two.xlsx");

        let mut workbook = Workbook::new();
        workbook.add_worksheet().write_string(0, 0, "first").unwrap();
        workbook.add_worksheet().write_string(0, 0, "second").unwrap();
        workbook.save(&path).unwrap();

        let raw = read_sheet(&path).unwrap();
        assert_eq!(raw.rows[0][0], CellValue::from("first"));
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let dir = tempdir().unwrap();
        let err = read_sheet(dir.path().join("nope.xlsx")).unwrap_err();
        assert!(matches!(err, SheetError::Open { .. }));
    }

    #[test]
    fn test_corrupt_file_is_open_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.xlsx");
        std::fs::write(&path, b"definitely not a zip").unwrap();
        assert!(read_sheet(&path).is_err());
    }

    #[test]
    fn test_csv_source() {
        let csv = "Reporte\nNombre del paciente;Edad\nAna;30\nLuis\n";
        let raw = read_csv_bytes(csv.as_bytes(), "export").unwrap();
        assert_eq!(raw.name, "export");
        assert_eq!(raw.column_names().unwrap(), vec!["Nombre del paciente", "Edad"]);

        let records = raw.records().unwrap();
        assert_eq!(records[0].get("Edad"), Some(&CellValue::Number(30.0)));
        assert!(!records[1].contains("Edad"));
    }

    #[test]
    fn test_csv_empty_field_is_empty_cell() {
        let raw = read_csv_bytes(b"t\na,b\n,2\n", "x").unwrap();
        assert_eq!(raw.rows[2][0], CellValue::Empty);
    }

    #[test]
    fn test_csv_fields_are_typed() {
        assert_eq!(decode_csv_field("0"), CellValue::Number(0.0));
        assert_eq!(decode_csv_field("-2.5"), CellValue::Number(-2.5));
        assert_eq!(decode_csv_field("TRUE"), CellValue::Bool(true));
        assert_eq!(decode_csv_field("false"), CellValue::Bool(false));
        assert_eq!(decode_csv_field("Norte"), CellValue::from("Norte"));
        assert_eq!(decode_csv_field("NaN"), CellValue::from("NaN"));
        assert_eq!(decode_csv_field("inf"), CellValue::from("inf"));
        assert_eq!(decode_csv_field("A-123"), CellValue::from("A-123"));
        assert_eq!(decode_csv_field(""), CellValue::Empty);
    }

    #[test]
    fn test_csv_zero_is_falsy_like_workbook_zero() {
        let raw = read_csv_bytes(b"banner\nEdad;Sede\n0;Norte\n", "x").unwrap();
        let records = raw.records().unwrap();
        assert_eq!(records[0].get("Edad"), Some(&CellValue::Number(0.0)));
        assert!(!records[0].get("Edad").unwrap().is_truthy());
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c"), ';');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Crítico" in ISO-8859-1
        let bytes: &[u8] = &[0x43, 0x72, 0xED, 0x74, 0x69, 0x63, 0x6F];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Crítico");
    }

    #[test]
    fn test_bom_is_stripped() {
        let decoded = decode_content("\u{feff}a,b".as_bytes(), "utf-8");
        assert_eq!(decoded, "a,b");
    }
}
