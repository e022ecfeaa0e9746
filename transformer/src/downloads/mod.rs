//! Helpers for the portal's download folder.
//!
//! The export lands in a downloads directory under whatever name the portal
//! picks. These helpers find the newest export, give it the report name
//! `<user>-leidos-<YYYY-MM-DD>.<ext>`, and list the files a batch run covers.

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{PipelineError, PipelineResult};
use crate::writer::OUTPUT_SUFFIX;

/// Extensions the portal exports
pub const EXPORT_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// Extensions the reader accepts
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["xlsx", "xlsm", "xls", "xlsb", "ods", "csv"];

fn extension_in(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| allowed.iter().any(|a| e.eq_ignore_ascii_case(a)))
        .unwrap_or(false)
}

/// True for files already produced by a transform (`*-r.<ext>`).
pub fn is_transformed_output(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(OUTPUT_SUFFIX))
}

/// Report file name: `<username>-leidos-<YYYY-MM-DD>.<ext>`.
pub fn report_file_name(username: &str, date: NaiveDate, extension: &str) -> String {
    format!("{}-leidos-{}.{}", username, date.format("%Y-%m-%d"), extension)
}

fn candidates(dir: &Path, allowed: &[&str]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && extension_in(&path, allowed) && !is_transformed_output(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Readable spreadsheets in `dir`, sorted by name, transform outputs excluded.
pub fn spreadsheets_in(dir: &Path) -> io::Result<Vec<PathBuf>> {
    candidates(dir, &SUPPORTED_EXTENSIONS)
}

/// The most recently modified portal export in `dir`.
pub fn latest_spreadsheet(dir: &Path) -> PipelineResult<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for path in candidates(dir, &EXPORT_EXTENSIONS)? {
        let modified = fs::metadata(&path)?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    newest
        .map(|(_, path)| path)
        .ok_or_else(|| PipelineError::NoSpreadsheetFound(dir.to_path_buf()))
}

/// Rename a download to the report name, keeping directory and extension.
///
/// An existing file with the target name is replaced.
pub fn rename_download(path: &Path, username: &str, date: NaiveDate) -> io::Result<PathBuf> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("xlsx");
    let target = path.with_file_name(report_file_name(username, date, extension));
    if target != path {
        fs::rename(path, &target)?;
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn touch(path: &Path, age_secs: u64) {
        let file = fs::File::create(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn test_report_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 7, 22).unwrap();
        assert_eq!(
            report_file_name("ddavila", date, "xlsx"),
            "ddavila-leidos-2025-07-22.xlsx"
        );
    }

    #[test]
    fn test_is_transformed_output() {
        assert!(is_transformed_output(Path::new("report-r.xlsx")));
        assert!(!is_transformed_output(Path::new("report.xlsx")));
        assert!(!is_transformed_output(Path::new("report-rx.xlsx")));
    }

    #[test]
    fn test_latest_picks_newest_export() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("old.xlsx"), 300);
        touch(&dir.path().join("new.xls"), 10);
        touch(&dir.path().join("newest-r.xlsx"), 0);
        touch(&dir.path().join("notes.txt"), 0);

        let latest = latest_spreadsheet(dir.path()).unwrap();
        assert_eq!(latest, dir.path().join("new.xls"));
    }

    #[test]
    fn test_latest_in_empty_dir() {
        let dir = tempdir().unwrap();
        let err = latest_spreadsheet(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::NoSpreadsheetFound(_)));
    }

    #[test]
    fn test_spreadsheets_in_sorted_and_filtered() {
        let dir = tempdir().unwrap();
        for name in ["b.xlsx", "a.csv", "a-r.csv", "c.ODS", "readme.md"] {
            touch(&dir.path().join(name), 0);
        }
        fs::create_dir(dir.path().join("d.xlsx")).unwrap();

        let files = spreadsheets_in(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.xlsx", "c.ODS"]);
    }

    #[test]
    fn test_rename_download() {
        let dir = tempdir().unwrap();
        let download = dir.path().join("ExportResultados.xlsx");
        touch(&download, 0);
        let date = NaiveDate::from_ymd_opt(2025, 7, 22).unwrap();

        let renamed = rename_download(&download, "ddavila", date).unwrap();
        assert_eq!(renamed, dir.path().join("ddavila-leidos-2025-07-22.xlsx"));
        assert!(renamed.exists());
        assert!(!download.exists());
    }
}
