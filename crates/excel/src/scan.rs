//! Spreadsheet discovery.

use std::path::{Path, PathBuf};

use patentupload_protocol::ScanResult;
use patentupload_protocol::constants::SPREADSHEET_EXTENSIONS;

use crate::error::ExcelError;

/// Whether `path` looks like a workbook we can convert.
///
/// Extension match is case-insensitive. Office lock files (`~$name.xlsx`)
/// are skipped.
pub fn is_spreadsheet(path: &Path) -> bool {
    let locked = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("~$"));
    let known_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|x| x.eq_ignore_ascii_case(e))
        });
    known_ext && !locked
}

/// Recursively lists spreadsheets under `root`, sorted by path.
pub fn get_excel_files(root: &Path) -> Result<Vec<PathBuf>, ExcelError> {
    let mut files = Vec::new();
    walk_dir(root, &mut files)?;
    files.sort();
    Ok(files)
}

/// Scans `root` and reports spreadsheet count, total size and paths.
pub fn scan_directory(root: &Path) -> Result<ScanResult, ExcelError> {
    let files = get_excel_files(root)?;
    let mut total_size = 0u64;
    for file in &files {
        total_size += std::fs::metadata(file)?.len();
    }

    Ok(ScanResult {
        file_count: files.len(),
        total_size,
        files: files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect(),
    })
}

fn walk_dir(current: &Path, files: &mut Vec<PathBuf>) -> Result<(), ExcelError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;

        if metadata.is_dir() {
            walk_dir(&path, files)?;
        } else if metadata.is_file() && is_spreadsheet(&path) {
            files.push(path);
        }
    }
    Ok(())
}
