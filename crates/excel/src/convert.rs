//! Header-mapping workbook conversion.
//!
//! Every sheet is copied cell by cell as text. Only the first row is
//! passed through the column mapping.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use calamine::{Data, Reader, open_workbook_auto};
use patentupload_protocol::ColumnMapping;
use rust_xlsxwriter::Workbook;
use tracing::{debug, info, warn};

use crate::error::ExcelError;
use crate::mapping::mapping_table;
use crate::scan::get_excel_files;

/// Text form of a cell as written to the converted workbook.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::Error(e) => format!("ERROR: {e:?}"),
        other => other.to_string(),
    }
}

/// Output path for `file`: same position relative to `target_root` as
/// `file` has under `source_root`, always with an `.xlsx` extension.
pub fn target_path(source_root: &Path, file: &Path, target_root: &Path) -> Result<PathBuf, ExcelError> {
    let relative = file.strip_prefix(source_root).map_err(|_| ExcelError::Path {
        path: file.to_path_buf(),
        root: source_root.to_path_buf(),
    })?;
    Ok(target_root.join(relative).with_extension("xlsx"))
}

/// Converts one workbook synchronously.
pub fn convert_file(
    source: &Path,
    target: &Path,
    mappings: &HashMap<String, String>,
) -> Result<(), ExcelError> {
    let mut input = open_workbook_auto(source).map_err(|e| ExcelError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;
    let mut output = Workbook::new();
    let write_err = |e: rust_xlsxwriter::XlsxError| ExcelError::Write {
        path: target.to_path_buf(),
        source: e,
    };

    for sheet_name in input.sheet_names() {
        let range = match input.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(e) => {
                warn!(file = %source.display(), sheet = %sheet_name, error = %e, "skipping unreadable sheet");
                continue;
            }
        };

        let sheet = output.add_worksheet();
        sheet.set_name(&sheet_name).map_err(write_err)?;

        for (row_idx, row) in range.rows().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                let text = cell_to_string(cell);
                let value = if row_idx == 0 {
                    mappings.get(&text).cloned().unwrap_or(text)
                } else {
                    text
                };
                // Empty cells are left unwritten: they read back as blank,
                // the same as an empty string.
                if value.is_empty() {
                    continue;
                }
                sheet
                    .write_string(row_idx as u32, col_idx as u16, value)
                    .map_err(write_err)?;
            }
        }
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    output.save(target).map_err(write_err)?;
    debug!(source = %source.display(), target = %target.display(), "workbook converted");
    Ok(())
}

/// Converts every spreadsheet under `source_root` into `target_root`.
///
/// Returns the written paths in scan order. Stops at the first file that
/// cannot be converted.
pub async fn convert_files(
    source_root: &Path,
    target_root: &Path,
    mappings: &[ColumnMapping],
) -> Result<Vec<PathBuf>, ExcelError> {
    let files = get_excel_files(source_root)?;
    let table = Arc::new(mapping_table(mappings));
    let mut converted = Vec::with_capacity(files.len());

    info!(count = files.len(), source = %source_root.display(), "converting workbooks");
    for file in files {
        let target = target_path(source_root, &file, target_root)?;
        let table = Arc::clone(&table);
        let out = target.clone();
        tokio::task::spawn_blocking(move || convert_file(&file, &out, &table)).await??;
        converted.push(target);
    }

    info!(count = converted.len(), target = %target_root.display(), "conversion finished");
    Ok(converted)
}
