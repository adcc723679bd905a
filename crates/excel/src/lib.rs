//! Workbook preparation for the import service.
//!
//! Finds spreadsheets under a directory and rewrites them with renamed
//! header columns, keeping the directory layout.

mod convert;
mod error;
mod mapping;
mod scan;

pub use convert::{cell_to_string, convert_file, convert_files, target_path};
pub use error::ExcelError;
pub use mapping::{DEFAULT_HEADERS, default_mappings, mapping_table, parse_column_mapping};
pub use scan::{get_excel_files, is_spreadsheet, scan_directory};
