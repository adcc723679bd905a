use std::time::Duration;

/// Login endpoint, relative to the server base URL.
pub const LOGIN_PATH: &str = "/auth/admin/login";

/// Import endpoint, relative to the server base URL.
pub const IMPORT_PATH: &str = "/admin/patent/import";

/// Query parameter restricting the import to valid invention patents.
pub const ONLY_VALID_INVENTION_PARAM: &str = "onlyValidInvention";

/// Multipart field name the import endpoint reads the workbook from.
pub const IMPORT_FIELD: &str = "file";

/// MIME type of converted workbooks.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// File name used when a source path has no usable basename.
pub const FALLBACK_FILE_NAME: &str = "file.xlsx";

/// Spreadsheet extensions picked up by the scanner.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Pause between two consecutive file uploads.
///
/// Keeps a large batch from hammering the import endpoint.
pub const INTER_ITEM_DELAY: Duration = Duration::from_millis(500);

/// Timeout applied to every HTTP request (uploads of large workbooks included).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Trims trailing slashes from a server base URL.
pub fn normalize_base_url(url: &str) -> &str {
    url.trim().trim_end_matches('/')
}
