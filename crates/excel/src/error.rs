use std::path::PathBuf;

/// Errors from scanning and converting workbooks.
#[derive(Debug, thiserror::Error)]
pub enum ExcelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read workbook {path}: {source}")]
    Read {
        path: PathBuf,
        source: calamine::Error,
    },

    #[error("cannot write workbook {path}: {source}")]
    Write {
        path: PathBuf,
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("invalid column mapping '{0}': expected ORIGINAL:MAPPED")]
    InvalidMapping(String),

    #[error("{path} is not under {root}")]
    Path { path: PathBuf, root: PathBuf },

    #[error("conversion task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
