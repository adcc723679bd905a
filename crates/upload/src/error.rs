//! Upload error types.

use patentupload_transfer::LedgerError;

/// Errors surfaced by the orchestrator to its caller.
///
/// Only setup-phase failures and misuse come out of a run; per-item
/// [`TransferError`]s are recorded in the ledger instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl From<LedgerError> for UploadError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::IndexOutOfRange { index, len } => Self::IndexOutOfRange { index, len },
            LedgerError::Busy(index) => {
                Self::InvalidState(format!("item {index} is still uploading"))
            }
        }
    }
}

/// Failure of a single file transfer.
///
/// Displays as `[code] message` when the server answered with a status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}{message}", status_prefix(.status_code))]
pub struct TransferError {
    pub status_code: Option<u16>,
    pub message: String,
}

fn status_prefix(status_code: &Option<u16>) -> String {
    status_code.map(|c| format!("[{c}] ")).unwrap_or_default()
}

impl TransferError {
    /// Failure without an HTTP status (network, IO, rejected payload).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status_code: None,
            message: message.into(),
        }
    }

    /// Failure tied to an HTTP status code.
    pub fn with_status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            message: message.into(),
        }
    }
}
