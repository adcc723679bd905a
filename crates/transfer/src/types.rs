use std::path::{Path, PathBuf};

use patentupload_protocol::ImportResponse;
use patentupload_protocol::constants::FALLBACK_FILE_NAME;
use serde::{Deserialize, Serialize};

/// One file queued for upload.
///
/// Immutable once queued: the display name is what the operator sees,
/// the source is where the bytes are read from at transfer time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    pub display_name: String,
    pub source: PathBuf,
}

impl TransferItem {
    pub fn new(display_name: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            display_name: display_name.into(),
            source: source.into(),
        }
    }

    /// Builds an item keyed by the basename of `path`.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        Self {
            display_name,
            source: path.to_path_buf(),
        }
    }
}

/// Lifecycle of a single record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    #[default]
    Pending,
    Uploading,
    Completed,
    Failed,
}

impl TransferStatus {
    /// `completed` and `failed` only change through an explicit retry.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Status and progress of one queued file.
///
/// `error` is set iff the status is `Failed`; `result` iff `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub file_index: usize,
    pub file_name: String,
    pub progress: u8,
    pub status: TransferStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ImportResponse>,
}

impl ProgressRecord {
    /// Fresh pending record.
    pub fn pending(file_index: usize, file_name: impl Into<String>) -> Self {
        Self {
            file_index,
            file_name: file_name.into(),
            progress: 0,
            status: TransferStatus::Pending,
            error: None,
            result: None,
        }
    }

    /// Progress counted towards the overall figure: a completed record
    /// always weighs 100 whatever its stored value.
    pub fn effective_progress(&self) -> u8 {
        match self.status {
            TransferStatus::Completed => 100,
            _ => self.progress,
        }
    }
}
