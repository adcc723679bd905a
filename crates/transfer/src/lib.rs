//! Queue items and per-file progress bookkeeping for batch uploads.
//!
//! The [`ProgressLedger`] holds one [`ProgressRecord`] per queued
//! [`TransferItem`] and derives the aggregate numbers shown to the
//! operator. It has a single writer (the upload orchestrator); readers
//! get cloned snapshots.

mod ledger;
mod progress;
mod types;

pub use ledger::ProgressLedger;
pub use progress::{ByteProgress, percent_of};
pub use types::{ProgressRecord, TransferItem, TransferStatus};

/// Errors produced by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("record {0} is still uploading")]
    Busy(usize),
}
