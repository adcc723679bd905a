use patentupload_protocol::ImportResponse;

use crate::LedgerError;
use crate::types::{ProgressRecord, TransferItem, TransferStatus};

/// Ordered per-file progress records with derived aggregate metrics.
///
/// Record `i` always describes queue item `i`. All transitions validate
/// the index; none of them touch other records.
#[derive(Debug, Clone, Default)]
pub struct ProgressLedger {
    records: Vec<ProgressRecord>,
}

impl ProgressLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every record with a fresh `pending` entry per item.
    ///
    /// Refused while a record is `uploading`.
    pub fn initialize(&mut self, items: &[TransferItem]) -> Result<(), LedgerError> {
        if let Some(busy) = self
            .records
            .iter()
            .find(|r| r.status == TransferStatus::Uploading)
        {
            return Err(LedgerError::Busy(busy.file_index));
        }

        self.records = items
            .iter()
            .enumerate()
            .map(|(i, item)| ProgressRecord::pending(i, item.display_name.clone()))
            .collect();
        Ok(())
    }

    /// Drops every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether the ledger holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot of all records.
    pub fn records(&self) -> Vec<ProgressRecord> {
        self.records.clone()
    }

    /// Returns record `index`, if it exists.
    pub fn get(&self, index: usize) -> Option<&ProgressRecord> {
        self.records.get(index)
    }

    /// Unweighted mean of the effective per-record progress, rounded to
    /// nearest. Zero for an empty ledger.
    pub fn overall_progress(&self) -> u8 {
        if self.records.is_empty() {
            return 0;
        }
        let total: u64 = self
            .records
            .iter()
            .map(|r| u64::from(r.effective_progress()))
            .sum();
        let len = self.records.len() as u64;
        // Integer round-half-up of total / len.
        ((total * 2 + len) / (len * 2)) as u8
    }

    /// Returns the number of completed records.
    pub fn completed_count(&self) -> usize {
        self.count(TransferStatus::Completed)
    }

    /// Returns the number of failed records.
    pub fn failed_count(&self) -> usize {
        self.count(TransferStatus::Failed)
    }

    /// Returns the number of records not attempted yet.
    pub fn pending_count(&self) -> usize {
        self.count(TransferStatus::Pending)
    }

    /// Indices of failed records, in queue order.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.records
            .iter()
            .filter(|r| r.status == TransferStatus::Failed)
            .map(|r| r.file_index)
            .collect()
    }

    /// Marks a record as uploading: progress back to 0, previous outcome cleared.
    pub fn set_uploading(&mut self, index: usize) -> Result<(), LedgerError> {
        let rec = self.record_mut(index)?;
        rec.status = TransferStatus::Uploading;
        rec.progress = 0;
        rec.error = None;
        rec.result = None;
        Ok(())
    }

    /// Records transport progress. Values above 100 are clamped and a
    /// value lower than the stored one is ignored. Completed and failed
    /// records keep their progress.
    pub fn set_progress(&mut self, index: usize, pct: u8) -> Result<(), LedgerError> {
        let rec = self.record_mut(index)?;
        if rec.status.is_terminal() {
            return Ok(());
        }
        let pct = pct.min(100);
        if pct > rec.progress {
            rec.progress = pct;
        }
        Ok(())
    }

    /// Marks a record as completed with the server's result. Progress becomes 100.
    pub fn set_completed(
        &mut self,
        index: usize,
        result: ImportResponse,
    ) -> Result<(), LedgerError> {
        let rec = self.record_mut(index)?;
        rec.status = TransferStatus::Completed;
        rec.progress = 100;
        rec.error = None;
        rec.result = Some(result);
        Ok(())
    }

    /// Marks a record as failed. Progress keeps its last value.
    pub fn set_failed(&mut self, index: usize, error: impl Into<String>) -> Result<(), LedgerError> {
        let rec = self.record_mut(index)?;
        rec.status = TransferStatus::Failed;
        rec.error = Some(error.into());
        rec.result = None;
        Ok(())
    }

    fn count(&self, status: TransferStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    fn record_mut(&mut self, index: usize) -> Result<&mut ProgressRecord, LedgerError> {
        let len = self.records.len();
        self.records
            .get_mut(index)
            .ok_or(LedgerError::IndexOutOfRange { index, len })
    }
}
