//! Batch upload orchestration.
//!
//! This crate implements the **control flow** for sending a queue of
//! converted workbooks to the import service. It has no transport
//! dependency: the app provides a [`TransferClient`] implementation that
//! bridges to the actual HTTP client.
//!
//! # Run
//!
//! 1. **Validate** the explicit [`RunConfig`]
//! 2. **Authenticate** once per run
//! 3. **Transfer** items strictly in queue order, one at a time,
//!    honoring pause between items
//! 4. **Record** each outcome in the ledger; a failed item never aborts the run
//! 5. **Summarize** completed vs failed counts
//!
//! Failed items can be re-attempted with [`UploadOrchestrator::retry`]
//! using the session of the latest run.

pub mod client;
pub mod error;
pub mod events;
pub mod orchestrator;
mod pause;
pub mod types;

// Re-export primary types for convenience.
pub use client::{ProgressFn, TransferClient, TransferFuture};
pub use error::{TransferError, UploadError};
pub use events::{Tone, UploadEvent};
pub use orchestrator::UploadOrchestrator;
pub use types::{Credential, OrchestratorOptions, Phase, RunConfig, RunSummary, Session};

pub use patentupload_transfer::{ProgressRecord, TransferItem, TransferStatus};
