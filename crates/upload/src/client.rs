//! Transfer client contract.
//!
//! `TransferClient` is implemented by the app on top of the HTTP client.
//! Using a trait keeps the orchestrator decoupled from transport and
//! testable with mocks.

use std::future::Future;
use std::pin::Pin;

use patentupload_protocol::ImportResponse;
use patentupload_transfer::TransferItem;

use crate::error::{TransferError, UploadError};
use crate::types::{Credential, Session};

/// Boxed future returned by [`TransferClient`] methods.
pub type TransferFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Progress callback receiving integer percentages (0–100).
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Authentication exchange and single-file transfer.
pub trait TransferClient: Send + Sync {
    /// Exchanges credentials for a session credential.
    ///
    /// Implementations report bad credentials, non-2xx responses and
    /// malformed payloads as [`UploadError::Authentication`].
    fn authenticate<'a>(
        &'a self,
        endpoint: &'a str,
        username: &'a str,
        password: &'a str,
    ) -> TransferFuture<'a, Result<Credential, UploadError>>;

    /// Sends one file.
    ///
    /// `on_progress` is called zero or more times with non-decreasing
    /// percentages. No internal retries.
    fn transfer<'a>(
        &'a self,
        item: &'a TransferItem,
        session: &'a Session,
        on_progress: ProgressFn<'a>,
    ) -> TransferFuture<'a, Result<ImportResponse, TransferError>>;
}
