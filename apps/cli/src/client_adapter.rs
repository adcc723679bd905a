//! Adapter bridging `HttpTransferClient` to the orchestrator's
//! `TransferClient` contract.

use patentupload_client::{Error as ClientError, HttpTransferClient};
use patentupload_protocol::ImportResponse;
use patentupload_upload::{
    Credential, ProgressFn, Session, TransferClient, TransferError, TransferFuture, TransferItem,
    UploadError,
};

/// Implements `TransferClient` by delegating to the HTTP client.
pub struct HttpAdapter {
    client: HttpTransferClient,
}

impl HttpAdapter {
    pub fn new(client: HttpTransferClient) -> Self {
        Self { client }
    }
}

impl TransferClient for HttpAdapter {
    fn authenticate<'a>(
        &'a self,
        endpoint: &'a str,
        username: &'a str,
        password: &'a str,
    ) -> TransferFuture<'a, Result<Credential, UploadError>> {
        Box::pin(async move {
            self.client
                .login(endpoint, username, password)
                .await
                .map(Credential::new)
                .map_err(|e| UploadError::Authentication(describe(&e)))
        })
    }

    fn transfer<'a>(
        &'a self,
        item: &'a TransferItem,
        session: &'a Session,
        on_progress: ProgressFn<'a>,
    ) -> TransferFuture<'a, Result<ImportResponse, TransferError>> {
        Box::pin(async move {
            self.client
                .upload(
                    &item.source,
                    &item.display_name,
                    &session.endpoint,
                    session.credential.expose(),
                    on_progress,
                )
                .await
                .map_err(|e| to_transfer_error(&e))
        })
    }
}

/// Maps a client failure onto the per-item error recorded in the ledger.
pub fn to_transfer_error(e: &ClientError) -> TransferError {
    let message = describe(e);
    match e.status_code() {
        Some(code) => TransferError::with_status(code, message),
        None => TransferError::new(message),
    }
}

/// Human-readable reason, preferring the server's own `message` field.
fn describe(e: &ClientError) -> String {
    match e {
        ClientError::Api { status, body } => server_message(body)
            .unwrap_or_else(|| format!("HTTP {status}")),
        other => other.to_string(),
    }
}

fn server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
