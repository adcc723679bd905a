//! Import service client.
//!
//! Async HTTP client using `reqwest`: JSON login, then one multipart
//! upload per workbook with a Bearer token.

use std::path::Path;
use std::time::Duration;

use patentupload_protocol::constants::{
    IMPORT_FIELD, IMPORT_PATH, LOGIN_PATH, ONLY_VALID_INVENTION_PARAM, REQUEST_TIMEOUT, XLSX_MIME,
    normalize_base_url,
};
use patentupload_protocol::{ImportResponse, LoginRequest, LoginResponse};
use patentupload_transfer::ByteProgress;
use reqwest::multipart::{Form, Part};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::debug;

/// Size of the body chunks handed to the transport.
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Errors from the import service client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// 2xx response whose payload reports `success: false`.
    #[error("{0}")]
    Rejected(String),

    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("login response carried no token")]
    InvalidToken,
}

impl Error {
    /// HTTP status associated with the failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Import service client.
pub struct HttpTransferClient {
    http: reqwest::Client,
    only_valid_invention: bool,
}

impl HttpTransferClient {
    /// Creates a client with the default request timeout.
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Creates a client whose requests give up after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            only_valid_invention: false,
        })
    }

    /// Restricts imports to valid invention patents.
    pub fn only_valid_invention(mut self, enabled: bool) -> Self {
        self.only_valid_invention = enabled;
        self
    }

    /// Logs in and returns the session token.
    pub async fn login(&self, endpoint: &str, username: &str, password: &str) -> Result<String, Error> {
        let url = format!("{}{LOGIN_PATH}", normalize_base_url(endpoint));
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        debug!(url = %url, "logging in");
        let resp = self.http.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: LoginResponse = serde_json::from_slice(&resp.bytes().await?)?;
        if !payload.success {
            return Err(Error::Rejected(
                payload.message.unwrap_or_else(|| "login rejected".into()),
            ));
        }
        payload
            .token()
            .map(str::to_string)
            .ok_or(Error::InvalidToken)
    }

    /// Whether the login endpoint answers at all.
    ///
    /// Any HTTP response counts, including 4xx/5xx; only transport
    /// failures (refused connection, timeout, bad URL) report `false`.
    pub async fn test_connection(&self, endpoint: &str) -> bool {
        let url = format!("{}{LOGIN_PATH}", normalize_base_url(endpoint));
        let probe = LoginRequest {
            username: "test".into(),
            password: "test".into(),
        };
        match self.http.post(&url).json(&probe).send().await {
            Ok(resp) => {
                debug!(url = %url, status = resp.status().as_u16(), "server reachable");
                true
            }
            Err(e) => {
                debug!(url = %url, error = %e, "server unreachable");
                false
            }
        }
    }

    /// Uploads one workbook as multipart field `file`.
    ///
    /// `on_progress` receives the share of body bytes handed to the
    /// transport, reported only when the integer percentage moves.
    pub async fn upload(
        &self,
        path: &Path,
        file_name: &str,
        endpoint: &str,
        token: &str,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<ImportResponse, Error> {
        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();

        // The body is read from disk one chunk at a time; each chunk size is
        // reported back as it is handed to the transport.
        let (tx, mut rx) = mpsc::unbounded_channel::<usize>();
        let stream = futures_util::stream::try_unfold((file, tx), |(mut file, tx)| async move {
            let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok::<_, std::io::Error>(None);
            }
            buf.truncate(n);
            let _ = tx.send(n);
            Ok(Some((buf, (file, tx))))
        });

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(file_name.to_string())
            .mime_str(XLSX_MIME)?;
        let form = Form::new().part(IMPORT_FIELD, part);

        let url = format!("{}{IMPORT_PATH}", normalize_base_url(endpoint));
        debug!(url = %url, file = file_name, bytes = total, "uploading workbook");

        let send = self
            .http
            .post(&url)
            .query(&[(
                ONLY_VALID_INVENTION_PARAM,
                self.only_valid_invention.to_string(),
            )])
            .bearer_auth(token)
            .multipart(form)
            .send();
        tokio::pin!(send);

        let mut progress = ByteProgress::new(total);
        let resp = loop {
            tokio::select! {
                res = &mut send => break res?,
                Some(n) = rx.recv() => {
                    if let Some(pct) = progress.advance(n as u64) {
                        on_progress(pct);
                    }
                }
            }
        };
        while let Ok(n) = rx.try_recv() {
            if let Some(pct) = progress.advance(n as u64) {
                on_progress(pct);
            }
        }

        debug!(file = file_name, sent = progress.sent(), total = progress.total(), "body sent");

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ImportResponse = serde_json::from_slice(&resp.bytes().await?)?;
        if !payload.success {
            return Err(Error::Rejected(
                payload.message.unwrap_or_else(|| "import rejected".into()),
            ));
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Reads one full HTTP request (head plus body).
    async fn read_request(stream: &mut tokio::net::TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 8192];
        loop {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                return buf;
            }
            buf.extend_from_slice(&chunk[..n]);

            let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            let body_len = buf.len() - head_end - 4;
            match content_length {
                Some(len) if body_len >= len => return buf,
                None if head.contains("transfer-encoding: chunked") => {
                    if buf.ends_with(b"0\r\n\r\n") {
                        return buf;
                    }
                }
                None => return buf,
                _ => {}
            }
        }
    }

    /// Starts a mock HTTP server answering one request with `status` and
    /// `body`. The handle resolves to the raw request.
    async fn mock_server(status: u16, body: &str) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}/");
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            let Ok((mut stream, _)) = listener.accept().await else {
                return Vec::new();
            };
            let request = read_request(&mut stream).await;

            let resp = format!(
                "HTTP/1.1 {status} Status\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(resp.as_bytes()).await;
            let _ = stream.shutdown().await;
            request
        });

        (url, handle)
    }

    fn workbook(content: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut f, content).unwrap();
        f
    }

    #[tokio::test]
    async fn login_returns_token() {
        let (url, handle) = mock_server(
            200,
            r#"{"success":true,"data":{"id":1,"username":"admin","token":"abc"}}"#,
        )
        .await;

        let client = HttpTransferClient::new().unwrap();
        let token = client.login(&url, "admin", "pw").await.unwrap();
        assert_eq!(token, "abc");

        let req = String::from_utf8_lossy(&handle.await.unwrap()).to_string();
        assert!(req.starts_with("POST /auth/admin/login HTTP/1.1"), "{req}");
        assert!(req.contains(r#""username":"admin""#));
        assert!(req.contains(r#""password":"pw""#));
    }

    #[tokio::test]
    async fn login_http_error_carries_status() {
        let (url, handle) = mock_server(401, r#"{"message":"bad credentials"}"#).await;

        let client = HttpTransferClient::new().unwrap();
        let err = client.login(&url, "admin", "nope").await.unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert!(err.to_string().contains("bad credentials"));

        handle.abort();
    }

    #[tokio::test]
    async fn login_success_false_is_rejected() {
        let (url, handle) = mock_server(200, r#"{"success":false,"message":"locked"}"#).await;

        let client = HttpTransferClient::new().unwrap();
        let err = client.login(&url, "admin", "pw").await.unwrap_err();
        assert!(matches!(err, Error::Rejected(ref m) if m == "locked"));

        handle.abort();
    }

    #[tokio::test]
    async fn login_without_token_is_invalid() {
        let (url, handle) =
            mock_server(200, r#"{"success":true,"data":{"id":1,"token":""}}"#).await;

        let client = HttpTransferClient::new().unwrap();
        let err = client.login(&url, "admin", "pw").await.unwrap_err();
        assert!(matches!(err, Error::InvalidToken));

        handle.abort();
    }

    #[tokio::test]
    async fn login_malformed_body_is_json_error() {
        let (url, handle) = mock_server(200, "not json").await;

        let client = HttpTransferClient::new().unwrap();
        let err = client.login(&url, "admin", "pw").await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));

        handle.abort();
    }

    #[tokio::test]
    async fn test_connection_accepts_any_status() {
        let (url, handle) = mock_server(401, r#"{"success":false}"#).await;

        let client = HttpTransferClient::new().unwrap();
        assert!(client.test_connection(&url).await);

        let req = String::from_utf8_lossy(&handle.await.unwrap()).to_string();
        assert!(req.starts_with("POST /auth/admin/login "));
    }

    #[tokio::test]
    async fn test_connection_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = HttpTransferClient::new().unwrap();
        assert!(!client.test_connection(&url).await);
    }

    #[tokio::test]
    async fn upload_sends_multipart_with_bearer() {
        let (url, handle) = mock_server(
            200,
            r#"{"success":true,"data":{"modifiedCount":2,"upsertedCount":3,"excelCount":5}}"#,
        )
        .await;
        let content = vec![b'x'; UPLOAD_CHUNK_SIZE * 2 + 100];
        let file = workbook(&content);

        let seen = Mutex::new(Vec::new());
        let on_progress = |pct: u8| seen.lock().unwrap().push(pct);

        let client = HttpTransferClient::new().unwrap().only_valid_invention(true);
        let resp = client
            .upload(file.path(), "batch.xlsx", &url, "tok", &on_progress)
            .await
            .unwrap();

        let summary = resp.data.unwrap();
        assert_eq!(summary.upserted_count, 3);
        assert_eq!(summary.excel_count, 5);

        let req = String::from_utf8_lossy(&handle.await.unwrap()).to_string();
        let lower = req.to_lowercase();
        assert!(
            req.starts_with("POST /admin/patent/import?onlyValidInvention=true HTTP/1.1"),
            "{req}"
        );
        assert!(lower.contains("authorization: bearer tok"));
        assert!(lower.contains("content-type: multipart/form-data; boundary="));
        assert!(req.contains(r#"name="file"; filename="batch.xlsx""#));
        assert!(req.contains(XLSX_MIME));
        assert!(req.contains(&"x".repeat(1000)));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
    }

    #[tokio::test]
    async fn upload_flag_defaults_to_false() {
        let (url, handle) = mock_server(200, r#"{"success":true}"#).await;
        let file = workbook(b"data");

        let client = HttpTransferClient::new().unwrap();
        client
            .upload(file.path(), "a.xlsx", &url, "tok", &|_: u8| {})
            .await
            .unwrap();

        let req = String::from_utf8_lossy(&handle.await.unwrap()).to_string();
        assert!(req.starts_with("POST /admin/patent/import?onlyValidInvention=false "));
    }

    #[tokio::test]
    async fn upload_server_error_carries_status() {
        let (url, handle) = mock_server(500, r#"{"message":"boom"}"#).await;
        let file = workbook(b"data");

        let client = HttpTransferClient::new().unwrap();
        let err = client
            .upload(file.path(), "a.xlsx", &url, "tok", &|_: u8| {})
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert!(err.to_string().contains("boom"));

        handle.abort();
    }

    #[tokio::test]
    async fn upload_success_false_is_rejected() {
        let (url, handle) =
            mock_server(200, r#"{"success":false,"message":"bad sheet"}"#).await;
        let file = workbook(b"data");

        let client = HttpTransferClient::new().unwrap();
        let err = client
            .upload(file.path(), "a.xlsx", &url, "tok", &|_: u8| {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Rejected(ref m) if m == "bad sheet"));
        assert_eq!(err.status_code(), None);

        handle.abort();
    }

    #[tokio::test]
    async fn upload_malformed_body_is_json_error() {
        let (url, handle) = mock_server(200, "not json").await;
        let file = workbook(b"data");

        let client = HttpTransferClient::new().unwrap();
        let err = client
            .upload(file.path(), "a.xlsx", &url, "tok", &|_: u8| {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert_eq!(err.status_code(), None);

        handle.abort();
    }

    #[tokio::test]
    async fn upload_empty_file_sends_empty_part() {
        let (url, handle) = mock_server(200, r#"{"success":true}"#).await;
        let file = workbook(b"");

        let client = HttpTransferClient::new().unwrap();
        let resp = client
            .upload(file.path(), "empty.xlsx", &url, "tok", &|_: u8| {})
            .await
            .unwrap();
        assert!(resp.success);

        let req = String::from_utf8_lossy(&handle.await.unwrap()).to_string();
        assert!(req.contains(r#"filename="empty.xlsx""#));
    }

    #[tokio::test]
    async fn upload_missing_file_fails_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone.xlsx");

        let client = HttpTransferClient::new().unwrap();
        // Port 9 is never contacted: opening the file fails first.
        let err = client
            .upload(&missing, "gone.xlsx", "http://127.0.0.1:9", "tok", &|_: u8| {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
