use serde::{Deserialize, Serialize};

/// Body of `POST /auth/admin/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Account data returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub username: String,
    pub token: String,
}

/// Response of `POST /auth/admin/login`.
///
/// Only `success: true` with a non-empty `data.token` counts as a login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<LoginData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoginResponse {
    /// Returns the session token if the payload describes a successful login.
    pub fn token(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.data
            .as_ref()
            .map(|d| d.token.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Row counters reported by the import endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImportSummary {
    pub modified_count: i64,
    pub upserted_count: i64,
    pub excel_count: i64,
}

/// Response of `POST /admin/patent/import`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<ImportSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Spreadsheets found under a source folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub file_count: usize,
    pub total_size: u64,
    pub files: Vec<String>,
}

/// Renames a header column during conversion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub original: String,
    pub mapped: String,
}

impl ColumnMapping {
    pub fn new(original: impl Into<String>, mapped: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            mapped: mapped.into(),
        }
    }
}
