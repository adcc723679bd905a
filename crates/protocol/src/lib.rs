//! Wire types shared between the import service client, the upload
//! orchestrator and the spreadsheet converter.

pub mod constants;
pub mod types;

pub use types::{
    ColumnMapping, ImportResponse, ImportSummary, LoginData, LoginRequest, LoginResponse,
    ScanResult,
};
