//! HTTP client for the patent import service.

mod client;

pub use client::{Error, HttpTransferClient, UPLOAD_CHUNK_SIZE};
