//! Data types for an upload run.

use std::time::Duration;

use patentupload_protocol::constants::{INTER_ITEM_DELAY, normalize_base_url};

use crate::error::UploadError;

/// Server coordinates for one run, passed explicitly to
/// [`UploadOrchestrator::run`](crate::UploadOrchestrator::run).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

impl RunConfig {
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Checks that every field is filled in.
    pub fn validate(&self) -> Result<(), UploadError> {
        let missing: Vec<&str> = [
            ("server URL", &self.endpoint),
            ("username", &self.username),
            ("password", &self.password),
        ]
        .into_iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(UploadError::Configuration(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }

    /// Endpoint without trailing slashes.
    pub fn base_url(&self) -> &str {
        normalize_base_url(&self.endpoint)
    }
}

/// Opaque bearer credential issued by the login endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Authenticated context: base endpoint plus credential.
///
/// Never persisted; lives until the queue is cleared or logged out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub endpoint: String,
    pub credential: Credential,
}

impl Session {
    pub fn new(endpoint: &str, credential: Credential) -> Self {
        Self {
            endpoint: normalize_base_url(endpoint).to_string(),
            credential,
        }
    }
}

/// Orchestrator tuning.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Pause between consecutive items (not after the last one).
    pub inter_item_delay: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            inter_item_delay: INTER_ITEM_DELAY,
            event_capacity: 256,
        }
    }
}

/// Where the orchestrator currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Authenticating,
    /// Transferring the item at this index.
    Running(usize),
    /// Waiting for resume before starting the item at this index.
    Paused(usize),
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl RunSummary {
    /// Returns whether some items succeeded and others failed.
    pub fn is_partial_failure(&self) -> bool {
        self.failed > 0 && self.completed > 0
    }
}
