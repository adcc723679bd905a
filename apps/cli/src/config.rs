//! Persistent settings.
//!
//! Stored as JSON at `~/.config/patentupload/config.json` (`%APPDATA%` on
//! Windows). Command-line flags override whatever the file holds.

use std::path::{Path, PathBuf};

use patentupload_excel::default_mappings;
use patentupload_protocol::ColumnMapping;
use patentupload_upload::RunConfig;
use serde::{Deserialize, Serialize};

use crate::args::Cli;

/// Settings as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub column_mappings: Vec<ColumnMapping>,
    #[serde(default)]
    pub only_valid_invention: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Settings {
    /// Reads settings from `path`.
    ///
    /// A missing file yields defaults. An unparsable file also yields
    /// defaults; the parse error is handed back so the caller can report
    /// it once logging is up.
    pub fn load_from(path: &Path) -> anyhow::Result<(Self, Option<serde_json::Error>)> {
        if !path.exists() {
            return Ok((Self::default(), None));
        }
        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(settings) => Ok((settings, None)),
            Err(e) => Ok((Self::default(), Some(e))),
        }
    }

    /// Writes settings to `path` with owner-only permissions.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, &json)?;
        set_permissions_0600(path);

        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Applies command-line overrides.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(server) = &cli.server {
            self.server_url = server.clone();
        }
        if let Some(username) = &cli.username {
            self.username = username.clone();
        }
        if let Some(password) = &cli.password {
            self.password = password.clone();
        }
        if !cli.column_mappings.is_empty() {
            self.column_mappings = cli.column_mappings.clone();
        }
        if cli.only_valid_invention {
            self.only_valid_invention = true;
        }
        if let Some(level) = &cli.log_level {
            self.log_level = Some(level.clone());
        }
    }

    /// Configured mappings, or the built-in identity set when none are.
    pub fn mappings(&self) -> Vec<ColumnMapping> {
        if self.column_mappings.is_empty() {
            default_mappings()
        } else {
            self.column_mappings.clone()
        }
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(&self.server_url, &self.username, &self.password)
    }
}

fn set_permissions_0600(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600));
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
}

/// Default settings file location.
pub fn default_config_path() -> PathBuf {
    config_base_dir().join("patentupload").join("config.json")
}

fn config_base_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata)
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home).join(".config")
    }
}
