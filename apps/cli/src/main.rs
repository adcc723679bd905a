//! patent-upload entry point.

mod args;
mod client_adapter;
mod config;
mod console;
mod pipeline;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::PoisonError;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use patentupload_event_log::{EventLog, EventLogLayer, SharedEventLog, default_export_name};

use args::Cli;
use config::Settings;

/// Targets whose tracing output is also kept in the exportable event log.
const LOGGED_TARGETS: [&str; 3] = ["patentupload_client", "patentupload_excel", "patent_upload"];

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let (mut settings, parse_err) = Settings::load_from(&config_path)?;
    settings.merge_cli(&cli);

    let log = EventLog::shared();
    init_tracing(settings.log_level.as_deref(), &log);

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "starting patent-upload");
    if let Some(e) = parse_err {
        tracing::warn!(path = %config_path.display(), error = %e, "invalid settings file, using defaults");
    }

    if cli.save_config {
        settings.save_to(&config_path)?;
        tracing::info!(path = %config_path.display(), "settings saved");
    }

    let code = pipeline::run(&cli, &settings, &log).await;

    if let Some(target) = &cli.log_file {
        let path = log_file_path(target);
        let snapshot = log.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match snapshot.save(&path).await {
            Ok(()) => tracing::info!(path = %path.display(), "event log written"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to write event log"),
        }
    }

    code
}

/// An existing directory gets a timestamped file name inside it.
fn log_file_path(target: &Path) -> PathBuf {
    if target.is_dir() {
        target.join(default_export_name())
    } else {
        target.to_path_buf()
    }
}

fn init_tracing(level: Option<&str>, log: &SharedEventLog) {
    let filter = EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| level.and_then(|l| EnvFilter::try_new(l).ok()))
        .unwrap_or_else(|| EnvFilter::new("info,patentupload=debug,patent_upload=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EventLogLayer::new(log.clone(), LOGGED_TARGETS))
        .init();
}
