//! Scan → convert → upload.

use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use patentupload_client::HttpTransferClient;
use patentupload_event_log::SharedEventLog;
use patentupload_excel::{convert_files, scan_directory};
use patentupload_upload::{
    ProgressRecord, RunConfig, RunSummary, TransferItem, TransferStatus, UploadError,
    UploadOrchestrator,
};
use tracing::{info, warn};

use crate::args::Cli;
use crate::client_adapter::HttpAdapter;
use crate::config::Settings;
use crate::console;

/// Exit code when the run finished but some files failed.
const EXIT_PARTIAL: u8 = 2;

pub async fn run(cli: &Cli, settings: &Settings, log: &SharedEventLog) -> anyhow::Result<ExitCode> {
    let client =
        HttpTransferClient::new()?.only_valid_invention(settings.only_valid_invention);

    if cli.check {
        return Ok(check(&client, &settings.server_url).await);
    }

    let (Some(input), Some(output)) = (cli.input.as_deref(), cli.output.as_deref()) else {
        anyhow::bail!("--input and --output are required");
    };

    let Some(files) = prepare(input, output, settings).await? else {
        return Ok(ExitCode::SUCCESS);
    };
    let items = files.iter().map(TransferItem::from_path).collect();

    let summary = upload(items, settings.run_config(), client, cli.retry_failed, log).await?;
    Ok(if summary.failed > 0 {
        ExitCode::from(EXIT_PARTIAL)
    } else {
        ExitCode::SUCCESS
    })
}

async fn check(client: &HttpTransferClient, server: &str) -> ExitCode {
    if server.trim().is_empty() {
        warn!("no server URL configured");
        return ExitCode::FAILURE;
    }
    if client.test_connection(server).await {
        info!(server, "server is reachable");
        ExitCode::SUCCESS
    } else {
        warn!(server, "server is not reachable");
        ExitCode::FAILURE
    }
}

/// Scans and converts. `None` when there is nothing to upload.
async fn prepare(
    input: &Path,
    output: &Path,
    settings: &Settings,
) -> anyhow::Result<Option<Vec<std::path::PathBuf>>> {
    let scan = scan_directory(input)
        .with_context(|| format!("cannot scan {}", input.display()))?;
    if scan.file_count == 0 {
        warn!(input = %input.display(), "no workbooks found, nothing to upload");
        return Ok(None);
    }
    info!(
        files = scan.file_count,
        bytes = scan.total_size,
        "workbooks found"
    );

    let converted = convert_files(input, output, &settings.mappings())
        .await
        .context("conversion failed")?;
    info!(files = converted.len(), output = %output.display(), "workbooks converted");
    Ok(Some(converted))
}

async fn upload(
    items: Vec<TransferItem>,
    config: RunConfig,
    client: HttpTransferClient,
    retry_failed: bool,
    log: &SharedEventLog,
) -> anyhow::Result<RunSummary> {
    let orch = Arc::new(UploadOrchestrator::new(Arc::new(HttpAdapter::new(client))));
    let forwarder = console::spawn_event_forwarder(orch.subscribe(), log.clone());

    let toggle = std::io::stdin().is_terminal().then(|| {
        println!("  (type p + Enter to pause or resume)");
        console::spawn_pause_toggle(Arc::clone(&orch))
    });

    let result = drive(&orch, items, &config, retry_failed).await;

    if let Some(toggle) = toggle {
        toggle.abort();
        let _ = toggle.await;
    }
    let records = orch.progress();
    let pending = orch.pending_count();
    if pending > 0 {
        warn!(pending, "some files were never attempted");
    }
    drop(orch);
    let _ = forwarder.await;

    let summary = result?;
    print_report(&records, &summary);
    Ok(summary)
}

async fn drive(
    orch: &UploadOrchestrator,
    items: Vec<TransferItem>,
    config: &RunConfig,
    retry_failed: bool,
) -> Result<RunSummary, UploadError> {
    orch.initialize(items)?;
    let mut summary = orch.run(config).await?;

    if retry_failed && summary.failed > 0 {
        let retried = orch.retry_failed().await?;
        summary.completed += retried.completed;
        summary.failed = retried.failed;
    }
    Ok(summary)
}

fn print_report(records: &[ProgressRecord], summary: &RunSummary) {
    println!();
    for rec in records {
        match rec.status {
            TransferStatus::Completed => {
                let counts = rec
                    .result
                    .as_ref()
                    .and_then(|r| r.data)
                    .map(|d| {
                        format!(
                            " (modified {}, added {})",
                            d.modified_count, d.upserted_count
                        )
                    })
                    .unwrap_or_default();
                println!("  ✓ {}{counts}", rec.file_name);
            }
            TransferStatus::Failed => {
                println!(
                    "  ✗ {}: {}",
                    rec.file_name,
                    rec.error.as_deref().unwrap_or("unknown error")
                );
            }
            TransferStatus::Pending | TransferStatus::Uploading => {
                println!("  - {} (not uploaded)", rec.file_name);
            }
        }
    }
    println!();
    println!(
        "succeeded: {}  failed: {}  total: {}",
        summary.completed, summary.failed, summary.total
    );
    if summary.is_partial_failure() {
        println!("some files failed; rerun with --retry-failed to retry them once");
    }
}
