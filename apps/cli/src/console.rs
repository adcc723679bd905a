//! Terminal side of a run: event narration and keyboard pause.

use std::sync::{Arc, PoisonError};

use patentupload_event_log::{LogLevel, SharedEventLog};
use patentupload_upload::{Tone, UploadEvent, UploadOrchestrator};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

pub fn level_for(tone: Tone) -> LogLevel {
    match tone {
        Tone::Info => LogLevel::Info,
        Tone::Warn => LogLevel::Warn,
        Tone::Error => LogLevel::Error,
        Tone::Success => LogLevel::Success,
    }
}

fn marker(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => " ",
        LogLevel::Warn => "!",
        LogLevel::Error => "✗",
        LogLevel::Success => "✓",
    }
}

/// Records one event in the log and echoes it to stdout.
///
/// Per-chunk progress is skipped.
pub fn record_event(log: &SharedEventLog, event: &UploadEvent) {
    if event.is_progress() {
        return;
    }
    let level = level_for(event.tone());
    let message = event.to_string();
    println!("{} {message}", marker(level));
    log.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(level, message);
}

/// Forwards orchestrator events until every sender is gone.
pub fn spawn_event_forwarder(
    mut rx: broadcast::Receiver<UploadEvent>,
    log: SharedEventLog,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => record_event(&log, &event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "event log fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Toggles pause whenever a line reading `p` arrives on stdin.
///
/// Stdin is read on a plain thread: a blocking read cannot be cancelled
/// and must not hold up runtime shutdown.
pub fn spawn_pause_toggle(orch: Arc<UploadOrchestrator>) -> JoinHandle<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if line.trim().eq_ignore_ascii_case("p") {
                orch.toggle_pause();
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use patentupload_event_log::EventLog;
    use patentupload_upload::RunSummary;

    #[test]
    fn events_land_in_log_with_tone() {
        let log = EventLog::shared();
        record_event(
            &log,
            &UploadEvent::ItemFailed {
                index: 1,
                file_name: "b.xlsx".into(),
                error: "[500] boom".into(),
            },
        );
        record_event(&log, &UploadEvent::ItemProgress { index: 1, progress: 50 });
        record_event(
            &log,
            &UploadEvent::RunFinished(RunSummary {
                total: 1,
                completed: 1,
                failed: 0,
            }),
        );

        let log = log.lock().unwrap();
        let entries: Vec<_> = log.entries().map(|e| (e.level, e.message.clone())).collect();
        assert_eq!(
            entries,
            vec![
                (LogLevel::Error, "[2] b.xlsx failed: [500] boom".to_string()),
                (
                    LogLevel::Success,
                    "upload finished: 1 succeeded, 0 failed, 1 total".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn forwarder_stops_when_sender_dropped() {
        let (tx, rx) = broadcast::channel(8);
        let log = EventLog::shared();
        let handle = spawn_event_forwarder(rx, log.clone());

        tx.send(UploadEvent::Authenticated).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(log.lock().unwrap().count(LogLevel::Success), 1);
    }
}
