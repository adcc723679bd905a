//! Narration events broadcast by the orchestrator.
//!
//! Purely informational: nothing in the control flow waits on them, and
//! a run proceeds the same with zero subscribers.

use std::fmt;

use crate::types::RunSummary;

/// Milestone emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    QueueInitialized { total: usize },
    QueueCleared,
    /// `run()` was called on an empty queue.
    QueueEmpty,
    Authenticating { endpoint: String },
    Authenticated,
    AuthenticationFailed { error: String },
    RunStarted { total: usize },
    ItemStarted { index: usize, file_name: String },
    ItemProgress { index: usize, progress: u8 },
    ItemCompleted { index: usize, file_name: String },
    ItemFailed { index: usize, file_name: String, error: String },
    Paused,
    Resumed,
    RetryStarted { index: usize, file_name: String },
    RunFinished(RunSummary),
}

/// How an event should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Warn,
    Error,
    Success,
}

impl UploadEvent {
    /// Returns the log level this event is narrated at.
    pub fn tone(&self) -> Tone {
        match self {
            Self::QueueEmpty | Self::Paused => Tone::Warn,
            Self::AuthenticationFailed { .. } | Self::ItemFailed { .. } => Tone::Error,
            Self::Authenticated | Self::ItemCompleted { .. } => Tone::Success,
            Self::RunFinished(summary) if summary.failed > 0 => Tone::Warn,
            Self::RunFinished(_) => Tone::Success,
            _ => Tone::Info,
        }
    }

    /// Per-chunk progress is too chatty for the operator log.
    pub fn is_progress(&self) -> bool {
        matches!(self, Self::ItemProgress { .. })
    }
}

impl fmt::Display for UploadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueInitialized { total } => write!(f, "queue initialized with {total} file(s)"),
            Self::QueueCleared => f.write_str("upload queue cleared"),
            Self::QueueEmpty => f.write_str("nothing to upload: queue is empty"),
            Self::Authenticating { endpoint } => write!(f, "logging in to {endpoint}"),
            Self::Authenticated => f.write_str("login successful"),
            Self::AuthenticationFailed { error } => write!(f, "login failed: {error}"),
            Self::RunStarted { total } => write!(f, "uploading {total} file(s)"),
            Self::ItemStarted { index, file_name } => {
                write!(f, "[{}] uploading {file_name}", index + 1)
            }
            Self::ItemProgress { index, progress } => {
                write!(f, "[{}] {progress}%", index + 1)
            }
            Self::ItemCompleted { index, file_name } => {
                write!(f, "[{}] {file_name} uploaded", index + 1)
            }
            Self::ItemFailed {
                index,
                file_name,
                error,
            } => write!(f, "[{}] {file_name} failed: {error}", index + 1),
            Self::Paused => f.write_str("upload paused"),
            Self::Resumed => f.write_str("upload resumed"),
            Self::RetryStarted { index, file_name } => {
                write!(f, "[{}] retrying {file_name}", index + 1)
            }
            Self::RunFinished(s) => write!(
                f,
                "upload finished: {} succeeded, {} failed, {} total",
                s.completed, s.failed, s.total
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_finished_tone_depends_on_failures() {
        let clean = UploadEvent::RunFinished(RunSummary {
            total: 2,
            completed: 2,
            failed: 0,
        });
        let partial = UploadEvent::RunFinished(RunSummary {
            total: 2,
            completed: 1,
            failed: 1,
        });
        assert_eq!(clean.tone(), Tone::Success);
        assert_eq!(partial.tone(), Tone::Warn);
    }

    #[test]
    fn item_messages_are_one_based() {
        let e = UploadEvent::ItemFailed {
            index: 0,
            file_name: "a.xlsx".into(),
            error: "[500] oops".into(),
        };
        assert_eq!(e.to_string(), "[1] a.xlsx failed: [500] oops");
        assert_eq!(e.tone(), Tone::Error);
    }

    #[test]
    fn progress_events_are_flagged() {
        assert!(UploadEvent::ItemProgress { index: 0, progress: 5 }.is_progress());
        assert!(!UploadEvent::Paused.is_progress());
    }
}
