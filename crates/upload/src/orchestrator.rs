//! Upload orchestrator for sequential batch transfer.
//!
//! Walks the queue strictly in order, one transfer in flight at a time,
//! recording every outcome in the ledger. Pause is honored only between
//! items; a failed item never aborts the run.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use patentupload_transfer::{ProgressLedger, ProgressRecord, TransferItem, TransferStatus};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::client::TransferClient;
use crate::error::{TransferError, UploadError};
use crate::events::UploadEvent;
use crate::pause::PauseGate;
use crate::types::{OrchestratorOptions, Phase, RunConfig, RunSummary, Session};

/// Queue state owned by the orchestrator.
#[derive(Debug, Default)]
struct QueueState {
    items: Vec<TransferItem>,
    ledger: ProgressLedger,
    phase: Phase,
    running: bool,
    session: Option<Session>,
}

/// Drives a queue of files through a [`TransferClient`].
///
/// Share it as `Arc<UploadOrchestrator>`: `pause`, `resume` and the
/// read-side accessors may be called from other tasks while
/// [`run`](Self::run) is in progress.
pub struct UploadOrchestrator {
    client: Arc<dyn TransferClient>,
    options: OrchestratorOptions,
    state: Mutex<QueueState>,
    pause: PauseGate,
    events: broadcast::Sender<UploadEvent>,
}

/// Releases the busy flag when a run or retry ends, including when its
/// future is dropped mid-transfer.
struct BusyGuard<'a> {
    orch: &'a UploadOrchestrator,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let mut s = self.orch.state();
        if let Phase::Running(index) = s.phase {
            if s.ledger.get(index).map(|r| r.status) == Some(TransferStatus::Uploading) {
                warn!(index, "transfer abandoned mid-flight");
                let _ = s.ledger.set_failed(index, "cancelled");
            }
        }
        s.running = false;
        s.phase = Phase::Idle;
    }
}

impl UploadOrchestrator {
    /// Creates an orchestrator with default options.
    pub fn new(client: Arc<dyn TransferClient>) -> Self {
        Self::with_options(client, OrchestratorOptions::default())
    }

    /// Creates an orchestrator with explicit delay and event-channel sizing.
    pub fn with_options(client: Arc<dyn TransferClient>, options: OrchestratorOptions) -> Self {
        let (events, _rx) = broadcast::channel(options.event_capacity.max(1));
        Self {
            client,
            options,
            state: Mutex::new(QueueState::default()),
            pause: PauseGate::new(),
            events,
        }
    }

    /// Subscribes to narration events.
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Queue lifecycle
    // -----------------------------------------------------------------------

    /// Replaces the queue with `items`, every record back to `pending`.
    pub fn initialize(&self, items: Vec<TransferItem>) -> Result<(), UploadError> {
        let total = items.len();
        {
            let mut s = self.state();
            if s.running {
                return Err(busy("initialize the queue"));
            }
            s.ledger.initialize(&items)?;
            s.items = items;
            s.phase = Phase::Idle;
        }
        self.pause.resume();

        info!(total, "upload queue initialized");
        self.emit(UploadEvent::QueueInitialized { total });
        Ok(())
    }

    /// Empties the queue and drops the session.
    pub fn clear(&self) -> Result<(), UploadError> {
        {
            let mut s = self.state();
            if s.running {
                return Err(busy("clear the queue"));
            }
            *s = QueueState::default();
        }
        self.pause.resume();

        info!("upload queue cleared");
        self.emit(UploadEvent::QueueCleared);
        Ok(())
    }

    /// Drops the session kept from the latest run.
    pub fn logout(&self) -> Result<(), UploadError> {
        let mut s = self.state();
        if s.running {
            return Err(busy("log out"));
        }
        if s.session.take().is_some() {
            debug!("session dropped");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Run
    // -----------------------------------------------------------------------

    /// Authenticates and uploads every queued item in order.
    ///
    /// Resolves with the aggregate summary even when items failed; only
    /// configuration, authentication and re-entrancy errors are returned.
    pub async fn run(&self, config: &RunConfig) -> Result<RunSummary, UploadError> {
        let (busy_guard, total) = {
            let mut s = self.state();
            if s.items.is_empty() {
                drop(s);
                warn!("upload requested on an empty queue");
                self.emit(UploadEvent::QueueEmpty);
                return Ok(RunSummary::default());
            }
            if s.running {
                return Err(busy("start a run"));
            }
            s.running = true;
            (BusyGuard { orch: self }, s.items.len())
        };

        config.validate()?;
        let session = self.authenticate(config).await?;

        info!(total, "upload run started");
        self.emit(UploadEvent::RunStarted { total });

        for index in 0..total {
            self.wait_if_paused(index).await;
            // Outcome is already recorded in the ledger.
            let _ = self.transfer_one(index, &session).await;

            if index + 1 < total && !self.options.inter_item_delay.is_zero() {
                tokio::time::sleep(self.options.inter_item_delay).await;
            }
        }

        let summary = self.summary();
        drop(busy_guard);

        info!(
            completed = summary.completed,
            failed = summary.failed,
            total = summary.total,
            "upload run finished"
        );
        self.emit(UploadEvent::RunFinished(summary));
        Ok(summary)
    }

    /// Re-attempts one failed item with the session of the latest run.
    ///
    /// Returns `Ok(false)` without touching the client unless the record
    /// is `failed`. A repeated failure is recorded, not returned.
    pub async fn retry(&self, index: usize) -> Result<bool, UploadError> {
        let (busy_guard, session, file_name) = {
            let mut s = self.state();
            let file_name = match s.ledger.get(index) {
                Some(r) if r.status == TransferStatus::Failed => r.file_name.clone(),
                _ => {
                    debug!(index, "retry ignored: record is not failed");
                    return Ok(false);
                }
            };
            if s.running {
                return Err(busy("retry"));
            }
            let Some(session) = s.session.clone() else {
                return Err(UploadError::InvalidState(
                    "no session: run the queue before retrying".into(),
                ));
            };
            s.running = true;
            (BusyGuard { orch: self }, session, file_name)
        };

        info!(index, file = %file_name, "retrying upload");
        self.emit(UploadEvent::RetryStarted { index, file_name });

        if let Err(e) = self.transfer_one(index, &session).await {
            warn!(index, error = %e, "retry failed again");
        }
        drop(busy_guard);
        Ok(true)
    }

    /// Retries every failed item in queue order.
    ///
    /// The summary covers the retried subset only.
    pub async fn retry_failed(&self) -> Result<RunSummary, UploadError> {
        let (busy_guard, session, indices) = {
            let mut s = self.state();
            if s.running {
                return Err(busy("retry"));
            }
            let indices = s.ledger.failed_indices();
            if indices.is_empty() {
                return Ok(RunSummary::default());
            }
            let Some(session) = s.session.clone() else {
                return Err(UploadError::InvalidState(
                    "no session: run the queue before retrying".into(),
                ));
            };
            s.running = true;
            (BusyGuard { orch: self }, session, indices)
        };

        let mut summary = RunSummary {
            total: indices.len(),
            ..RunSummary::default()
        };
        info!(total = summary.total, "retrying failed uploads");

        for (n, &index) in indices.iter().enumerate() {
            self.wait_if_paused(index).await;
            let file_name = self.file_name(index);
            self.emit(UploadEvent::RetryStarted { index, file_name });

            match self.transfer_one(index, &session).await {
                Ok(()) => summary.completed += 1,
                Err(_) => summary.failed += 1,
            }

            if n + 1 < indices.len() && !self.options.inter_item_delay.is_zero() {
                tokio::time::sleep(self.options.inter_item_delay).await;
            }
        }
        drop(busy_guard);

        info!(
            completed = summary.completed,
            failed = summary.failed,
            "retry pass finished"
        );
        self.emit(UploadEvent::RunFinished(summary));
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Pause
    // -----------------------------------------------------------------------

    /// Holds the run before the next item. An in-flight transfer is not affected.
    pub fn pause(&self) {
        if self.pause.pause() {
            info!("upload paused");
            self.emit(UploadEvent::Paused);
        }
    }

    /// Lets a paused run continue with the next item.
    pub fn resume(&self) {
        if self.pause.resume() {
            info!("upload resumed");
            self.emit(UploadEvent::Resumed);
        }
    }

    /// Flips the pause flag and returns the new value.
    pub fn toggle_pause(&self) -> bool {
        let paused = self.pause.toggle();
        if paused {
            info!("upload paused");
            self.emit(UploadEvent::Paused);
        } else {
            info!("upload resumed");
            self.emit(UploadEvent::Resumed);
        }
        paused
    }

    /// Returns whether the run is held before the next item.
    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    // -----------------------------------------------------------------------
    // Read side (snapshots)
    // -----------------------------------------------------------------------

    /// Returns a snapshot of every progress record.
    pub fn progress(&self) -> Vec<ProgressRecord> {
        self.state().ledger.records()
    }

    /// Returns a snapshot of record `index`, if it exists.
    pub fn record(&self, index: usize) -> Option<ProgressRecord> {
        self.state().ledger.get(index).cloned()
    }

    /// Returns the queued items.
    pub fn items(&self) -> Vec<TransferItem> {
        self.state().items.clone()
    }

    /// Returns the number of queued items.
    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    /// Returns whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    /// Returns the mean progress over all records, 0 to 100.
    pub fn overall_progress(&self) -> u8 {
        self.state().ledger.overall_progress()
    }

    /// Returns the number of completed records.
    pub fn completed_count(&self) -> usize {
        self.state().ledger.completed_count()
    }

    /// Returns the number of failed records.
    pub fn failed_count(&self) -> usize {
        self.state().ledger.failed_count()
    }

    /// Returns the number of records not attempted yet.
    pub fn pending_count(&self) -> usize {
        self.state().ledger.pending_count()
    }

    /// Returns the current phase.
    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    /// Index of the in-flight item, `None` when nothing is transferring.
    pub fn current_index(&self) -> Option<usize> {
        match self.state().phase {
            Phase::Running(index) => Some(index),
            _ => None,
        }
    }

    /// Returns whether a run or retry is in progress.
    pub fn is_running(&self) -> bool {
        self.state().running
    }

    /// Returns whether a session from a previous run is kept.
    pub fn has_session(&self) -> bool {
        self.state().session.is_some()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn authenticate(&self, config: &RunConfig) -> Result<Session, UploadError> {
        let endpoint = config.base_url().to_string();
        self.state().phase = Phase::Authenticating;
        self.emit(UploadEvent::Authenticating {
            endpoint: endpoint.clone(),
        });

        let outcome = self
            .client
            .authenticate(&endpoint, &config.username, &config.password)
            .await;

        match outcome {
            Ok(credential) => {
                let session = Session::new(&endpoint, credential);
                self.state().session = Some(session.clone());
                info!(endpoint = %endpoint, "authenticated");
                self.emit(UploadEvent::Authenticated);
                Ok(session)
            }
            Err(e) => {
                self.state().session = None;
                let e = match e {
                    UploadError::Authentication(_) => e,
                    other => UploadError::Authentication(other.to_string()),
                };
                error!(endpoint = %endpoint, error = %e, "authentication failed");
                self.emit(UploadEvent::AuthenticationFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn wait_if_paused(&self, index: usize) {
        if !self.pause.is_paused() {
            return;
        }
        self.state().phase = Phase::Paused(index);
        debug!(index, "waiting for resume");
        self.pause.wait_until_resumed().await;
    }

    /// Transfers a single item and records the outcome in the ledger.
    async fn transfer_one(&self, index: usize, session: &Session) -> Result<(), TransferError> {
        let item = {
            let mut s = self.state();
            let Some(item) = s.items.get(index).cloned() else {
                return Err(TransferError::new(format!("no queued item at index {index}")));
            };
            s.ledger
                .set_uploading(index)
                .map_err(|e| TransferError::new(e.to_string()))?;
            s.phase = Phase::Running(index);
            item
        };

        info!(index, file = %item.display_name, "uploading");
        self.emit(UploadEvent::ItemStarted {
            index,
            file_name: item.display_name.clone(),
        });

        let on_progress = |pct: u8| self.record_progress(index, pct);
        let outcome = self.client.transfer(&item, session, &on_progress).await;

        match outcome {
            Ok(result) => {
                let _ = self.state().ledger.set_completed(index, result);
                info!(index, file = %item.display_name, "upload completed");
                self.emit(UploadEvent::ItemCompleted {
                    index,
                    file_name: item.display_name,
                });
                Ok(())
            }
            Err(e) => {
                let _ = self.state().ledger.set_failed(index, e.to_string());
                warn!(index, file = %item.display_name, error = %e, "upload failed");
                self.emit(UploadEvent::ItemFailed {
                    index,
                    file_name: item.display_name,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn record_progress(&self, index: usize, pct: u8) {
        let progress = {
            let mut s = self.state();
            let before = match s.ledger.get(index) {
                Some(r) if r.status == TransferStatus::Uploading => r.progress,
                _ => return,
            };
            let _ = s.ledger.set_progress(index, pct);
            match s.ledger.get(index) {
                Some(r) if r.progress != before => r.progress,
                _ => return,
            }
        };
        self.emit(UploadEvent::ItemProgress { index, progress });
    }

    fn summary(&self) -> RunSummary {
        let s = self.state();
        RunSummary {
            total: s.ledger.len(),
            completed: s.ledger.completed_count(),
            failed: s.ledger.failed_count(),
        }
    }

    fn file_name(&self, index: usize) -> String {
        self.state()
            .ledger
            .get(index)
            .map(|r| r.file_name.clone())
            .unwrap_or_default()
    }

    fn emit(&self, event: UploadEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn busy(action: &str) -> UploadError {
    UploadError::InvalidState(format!("cannot {action}: an upload is in progress"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ProgressFn, TransferFuture};
    use crate::types::Credential;
    use patentupload_protocol::ImportResponse;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    struct FailPlan {
        progress: u8,
        error: TransferError,
        remaining: usize,
    }

    #[derive(Default)]
    struct MockClient {
        fail_auth: bool,
        failures: Mutex<HashMap<String, FailPlan>>,
        holds: Mutex<HashMap<String, Arc<Notify>>>,
        calls: Mutex<Vec<String>>,
        auth_calls: AtomicUsize,
        in_flight: AtomicUsize,
        overlapped: AtomicBool,
    }

    impl MockClient {
        fn failing_auth() -> Self {
            Self {
                fail_auth: true,
                ..Self::default()
            }
        }

        /// Makes `name` report `progress`% and then fail, `times` times.
        fn fail(self, name: &str, progress: u8, times: usize) -> Self {
            self.failures.lock().unwrap().insert(
                name.into(),
                FailPlan {
                    progress,
                    error: TransferError::with_status(500, "import rejected"),
                    remaining: times,
                },
            );
            self
        }

        /// Blocks the transfer of `name` until the returned notify fires.
        fn hold(&self, name: &str) -> Arc<Notify> {
            let n = Arc::new(Notify::new());
            self.holds.lock().unwrap().insert(name.into(), Arc::clone(&n));
            n
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl TransferClient for MockClient {
        fn authenticate<'a>(
            &'a self,
            _endpoint: &'a str,
            _username: &'a str,
            _password: &'a str,
        ) -> TransferFuture<'a, Result<Credential, UploadError>> {
            Box::pin(async move {
                self.auth_calls.fetch_add(1, Ordering::SeqCst);
                if self.fail_auth {
                    Err(UploadError::Authentication("401 Unauthorized".into()))
                } else {
                    Ok(Credential::new("tok"))
                }
            })
        }

        fn transfer<'a>(
            &'a self,
            item: &'a TransferItem,
            session: &'a Session,
            on_progress: ProgressFn<'a>,
        ) -> TransferFuture<'a, Result<ImportResponse, TransferError>> {
            Box::pin(async move {
                assert_eq!(session.credential.expose(), "tok");
                if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
                    self.overlapped.store(true, Ordering::SeqCst);
                }
                self.calls.lock().unwrap().push(item.display_name.clone());

                on_progress(10);
                let hold = self.holds.lock().unwrap().get(&item.display_name).cloned();
                if let Some(n) = hold {
                    n.notified().await;
                }
                tokio::task::yield_now().await;

                let failure = {
                    let mut failures = self.failures.lock().unwrap();
                    match failures.get_mut(&item.display_name) {
                        Some(plan) if plan.remaining > 0 => {
                            plan.remaining -= 1;
                            Some((plan.progress, plan.error.clone()))
                        }
                        _ => None,
                    }
                };

                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                match failure {
                    Some((progress, error)) => {
                        on_progress(progress);
                        Err(error)
                    }
                    None => {
                        on_progress(60);
                        on_progress(100);
                        Ok(ImportResponse {
                            success: true,
                            data: None,
                            message: None,
                        })
                    }
                }
            })
        }
    }

    fn items(n: usize) -> Vec<TransferItem> {
        (0..n)
            .map(|i| TransferItem::new(format!("f{i}.xlsx"), format!("/out/f{i}.xlsx")))
            .collect()
    }

    fn config() -> RunConfig {
        RunConfig::new("http://import.local/", "admin", "secret")
    }

    fn orchestrator(client: Arc<MockClient>) -> Arc<UploadOrchestrator> {
        Arc::new(UploadOrchestrator::with_options(
            client,
            OrchestratorOptions {
                inter_item_delay: Duration::ZERO,
                ..OrchestratorOptions::default()
            },
        ))
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn run_uploads_all_in_order() {
        let client = Arc::new(MockClient::default());
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(4)).unwrap();

        let summary = orch.run(&config()).await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                total: 4,
                completed: 4,
                failed: 0
            }
        );
        assert_eq!(client.calls(), vec!["f0.xlsx", "f1.xlsx", "f2.xlsx", "f3.xlsx"]);
        assert!(!client.overlapped.load(Ordering::SeqCst));
        assert_eq!(orch.overall_progress(), 100);
        assert_eq!(orch.phase(), Phase::Idle);
        assert_eq!(orch.current_index(), None);
        assert!(!orch.is_running());
    }

    #[tokio::test]
    async fn failed_item_does_not_abort_run() {
        let client = Arc::new(MockClient::default().fail("f1.xlsx", 40, 1));
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(3)).unwrap();

        let summary = orch.run(&config()).await.unwrap();

        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        assert!(summary.is_partial_failure());
        assert_eq!(client.calls().len(), 3);
        assert_eq!(orch.completed_count(), 2);
        assert_eq!(orch.failed_count(), 1);
        assert_eq!(orch.overall_progress(), 80);

        let failed = orch.record(1).unwrap();
        assert_eq!(failed.status, TransferStatus::Failed);
        assert_eq!(failed.progress, 40);
        assert_eq!(failed.error.as_deref(), Some("[500] import rejected"));
        assert!(failed.result.is_none());
    }

    #[tokio::test]
    async fn empty_queue_is_a_no_op() {
        let client = Arc::new(MockClient::default());
        let orch = orchestrator(Arc::clone(&client));
        let mut events = orch.subscribe();

        let summary = orch.run(&config()).await.unwrap();

        assert_eq!(summary, RunSummary::default());
        assert_eq!(client.auth_calls.load(Ordering::SeqCst), 0);
        assert!(client.calls().is_empty());
        assert!(!orch.has_session());
        assert_eq!(events.try_recv().unwrap(), UploadEvent::QueueEmpty);
    }

    #[tokio::test]
    async fn missing_server_url_rejected_before_any_call() {
        let client = Arc::new(MockClient::default());
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(2)).unwrap();

        let err = orch
            .run(&RunConfig::new("", "admin", "secret"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Configuration(_)));
        assert_eq!(client.auth_calls.load(Ordering::SeqCst), 0);
        assert!(client.calls().is_empty());
        assert!(!orch.is_running());
    }

    #[tokio::test]
    async fn authentication_failure_aborts_before_items() {
        let client = Arc::new(MockClient::failing_auth());
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(2)).unwrap();

        let err = orch.run(&config()).await.unwrap_err();

        assert!(matches!(err, UploadError::Authentication(_)));
        assert!(client.calls().is_empty());
        assert!(orch.progress().iter().all(|r| r.status == TransferStatus::Pending));
        assert_eq!(orch.pending_count(), 2);
        assert!(!orch.has_session());
        assert!(!orch.is_running());
    }

    #[tokio::test]
    async fn authenticates_once_per_run() {
        let client = Arc::new(MockClient::default());
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(3)).unwrap();

        orch.run(&config()).await.unwrap();
        orch.run(&config()).await.unwrap();

        assert_eq!(client.auth_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reentrant_calls_rejected_while_running() {
        let client = Arc::new(MockClient::default());
        let release = client.hold("f0.xlsx");
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(2)).unwrap();

        let o = Arc::clone(&orch);
        let run = tokio::spawn(async move { o.run(&config()).await });
        wait_until(|| client.calls().len() == 1).await;

        assert_eq!(orch.current_index(), Some(0));
        assert!(matches!(
            orch.run(&config()).await,
            Err(UploadError::InvalidState(_))
        ));
        assert!(matches!(
            orch.initialize(items(1)),
            Err(UploadError::InvalidState(_))
        ));
        assert!(matches!(orch.clear(), Err(UploadError::InvalidState(_))));
        assert!(matches!(orch.logout(), Err(UploadError::InvalidState(_))));

        release.notify_one();
        let summary = run.await.unwrap().unwrap();
        assert_eq!(summary.completed, 2);
    }

    #[tokio::test]
    async fn pause_before_first_item_holds_run() {
        let client = Arc::new(MockClient::default());
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(2)).unwrap();
        orch.pause();

        let o = Arc::clone(&orch);
        let run = tokio::spawn(async move { o.run(&config()).await });
        wait_until(|| orch.phase() == Phase::Paused(0)).await;
        assert!(client.calls().is_empty());

        orch.resume();
        run.await.unwrap().unwrap();
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test]
    async fn pause_does_not_interrupt_in_flight_transfer() {
        let client = Arc::new(MockClient::default());
        let release = client.hold("f0.xlsx");
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(3)).unwrap();

        let o = Arc::clone(&orch);
        let run = tokio::spawn(async move { o.run(&config()).await });
        wait_until(|| client.calls().len() == 1).await;

        orch.pause();
        release.notify_one();
        wait_until(|| orch.phase() == Phase::Paused(1)).await;

        assert_eq!(orch.record(0).unwrap().status, TransferStatus::Completed);
        assert_eq!(orch.record(1).unwrap().status, TransferStatus::Pending);
        assert_eq!(client.calls().len(), 1);

        orch.resume();
        run.await.unwrap().unwrap();
        assert_eq!(client.calls(), vec!["f0.xlsx", "f1.xlsx", "f2.xlsx"]);
    }

    #[tokio::test]
    async fn toggle_pause_twice_restores_state() {
        let orch = orchestrator(Arc::new(MockClient::default()));
        assert!(orch.toggle_pause());
        assert!(orch.is_paused());
        assert!(!orch.toggle_pause());
        assert!(!orch.is_paused());
    }

    #[tokio::test]
    async fn retry_is_no_op_unless_failed() {
        let client = Arc::new(MockClient::default());
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(2)).unwrap();

        // pending
        assert!(!orch.retry(0).await.unwrap());
        assert!(client.calls().is_empty());

        orch.run(&config()).await.unwrap();
        let before = client.calls().len();

        // completed
        assert!(!orch.retry(0).await.unwrap());
        // out of range
        assert!(!orch.retry(9).await.unwrap());
        assert_eq!(client.calls().len(), before);
    }

    #[tokio::test]
    async fn retry_failed_item_succeeds_without_reauth() {
        let client = Arc::new(MockClient::default().fail("f1.xlsx", 40, 1));
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(3)).unwrap();
        orch.run(&config()).await.unwrap();
        assert_eq!(orch.failed_count(), 1);

        assert!(orch.retry(1).await.unwrap());

        let rec = orch.record(1).unwrap();
        assert_eq!(rec.status, TransferStatus::Completed);
        assert_eq!(rec.progress, 100);
        assert!(rec.error.is_none());
        assert_eq!(client.auth_calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.calls(), vec!["f0.xlsx", "f1.xlsx", "f2.xlsx", "f1.xlsx"]);
        assert!(!orch.is_running());
    }

    #[tokio::test]
    async fn retry_failing_again_is_recorded_not_raised() {
        let client = Arc::new(MockClient::default().fail("f0.xlsx", 20, 2));
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(1)).unwrap();
        orch.run(&config()).await.unwrap();

        let mut events = orch.subscribe();
        assert!(orch.retry(0).await.unwrap());

        let rec = orch.record(0).unwrap();
        assert_eq!(rec.status, TransferStatus::Failed);
        assert_eq!(rec.progress, 20);

        let mut saw_uploading_start = false;
        while let Ok(e) = events.try_recv() {
            if matches!(e, UploadEvent::ItemStarted { index: 0, .. }) {
                saw_uploading_start = true;
            }
        }
        assert!(saw_uploading_start);
    }

    #[tokio::test]
    async fn retry_without_session_rejected() {
        let client = Arc::new(MockClient::default().fail("f0.xlsx", 0, 1));
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(1)).unwrap();
        orch.run(&config()).await.unwrap();
        orch.logout().unwrap();

        assert!(matches!(
            orch.retry(0).await,
            Err(UploadError::InvalidState(_))
        ));
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn retry_failed_only_touches_failed_items() {
        let client = Arc::new(
            MockClient::default()
                .fail("f0.xlsx", 5, 1)
                .fail("f2.xlsx", 5, 2),
        );
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(4)).unwrap();
        orch.run(&config()).await.unwrap();
        assert_eq!(orch.failed_count(), 2);

        let summary = orch.retry_failed().await.unwrap();

        assert_eq!(
            summary,
            RunSummary {
                total: 2,
                completed: 1,
                failed: 1
            }
        );
        assert_eq!(&client.calls()[4..], ["f0.xlsx", "f2.xlsx"]);
        assert_eq!(orch.completed_count(), 3);
    }

    #[tokio::test]
    async fn retry_failed_with_nothing_failed() {
        let client = Arc::new(MockClient::default());
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(1)).unwrap();
        assert_eq!(orch.retry_failed().await.unwrap(), RunSummary::default());
    }

    #[tokio::test]
    async fn initialize_then_clear_restores_empty_state() {
        let orch = orchestrator(Arc::new(MockClient::default()));
        orch.initialize(items(3)).unwrap();
        orch.pause();
        orch.clear().unwrap();

        assert!(orch.is_empty());
        assert!(orch.progress().is_empty());
        assert_eq!(orch.overall_progress(), 0);
        assert_eq!(orch.phase(), Phase::Idle);
        assert!(!orch.is_paused());
        assert!(!orch.has_session());
        assert!(!orch.is_running());
    }

    #[tokio::test]
    async fn clear_drops_session() {
        let client = Arc::new(MockClient::default());
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(1)).unwrap();
        orch.run(&config()).await.unwrap();
        assert!(orch.has_session());

        orch.clear().unwrap();
        assert!(!orch.has_session());
    }

    #[tokio::test]
    async fn dropped_run_releases_busy_flag() {
        let client = Arc::new(MockClient::default());
        let _never = client.hold("f0.xlsx");
        let orch = orchestrator(Arc::clone(&client));
        orch.initialize(items(2)).unwrap();

        let o = Arc::clone(&orch);
        let run = tokio::spawn(async move { o.run(&config()).await });
        wait_until(|| client.calls().len() == 1).await;

        run.abort();
        assert!(run.await.unwrap_err().is_cancelled());

        assert!(!orch.is_running());
        assert_eq!(orch.phase(), Phase::Idle);
        let rec = orch.record(0).unwrap();
        assert_eq!(rec.status, TransferStatus::Failed);
        assert_eq!(rec.error.as_deref(), Some("cancelled"));
        assert_eq!(orch.record(1).unwrap().status, TransferStatus::Pending);
    }

    #[tokio::test]
    async fn events_narrate_the_run() {
        let client = Arc::new(MockClient::default().fail("f1.xlsx", 0, 1));
        let orch = orchestrator(Arc::clone(&client));
        let mut rx = orch.subscribe();
        orch.initialize(items(2)).unwrap();
        orch.run(&config()).await.unwrap();

        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            if !e.is_progress() {
                events.push(e);
            }
        }

        assert_eq!(
            events,
            vec![
                UploadEvent::QueueInitialized { total: 2 },
                UploadEvent::Authenticating {
                    endpoint: "http://import.local".into()
                },
                UploadEvent::Authenticated,
                UploadEvent::RunStarted { total: 2 },
                UploadEvent::ItemStarted {
                    index: 0,
                    file_name: "f0.xlsx".into()
                },
                UploadEvent::ItemCompleted {
                    index: 0,
                    file_name: "f0.xlsx".into()
                },
                UploadEvent::ItemStarted {
                    index: 1,
                    file_name: "f1.xlsx".into()
                },
                UploadEvent::ItemFailed {
                    index: 1,
                    file_name: "f1.xlsx".into(),
                    error: "[500] import rejected".into()
                },
                UploadEvent::RunFinished(RunSummary {
                    total: 2,
                    completed: 1,
                    failed: 1
                }),
            ]
        );
    }

    #[tokio::test]
    async fn progress_events_are_monotonic() {
        let client = Arc::new(MockClient::default());
        let orch = orchestrator(Arc::clone(&client));
        let mut rx = orch.subscribe();
        orch.initialize(items(1)).unwrap();
        orch.run(&config()).await.unwrap();

        let mut last = 0u8;
        while let Ok(e) = rx.try_recv() {
            if let UploadEvent::ItemProgress { progress, .. } = e {
                assert!(progress > last, "progress went {last} -> {progress}");
                last = progress;
            }
        }
        assert_eq!(last, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn inter_item_delay_only_between_items() {
        let client = Arc::new(MockClient::default());
        let orch = UploadOrchestrator::with_options(
            client,
            OrchestratorOptions {
                inter_item_delay: Duration::from_millis(500),
                ..OrchestratorOptions::default()
            },
        );
        orch.initialize(items(3)).unwrap();

        let start = tokio::time::Instant::now();
        orch.run(&config()).await.unwrap();
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(1000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1500), "{elapsed:?}");
    }
}
